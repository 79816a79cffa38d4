//! The `Structure` built-in: the one native class whose instances accept
//! arbitrary attribute reads and writes through a plain field table.

use indexmap::IndexMap;

use crate::value::Value;

#[derive(Debug, Default)]
pub(crate) struct StructureData {
    pub fields: IndexMap<String, Value>,
}
