//! Function closures: scripted bodies with their captured defining scope, or
//! native functions exported by built-in modules.

use std::rc::Rc;

use crate::{
    ast::FunctionNode,
    eval::Interpreter,
    exception_private::RunResult,
    heap::HeapId,
    value::Value,
};

pub(crate) type NativeFn = fn(&mut Interpreter, &[Value]) -> RunResult<Value>;

#[derive(Debug, Clone)]
pub(crate) enum FunctionKind {
    /// A function literal from source, with the scope it closed over.
    Scripted { node: Rc<FunctionNode>, scope: HeapId },
    Native { arity: u8, f: NativeFn },
}

#[derive(Debug, Clone)]
pub(crate) struct FunctionData {
    pub name: Option<String>,
    pub kind: FunctionKind,
}

impl FunctionData {
    pub fn captured_scope(&self) -> Option<HeapId> {
        match &self.kind {
            FunctionKind::Scripted { scope, .. } => Some(*scope),
            FunctionKind::Native { .. } => None,
        }
    }
}
