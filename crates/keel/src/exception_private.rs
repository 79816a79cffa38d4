//! Exception plumbing used inside the interpreter.
//!
//! A raised exception is an ordinary heap object; `RunError` carries its id
//! while the stack unwinds through `?`. The public [`crate::Exception`] type
//! is produced from it at the API boundary.

use strum::{Display, EnumCount, EnumString, IntoStaticStr, VariantArray};

use crate::{
    class::FieldLevel,
    eval::Interpreter,
    heap::{HeapId, ObjectData},
};

/// The built-in exception classes. Each is a direct subclass of `Exception`,
/// which subclasses `Object`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumCount, VariantArray)]
pub(crate) enum ExcType {
    Exception,
    TypeError,
    NameError,
    AttributeError,
    ParameterError,
    ImportError,
    /// The operator-dispatch fall-through signal; rarely user-visible.
    NotImplementedError,
    ZeroDivisionError,
    ValueError,
    SyntaxError,
}

/// A raised exception travelling up the evaluator.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RunError {
    pub exception: HeapId,
}

pub(crate) type RunResult<T> = Result<T, RunError>;

/// Payload of exception objects: the message, an optional cause, and field
/// levels for scripted subclasses.
#[derive(Debug)]
pub(crate) struct ExceptionData {
    pub message: String,
    pub cause: Option<HeapId>,
    pub levels: Vec<FieldLevel>,
}

impl Interpreter {
    /// Allocates an exception object of the given built-in type.
    pub(crate) fn new_exception(&mut self, ty: ExcType, message: impl Into<String>) -> HeapId {
        let class = self.builtins.exception(ty);
        self.heap.allocate(
            class,
            ObjectData::Exception(ExceptionData {
                message: message.into(),
                cause: None,
                levels: Vec::new(),
            }),
        )
    }

    /// Raises: allocates the exception and returns it as an error.
    pub(crate) fn raise<T>(&mut self, ty: ExcType, message: impl Into<String>) -> RunResult<T> {
        let exception = self.new_exception(ty, message);
        Err(RunError { exception })
    }
}
