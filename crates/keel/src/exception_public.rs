//! The public face of an uncaught language exception.

use std::fmt;

/// An uncaught exception, snapshotted at the API boundary: the exception
/// class name and its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    kind: String,
    message: String,
}

impl Exception {
    pub(crate) fn new(kind: String, message: String) -> Self {
        Self { kind, message }
    }

    /// The exception class name, e.g. `"TypeError"`.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for Exception {}
