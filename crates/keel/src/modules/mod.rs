//! Built-in modules, registered once at interpreter construction.

pub(crate) mod math;

use crate::eval::Interpreter;

pub(crate) fn register_builtin_modules(interp: &mut Interpreter) {
    math::register(interp);
}
