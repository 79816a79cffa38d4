//! The built-in `math` module: constants and a few native functions.

use crate::{
    eval::Interpreter,
    exception_private::{ExcType, RunResult},
    function::{FunctionData, FunctionKind, NativeFn},
    heap::{HeapId, ObjectData},
    value::Value,
};

pub(crate) fn register(interp: &mut Interpreter) {
    let module = interp.new_module("math", true, None);
    export_value(interp, module, "pi", Value::Float(std::f64::consts::PI));
    export_value(interp, module, "e", Value::Float(std::f64::consts::E));
    export_value(interp, module, "tau", Value::Float(std::f64::consts::TAU));
    export_value(interp, module, "inf", Value::Float(f64::INFINITY));
    export_function(interp, module, "sqrt", 1, math_sqrt);
    export_function(interp, module, "abs", 1, math_abs);
    export_function(interp, module, "floor", 1, math_floor);
    export_function(interp, module, "ceil", 1, math_ceil);
    export_function(interp, module, "pow", 2, math_pow);
}

fn export_value(interp: &mut Interpreter, module: HeapId, name: &str, value: Value) {
    interp.module_add_export(module, name, value);
}

fn export_function(interp: &mut Interpreter, module: HeapId, name: &str, arity: u8, f: NativeFn) {
    let function = interp.heap.allocate(
        interp.builtins.function,
        ObjectData::Function(FunctionData {
            name: Some(name.to_owned()),
            kind: FunctionKind::Native { arity, f },
        }),
    );
    interp.module_add_export(module, name, Value::Ref(function));
}

fn number_arg(interp: &mut Interpreter, value: Value) -> RunResult<f64> {
    match value {
        Value::Int(v) => Ok(v as f64),
        Value::Float(v) => Ok(v),
        _ => interp.raise(ExcType::TypeError, "Expected a number"),
    }
}

/// Converts a rounded float back to an integer, rejecting values outside the
/// 64-bit range.
fn int_result(interp: &mut Interpreter, value: f64) -> RunResult<Value> {
    if value.is_finite() && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        Ok(Value::Int(value as i64))
    } else {
        interp.raise(ExcType::ValueError, "Result out of range")
    }
}

fn math_sqrt(interp: &mut Interpreter, args: &[Value]) -> RunResult<Value> {
    let x = number_arg(interp, args[0])?;
    if x < 0.0 {
        return interp.raise(ExcType::ValueError, "math domain error");
    }
    Ok(Value::Float(x.sqrt()))
}

fn math_abs(interp: &mut Interpreter, args: &[Value]) -> RunResult<Value> {
    match args[0] {
        Value::Int(v) => Ok(Value::Int(v.wrapping_abs())),
        Value::Float(v) => Ok(Value::Float(v.abs())),
        _ => interp.raise(ExcType::TypeError, "Expected a number"),
    }
}

fn math_floor(interp: &mut Interpreter, args: &[Value]) -> RunResult<Value> {
    let x = number_arg(interp, args[0])?;
    int_result(interp, x.floor())
}

fn math_ceil(interp: &mut Interpreter, args: &[Value]) -> RunResult<Value> {
    let x = number_arg(interp, args[0])?;
    int_result(interp, x.ceil())
}

fn math_pow(interp: &mut Interpreter, args: &[Value]) -> RunResult<Value> {
    let base = number_arg(interp, args[0])?;
    let exponent = number_arg(interp, args[1])?;
    Ok(Value::Float(base.powf(exponent)))
}
