//! Operator dispatch.
//!
//! Binary operators cascade: the left operand's class is asked first, then
//! the right operand's reflected operator, then the right operand's plain
//! operator with swapped operands. A dispatch miss is signalled with `None`
//! rather than an exception, so an operator method that genuinely raises
//! `NotImplementedError` still surfaces it. Primitive operands are handled
//! inline; the `operator <op>` / `operator r<op>` method names are consulted
//! only for scripted classes.

use crate::{
    ast::Operator,
    class::NativeKind,
    eval::Interpreter,
    exception_private::{ExcType, RunResult},
    heap::ObjectData,
    value::Value,
};

impl Interpreter {
    pub(crate) fn binary_operation(&mut self, left: Value, op: Operator, right: Value) -> RunResult<Value> {
        if op == Operator::InstanceOf {
            return self.instance_of(left, right);
        }
        if let Some(value) = self.binary_half(left, op, right, false)? {
            return Ok(value);
        }
        if let Some(value) = self.binary_half(right, op, left, true)? {
            return Ok(value);
        }
        if let Some(value) = self.binary_half(right, op, left, false)? {
            return Ok(value);
        }
        let message = format!(
            "Unsupported classes for '{}': {} and {}",
            op.as_str(),
            self.class_name_of(left),
            self.class_name_of(right)
        );
        self.raise(ExcType::TypeError, message)
    }

    pub(crate) fn unary_operation(&mut self, op: Operator, operand: Value) -> RunResult<Value> {
        let result = match (op, operand) {
            (Operator::Minus, Value::Int(v)) => Some(Value::Int(v.wrapping_neg())),
            (Operator::Plus, Value::Int(v)) => Some(Value::Int(v)),
            (Operator::Minus, Value::Float(v)) => Some(Value::Float(-v)),
            (Operator::Plus, Value::Float(v)) => Some(Value::Float(v)),
            (Operator::Not, Value::Bool(v)) => Some(Value::Bool(!v)),
            _ => None,
        };
        match result {
            Some(value) => Ok(value),
            None => {
                let message = format!(
                    "Unsupported class for unary '{}': {}",
                    op.as_str(),
                    self.class_name_of(operand)
                );
                self.raise(ExcType::TypeError, message)
            }
        }
    }

    /// `left instanceof right`, via `isA` on the left value's dynamic class.
    fn instance_of(&mut self, left: Value, right: Value) -> RunResult<Value> {
        let class = match right.as_object() {
            Some(id) if matches!(self.heap.data(id), ObjectData::Class(_)) => id,
            _ => return self.raise(ExcType::TypeError, "Expected a class"),
        };
        let value_class = self.class_of_value(left);
        Ok(Value::Bool(self.is_a(value_class, class)))
    }

    /// One side of the cascade: `Ok(None)` is a dispatch miss. With
    /// `reflected` set, `this` is the right operand of the source expression
    /// and the operands are swapped back before computing.
    fn binary_half(&mut self, this: Value, op: Operator, other: Value, reflected: bool) -> RunResult<Option<Value>> {
        match this {
            Value::Null => Ok(null_binary(op, other)),
            Value::Bool(v) => Ok(bool_binary(v, op, other)),
            Value::Int(v) => self.int_binary(v, op, other, reflected),
            Value::Float(v) => Ok(float_binary(v, op, other, reflected)),
            Value::Ref(id) => {
                let class = self.heap.class_of(id);
                match self.heap.expect_class(class).native {
                    Some(NativeKind::Str) => self.str_binary(id, op, other, reflected),
                    Some(_) => Ok(None),
                    None => self.object_binary(this, op, other, reflected),
                }
            }
        }
    }

    fn int_binary(&mut self, this: i64, op: Operator, other: Value, reflected: bool) -> RunResult<Option<Value>> {
        let Value::Int(other) = other else {
            return Ok(None);
        };
        let (l, r) = if reflected { (other, this) } else { (this, other) };
        let value = match op {
            Operator::Plus => Value::Int(l.wrapping_add(r)),
            Operator::Minus => Value::Int(l.wrapping_sub(r)),
            Operator::Star => Value::Int(l.wrapping_mul(r)),
            Operator::Slash => {
                if r == 0 {
                    return self.raise(ExcType::ZeroDivisionError, "Division by zero");
                }
                Value::Int(l.wrapping_div(r))
            }
            Operator::Eq => Value::Bool(l == r),
            Operator::NotEq => Value::Bool(l != r),
            Operator::Lt => Value::Bool(l < r),
            Operator::Gt => Value::Bool(l > r),
            Operator::LtEq => Value::Bool(l <= r),
            Operator::GtEq => Value::Bool(l >= r),
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    fn str_binary(&mut self, this: crate::heap::HeapId, op: Operator, other: Value, reflected: bool) -> RunResult<Option<Value>> {
        match op {
            Operator::Plus => {
                let Some(other_id) = other.as_object() else {
                    return Ok(None);
                };
                let (ObjectData::Str(a), ObjectData::Str(b)) = (self.heap.data(this), self.heap.data(other_id)) else {
                    return Ok(None);
                };
                let text = if reflected {
                    format!("{b}{a}")
                } else {
                    format!("{a}{b}")
                };
                Ok(Some(self.new_string(text)))
            }
            Operator::Star => {
                let Value::Int(count) = other else {
                    return Ok(None);
                };
                if count < 0 {
                    return self.raise(ExcType::ValueError, "Cannot repeat a string a negative number of times");
                }
                let ObjectData::Str(text) = self.heap.data(this) else {
                    unreachable!("string class cell without string data");
                };
                let repeated = text.repeat(usize::try_from(count).unwrap_or(0));
                Ok(Some(self.new_string(repeated)))
            }
            Operator::Eq | Operator::NotEq => {
                let Some(other_id) = other.as_object() else {
                    return Ok(None);
                };
                let (ObjectData::Str(a), ObjectData::Str(b)) = (self.heap.data(this), self.heap.data(other_id)) else {
                    return Ok(None);
                };
                let equal = a == b;
                Ok(Some(Value::Bool(if op == Operator::Eq { equal } else { !equal })))
            }
            _ => Ok(None),
        }
    }

    /// Operator dispatch on an instance of a scripted class: looks up the
    /// synthesized method name on its class and calls it.
    fn object_binary(&mut self, this: Value, op: Operator, other: Value, reflected: bool) -> RunResult<Option<Value>> {
        let method_name = if reflected {
            format!("operator r{}", op.as_str())
        } else {
            format!("operator {}", op.as_str())
        };
        let class = self.class_of_value(this);
        match self.find_method_or_getter(class, &method_name, true) {
            Some(method) if !self.heap.expect_method(method).flags.get => {
                let value = self.call_method(method, this, &[other])?;
                Ok(Some(value))
            }
            _ => Ok(None),
        }
    }
}

fn null_binary(op: Operator, other: Value) -> Option<Value> {
    match op {
        Operator::Eq => Some(Value::Bool(other == Value::Null)),
        Operator::NotEq => Some(Value::Bool(other != Value::Null)),
        _ => None,
    }
}

fn bool_binary(this: bool, op: Operator, other: Value) -> Option<Value> {
    let Value::Bool(other) = other else {
        return None;
    };
    let value = match op {
        Operator::Eq => this == other,
        Operator::NotEq => this != other,
        Operator::And => this && other,
        Operator::Or => this || other,
        _ => return None,
    };
    Some(Value::Bool(value))
}

/// Floats handle mixed numeric operands, which is how `int op float` reaches
/// a result: the integer side misses and the float side picks it up through
/// the reflected form.
fn float_binary(this: f64, op: Operator, other: Value, reflected: bool) -> Option<Value> {
    let other = match other {
        Value::Float(v) => v,
        Value::Int(v) => v as f64,
        _ => return None,
    };
    let (l, r) = if reflected { (other, this) } else { (this, other) };
    let value = match op {
        Operator::Plus => Value::Float(l + r),
        Operator::Minus => Value::Float(l - r),
        Operator::Star => Value::Float(l * r),
        Operator::Slash => Value::Float(l / r),
        Operator::Eq => Value::Bool(l == r),
        Operator::NotEq => Value::Bool(l != r),
        Operator::Lt => Value::Bool(l < r),
        Operator::Gt => Value::Bool(l > r),
        Operator::LtEq => Value::Bool(l <= r),
        Operator::GtEq => Value::Bool(l >= r),
        _ => return None,
    };
    Some(value)
}
