//! Runtime value variant and the coercion rules shared by every opcode.
//!
//! Truthiness, rendering, numeric coercion, arithmetic, and comparison all
//! live here so the VM dispatch stays a thin switch.

use std::cmp::Ordering;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

/// Errors produced by value coercion and arithmetic.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValueError {
    #[error("Invalid number format")]
    InvalidNumberFormat,
    #[error("Division by zero")]
    DivisionByZero,
}

/// Numeric view of a value. Int/int arithmetic stays integral; anything
/// else widens to float.
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_float(&self) -> f64 {
        match self {
            Number::Int(value) => *value as f64,
            Number::Float(value) => *value,
        }
    }
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(value) => *value != 0,
            Value::Float(value) => *value != 0.0,
            Value::Bool(value) => *value,
            Value::Str(value) => !value.is_empty(),
        }
    }

    /// Renders the value the way `print` and string concatenation see it.
    pub fn to_output(&self) -> String {
        match self {
            Value::Int(value) => value.to_string(),
            Value::Float(value) => value.to_string(),
            Value::Bool(value) => {
                if *value {
                    "true".to_string()
                } else {
                    "false".to_string()
                }
            }
            Value::Str(value) => value.clone(),
        }
    }

    fn as_number(&self) -> Result<Number, ValueError> {
        match self {
            Value::Int(value) => Ok(Number::Int(*value)),
            Value::Float(value) => Ok(Number::Float(*value)),
            Value::Bool(value) => Ok(Number::Int(i64::from(*value))),
            Value::Str(value) => {
                let parsed = if value.contains('.') {
                    value.parse::<f64>().ok().map(Number::Float)
                } else {
                    value.parse::<i64>().ok().map(Number::Int)
                };
                parsed.ok_or(ValueError::InvalidNumberFormat)
            }
        }
    }

    /// Addition, or concatenation when either operand is a string. The
    /// non-string side is rendered and appended in left-then-right order.
    pub fn add(&self, other: &Value) -> Result<Value, ValueError> {
        if matches!(self, Value::Str(_)) || matches!(other, Value::Str(_)) {
            return Ok(Value::Str(format!(
                "{}{}",
                self.to_output(),
                other.to_output()
            )));
        }
        match (self.as_number()?, other.as_number()?) {
            (Number::Int(left), Number::Int(right)) => Ok(Value::Int(left.wrapping_add(right))),
            (left, right) => Ok(Value::Float(left.as_float() + right.as_float())),
        }
    }

    pub fn sub(&self, other: &Value) -> Result<Value, ValueError> {
        match (self.as_number()?, other.as_number()?) {
            (Number::Int(left), Number::Int(right)) => Ok(Value::Int(left.wrapping_sub(right))),
            (left, right) => Ok(Value::Float(left.as_float() - right.as_float())),
        }
    }

    pub fn mul(&self, other: &Value) -> Result<Value, ValueError> {
        match (self.as_number()?, other.as_number()?) {
            (Number::Int(left), Number::Int(right)) => Ok(Value::Int(left.wrapping_mul(right))),
            (left, right) => Ok(Value::Float(left.as_float() * right.as_float())),
        }
    }

    /// Integer division truncates toward zero; any zero divisor is an error.
    pub fn div(&self, other: &Value) -> Result<Value, ValueError> {
        match (self.as_number()?, other.as_number()?) {
            (Number::Int(left), Number::Int(right)) => {
                if right == 0 {
                    return Err(ValueError::DivisionByZero);
                }
                Ok(Value::Int(left.wrapping_div(right)))
            }
            (left, right) => {
                let divisor = right.as_float();
                if divisor == 0.0 {
                    return Err(ValueError::DivisionByZero);
                }
                Ok(Value::Float(left.as_float() / divisor))
            }
        }
    }

    /// Lexicographic for string/string pairs; everything else coerces to
    /// numeric and compares as floats.
    pub fn compare(&self, other: &Value) -> Result<Ordering, ValueError> {
        if let (Value::Str(left), Value::Str(right)) = (self, other) {
            return Ok(left.cmp(right));
        }
        let left = self.as_number()?.as_float();
        let right = other.as_number()?.as_float();
        Ok(left.total_cmp(&right))
    }
}
