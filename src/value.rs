//! Runtime values. Plain `f64`
//! rather than a `NotNan` wrapper (the sibling `rtlola` storage crate's
//! choice) since a NaN result should always count as changed -
//! exactly Rust's native `PartialEq` for `f64` already does
//! that, and a `NotNan` wrapper would make legitimate NaN results (e.g.
//! `sqrt(-1)`) a hard error instead of a value the language can observe.

use crate::error::EvalError;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Array(Vec<Value>),
    /// `BTreeMap` for deterministic field order in equality, `Display`,
    /// and struct-push fan-out.
    Struct(BTreeMap<String, Value>),
    Unit,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Struct(fields) => {
                write!(f, "{{")?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, v)?;
                }
                write!(f, "}}")
            }
            Value::Unit => write!(f, "()"),
        }
    }
}

impl Value {
    pub fn as_array(&self) -> Result<&[Value], EvalError> {
        match self {
            Value::Array(items) => Ok(items),
            _ => Err(EvalError::NotAnArray),
        }
    }

    pub fn as_struct(&self) -> Result<&BTreeMap<String, Value>, EvalError> {
        match self {
            Value::Struct(fields) => Ok(fields),
            _ => Err(EvalError::NotAStruct),
        }
    }

    pub fn as_bool(&self) -> Result<bool, EvalError> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(EvalError::Type("expected bool".to_string())),
        }
    }

    pub fn as_index(&self) -> Result<i64, EvalError> {
        match self {
            Value::Int(i) => Ok(*i),
            _ => Err(EvalError::IndexNotInt),
        }
    }

    pub fn as_f64(&self) -> Result<f64, EvalError> {
        match self {
            Value::Int(i) => Ok(*i as f64),
            Value::Float(x) => Ok(*x),
            _ => Err(EvalError::Type("expected a numeric value".to_string())),
        }
    }
}

/// Zero value for a type, used to initialize triggered streams that skip
/// their formula at compile time.
pub fn default_of(ty: &crate::ty::Type) -> Value {
    use crate::ty::Type;
    match ty {
        Type::Int => Value::Int(0),
        Type::Float => Value::Float(0.0),
        Type::Bool => Value::Bool(false),
        Type::String => Value::Str(String::new()),
        Type::Any => Value::Unit,
        Type::Array(_) => Value::Array(Vec::new()),
        Type::Struct(fields) => {
            Value::Struct(fields.iter().map(|(k, t)| (k.clone(), default_of(t))).collect())
        }
        Type::Function(..) => Value::Unit,
        Type::Named(_) => Value::Unit,
    }
}

macro_rules! numeric_binop {
    ($name:ident, $int_op:expr, $float_op:expr) => {
        pub fn $name(lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
            match (lhs, rhs) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int($int_op(*a, *b))),
                (Value::Int(a), Value::Float(b)) => Ok(Value::Float($float_op(*a as f64, *b))),
                (Value::Float(a), Value::Int(b)) => Ok(Value::Float($float_op(*a, *b as f64))),
                (Value::Float(a), Value::Float(b)) => Ok(Value::Float($float_op(*a, *b))),
                _ => Err(EvalError::Type("arithmetic requires numeric operands".to_string())),
            }
        }
    };
}

numeric_binop!(add, |a: i64, b: i64| a.wrapping_add(b), |a: f64, b: f64| a + b);
numeric_binop!(sub, |a: i64, b: i64| a.wrapping_sub(b), |a: f64, b: f64| a - b);
numeric_binop!(mul, |a: i64, b: i64| a.wrapping_mul(b), |a: f64, b: f64| a * b);

/// `/` is always float: integer operands are promoted before the
/// division runs, so there is no integer-division error path here.
/// Division by zero always yields positive infinity, regardless of the
/// numerator's sign or value - not native IEEE-754 signed-infinity/NaN
/// division.
pub fn div(lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let a = lhs.as_f64()?;
    let b = rhs.as_f64()?;
    if b == 0.0 {
        return Ok(Value::Float(f64::INFINITY));
    }
    Ok(Value::Float(a / b))
}

/// `%` is always int; division by zero is a hard runtime error,
/// unlike float division.
pub fn rem(lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match (lhs, rhs) {
        (Value::Int(_), Value::Int(0)) => Err(EvalError::DivisionByZero),
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a % b)),
        _ => Err(EvalError::Type("'%' requires integer operands".to_string())),
    }
}

pub fn neg(v: &Value) -> Result<Value, EvalError> {
    match v {
        Value::Int(i) => Ok(Value::Int(-i)),
        Value::Float(x) => Ok(Value::Float(-x)),
        _ => Err(EvalError::Type("unary '-' requires a numeric operand".to_string())),
    }
}

pub fn not(v: &Value) -> Result<Value, EvalError> {
    Ok(Value::Bool(!v.as_bool()?))
}

pub fn compare(op: &crate::ast::BinOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    use crate::ast::BinOp::*;
    let ordering = match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        _ => {
            return match op {
                Eq => Ok(Value::Bool(lhs == rhs)),
                Ne => Ok(Value::Bool(lhs != rhs)),
                _ => Err(EvalError::Type("comparison requires ordered operands".to_string())),
            }
        }
    };
    let ordering = match ordering {
        Some(o) => o,
        None => return Ok(Value::Bool(matches!(op, Ne))), // NaN: only `!=` is true
    };
    use std::cmp::Ordering::*;
    Ok(Value::Bool(match (op, ordering) {
        (Eq, Equal) => true,
        (Ne, o) => o != Equal,
        (Lt, Less) => true,
        (Le, Less) | (Le, Equal) => true,
        (Gt, Greater) => true,
        (Ge, Greater) | (Ge, Equal) => true,
        _ => false,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_division_by_zero_is_infinity() {
        let result = div(&Value::Float(1.0), &Value::Float(0.0)).unwrap();
        assert_eq!(result, Value::Float(f64::INFINITY));
    }

    #[test]
    fn int_modulo_by_zero_errors() {
        assert_eq!(rem(&Value::Int(1), &Value::Int(0)), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn mixed_int_float_add_promotes_to_float() {
        assert_eq!(add(&Value::Int(1), &Value::Float(2.5)).unwrap(), Value::Float(3.5));
    }

    #[test]
    fn nan_never_equals_itself() {
        let nan = Value::Float(f64::NAN);
        assert_ne!(nan, nan.clone());
    }
}
