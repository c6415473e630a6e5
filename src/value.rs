//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.


//! Scalar cell values.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};

/// A single cell of a [`crate::Table`].
///
/// Equality and hashing are structural (floats compare by bit pattern), which
/// is what grouping needs. SQL comparison goes through [`Value::compare`].
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short kind name used in error messages and by the CLI type row.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Boolean view of the value: `Null` is unknown, non-booleans are an error.
    pub fn as_bool(&self) -> Result<Option<bool>> {
        match self {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(*b)),
            other => Err(Error::TypeMismatch(format!(
                "expected bool, found {}",
                other.kind()
            ))),
        }
    }

    /// Canonical form used as a grouping and DISTINCT key, so that keys
    /// agree with [`Value::compare`]: integral floats become `Int` (`-0.0`
    /// included) and every NaN maps to one key.
    pub fn group_key(&self) -> Value {
        match self {
            Value::Float(f)
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
            {
                Value::Int(*f as i64)
            }
            Value::Float(f) if f.is_nan() => Value::Float(f64::NAN),
            other => other.clone(),
        }
    }

    fn is_zero(&self) -> bool {
        match self {
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            _ => false,
        }
    }

    /// Total order used by ORDER BY, min/max and comparison operators.
    ///
    /// `Null` sorts before everything; ints and floats compare numerically.
    pub fn compare(&self, other: &Value) -> Result<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Ok(Ordering::Equal),
            (Value::Null, _) => Ok(Ordering::Less),
            (_, Value::Null) => Ok(Ordering::Greater),
            (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Ok(x.total_cmp(&y)),
                _ => Err(Error::TypeMismatch(format!(
                    "cannot compare {} with {}",
                    a.kind(),
                    b.kind()
                ))),
            },
        }
    }

    pub fn add(&self, other: &Value) -> Result<Value> {
        self.arith(other, "+", i64::checked_add, |a, b| a + b)
    }

    pub fn sub(&self, other: &Value) -> Result<Value> {
        self.arith(other, "-", i64::checked_sub, |a, b| a - b)
    }

    pub fn mul(&self, other: &Value) -> Result<Value> {
        self.arith(other, "*", i64::checked_mul, |a, b| a * b)
    }

    /// Division by zero yields `Null`.
    pub fn div(&self, other: &Value) -> Result<Value> {
        if other.is_zero() && self.as_f64().is_some() {
            return Ok(Value::Null);
        }
        self.arith(other, "/", i64::checked_div, |a, b| a / b)
    }

    pub fn rem(&self, other: &Value) -> Result<Value> {
        if other.is_zero() && self.as_f64().is_some() {
            return Ok(Value::Null);
        }
        self.arith(other, "%", i64::checked_rem, |a, b| a % b)
    }

    fn arith(
        &self,
        other: &Value,
        op: &str,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Result<Value> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
                .map(Value::Int)
                .ok_or_else(|| Error::InvalidArgument(format!("integer overflow in {a} {op} {b}"))),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Ok(Value::Float(float_op(x, y))),
                _ => Err(Error::TypeMismatch(format!(
                    "cannot apply '{op}' to {} and {}",
                    a.kind(),
                    b.kind()
                ))),
            },
        }
    }

    pub fn neg(&self) -> Result<Value> {
        match self {
            Value::Null => Ok(Value::Null),
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| Error::InvalidArgument(format!("integer overflow in -{i}"))),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(Error::TypeMismatch(format!("cannot negate {}", other.kind()))),
        }
    }

    pub fn and(&self, other: &Value) -> Result<Value> {
        Ok(match (self.as_bool()?, other.as_bool()?) {
            (Some(false), _) | (_, Some(false)) => Value::Bool(false),
            (Some(true), Some(true)) => Value::Bool(true),
            _ => Value::Null,
        })
    }

    pub fn or(&self, other: &Value) -> Result<Value> {
        Ok(match (self.as_bool()?, other.as_bool()?) {
            (Some(true), _) | (_, Some(true)) => Value::Bool(true),
            (Some(false), Some(false)) => Value::Bool(false),
            _ => Value::Null,
        })
    }

    pub fn not(&self) -> Result<Value> {
        Ok(match self.as_bool()? {
            Some(b) => Value::Bool(!b),
            None => Value::Null,
        })
    }

    /// Infer a value from a raw CSV cell.
    pub fn parse_cell(raw: &str) -> Value {
        if raw.is_empty() {
            return Value::Null;
        }
        if raw.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Int(i);
        }
        // "inf" and "nan" parse as floats; keep those as text
        if raw.bytes().any(|b| b.is_ascii_digit()) {
            if let Ok(f) = raw.parse::<f64>() {
                return Value::Float(f);
            }
        }
        Value::Text(raw.to_string())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
                write!(f, "{v:.1}")
            }
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nulls_sort_first_and_numbers_mix() {
        assert_eq!(Value::Null.compare(&Value::Int(-5)).unwrap(), Ordering::Less);
        assert_eq!(
            Value::Int(2).compare(&Value::Float(1.5)).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            Value::text("a").compare(&Value::text("b")).unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn text_against_number_is_a_type_mismatch() {
        let err = Value::text("x").compare(&Value::Int(1)).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }

    #[test]
    fn arithmetic_promotes_and_propagates_null() {
        assert_eq!(Value::Int(2).add(&Value::Int(3)).unwrap(), Value::Int(5));
        assert_eq!(
            Value::Int(1).add(&Value::Float(0.5)).unwrap(),
            Value::Float(1.5)
        );
        assert_eq!(Value::Null.mul(&Value::Int(3)).unwrap(), Value::Null);
        assert_eq!(Value::Int(7).div(&Value::Int(2)).unwrap(), Value::Int(3));
        assert_eq!(Value::Int(7).div(&Value::Int(0)).unwrap(), Value::Null);
        assert!(Value::Int(i64::MAX).add(&Value::Int(1)).is_err());
    }

    #[test]
    fn three_valued_logic() {
        let t = Value::Bool(true);
        let f = Value::Bool(false);
        assert_eq!(Value::Null.and(&f).unwrap(), f);
        assert_eq!(Value::Null.and(&t).unwrap(), Value::Null);
        assert_eq!(Value::Null.or(&t).unwrap(), t);
        assert_eq!(Value::Null.not().unwrap(), Value::Null);
        assert!(Value::Int(1).and(&t).is_err());
    }

    #[test]
    fn parse_cell_infers_kinds() {
        assert_eq!(Value::parse_cell(""), Value::Null);
        assert_eq!(Value::parse_cell("42"), Value::Int(42));
        assert_eq!(Value::parse_cell("4.5"), Value::Float(4.5));
        assert_eq!(Value::parse_cell("TRUE"), Value::Bool(true));
        assert_eq!(Value::parse_cell("nan"), Value::text("nan"));
        assert_eq!(Value::parse_cell("bug"), Value::text("bug"));
    }

    #[test]
    fn group_key_unifies_equal_numbers() {
        assert_eq!(Value::Float(1.0).group_key(), Value::Int(1).group_key());
        assert_eq!(Value::Float(-0.0).group_key(), Value::Int(0));
        assert_eq!(Value::Float(1.5).group_key(), Value::Float(1.5));
        assert_eq!(Value::Float(f64::NAN).group_key(), Value::Float(-f64::NAN).group_key());
        assert_eq!(Value::text("1").group_key(), Value::text("1"));
    }

    #[test]
    fn display_keeps_float_marker() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(2.25).to_string(), "2.25");
        assert_eq!(Value::Null.to_string(), "NULL");
    }
}
