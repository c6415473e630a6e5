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


//! Built-in function registry.
//!
//! Every call in an expression tree resolves here by name. Whether a call is
//! an aggregate is a static property of its registry entry, which is what the
//! evaluator and the aggregate-collapse check rely on.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::value::Value;

/// Aggregate reductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
    First,
    Last,
}

impl AggOp {
    /// Reduce a column to one value. Nulls are skipped except by `First`/`Last`.
    pub fn reduce<'a>(self, values: impl Iterator<Item = &'a Value>) -> Result<Value> {
        match self {
            AggOp::Count => Ok(Value::Int(values.filter(|v| !v.is_null()).count() as i64)),
            AggOp::CountDistinct => {
                let distinct: HashSet<Value> = values
                    .filter(|v| !v.is_null())
                    .map(Value::group_key)
                    .collect();
                Ok(Value::Int(distinct.len() as i64))
            }
            AggOp::Sum => {
                let mut acc = Value::Null;
                for v in values.filter(|v| !v.is_null()) {
                    acc = if acc.is_null() { v.clone() } else { acc.add(v)? };
                }
                if !acc.is_null() && acc.as_f64().is_none() {
                    return Err(Error::TypeMismatch(format!("cannot sum {}", acc.kind())));
                }
                Ok(acc)
            }
            AggOp::Avg => {
                let mut total = 0.0;
                let mut n = 0usize;
                for v in values.filter(|v| !v.is_null()) {
                    let x = v.as_f64().ok_or_else(|| {
                        Error::TypeMismatch(format!("cannot average {}", v.kind()))
                    })?;
                    total += x;
                    n += 1;
                }
                Ok(if n == 0 {
                    Value::Null
                } else {
                    Value::Float(total / n as f64)
                })
            }
            AggOp::Min => extreme(values, Ordering::Less),
            AggOp::Max => extreme(values, Ordering::Greater),
            AggOp::First => Ok(values.into_iter().next().cloned().unwrap_or_default()),
            AggOp::Last => Ok(values.last().cloned().unwrap_or_default()),
        }
    }
}

fn extreme<'a>(values: impl Iterator<Item = &'a Value>, wanted: Ordering) -> Result<Value> {
    let mut best: Option<&Value> = None;
    for v in values.filter(|v| !v.is_null()) {
        best = match best {
            Some(b) if v.compare(b)? != wanted => Some(b),
            _ => Some(v),
        };
    }
    Ok(best.cloned().unwrap_or_default())
}

pub type ScalarFn = fn(&[Value]) -> Result<Value>;

#[derive(Clone, Copy)]
pub enum FunctionKind {
    Aggregate(AggOp),
    Scalar(ScalarFn),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

/// One registry entry.
#[derive(Clone, Copy)]
pub struct FunctionDef {
    pub name: &'static str,
    pub kind: FunctionKind,
    pub arity: Arity,
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("aggregate", &self.is_aggregate())
            .field("arity", &self.arity)
            .finish()
    }
}

impl FunctionDef {
    pub fn is_aggregate(&self) -> bool {
        matches!(self.kind, FunctionKind::Aggregate(_))
    }

    pub fn check_arity(&self, n: usize) -> Result<()> {
        let ok = match self.arity {
            Arity::Exact(k) => n == k,
            Arity::Range(lo, hi) => (lo..=hi).contains(&n),
            Arity::AtLeast(lo) => n >= lo,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "{}() does not take {n} argument(s)",
                self.name
            )))
        }
    }
}

const fn agg(name: &'static str, op: AggOp) -> FunctionDef {
    FunctionDef {
        name,
        kind: FunctionKind::Aggregate(op),
        arity: Arity::Exact(1),
    }
}

const fn scalar(name: &'static str, arity: Arity, f: ScalarFn) -> FunctionDef {
    FunctionDef {
        name,
        kind: FunctionKind::Scalar(f),
        arity,
    }
}

static REGISTRY: LazyLock<HashMap<&'static str, FunctionDef>> = LazyLock::new(|| {
    use Arity::*;
    [
        agg("count", AggOp::Count),
        agg("count_distinct", AggOp::CountDistinct),
        agg("sum", AggOp::Sum),
        agg("avg", AggOp::Avg),
        agg("min", AggOp::Min),
        agg("max", AggOp::Max),
        agg("first", AggOp::First),
        agg("last", AggOp::Last),
        // operators
        scalar("+", Exact(2), |a| a[0].add(&a[1])),
        scalar("-", Exact(2), |a| a[0].sub(&a[1])),
        scalar("*", Exact(2), |a| a[0].mul(&a[1])),
        scalar("/", Exact(2), |a| a[0].div(&a[1])),
        scalar("%", Exact(2), |a| a[0].rem(&a[1])),
        scalar("neg", Exact(1), |a| a[0].neg()),
        scalar("=", Exact(2), |a| compare_with(a, Ordering::is_eq)),
        scalar("!=", Exact(2), |a| compare_with(a, Ordering::is_ne)),
        scalar("<", Exact(2), |a| compare_with(a, Ordering::is_lt)),
        scalar("<=", Exact(2), |a| compare_with(a, Ordering::is_le)),
        scalar(">", Exact(2), |a| compare_with(a, Ordering::is_gt)),
        scalar(">=", Exact(2), |a| compare_with(a, Ordering::is_ge)),
        scalar("and", Exact(2), |a| a[0].and(&a[1])),
        scalar("or", Exact(2), |a| a[0].or(&a[1])),
        scalar("not", Exact(1), |a| a[0].not()),
        scalar("||", Exact(2), concat_op),
        scalar("like", Exact(2), like),
        scalar("is_null", Exact(1), |a| Ok(Value::Bool(a[0].is_null()))),
        // math
        scalar("abs", Exact(1), abs),
        scalar("round", Range(1, 2), round),
        scalar("floor", Exact(1), |a| float_op(&a[0], "floor", f64::floor)),
        scalar("ceil", Exact(1), |a| float_op(&a[0], "ceil", f64::ceil)),
        scalar("sqrt", Exact(1), sqrt),
        // strings
        scalar("lower", Exact(1), |a| text_op(&a[0], "lower", |s| Value::Text(s.to_lowercase()))),
        scalar("upper", Exact(1), |a| text_op(&a[0], "upper", |s| Value::Text(s.to_uppercase()))),
        scalar("trim", Exact(1), |a| text_op(&a[0], "trim", |s| Value::text(s.trim()))),
        scalar("length", Exact(1), |a| {
            text_op(&a[0], "length", |s| Value::Int(s.chars().count() as i64))
        }),
        scalar("concat", AtLeast(1), concat),
        // null handling and casts
        scalar("coalesce", AtLeast(1), |a| {
            Ok(a.iter().find(|v| !v.is_null()).cloned().unwrap_or_default())
        }),
        scalar("nullif", Exact(2), nullif),
        scalar("to_int", Exact(1), to_int),
        scalar("to_float", Exact(1), to_float),
        scalar("to_text", Exact(1), |a| {
            Ok(match &a[0] {
                Value::Null => Value::Null,
                v => Value::Text(v.to_string()),
            })
        }),
    ]
    .into_iter()
    .map(|def| (def.name, def))
    .collect()
});

/// Resolve a function by name, case-insensitively.
pub fn lookup(name: &str) -> Option<&'static FunctionDef> {
    REGISTRY
        .get(name)
        .or_else(|| REGISTRY.get(name.to_ascii_lowercase().as_str()))
}

pub fn is_aggregate_name(name: &str) -> bool {
    lookup(name).is_some_and(FunctionDef::is_aggregate)
}

/// Names callable with function syntax (operators excluded), sorted.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = REGISTRY
        .keys()
        .copied()
        .filter(|n| n.starts_with(|c: char| c.is_ascii_alphabetic()) && !is_operator_word(n))
        .collect();
    names.sort_unstable();
    names
}

fn is_operator_word(name: &str) -> bool {
    matches!(name, "and" | "or" | "not" | "like" | "neg" | "is_null")
}

/// Operators rendered infix in display labels.
pub(crate) fn is_infix(name: &str) -> bool {
    matches!(
        name,
        "+" | "-" | "*" | "/" | "%" | "=" | "!=" | "<" | "<=" | ">" | ">=" | "and" | "or" | "||"
            | "like"
    )
}

fn compare_with(args: &[Value], pred: fn(Ordering) -> bool) -> Result<Value> {
    let (a, b) = (&args[0], &args[1]);
    if a.is_null() || b.is_null() {
        return Ok(Value::Null);
    }
    Ok(Value::Bool(pred(a.compare(b)?)))
}

fn concat_op(args: &[Value]) -> Result<Value> {
    if args.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }
    Ok(Value::Text(format!("{}{}", args[0], args[1])))
}

fn concat(args: &[Value]) -> Result<Value> {
    let mut out = String::new();
    for v in args.iter().filter(|v| !v.is_null()) {
        out.push_str(&v.to_string());
    }
    Ok(Value::Text(out))
}

fn like(args: &[Value]) -> Result<Value> {
    match (&args[0], &args[1]) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Text(s), Value::Text(p)) => {
            let text: Vec<char> = s.chars().collect();
            let pat: Vec<char> = p.chars().collect();
            Ok(Value::Bool(like_match(&text, &pat)))
        }
        (a, b) => Err(Error::TypeMismatch(format!(
            "LIKE expects text operands, found {} and {}",
            a.kind(),
            b.kind()
        ))),
    }
}

/// SQL LIKE: `%` matches any run, `_` matches one character.
fn like_match(text: &[char], pat: &[char]) -> bool {
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pat.len() && (pat[p] == '_' || pat[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pat.len() && pat[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((bp, bt)) = backtrack {
            p = bp + 1;
            t = bt + 1;
            backtrack = Some((bp, bt + 1));
        } else {
            return false;
        }
    }
    while p < pat.len() && pat[p] == '%' {
        p += 1;
    }
    p == pat.len()
}

fn abs(args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::Int(i) => i
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| Error::InvalidArgument(format!("integer overflow in abs({i})"))),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(Error::TypeMismatch(format!("abs() of {}", other.kind()))),
    }
}

fn round(args: &[Value]) -> Result<Value> {
    let digits = match args.get(1) {
        None => 0,
        Some(Value::Int(n)) => i32::try_from(*n)
            .map_err(|_| Error::InvalidArgument(format!("round() precision {n} out of range")))?,
        Some(other) => {
            return Err(Error::TypeMismatch(format!(
                "round() precision must be int, found {}",
                other.kind()
            )))
        }
    };
    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(f) => {
            let scale = 10f64.powi(digits);
            Ok(Value::Float((f * scale).round() / scale))
        }
        other => Err(Error::TypeMismatch(format!("round() of {}", other.kind()))),
    }
}

fn float_op(v: &Value, name: &str, f: fn(f64) -> f64) -> Result<Value> {
    match v {
        Value::Null => Ok(Value::Null),
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(x) => Ok(Value::Float(f(*x))),
        other => Err(Error::TypeMismatch(format!("{name}() of {}", other.kind()))),
    }
}

fn sqrt(args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Null => Ok(Value::Null),
        v => match v.as_f64() {
            Some(x) if x < 0.0 => Ok(Value::Null),
            Some(x) => Ok(Value::Float(x.sqrt())),
            None => Err(Error::TypeMismatch(format!("sqrt() of {}", v.kind()))),
        },
    }
}

fn text_op(v: &Value, name: &str, f: impl Fn(&str) -> Value) -> Result<Value> {
    match v {
        Value::Null => Ok(Value::Null),
        Value::Text(s) => Ok(f(s)),
        other => Err(Error::TypeMismatch(format!("{name}() of {}", other.kind()))),
    }
}

fn nullif(args: &[Value]) -> Result<Value> {
    let (a, b) = (&args[0], &args[1]);
    if !a.is_null() && !b.is_null() && a.compare(b)?.is_eq() {
        return Ok(Value::Null);
    }
    Ok(a.clone())
}

fn to_int(args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
        Value::Float(f) => Err(Error::InvalidArgument(format!("cannot convert {f} to int"))),
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| Error::InvalidArgument(format!("cannot convert '{s}' to int"))),
    }
}

fn to_float(args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| Error::InvalidArgument(format!("cannot convert '{s}' to float"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value> {
        let def = lookup(name).unwrap();
        def.check_arity(args.len())?;
        match def.kind {
            FunctionKind::Scalar(f) => f(args),
            FunctionKind::Aggregate(op) => op.reduce(args.iter()),
        }
    }

    #[test]
    fn lookup_is_case_insensitive_and_knows_aggregates() {
        assert!(lookup("COUNT").is_some());
        assert!(is_aggregate_name("Sum"));
        assert!(!is_aggregate_name("upper"));
        assert!(!is_aggregate_name("no_such_fn"));
    }

    #[test]
    fn count_distinct_treats_equal_numbers_as_one() {
        let vals = [Value::Int(1), Value::Float(1.0), Value::Float(2.5), Value::Int(2)];
        assert_eq!(AggOp::CountDistinct.reduce(vals.iter()).unwrap(), Value::Int(3));
    }

    #[test]
    fn aggregates_skip_nulls() {
        let vals = [Value::Int(3), Value::Null, Value::Int(1), Value::Int(3)];
        assert_eq!(AggOp::Count.reduce(vals.iter()).unwrap(), Value::Int(3));
        assert_eq!(AggOp::CountDistinct.reduce(vals.iter()).unwrap(), Value::Int(2));
        assert_eq!(AggOp::Sum.reduce(vals.iter()).unwrap(), Value::Int(7));
        assert_eq!(
            AggOp::Avg.reduce(vals.iter()).unwrap(),
            Value::Float(7.0 / 3.0)
        );
        assert_eq!(AggOp::Min.reduce(vals.iter()).unwrap(), Value::Int(1));
        assert_eq!(AggOp::Max.reduce(vals.iter()).unwrap(), Value::Int(3));
        assert_eq!(AggOp::First.reduce(vals.iter()).unwrap(), Value::Int(3));
        assert_eq!(AggOp::Last.reduce(vals.iter()).unwrap(), Value::Int(3));
    }

    #[test]
    fn empty_aggregates() {
        let none: [Value; 0] = [];
        assert_eq!(AggOp::Count.reduce(none.iter()).unwrap(), Value::Int(0));
        assert_eq!(AggOp::Sum.reduce(none.iter()).unwrap(), Value::Null);
        assert_eq!(AggOp::Avg.reduce(none.iter()).unwrap(), Value::Null);
        assert_eq!(AggOp::Max.reduce(none.iter()).unwrap(), Value::Null);
    }

    #[test]
    fn sum_of_text_is_rejected() {
        let vals = [Value::text("a")];
        assert!(matches!(
            AggOp::Sum.reduce(vals.iter()),
            Err(Error::TypeMismatch(_))
        ));
    }

    #[test]
    fn like_patterns() {
        let yes = |s: &str, p: &str| call("like", &[s.into(), p.into()]).unwrap() == Value::Bool(true);
        assert!(yes("bugfix", "bug%"));
        assert!(yes("bugfix", "%fix"));
        assert!(yes("bugfix", "b_gf%"));
        assert!(yes("", "%"));
        assert!(!yes("bugfix", "bug"));
        assert!(!yes("feature", "%bug%"));
    }

    #[test]
    fn comparisons_and_nulls() {
        assert_eq!(call("<", &[1.into(), 2.into()]).unwrap(), Value::Bool(true));
        assert_eq!(call("=", &[Value::Null, 2.into()]).unwrap(), Value::Null);
        assert!(call("=", &["a".into(), 2.into()]).is_err());
    }

    #[test]
    fn scalar_helpers() {
        assert_eq!(call("round", &[2.346.into(), 2.into()]).unwrap(), Value::Float(2.35));
        assert_eq!(call("upper", &["ab".into()]).unwrap(), Value::text("AB"));
        assert_eq!(call("length", &["héllo".into()]).unwrap(), Value::Int(5));
        assert_eq!(
            call("coalesce", &[Value::Null, 4.into()]).unwrap(),
            Value::Int(4)
        );
        assert_eq!(call("nullif", &[4.into(), 4.into()]).unwrap(), Value::Null);
        assert_eq!(call("to_int", &["12".into()]).unwrap(), Value::Int(12));
        assert_eq!(
            call("concat", &["a".into(), Value::Null, 1.into()]).unwrap(),
            Value::text("a1")
        );
    }

    #[test]
    fn arity_is_checked() {
        assert!(matches!(
            call("abs", &[1.into(), 2.into()]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn callable_names_exclude_operators() {
        let names = names();
        assert!(names.contains(&"count"));
        assert!(names.contains(&"coalesce"));
        assert!(!names.contains(&"and"));
        assert!(!names.contains(&"+"));
        assert!(names.windows(2).all(|w| w[0] < w[1]));
    }
}
