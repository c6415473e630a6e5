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


//! Expression trees, token extraction and evaluation against a table.
//!
//! An expression evaluates to either one value per row or a single scalar.
//! Literals and aggregate calls produce scalars; scalars are broadcast to the
//! table's row count only when a caller asks for per-row output
//! ([`EvalMode::PerRow`]).

use crate::error::{Error, Result};
use crate::functions::{self, AggOp, FunctionDef, FunctionKind, ScalarFn};
use crate::table::{Row, Table};
use crate::value::Value;

/// A parsed SELECT / WHERE / GROUP BY / HAVING / ORDER BY item.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Column(String),
    /// `*`: a whole SELECT item, or the argument of `count(*)`.
    Wildcard,
    /// Function or operator application, resolved by name in the registry.
    Call { name: String, args: Vec<Expr> },
}

impl Expr {
    pub fn lit(value: impl Into<Value>) -> Expr {
        Expr::Literal(value.into())
    }

    pub fn col(name: impl Into<String>) -> Expr {
        Expr::Column(name.into())
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Call {
            name: name.into(),
            args,
        }
    }

    /// Binary operator call, e.g. `Expr::binary(">", a, b)`.
    pub fn binary(op: &str, left: Expr, right: Expr) -> Expr {
        Expr::call(op, vec![left, right])
    }

    /// True when this node itself is an aggregate call.
    pub fn is_aggregate_call(&self) -> bool {
        matches!(self, Expr::Call { name, .. } if functions::is_aggregate_name(name))
    }

    /// True when an aggregate call appears anywhere in the tree.
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expr::Call { args, .. } => {
                self.is_aggregate_call() || args.iter().any(Expr::contains_aggregate)
            }
            _ => false,
        }
    }

    pub fn contains_wildcard(&self) -> bool {
        match self {
            Expr::Wildcard => true,
            Expr::Call { args, .. } => args.iter().any(Expr::contains_wildcard),
            _ => false,
        }
    }

    /// Display label, used as the output field name.
    pub fn label(&self) -> String {
        match self {
            Expr::Literal(Value::Text(s)) => format!("'{s}'"),
            Expr::Literal(v) => v.to_string(),
            Expr::Column(name) => name.clone(),
            Expr::Wildcard => "*".to_string(),
            Expr::Call { name, args } if args.len() == 2 && functions::is_infix(name) => {
                format!(
                    "{} {name} {}",
                    args[0].operand_label(),
                    args[1].operand_label()
                )
            }
            Expr::Call { name, args } if name == "neg" && args.len() == 1 => {
                format!("-{}", args[0].operand_label())
            }
            Expr::Call { name, args } if name == "not" && args.len() == 1 => {
                format!("not {}", args[0].operand_label())
            }
            Expr::Call { name, args } => {
                let args: Vec<String> = args.iter().map(Expr::label).collect();
                format!("{name}({})", args.join(", "))
            }
        }
    }

    fn operand_label(&self) -> String {
        match self {
            Expr::Call { name, args }
                if (args.len() == 2 && functions::is_infix(name)) || name == "not" =>
            {
                format!("({})", self.label())
            }
            _ => self.label(),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// A column reference pulled out of an expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Column(String),
    Wildcard,
}

/// Insertion-ordered set of tokens.
///
/// Once a wildcard is inserted the set collapses to `{*}` and stays that way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    tokens: Vec<Token>,
}

impl TokenSet {
    pub fn new() -> Self {
        TokenSet::default()
    }

    pub fn wildcard() -> Self {
        TokenSet {
            tokens: vec![Token::Wildcard],
        }
    }

    pub fn insert(&mut self, token: Token) {
        if self.is_wildcard() || self.tokens.contains(&token) {
            return;
        }
        if token == Token::Wildcard {
            self.tokens.clear();
        }
        self.tokens.push(token);
    }

    pub fn union(&mut self, other: &TokenSet) {
        for token in &other.tokens {
            self.insert(token.clone());
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.tokens.first() == Some(&Token::Wildcard)
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.tokens.contains(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    /// Column names in insertion order (empty for the wildcard set).
    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.tokens.iter().filter_map(|t| match t {
            Token::Column(name) => Some(name.as_str()),
            Token::Wildcard => None,
        })
    }
}

impl<'a> IntoIterator for &'a TokenSet {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

/// Collect every column token referenced by `exprs`.
pub fn extract_tokens<'a>(exprs: impl IntoIterator<Item = &'a Expr>) -> TokenSet {
    fn walk(expr: &Expr, out: &mut TokenSet) {
        match expr {
            Expr::Literal(_) => {}
            Expr::Column(name) => out.insert(Token::Column(name.clone())),
            Expr::Wildcard => out.insert(Token::Wildcard),
            Expr::Call { args, .. } => args.iter().for_each(|a| walk(a, out)),
        }
    }
    let mut tokens = TokenSet::new();
    for expr in exprs {
        walk(expr, &mut tokens);
    }
    tokens
}

/// True iff no column token (or wildcard) appears outside an aggregate call.
pub fn is_all_tokens_in_aggregate<'a>(exprs: impl IntoIterator<Item = &'a Expr>) -> bool {
    fn bare(expr: &Expr) -> bool {
        match expr {
            Expr::Literal(_) => false,
            Expr::Column(_) | Expr::Wildcard => true,
            Expr::Call { name, args } => {
                !functions::is_aggregate_name(name) && args.iter().any(bare)
            }
        }
    }
    exprs.into_iter().all(|e| !bare(e))
}

/// How an expression's result is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    /// One value per row; scalars are broadcast.
    PerRow,
    /// The whole table is one group: exactly one value. Non-aggregate
    /// expressions yield their first row's value (`Null` on an empty table).
    Aggregate,
}

/// Evaluate `expr` once per row of `table`.
pub fn evaluate_expression(table: &Table, expr: &Expr) -> Result<Vec<Value>> {
    evaluate_expression_as(table, expr, EvalMode::PerRow)
}

pub fn evaluate_expression_as(table: &Table, expr: &Expr, mode: EvalMode) -> Result<Vec<Value>> {
    let evaluated = eval(table, expr)?;
    Ok(match (mode, evaluated) {
        (EvalMode::PerRow, Evaluated::Scalar(v)) => vec![v; table.len()],
        (EvalMode::PerRow, Evaluated::Column(values)) => values,
        (EvalMode::Aggregate, Evaluated::Scalar(v)) => vec![v],
        (EvalMode::Aggregate, Evaluated::Column(values)) => {
            vec![values.into_iter().next().unwrap_or_default()]
        }
    })
}

/// Evaluate `expr` with the whole table as one group.
pub fn evaluate_scalar(table: &Table, expr: &Expr) -> Result<Value> {
    match eval(table, expr)? {
        Evaluated::Scalar(v) => Ok(v),
        Evaluated::Column(values) => Ok(values.into_iter().next().unwrap_or_default()),
    }
}

/// Evaluate each expression into one output column.
///
/// The result's fields are the expressions' labels. It has as many rows as
/// `table`, except that an empty table evaluated with nothing but aggregates
/// produces exactly one row.
pub fn evaluate_expressions(table: &Table, exprs: &[Expr]) -> Result<Table> {
    let evaluated: Vec<Evaluated> = exprs
        .iter()
        .map(|e| eval(table, e))
        .collect::<Result<_>>()?;

    let collapsed = table.is_empty()
        && !exprs.is_empty()
        && exprs.iter().all(Expr::contains_aggregate)
        && evaluated.iter().all(Evaluated::is_scalar);
    let nrows = if collapsed { 1 } else { table.len() };

    let mut rows: Vec<Row> = vec![Vec::with_capacity(exprs.len()); nrows];
    for column in evaluated {
        match column {
            Evaluated::Scalar(v) => rows.iter_mut().for_each(|row| row.push(v.clone())),
            Evaluated::Column(values) => {
                for (row, v) in rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
    }
    Table::with_rows(exprs.iter().map(Expr::label), rows)
}

enum Evaluated {
    Scalar(Value),
    Column(Vec<Value>),
}

impl Evaluated {
    fn is_scalar(&self) -> bool {
        matches!(self, Evaluated::Scalar(_))
    }

    fn at(&self, row: usize) -> &Value {
        match self {
            Evaluated::Scalar(v) => v,
            Evaluated::Column(values) => &values[row],
        }
    }
}

fn eval(table: &Table, expr: &Expr) -> Result<Evaluated> {
    match expr {
        Expr::Literal(v) => Ok(Evaluated::Scalar(v.clone())),
        Expr::Column(name) => {
            let idx = table
                .column_index(name)
                .ok_or_else(|| Error::UnknownColumn(name.clone()))?;
            Ok(Evaluated::Column(table.column(idx).cloned().collect()))
        }
        Expr::Wildcard => Err(Error::Wildcard(
            "`*` is only valid as a SELECT item or inside count(*)".into(),
        )),
        Expr::Call { name, args } => {
            let def = functions::lookup(name).ok_or_else(|| Error::UnknownFunction(name.clone()))?;
            def.check_arity(args.len())?;
            match def.kind {
                FunctionKind::Aggregate(op) => eval_aggregate(table, def, op, &args[0]),
                FunctionKind::Scalar(f) => eval_scalar(table, f, args),
            }
        }
    }
}

fn eval_aggregate(table: &Table, def: &FunctionDef, op: AggOp, arg: &Expr) -> Result<Evaluated> {
    if arg.contains_aggregate() {
        return Err(Error::InvalidArgument(format!(
            "aggregate calls cannot be nested inside {}()",
            def.name
        )));
    }
    let value = match (op, arg) {
        (AggOp::Count, Expr::Wildcard) => Value::Int(table.len() as i64),
        (_, Expr::Wildcard) => {
            return Err(Error::Wildcard(format!("{}(*) is not supported", def.name)))
        }
        _ => match eval(table, arg)? {
            Evaluated::Column(values) => op.reduce(values.iter())?,
            Evaluated::Scalar(v) => op.reduce(std::iter::repeat(&v).take(table.len()))?,
        },
    };
    Ok(Evaluated::Scalar(value))
}

fn eval_scalar(table: &Table, f: ScalarFn, args: &[Expr]) -> Result<Evaluated> {
    let inputs = args
        .iter()
        .map(|a| eval(table, a))
        .collect::<Result<Vec<_>>>()?;

    if inputs.iter().all(Evaluated::is_scalar) {
        let values: Vec<Value> = inputs.iter().map(|i| i.at(0).clone()).collect();
        return Ok(Evaluated::Scalar(f(&values)?));
    }

    let mut out = Vec::with_capacity(table.len());
    let mut buf = Vec::with_capacity(args.len());
    for row in 0..table.len() {
        buf.clear();
        buf.extend(inputs.iter().map(|i| i.at(row).clone()));
        out.push(f(&buf)?);
    }
    Ok(Evaluated::Column(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Table {
        Table::with_rows(
            ["name", "age", "team"],
            vec![
                vec!["ann".into(), 31.into(), "core".into()],
                vec!["bob".into(), 25.into(), "web".into()],
                vec!["cid".into(), Value::Null, "core".into()],
            ],
        )
        .unwrap()
    }

    fn count(e: Expr) -> Expr {
        Expr::call("count", vec![e])
    }

    #[test]
    fn tokens_are_deduplicated_in_order() {
        let exprs = [
            Expr::binary("+", Expr::col("b"), Expr::col("a")),
            count(Expr::col("b")),
            Expr::col("c"),
        ];
        let tokens = extract_tokens(&exprs);
        assert_eq!(tokens.columns().collect::<Vec<_>>(), ["b", "a", "c"]);
    }

    #[test]
    fn wildcard_collapses_token_set() {
        let tokens = extract_tokens(&[Expr::Wildcard, Expr::col("a")]);
        assert!(tokens.is_wildcard());
        assert_eq!(tokens.len(), 1);

        let mut set = extract_tokens(&[Expr::col("a")]);
        set.union(&TokenSet::wildcard());
        set.insert(Token::Column("z".into()));
        assert_eq!(set, TokenSet::wildcard());
    }

    #[test]
    fn aggregate_detection() {
        assert!(is_all_tokens_in_aggregate(&[count(Expr::col("x"))]));
        assert!(!is_all_tokens_in_aggregate(&[
            Expr::col("x"),
            count(Expr::col("y"))
        ]));
        assert!(is_all_tokens_in_aggregate(&[Expr::binary(
            "+",
            count(Expr::Wildcard),
            Expr::lit(1)
        )]));
        assert!(is_all_tokens_in_aggregate(&[Expr::lit(1)]));
        assert!(!is_all_tokens_in_aggregate(&[Expr::Wildcard]));
    }

    #[test]
    fn per_row_evaluation_and_broadcast() {
        let t = people();
        let plus = Expr::binary("+", Expr::col("age"), Expr::lit(1));
        assert_eq!(
            evaluate_expression(&t, &plus).unwrap(),
            vec![Value::Int(32), Value::Int(26), Value::Null]
        );
        assert_eq!(
            evaluate_expression(&t, &count(Expr::col("age"))).unwrap(),
            vec![Value::Int(2); 3]
        );
        assert_eq!(
            evaluate_expression(&t, &count(Expr::Wildcard)).unwrap(),
            vec![Value::Int(3); 3]
        );
    }

    #[test]
    fn aggregate_mode_yields_one_value() {
        let t = people();
        let max = Expr::call("max", vec![Expr::col("age")]);
        assert_eq!(
            evaluate_expression_as(&t, &max, EvalMode::Aggregate).unwrap(),
            vec![Value::Int(31)]
        );
        assert_eq!(
            evaluate_expression_as(&t, &Expr::col("name"), EvalMode::Aggregate).unwrap(),
            vec![Value::text("ann")]
        );
        assert_eq!(evaluate_scalar(&Table::new(["name"]), &Expr::col("name")).unwrap(), Value::Null);
    }

    #[test]
    fn unknown_column_and_function_surface() {
        let t = people();
        assert_eq!(
            evaluate_expression(&t, &Expr::col("salary")).unwrap_err(),
            Error::UnknownColumn("salary".into())
        );
        assert_eq!(
            evaluate_expression(&t, &Expr::call("frobnicate", vec![])).unwrap_err(),
            Error::UnknownFunction("frobnicate".into())
        );
    }

    #[test]
    fn nested_aggregates_and_stray_wildcards_are_rejected() {
        let t = people();
        let nested = Expr::call("sum", vec![count(Expr::col("age"))]);
        assert!(matches!(
            evaluate_expression(&t, &nested),
            Err(Error::InvalidArgument(_))
        ));
        let summed = Expr::call("sum", vec![Expr::Wildcard]);
        assert!(matches!(evaluate_expression(&t, &summed), Err(Error::Wildcard(_))));
    }

    #[test]
    fn evaluate_expressions_labels_columns() {
        let t = people();
        let exprs = [
            Expr::col("name"),
            Expr::binary("*", Expr::col("age"), Expr::lit(2)),
            count(Expr::Wildcard),
        ];
        let out = evaluate_expressions(&t, &exprs).unwrap();
        assert_eq!(out.fields(), ["name", "age * 2", "count(*)"]);
        assert_eq!(out.len(), 3);
        assert_eq!(
            out.row(1).unwrap(),
            &vec![Value::text("bob"), Value::Int(50), Value::Int(3)]
        );
    }

    #[test]
    fn aggregates_over_empty_table_produce_one_row() {
        let empty = Table::new(["age"]);
        let out = evaluate_expressions(&empty, &[count(Expr::col("age"))]).unwrap();
        assert_eq!(out.rows(), [vec![Value::Int(0)]]);

        let mixed = evaluate_expressions(&empty, &[Expr::col("age"), count(Expr::col("age"))]).unwrap();
        assert!(mixed.is_empty());
    }

    #[test]
    fn labels_parenthesize_nested_operators() {
        let e = Expr::binary(
            "*",
            Expr::binary("+", Expr::col("a"), Expr::lit(1)),
            Expr::lit("x"),
        );
        assert_eq!(e.label(), "(a + 1) * 'x'");
        assert_eq!(count(Expr::Wildcard).to_string(), "count(*)");
    }
}
