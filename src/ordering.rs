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


//! Stable multi-key ordering of rows within a table and of tables within a
//! list of groups.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::expr::{evaluate_expression, evaluate_scalar, Expr};
use crate::table::{Row, Table};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// One `ORDER BY` item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderKey {
    pub expr: Expr,
    pub direction: Direction,
}

impl OrderKey {
    pub fn asc(expr: Expr) -> Self {
        OrderKey {
            expr,
            direction: Direction::Asc,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        OrderKey {
            expr,
            direction: Direction::Desc,
        }
    }
}

/// Orders the rows of a single table.
#[derive(Debug, Clone, Copy)]
pub struct RowOrdering<'a> {
    keys: &'a [OrderKey],
}

impl<'a> RowOrdering<'a> {
    pub fn new(keys: &'a [OrderKey]) -> Self {
        RowOrdering { keys }
    }

    /// Sort `table` by the key expressions evaluated per row. The result has
    /// the same fields as the input.
    pub fn sort(&self, table: &Table) -> Result<Table> {
        if self.keys.is_empty() {
            return Ok(table.clone());
        }
        let columns = self
            .keys
            .iter()
            .map(|k| evaluate_expression(table, &k.expr))
            .collect::<Result<Vec<_>>>()?;
        let rows: Vec<Row> = (0..table.len())
            .map(|i| columns.iter().map(|c| c[i].clone()).collect())
            .collect();
        let key_table = Table::with_rows(self.keys.iter().map(|k| k.expr.label()), rows)?;
        let with_keys = table.chain(&key_table)?;
        self.sort_trailing(&with_keys, table.width())
    }

    /// Sort by key columns already appended as the trailing `keys.len()`
    /// columns of `table`, then keep only the first `keep` columns.
    pub fn sort_trailing(&self, table: &Table, keep: usize) -> Result<Table> {
        let width = table.width();
        let nkeys = self.keys.len();
        if nkeys > width {
            return Err(Error::ShapeMismatch {
                expected: nkeys,
                found: width,
            });
        }
        let start = width - nkeys;
        for col in start..width {
            check_comparable(table.column(col))?;
        }

        let mut rows = table.rows().to_vec();
        rows.sort_by(|a, b| compare_keys(&a[start..], &b[start..], self.keys));
        Ok(Table::with_rows(table.fields().iter().cloned(), rows)?.slice_col(0, keep))
    }
}

/// Orders a list of group tables by per-table scalar keys.
#[derive(Debug, Clone, Copy)]
pub struct TableOrdering<'a> {
    keys: &'a [OrderKey],
}

impl<'a> TableOrdering<'a> {
    pub fn new(keys: &'a [OrderKey]) -> Self {
        TableOrdering { keys }
    }

    pub fn sort(&self, tables: Vec<Table>) -> Result<Vec<Table>> {
        if self.keys.is_empty() || tables.len() < 2 {
            return Ok(tables);
        }
        let mut keyed = tables
            .into_iter()
            .map(|t| {
                let key = self
                    .keys
                    .iter()
                    .map(|k| evaluate_scalar(&t, &k.expr))
                    .collect::<Result<Vec<Value>>>()?;
                Ok((key, t))
            })
            .collect::<Result<Vec<_>>>()?;
        for col in 0..self.keys.len() {
            check_comparable(keyed.iter().map(|(key, _)| &key[col]))?;
        }
        keyed.sort_by(|a, b| compare_keys(&a.0, &b.0, self.keys));
        Ok(keyed.into_iter().map(|(_, t)| t).collect())
    }
}

/// Sort class: values of different classes cannot be ordered against each
/// other. Null orders against anything.
fn class(v: &Value) -> Option<u8> {
    match v {
        Value::Null => None,
        Value::Bool(_) => Some(0),
        Value::Int(_) | Value::Float(_) => Some(1),
        Value::Text(_) => Some(2),
    }
}

fn check_comparable<'v>(values: impl Iterator<Item = &'v Value>) -> Result<()> {
    let mut seen: Option<&Value> = None;
    for v in values {
        let Some(c) = class(v) else { continue };
        match seen {
            None => seen = Some(v),
            Some(first) if class(first) != Some(c) => {
                return Err(Error::TypeMismatch(format!(
                    "cannot order {} against {}",
                    first.kind(),
                    v.kind()
                )))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn compare_keys(a: &[Value], b: &[Value], keys: &[OrderKey]) -> Ordering {
    for ((x, y), key) in a.iter().zip(b).zip(keys) {
        // Kinds were validated up front.
        let ord = x.compare(y).unwrap_or(Ordering::Equal);
        let ord = match key.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores() -> Table {
        Table::with_rows(
            ["name", "score"],
            vec![
                vec!["d".into(), 2.into()],
                vec!["a".into(), 1.into()],
                vec!["c".into(), 2.into()],
                vec!["b".into(), Value::Null],
                vec!["e".into(), 1.5.into()],
            ],
        )
        .unwrap()
    }

    fn names(t: &Table) -> Vec<String> {
        t.column(0).map(|v| v.to_string()).collect()
    }

    #[test]
    fn ascending_puts_nulls_first_and_is_stable() {
        let keys = [OrderKey::asc(Expr::col("score"))];
        let sorted = RowOrdering::new(&keys).sort(&scores()).unwrap();
        assert_eq!(sorted.fields(), ["name", "score"]);
        assert_eq!(names(&sorted), ["b", "a", "e", "d", "c"]);
    }

    #[test]
    fn descending_puts_nulls_last() {
        let keys = [OrderKey::desc(Expr::col("score"))];
        let sorted = RowOrdering::new(&keys).sort(&scores()).unwrap();
        assert_eq!(names(&sorted), ["d", "c", "e", "a", "b"]);
    }

    #[test]
    fn mixed_directions_left_to_right() {
        let keys = [
            OrderKey::desc(Expr::col("score")),
            OrderKey::asc(Expr::col("name")),
        ];
        let sorted = RowOrdering::new(&keys).sort(&scores()).unwrap();
        assert_eq!(names(&sorted), ["c", "d", "e", "a", "b"]);
    }

    #[test]
    fn sort_trailing_strips_keys() {
        let t = Table::with_rows(
            ["v", "k"],
            vec![vec![1.into(), 3.into()], vec![2.into(), 1.into()]],
        )
        .unwrap();
        let keys = [OrderKey::asc(Expr::col("k"))];
        let sorted = RowOrdering::new(&keys).sort_trailing(&t, 1).unwrap();
        assert_eq!(sorted.fields(), ["v"]);
        assert_eq!(sorted.rows(), [vec![Value::Int(2)], vec![Value::Int(1)]]);
    }

    #[test]
    fn mixed_kinds_are_rejected() {
        let t = Table::with_rows(["k"], vec![vec![1.into()], vec!["x".into()]]).unwrap();
        let keys = [OrderKey::asc(Expr::col("k"))];
        assert!(matches!(
            RowOrdering::new(&keys).sort(&t),
            Err(Error::TypeMismatch(_))
        ));
    }

    #[test]
    fn tables_order_by_aggregate() {
        let group = |vals: &[i64]| {
            Table::with_rows(["a"], vals.iter().map(|v| vec![Value::Int(*v)]).collect()).unwrap()
        };
        let groups = vec![group(&[1]), group(&[2, 3, 4]), group(&[5, 6])];
        let keys = [OrderKey::desc(Expr::call("count", vec![Expr::col("a")]))];
        let sorted = TableOrdering::new(&keys).sort(groups).unwrap();
        let lens: Vec<usize> = sorted.iter().map(Table::len).collect();
        assert_eq!(lens, [3, 2, 1]);
    }

    #[test]
    fn tables_with_equal_keys_keep_their_order() {
        let groups = vec![
            Table::with_rows(["a"], vec![vec![1.into()]]).unwrap(),
            Table::with_rows(["a"], vec![vec![2.into()]]).unwrap(),
        ];
        let keys = [OrderKey::asc(Expr::call("count", vec![Expr::Wildcard]))];
        let sorted = TableOrdering::new(&keys).sort(groups.clone()).unwrap();
        assert_eq!(sorted, groups);
    }
}
