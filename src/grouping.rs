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


//! Partitioning a working table by its trailing group-key columns.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::table::{Row, Table};
use crate::value::Value;

/// Split `table` into one sub-table per distinct group key.
///
/// The key of a row is the tuple of its trailing `group_exprs.len()` values,
/// compared in [`Value::group_key`] form so `1` and `1.0` share a group.
/// Groups appear in first-occurrence order and keep their rows in source
/// order; the key columns are dropped from every sub-table.
pub fn generate_groups(table: &Table, group_exprs: &[Expr]) -> Result<Vec<Table>> {
    let n = group_exprs.len();
    if n == 0 {
        return Ok(vec![table.clone()]);
    }
    let width = table.width();
    if n > width {
        return Err(Error::ShapeMismatch {
            expected: n,
            found: width,
        });
    }
    let split = width - n;
    let fields = &table.fields()[..split];

    let mut index: HashMap<Vec<Value>, usize> = HashMap::new();
    let mut buckets: Vec<Vec<Row>> = Vec::new();
    for row in table {
        let (values, key) = row.split_at(split);
        let key: Vec<Value> = key.iter().map(Value::group_key).collect();
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                index.insert(key, buckets.len());
                buckets.push(Vec::new());
                buckets.len() - 1
            }
        };
        buckets[slot].push(values.to_vec());
    }
    tracing::trace!(groups = buckets.len(), rows = table.len(), "partitioned");

    buckets
        .into_iter()
        .map(|rows| Table::with_rows(fields.iter().cloned(), rows))
        .collect()
}
