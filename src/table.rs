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


//! Row-oriented table with a named, ordered field list.

use std::ops::{Bound, RangeBounds};

use crate::error::{Error, Result};
use crate::value::Value;

/// A row is positionally aligned with the owning table's fields.
pub type Row = Vec<Value>;

/// An ordered collection of rows sharing one field list.
///
/// Invariant: every row has exactly `fields().len()` values. Every mutating
/// operation re-validates it, so a `Table` handed out by this crate is always
/// well formed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    fields: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given fields.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Table {
            fields: fields.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Create a table and append all `rows`, validating each one.
    pub fn with_rows<I, S>(fields: I, rows: Vec<Row>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Table::new(fields);
        table.set_table(rows)?;
        Ok(table)
    }

    /// Replace the field list. Existing rows must already match its length.
    pub fn set_fields<I, S>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        check_rows(fields.len(), &self.rows)?;
        self.fields = fields;
        Ok(())
    }

    pub fn append(&mut self, row: Row) -> Result<()> {
        if row.len() != self.fields.len() {
            return Err(Error::ShapeMismatch {
                expected: self.fields.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> Option<&Row> {
        self.rows.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of fields.
    pub fn width(&self) -> usize {
        self.fields.len()
    }

    /// Position of a field: exact match first, then ASCII case-insensitive.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f == name)
            .or_else(|| self.fields.iter().position(|f| f.eq_ignore_ascii_case(name)))
    }

    /// Iterate one column top to bottom.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| &row[idx])
    }

    /// New table holding the rows in `range` (clamped to the row count).
    pub fn slice_rows(&self, range: impl RangeBounds<usize>) -> Table {
        let (start, end) = clamp_range(range, self.rows.len());
        Table {
            fields: self.fields.clone(),
            rows: self.rows[start..end].to_vec(),
        }
    }

    /// New table holding only columns `[start, end)`, bounds clamped.
    pub fn slice_col(&self, start: usize, end: usize) -> Table {
        let end = end.min(self.fields.len());
        let start = start.min(end);
        Table {
            fields: self.fields[start..end].to_vec(),
            rows: self.rows.iter().map(|r| r[start..end].to_vec()).collect(),
        }
    }

    /// Horizontal concatenation: row `i` of the result is row `i` of `self`
    /// followed by row `i` of `other`.
    pub fn chain(&self, other: &Table) -> Result<Table> {
        if self.rows.len() != other.rows.len() {
            return Err(Error::RowCountMismatch {
                left: self.rows.len(),
                right: other.rows.len(),
            });
        }
        let mut fields = self.fields.clone();
        fields.extend(other.fields.iter().cloned());
        let rows = self
            .rows
            .iter()
            .zip(&other.rows)
            .map(|(l, r)| {
                let mut row = Vec::with_capacity(l.len() + r.len());
                row.extend(l.iter().cloned());
                row.extend(r.iter().cloned());
                row
            })
            .collect();
        Ok(Table { fields, rows })
    }

    /// Replace fields and rows with a copy of `other`'s.
    pub fn copy_from(&mut self, other: &Table) {
        self.fields = other.fields.clone();
        self.rows = other.rows.clone();
    }

    /// Replace the rows, keeping the field list.
    pub fn set_table(&mut self, rows: Vec<Row>) -> Result<()> {
        check_rows(self.fields.len(), &rows)?;
        self.rows = rows;
        Ok(())
    }

    /// Replace fields and rows together. On error the table is unchanged.
    pub fn replace_contents(&mut self, fields: Vec<String>, rows: Vec<Row>) -> Result<()> {
        check_rows(fields.len(), &rows)?;
        self.fields = fields;
        self.rows = rows;
        Ok(())
    }

    pub fn truncate(&mut self, len: usize) {
        self.rows.truncate(len);
    }

    /// Rename every field; the name count must equal the width.
    pub fn rename_fields(&mut self, names: Vec<String>) -> Result<()> {
        if names.len() != self.fields.len() {
            return Err(Error::ShapeMismatch {
                expected: self.fields.len(),
                found: names.len(),
            });
        }
        self.fields = names;
        Ok(())
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

fn check_rows(width: usize, rows: &[Row]) -> Result<()> {
    match rows.iter().find(|r| r.len() != width) {
        Some(bad) => Err(Error::ShapeMismatch {
            expected: width,
            found: bad.len(),
        }),
        None => Ok(()),
    }
}

fn clamp_range(range: impl RangeBounds<usize>, len: usize) -> (usize, usize) {
    let start = match range.start_bound() {
        Bound::Included(&s) => s,
        Bound::Excluded(&s) => s.saturating_add(1),
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&e) => e.saturating_add(1),
        Bound::Excluded(&e) => e,
        Bound::Unbounded => len,
    };
    let end = end.min(len);
    (start.min(end), end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::with_rows(
            ["a", "b", "c"],
            vec![
                vec![1.into(), "x".into(), 1.5.into()],
                vec![2.into(), "y".into(), 2.5.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn append_rejects_wrong_width() {
        let mut t = Table::new(["a", "b"]);
        t.append(vec![1.into(), 2.into()]).unwrap();
        let err = t.append(vec![1.into()]).unwrap_err();
        assert_eq!(err, Error::ShapeMismatch { expected: 2, found: 1 });
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn slice_col_then_chain_round_trips() {
        let t = sample();
        for split in 0..=t.width() {
            let left = t.slice_col(0, split);
            let right = t.slice_col(split, t.width());
            assert_eq!(left.chain(&right).unwrap(), t);
        }
        let w = t.width();
        assert_eq!(t.slice_col(0, w).chain(&t.slice_col(w, w)).unwrap().rows(), t.rows());
    }

    #[test]
    fn slice_col_clamps_bounds() {
        let t = sample();
        assert_eq!(t.slice_col(2, 10).fields(), ["c"]);
        assert_eq!(t.slice_col(5, 1).width(), 0);
        assert_eq!(t.slice_col(5, 1).len(), 2);
    }

    #[test]
    fn chain_requires_equal_row_counts() {
        let t = sample();
        let short = t.slice_rows(..1);
        assert_eq!(
            t.chain(&short).unwrap_err(),
            Error::RowCountMismatch { left: 2, right: 1 }
        );
    }

    #[test]
    fn set_table_revalidates_and_keeps_old_rows_on_error() {
        let mut t = sample();
        assert!(t.set_table(vec![vec![1.into()]]).is_err());
        assert_eq!(t.len(), 2);
        t.set_table(vec![vec![9.into(), "z".into(), Value::Null]]).unwrap();
        assert_eq!(t.row(0).unwrap()[0], Value::Int(9));
    }

    #[test]
    fn set_fields_keeps_old_fields_on_width_mismatch() {
        let mut t = sample();
        assert_eq!(
            t.set_fields(["x", "y"]).unwrap_err(),
            Error::ShapeMismatch { expected: 2, found: 3 }
        );
        assert_eq!(t.fields(), ["a", "b", "c"]);
        t.set_fields(["x", "y", "z"]).unwrap();
        assert_eq!(t.fields(), ["x", "y", "z"]);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn replace_contents_is_all_or_nothing() {
        let mut t = sample();
        let fields = vec!["p".to_string(), "q".to_string()];
        let bad = vec![vec![1.into(), 2.into()], vec![3.into()]];
        assert!(t.replace_contents(fields.clone(), bad).is_err());
        assert_eq!(t, sample());

        t.replace_contents(fields, vec![vec![1.into(), 2.into()]]).unwrap();
        assert_eq!(t.fields(), ["p", "q"]);
        assert_eq!(t.rows(), [vec![Value::Int(1), Value::Int(2)]]);
    }

    #[test]
    fn copy_from_replaces_everything() {
        let mut t = Table::new(["only"]);
        let src = sample();
        t.copy_from(&src);
        assert_eq!(t, src);
    }

    #[test]
    fn column_lookup_falls_back_to_case_insensitive() {
        let t = sample();
        assert_eq!(t.column_index("b"), Some(1));
        assert_eq!(t.column_index("B"), Some(1));
        assert_eq!(t.column_index("d"), None);
    }

    #[test]
    fn slice_rows_clamps() {
        let t = sample();
        assert_eq!(t.slice_rows(1..).len(), 1);
        assert_eq!(t.slice_rows(..10).len(), 2);
        assert_eq!(t.slice_rows(3..5).len(), 0);
    }
}
