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


//! Source resolution: turning a `FROM` label into a table.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::expr::{Token, TokenSet};
use crate::table::Table;
use crate::value::Value;

/// Resolves a source label into a table.
///
/// `tokens` lists the columns the query references. Implementations may
/// return just those columns (in any superset) or, for the wildcard set, every
/// column.
pub trait Fetcher {
    fn fetch(&self, label: &str, tokens: &TokenSet) -> Result<Table>;
}

impl<F> Fetcher for F
where
    F: Fn(&str, &TokenSet) -> Result<Table>,
{
    fn fetch(&self, label: &str, tokens: &TokenSet) -> Result<Table> {
        self(label, tokens)
    }
}

/// In-memory table registry that also reads CSV files on demand.
///
/// Label resolution order: a registered table (exact, then case-insensitive
/// name); a label ending in `.csv`, read as a path (relative to the base
/// directory when one is set); a dotted label `a.b` read as `<base>/a/b.csv`.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: HashMap<String, Table>,
    base_dir: Option<PathBuf>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Catalog {
            tables: HashMap::new(),
            base_dir: Some(dir.into()),
        }
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Register (or replace) a named table, returning the previous one.
    pub fn register(&mut self, name: impl Into<String>, table: Table) -> Option<Table> {
        self.tables.insert(name.into(), table)
    }

    /// Remove a table by name (exact, then case-insensitive).
    pub fn remove(&mut self, name: &str) -> Option<Table> {
        if let Some(table) = self.tables.remove(name) {
            return Some(table);
        }
        let key = self
            .tables
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))?
            .clone();
        self.tables.remove(&key)
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name).or_else(|| {
            self.tables
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, t)| t)
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered table names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// `(rows, columns)` of a registered table.
    pub fn info(&self, name: &str) -> Option<(usize, usize)> {
        self.get(name).map(|t| (t.len(), t.width()))
    }

    fn resolve(&self, label: &str) -> Result<Cow<'_, Table>> {
        if let Some(table) = self.get(label) {
            return Ok(Cow::Borrowed(table));
        }
        if let Some(path) = self.csv_path(label) {
            return read_csv(path).map(Cow::Owned);
        }
        Err(Error::Source(format!("table '{label}' not found")))
    }

    fn csv_path(&self, label: &str) -> Option<PathBuf> {
        let is_csv = Path::new(label)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        match (&self.base_dir, is_csv) {
            (Some(base), true) => Some(base.join(label)),
            (None, true) => Some(PathBuf::from(label)),
            (Some(base), false) if label.contains('.') => {
                let mut path = base.clone();
                path.extend(label.split('.'));
                path.set_extension("csv");
                Some(path)
            }
            _ => None,
        }
    }
}

impl Fetcher for Catalog {
    fn fetch(&self, label: &str, tokens: &TokenSet) -> Result<Table> {
        let table = self.resolve(label)?;
        let projected = project(&table, tokens)?;
        tracing::debug!(
            label,
            rows = projected.len(),
            columns = projected.width(),
            "fetched source"
        );
        Ok(projected)
    }
}

/// Keep only the columns named by `tokens`, in the table's own column order.
///
/// A wildcard set keeps every column; a token the table does not have is an
/// `UnknownColumn` error.
pub fn project(table: &Table, tokens: &TokenSet) -> Result<Table> {
    if tokens.is_wildcard() {
        return Ok(table.clone());
    }
    let mut keep = Vec::with_capacity(tokens.len());
    for token in tokens {
        if let Token::Column(name) = token {
            let idx = table
                .column_index(name)
                .ok_or_else(|| Error::UnknownColumn(name.clone()))?;
            keep.push(idx);
        }
    }
    keep.sort_unstable();
    keep.dedup();

    let fields = keep.iter().map(|&i| table.fields()[i].clone());
    let rows = table
        .iter()
        .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
        .collect();
    Table::with_rows(fields, rows)
}

/// Read a headed CSV file. Cells are trimmed and typed with
/// [`Value::parse_cell`].
pub fn read_csv(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let source_err = |e: csv::Error| Error::Source(format!("{}: {e}", path.display()));

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(source_err)?;
    let headers: Vec<String> = rdr
        .headers()
        .map_err(source_err)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut table = Table::new(headers);
    for record in rdr.records() {
        let record = record.map_err(source_err)?;
        table.append(record.iter().map(Value::parse_cell).collect())?;
    }
    tracing::debug!(path = %path.display(), rows = table.len(), "loaded csv");
    Ok(table)
}
