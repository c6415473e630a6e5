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


// SQL front end: parses SQL text with sqlparser (DuckDB dialect), translates it
// into core queries and runs them against a table catalog.

pub mod expr;
pub mod planner;

use crate::fetch::Catalog;
use crate::session::Query;
use crate::table::Table;

/// Errors produced by the SQL layer.
#[derive(Debug)]
pub enum SqlError {
    /// SQL syntax error from the parser.
    Parse(String),
    /// Planning error (unsupported statement or clause).
    Plan(String),
    /// Query execution error.
    Engine(crate::Error),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(msg) => write!(f, "SQL parse error: {msg}"),
            SqlError::Plan(msg) => write!(f, "SQL planning error: {msg}"),
            SqlError::Engine(err) => write!(f, "Engine error: {err}"),
        }
    }
}

impl std::error::Error for SqlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SqlError::Engine(e) => Some(e),
            _ => None,
        }
    }
}

impl From<crate::Error> for SqlError {
    fn from(err: crate::Error) -> Self {
        SqlError::Engine(err)
    }
}

/// Result of executing a SQL query.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    /// The result table; its fields are the SELECT labels (aliases where given).
    pub table: Table,
}

impl SqlResult {
    pub fn columns(&self) -> &[String] {
        self.table.fields()
    }
}

/// Result of executing a SQL statement via a [`Database`].
#[derive(Debug)]
pub enum ExecResult {
    /// A SELECT query that produced a result set.
    Query(SqlResult),
    /// A DDL statement (CREATE TABLE, DROP TABLE) with a status message.
    Ddl(String),
}

/// A stateful SQL session that maintains a table registry across statements.
#[derive(Debug, Default)]
pub struct Database {
    pub(crate) catalog: Catalog,
}

impl Database {
    pub fn new() -> Self {
        Database::default()
    }

    /// Start from an existing catalog (e.g. one with a base directory).
    pub fn with_catalog(catalog: Catalog) -> Self {
        Database { catalog }
    }

    /// Register a table under `name` (stored lowercase, as CREATE TABLE does).
    pub fn register(&mut self, name: &str, table: Table) {
        let name = name.to_lowercase();
        self.catalog.remove(&name);
        self.catalog.register(name, table);
    }

    /// Execute a SQL statement, which may be a SELECT, CREATE TABLE AS, or DROP TABLE.
    pub fn execute(&mut self, sql: &str) -> Result<ExecResult, SqlError> {
        planner::session_execute(self, sql)
    }

    /// Execute a multi-statement SQL script (statements separated by `;`).
    /// Returns the result of the last statement.
    ///
    /// Uses sqlparser to split statements correctly, respecting string
    /// literals and quoted identifiers.
    pub fn execute_script(&mut self, sql: &str) -> Result<ExecResult, SqlError> {
        let stmts = planner::parse_statements(sql)?;
        let mut last = None;
        for stmt in stmts {
            last = Some(planner::execute_statement(self, stmt)?);
        }
        last.ok_or_else(|| SqlError::Plan("Empty script".into()))
    }

    /// Execute a SQL script from a file path.
    pub fn execute_script_file(&mut self, path: &std::path::Path) -> Result<ExecResult, SqlError> {
        let sql = std::fs::read_to_string(path)
            .map_err(|e| SqlError::Plan(format!("Failed to read {}: {e}", path.display())))?;
        self.execute_script(&sql)
    }

    /// Stored table names, sorted.
    pub fn table_names(&self) -> Vec<&str> {
        self.catalog.names()
    }

    /// Get (nrows, ncols) for a stored table, or None if not found.
    pub fn table_info(&self, name: &str) -> Option<(usize, usize)> {
        self.catalog.info(name)
    }
}

/// Parse and execute a single SELECT against `catalog`.
/// Stateless single-query mode (no DDL).
pub fn execute_sql(catalog: &Catalog, sql: &str) -> Result<SqlResult, SqlError> {
    planner::plan_and_execute(catalog, sql)
}

/// Translate a SELECT statement into a core [`Query`] without running it.
pub fn parse_query(sql: &str) -> Result<Query, SqlError> {
    planner::parse_query(sql)
}
