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


//! Query parameters and the execution pipeline.
//!
//! `Session::execute` runs a [`Query`] through fixed stages:
//!
//! ```text
//! source -> filter -> evaluate -> group -> having -> order
//!        -> select -> collapse -> merge -> limit
//! ```
//!
//! Every stage consumes the previous stage's tables and produces new ones.

use crate::error::{Error, Result};
use crate::expr::{
    evaluate_expression, evaluate_expressions, extract_tokens, is_all_tokens_in_aggregate, Expr,
    TokenSet,
};
use crate::fetch::Fetcher;
use crate::grouping::generate_groups;
use crate::ordering::{OrderKey, RowOrdering, TableOrdering};
use crate::table::Table;

pub const DUMMY_FIELD: &str = "Dummy Field";
pub const DUMMY_VALUE: &str = "Dummy Value";

/// Where a query reads its rows from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// A label resolved by the session's [`Fetcher`].
    Label(String),
    /// The result of another query.
    Nested(Box<Query>),
}

/// Structured query parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub fields: Vec<Expr>,
    /// Display names for `fields`, one per item. A `*` item's name is
    /// ignored; it expands to the source's field names.
    pub labels: Option<Vec<String>>,
    pub source: Option<Source>,
    pub condition: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderKey>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn select(fields: Vec<Expr>) -> Self {
        Query {
            fields,
            ..Query::default()
        }
    }

    pub fn from_label(mut self, label: impl Into<String>) -> Self {
        self.source = Some(Source::Label(label.into()));
        self
    }

    pub fn from_query(mut self, inner: Query) -> Self {
        self.source = Some(Source::Nested(Box::new(inner)));
        self
    }

    pub fn filter(mut self, condition: Expr) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn group_by(mut self, exprs: Vec<Expr>) -> Self {
        self.group_by = exprs;
        self
    }

    pub fn having(mut self, condition: Expr) -> Self {
        self.having = Some(condition);
        self
    }

    pub fn order_by(mut self, keys: Vec<OrderKey>) -> Self {
        self.order_by = keys;
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Every token referenced by any clause; `{*}` if any clause needs all
    /// columns.
    pub fn relevant_tokens(&self) -> TokenSet {
        extract_tokens(
            self.fields
                .iter()
                .chain(&self.condition)
                .chain(&self.group_by)
                .chain(&self.having)
                .chain(self.order_by.iter().map(|k| &k.expr)),
        )
    }

    fn validate(&self) -> Result<()> {
        for field in &self.fields {
            if !matches!(field, Expr::Wildcard) && has_stray_wildcard(field) {
                return Err(Error::Wildcard(format!(
                    "`*` cannot appear inside `{field}`"
                )));
            }
        }
        if self.source.is_none() && self.fields.contains(&Expr::Wildcard) {
            return Err(Error::Wildcard("SELECT * requires a source".into()));
        }
        let clauses = self
            .condition
            .iter()
            .map(|e| ("WHERE", e))
            .chain(self.group_by.iter().map(|e| ("GROUP BY", e)))
            .chain(self.having.iter().map(|e| ("HAVING", e)))
            .chain(self.order_by.iter().map(|k| ("ORDER BY", &k.expr)));
        for (clause, expr) in clauses {
            if has_stray_wildcard(expr) {
                return Err(Error::Wildcard(format!("`*` is not allowed in {clause}")));
            }
        }
        if let Some(e) = self.group_by.iter().find(|e| e.contains_aggregate()) {
            return Err(Error::InvalidArgument(format!(
                "aggregate `{e}` is not allowed in GROUP BY"
            )));
        }
        if let Some(c) = self.condition.as_ref().filter(|c| c.contains_aggregate()) {
            return Err(Error::InvalidArgument(format!(
                "aggregate in `{c}` is not allowed in WHERE"
            )));
        }
        if let Some(labels) = &self.labels {
            if labels.len() != self.fields.len() {
                return Err(Error::ShapeMismatch {
                    expected: self.fields.len(),
                    found: labels.len(),
                });
            }
        }
        Ok(())
    }
}

/// `*` anywhere other than as the sole argument of `count`.
fn has_stray_wildcard(expr: &Expr) -> bool {
    match expr {
        Expr::Wildcard => true,
        Expr::Call { name, args }
            if name.eq_ignore_ascii_case("count") && matches!(args.as_slice(), [Expr::Wildcard]) =>
        {
            false
        }
        Expr::Call { args, .. } => args.iter().any(has_stray_wildcard),
        Expr::Literal(_) | Expr::Column(_) => false,
    }
}

/// Executes queries against one fetcher.
pub struct Session<'a> {
    fetcher: &'a dyn Fetcher,
}

impl<'a> Session<'a> {
    pub fn new(fetcher: &'a dyn Fetcher) -> Self {
        Session { fetcher }
    }

    pub fn execute(&self, query: &Query) -> Result<Table> {
        query.validate()?;

        // Source
        let source = match &query.source {
            Some(Source::Nested(inner)) => Some(self.execute(inner)?),
            Some(Source::Label(label)) => {
                Some(self.fetcher.fetch(label, &query.relevant_tokens())?)
            }
            None => None,
        };
        let has_source = source.is_some();
        let table = match source {
            Some(t) => t,
            None => Table::with_rows([DUMMY_FIELD], vec![vec![DUMMY_VALUE.into()]])?,
        };
        tracing::debug!(rows = table.len(), columns = table.width(), "resolved source");

        // Wildcard expansion
        let (fields, labels) = expand_wildcards(query, table.fields());
        if has_source && table.is_empty() {
            tracing::debug!("empty source");
            return Ok(Table::new(labels));
        }

        // Filter
        let table = match &query.condition {
            Some(cond) => filter_rows(table, cond)?,
            None => table,
        };
        tracing::debug!(rows = table.len(), "filtered");
        if table.is_empty() {
            return Ok(Table::new(labels));
        }

        // Working table: select tokens, order-only tokens, having-only
        // tokens, then the group keys as trailing columns.
        let order_exprs: Vec<Expr> = query.order_by.iter().map(|k| k.expr.clone()).collect();
        let mut columns = Vec::new();
        push_token_columns(&table, &extract_tokens(&fields), &mut columns)?;
        push_token_columns(&table, &extract_tokens(&order_exprs), &mut columns)?;
        let keep = columns.len();
        push_token_columns(&table, &extract_tokens(&query.having), &mut columns)?;

        let working = select_columns(&table, &columns)?;
        let working = if query.group_by.is_empty() {
            working
        } else {
            working.chain(&evaluate_expressions(&table, &query.group_by)?)?
        };

        // Group
        let groups = generate_groups(&working, &query.group_by)?;
        tracing::debug!(groups = groups.len(), "grouped");

        // Having
        let mut kept = Vec::with_capacity(groups.len());
        for group in groups {
            let passes = match &query.having {
                Some(cond) => all_true(&evaluate_expression(&group, cond)?)?,
                None => true,
            };
            if passes {
                kept.push(group.slice_col(0, keep));
            }
        }
        tracing::debug!(groups = kept.len(), "having applied");

        // Order: rows inside each group, then the groups themselves.
        let groups = if query.order_by.is_empty() {
            kept
        } else {
            let rows = RowOrdering::new(&query.order_by);
            let sorted = kept
                .iter()
                .map(|g| rows.sort(g))
                .collect::<Result<Vec<_>>>()?;
            TableOrdering::new(&query.order_by).sort(sorted)?
        };

        // Select and collapse
        let non_group: Vec<&Expr> = fields
            .iter()
            .filter(|f| !query.group_by.contains(f))
            .collect();
        let collapse = is_all_tokens_in_aggregate(non_group)
            || fields.iter().any(Expr::contains_aggregate);
        let mut selected = Vec::with_capacity(groups.len());
        for group in &groups {
            let mut out = evaluate_expressions(group, &fields)?;
            if collapse {
                out.truncate(1);
            }
            tracing::trace!(rows = out.len(), "selected group");
            selected.push(out);
        }

        // Merge
        let mut selected = selected.into_iter();
        let Some(mut merged) = selected.next() else {
            return Ok(Table::new(labels));
        };
        for group in selected {
            for row in group.into_rows() {
                merged.append(row)?;
            }
        }
        merged.rename_fields(labels)?;
        tracing::debug!(rows = merged.len(), collapse, "merged");

        // Limit
        if let Some(n) = query.limit {
            merged.truncate(n);
        }
        Ok(merged)
    }
}

/// Replace each `*` item with one column reference per source field, and
/// compute the display label of every resulting item.
fn expand_wildcards(query: &Query, source_fields: &[String]) -> (Vec<Expr>, Vec<String>) {
    let mut fields = Vec::with_capacity(query.fields.len());
    let mut labels = Vec::with_capacity(query.fields.len());
    for (i, field) in query.fields.iter().enumerate() {
        if let Expr::Wildcard = field {
            for name in source_fields {
                fields.push(Expr::Column(name.clone()));
                labels.push(name.clone());
            }
            continue;
        }
        let label = match &query.labels {
            Some(names) => names[i].clone(),
            None => field.label(),
        };
        fields.push(field.clone());
        labels.push(label);
    }
    (fields, labels)
}

fn filter_rows(table: Table, condition: &Expr) -> Result<Table> {
    let mask = evaluate_expression(&table, condition)?;
    let fields = table.fields().to_vec();
    let mut rows = Vec::new();
    for (row, keep) in table.into_rows().into_iter().zip(&mask) {
        if keep.as_bool()? == Some(true) {
            rows.push(row);
        }
    }
    Table::with_rows(fields, rows)
}

fn all_true(mask: &[crate::value::Value]) -> Result<bool> {
    for v in mask {
        if v.as_bool()? != Some(true) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn push_token_columns(table: &Table, tokens: &TokenSet, columns: &mut Vec<usize>) -> Result<()> {
    if tokens.is_wildcard() {
        for idx in 0..table.width() {
            if !columns.contains(&idx) {
                columns.push(idx);
            }
        }
        return Ok(());
    }
    for name in tokens.columns() {
        let idx = table
            .column_index(name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))?;
        if !columns.contains(&idx) {
            columns.push(idx);
        }
    }
    Ok(())
}

fn select_columns(table: &Table, columns: &[usize]) -> Result<Table> {
    let fields = columns.iter().map(|&i| table.fields()[i].clone());
    let rows = table
        .iter()
        .map(|row| columns.iter().map(|&i| row[i].clone()).collect())
        .collect();
    Table::with_rows(fields, rows)
}
