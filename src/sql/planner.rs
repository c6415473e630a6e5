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


// SQL planner: translates sqlparser statements into core queries and runs them.

use sqlparser::ast::{
    self, Distinct, FunctionArg, FunctionArgExpr, GroupByExpr, ObjectName, ObjectType, SelectItem,
    SetExpr, Statement, TableFactor, TableWithJoins, Value as SqlValue,
};
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;

use crate::expr::Expr;
use crate::fetch::Catalog;
use crate::ordering::{Direction, OrderKey};
use crate::session::{Query, Session, Source};

use super::expr::plan_expr;
use super::{Database, ExecResult, SqlError, SqlResult};

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

pub(crate) fn parse_statements(sql: &str) -> Result<Vec<Statement>, SqlError> {
    Parser::parse_sql(&DuckDbDialect {}, sql).map_err(|e| SqlError::Parse(e.to_string()))
}

fn parse_statement(sql: &str) -> Result<Statement, SqlError> {
    parse_statements(sql)?
        .into_iter()
        .next()
        .ok_or_else(|| SqlError::Plan("Empty query".into()))
}

/// Parse and execute one SQL statement against a database.
pub(crate) fn session_execute(db: &mut Database, sql: &str) -> Result<ExecResult, SqlError> {
    let stmt = parse_statement(sql)?;
    execute_statement(db, stmt)
}

/// Supports SELECT, CREATE TABLE AS SELECT, and DROP TABLE.
pub(crate) fn execute_statement(db: &mut Database, stmt: Statement) -> Result<ExecResult, SqlError> {
    match stmt {
        Statement::Query(q) => Ok(ExecResult::Query(run_query(&db.catalog, &q)?)),

        Statement::CreateTable(create) => {
            let table_name = object_name_to_string(&create.name).to_lowercase();

            if db.catalog.contains(&table_name) && !create.or_replace {
                if create.if_not_exists {
                    return Ok(ExecResult::Ddl(format!(
                        "Table '{table_name}' already exists (skipped)"
                    )));
                }
                return Err(SqlError::Plan(format!(
                    "Table '{table_name}' already exists (use CREATE OR REPLACE TABLE)"
                )));
            }

            let Some(query) = &create.query else {
                return Err(SqlError::Plan("CREATE TABLE requires AS SELECT".into()));
            };
            let result = run_query(&db.catalog, query)?;
            let (nrows, ncols) = (result.table.len(), result.table.width());
            db.catalog.remove(&table_name);
            db.catalog.register(table_name.clone(), result.table);
            tracing::debug!(table = %table_name, rows = nrows, "created table");

            Ok(ExecResult::Ddl(format!(
                "Created table '{table_name}' ({nrows} rows, {ncols} cols)"
            )))
        }

        Statement::Drop {
            object_type: ObjectType::Table,
            names,
            if_exists,
            ..
        } => {
            let mut msgs = Vec::new();
            for name in &names {
                let table_name = object_name_to_string(name).to_lowercase();
                if db.catalog.remove(&table_name).is_some() {
                    msgs.push(format!("Dropped table '{table_name}'"));
                } else if if_exists {
                    msgs.push(format!("Table '{table_name}' not found (skipped)"));
                } else {
                    return Err(SqlError::Plan(format!("Table '{table_name}' not found")));
                }
            }
            Ok(ExecResult::Ddl(msgs.join("\n")))
        }

        _ => Err(SqlError::Plan(
            "Only SELECT, CREATE TABLE AS, and DROP TABLE are supported".into(),
        )),
    }
}

/// Stateless single-query execution against a catalog.
pub(crate) fn plan_and_execute(catalog: &Catalog, sql: &str) -> Result<SqlResult, SqlError> {
    match parse_statement(sql)? {
        Statement::Query(q) => run_query(catalog, &q),
        _ => Err(SqlError::Plan("Only SELECT is supported here".into())),
    }
}

pub(crate) fn parse_query(sql: &str) -> Result<Query, SqlError> {
    match parse_statement(sql)? {
        Statement::Query(q) => plan_query(&q),
        _ => Err(SqlError::Plan("Expected a SELECT statement".into())),
    }
}

fn run_query(catalog: &Catalog, query: &ast::Query) -> Result<SqlResult, SqlError> {
    let planned = plan_query(query)?;
    tracing::debug!(?planned, "planned query");
    let table = Session::new(catalog).execute(&planned)?;
    Ok(SqlResult { table })
}

// ---------------------------------------------------------------------------
// Query planning
// ---------------------------------------------------------------------------

fn plan_query(query: &ast::Query) -> Result<Query, SqlError> {
    if query.with.is_some() {
        return Err(SqlError::Plan(
            "WITH (common table expressions) is not supported".into(),
        ));
    }
    if query.offset.is_some() {
        return Err(SqlError::Plan("OFFSET is not supported".into()));
    }
    if query.fetch.is_some() {
        return Err(SqlError::Plan("FETCH is not supported; use LIMIT".into()));
    }
    if !query.limit_by.is_empty() {
        return Err(SqlError::Plan("LIMIT BY is not supported".into()));
    }

    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        SetExpr::Query(inner) if query.order_by.is_none() && query.limit.is_none() => {
            return plan_query(inner)
        }
        SetExpr::SetOperation { op, .. } => {
            return Err(SqlError::Plan(format!("{op} is not supported")))
        }
        other => {
            return Err(SqlError::Plan(format!(
                "Unsupported query body: {other}"
            )))
        }
    };

    let source = plan_from(&select.from)?;

    // SELECT list
    let mut fields = Vec::with_capacity(select.projection.len());
    let mut labels = Vec::with_capacity(select.projection.len());
    for item in &select.projection {
        match item {
            SelectItem::Wildcard(_) => {
                fields.push(Expr::Wildcard);
                labels.push("*".to_string());
            }
            SelectItem::UnnamedExpr(e) => {
                let planned = plan_expr(e)?;
                labels.push(planned.label());
                fields.push(planned);
            }
            SelectItem::ExprWithAlias { expr, alias } => {
                fields.push(plan_expr(expr)?);
                labels.push(alias.value.clone());
            }
            SelectItem::QualifiedWildcard(..) => {
                return Err(SqlError::Plan(
                    "Qualified wildcards (t.*) are not supported".into(),
                ))
            }
        }
    }
    let scope = Scope {
        fields: &fields,
        labels: &labels,
    };

    let condition = select.selection.as_ref().map(plan_expr).transpose()?;

    let mut group_by = match &select.group_by {
        GroupByExpr::Expressions(exprs, modifiers) => {
            if !modifiers.is_empty() {
                return Err(SqlError::Plan(
                    "GROUP BY modifiers (ROLLUP, CUBE, TOTALS) are not supported".into(),
                ));
            }
            exprs
                .iter()
                .map(|e| scope.resolve(e, "GROUP BY"))
                .collect::<Result<Vec<_>, _>>()?
        }
        GroupByExpr::All(_) => {
            if fields.contains(&Expr::Wildcard) {
                return Err(SqlError::Plan("GROUP BY ALL cannot expand SELECT *".into()));
            }
            fields
                .iter()
                .filter(|f| !f.contains_aggregate() && !matches!(f, Expr::Literal(_)))
                .cloned()
                .collect()
        }
    };

    match &select.distinct {
        None => {}
        Some(Distinct::Distinct) => {
            if !group_by.is_empty() {
                return Err(SqlError::Plan(
                    "DISTINCT combined with GROUP BY is not supported".into(),
                ));
            }
            if fields.contains(&Expr::Wildcard) {
                return Err(SqlError::Plan("SELECT DISTINCT * is not supported".into()));
            }
            // An all-aggregate select list yields one row already.
            if !fields.iter().all(Expr::contains_aggregate) {
                group_by = fields.clone();
            }
        }
        Some(Distinct::On(_)) => {
            return Err(SqlError::Plan("DISTINCT ON is not supported".into()));
        }
    }

    let having = match &select.having {
        Some(e) => Some(scope.substitute(plan_expr(e)?)),
        None => None,
    };

    let mut order_by = Vec::new();
    if let Some(ob) = &query.order_by {
        for item in &ob.exprs {
            if item.nulls_first.is_some() {
                return Err(SqlError::Plan("NULLS FIRST/LAST is not supported".into()));
            }
            let direction = if item.asc == Some(false) {
                Direction::Desc
            } else {
                Direction::Asc
            };
            order_by.push(OrderKey {
                expr: scope.resolve(&item.expr, "ORDER BY")?,
                direction,
            });
        }
    }

    let limit = parse_limit(query)?;

    Ok(Query {
        fields,
        labels: Some(labels),
        source,
        condition,
        group_by,
        having,
        order_by,
        limit,
    })
}

/// SELECT-list context for GROUP BY / HAVING / ORDER BY: positional
/// references and output aliases resolve to the select items.
struct Scope<'a> {
    fields: &'a [Expr],
    labels: &'a [String],
}

impl Scope<'_> {
    fn resolve(&self, expr: &ast::Expr, clause: &str) -> Result<Expr, SqlError> {
        if let ast::Expr::Value(SqlValue::Number(n, _)) = expr {
            let pos = n
                .parse::<usize>()
                .map_err(|_| SqlError::Plan(format!("Invalid positional {clause}: {n}")))?;
            if pos == 0 || pos > self.fields.len() {
                return Err(SqlError::Plan(format!(
                    "{clause} position {pos} is not in the select list (1..={})",
                    self.fields.len()
                )));
            }
            return match &self.fields[pos - 1] {
                Expr::Wildcard => Err(SqlError::Plan(format!(
                    "{clause} position {pos} refers to `*`"
                ))),
                field => Ok(field.clone()),
            };
        }
        Ok(self.substitute(plan_expr(expr)?))
    }

    /// Replace column references that name an output alias with the aliased
    /// expression.
    fn substitute(&self, expr: Expr) -> Expr {
        match expr {
            Expr::Column(name) => self
                .fields
                .iter()
                .zip(self.labels)
                .find(|(f, label)| !matches!(f, Expr::Wildcard) && label.eq_ignore_ascii_case(&name))
                .map(|(f, _)| f.clone())
                .unwrap_or(Expr::Column(name)),
            Expr::Call { name, args } => Expr::Call {
                name,
                args: args.into_iter().map(|a| self.substitute(a)).collect(),
            },
            other => other,
        }
    }
}

fn parse_limit(query: &ast::Query) -> Result<Option<usize>, SqlError> {
    match &query.limit {
        None => Ok(None),
        Some(ast::Expr::Value(SqlValue::Number(n, _))) => n
            .parse::<usize>()
            .map(Some)
            .map_err(|_| SqlError::Plan(format!("Invalid LIMIT value: {n}"))),
        Some(_) => Err(SqlError::Plan("LIMIT must be an integer literal".into())),
    }
}

// ---------------------------------------------------------------------------
// FROM resolution
// ---------------------------------------------------------------------------

fn plan_from(from: &[TableWithJoins]) -> Result<Option<Source>, SqlError> {
    match from {
        [] => Ok(None),
        [twj] => {
            if !twj.joins.is_empty() {
                return Err(SqlError::Plan("Joins are not supported".into()));
            }
            plan_table_factor(&twj.relation).map(Some)
        }
        _ => Err(SqlError::Plan(
            "Multiple FROM sources (implicit joins) are not supported".into(),
        )),
    }
}

fn plan_table_factor(factor: &TableFactor) -> Result<Source, SqlError> {
    match factor {
        TableFactor::Table { name, args, .. } => {
            let table_name = object_name_to_string(name);
            if let Some(func_args) = args {
                return table_function(&table_name.to_lowercase(), &func_args.args);
            }
            Ok(Source::Label(table_name))
        }
        TableFactor::Derived { subquery, .. } => {
            Ok(Source::Nested(Box::new(plan_query(subquery)?)))
        }
        _ => Err(SqlError::Plan(
            "Only table references, read_csv(), and subqueries are supported in FROM".into(),
        )),
    }
}

fn table_function(name: &str, args: &[FunctionArg]) -> Result<Source, SqlError> {
    match name {
        "read_csv" | "read_csv_auto" => {
            if args.len() != 1 {
                return Err(SqlError::Plan(
                    "read_csv() takes one argument: read_csv('/path/to/file.csv')".into(),
                ));
            }
            Ok(Source::Label(extract_string_arg(&args[0])?))
        }
        _ => Err(SqlError::Plan(format!(
            "Unknown table function '{name}'. Supported: read_csv()"
        ))),
    }
}

/// Extract a string literal from a FunctionArg.
fn extract_string_arg(arg: &FunctionArg) -> Result<String, SqlError> {
    match arg {
        FunctionArg::Unnamed(FunctionArgExpr::Expr(ast::Expr::Value(
            SqlValue::SingleQuotedString(s),
        ))) => Ok(s.clone()),
        _ => Err(SqlError::Plan(format!(
            "Expected a string literal argument, got: {arg}"
        ))),
    }
}

fn object_name_to_string(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.clone())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(sql: &str) -> Query {
        parse_query(sql).unwrap()
    }

    fn plan_err(sql: &str) -> String {
        match parse_query(sql) {
            Ok(q) => panic!("expected an error for {sql}, got {q:?}"),
            Err(e) => e.to_string(),
        }
    }

    #[test]
    fn select_list_and_aliases() {
        let q = plan("SELECT a, count(*) AS n FROM t");
        assert_eq!(
            q.fields,
            vec![Expr::col("a"), Expr::call("count", vec![Expr::Wildcard])]
        );
        assert_eq!(q.labels, Some(vec!["a".to_string(), "n".to_string()]));
        assert_eq!(q.source, Some(Source::Label("t".into())));
    }

    #[test]
    fn order_by_alias_and_position() {
        let q = plan("SELECT b, count(a) AS n FROM t GROUP BY 1 ORDER BY n DESC, 1");
        assert_eq!(q.group_by, vec![Expr::col("b")]);
        assert_eq!(
            q.order_by,
            vec![
                OrderKey::desc(Expr::call("count", vec![Expr::col("a")])),
                OrderKey::asc(Expr::col("b")),
            ]
        );
    }

    #[test]
    fn distinct_groups_by_select_list() {
        let q = plan("SELECT DISTINCT lang FROM repos");
        assert_eq!(q.group_by, vec![Expr::col("lang")]);
    }

    #[test]
    fn distinct_over_aggregates_is_a_no_op() {
        let q = plan("SELECT DISTINCT count(*), max(stars) FROM repos");
        assert!(q.group_by.is_empty());
    }

    #[test]
    fn group_by_all_skips_aggregates() {
        let q = plan("SELECT lang, 1, sum(stars) FROM repos GROUP BY ALL");
        assert_eq!(q.group_by, vec![Expr::col("lang")]);
    }

    #[test]
    fn sources() {
        let q = plan("SELECT * FROM read_csv('/data/x.csv')");
        assert_eq!(q.source, Some(Source::Label("/data/x.csv".into())));
        let q = plan("SELECT * FROM acme.repos");
        assert_eq!(q.source, Some(Source::Label("acme.repos".into())));
        let q = plan("SELECT n FROM (SELECT count(*) AS n FROM t) sub");
        assert!(matches!(q.source, Some(Source::Nested(_))));
        assert_eq!(plan("SELECT 1").source, None);
    }

    #[test]
    fn limit_parses() {
        assert_eq!(plan("SELECT a FROM t LIMIT 3").limit, Some(3));
    }

    #[test]
    fn unsupported_constructs() {
        assert!(plan_err("SELECT a FROM t JOIN u ON t.a = u.a").contains("Joins"));
        assert!(plan_err("SELECT a FROM t UNION SELECT a FROM u").contains("not supported"));
        assert!(plan_err("WITH x AS (SELECT 1) SELECT * FROM x").contains("WITH"));
        assert!(plan_err("SELECT a FROM t LIMIT 1 OFFSET 2").contains("OFFSET"));
        assert!(plan_err("SELECT a FROM t ORDER BY 3").contains("position 3"));
        assert!(plan_err("SELECT a FROM t, u").contains("Multiple FROM"));
    }
}
