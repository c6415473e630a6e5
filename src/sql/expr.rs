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


// Expression translation: sqlparser AST expressions into core expression trees.

use sqlparser::ast::{
    self, BinaryOperator, DataType, DuplicateTreatment, FunctionArg, FunctionArgExpr,
    FunctionArguments, UnaryOperator, Value as SqlValue,
};

use crate::expr::Expr;
use crate::functions;
use crate::value::Value;

use super::SqlError;

/// Translate a scalar or aggregate SQL expression.
pub fn plan_expr(expr: &ast::Expr) -> Result<Expr, SqlError> {
    match expr {
        ast::Expr::Identifier(ident) => Ok(Expr::Column(ident.value.clone())),

        // table_alias.column: only the column part is meaningful with a single source
        ast::Expr::CompoundIdentifier(parts) => match parts.last() {
            Some(ident) if parts.len() == 2 => Ok(Expr::Column(ident.value.clone())),
            _ => Err(SqlError::Plan(format!(
                "Unsupported compound identifier: {expr}"
            ))),
        },

        ast::Expr::Value(val) => plan_value(val).map(Expr::Literal),

        ast::Expr::Nested(inner) => plan_expr(inner),

        ast::Expr::BinaryOp { left, op, right } => {
            let name = match op {
                BinaryOperator::Plus => "+",
                BinaryOperator::Minus => "-",
                BinaryOperator::Multiply => "*",
                BinaryOperator::Divide => "/",
                BinaryOperator::Modulo => "%",
                BinaryOperator::Eq => "=",
                BinaryOperator::NotEq => "!=",
                BinaryOperator::Lt => "<",
                BinaryOperator::LtEq => "<=",
                BinaryOperator::Gt => ">",
                BinaryOperator::GtEq => ">=",
                BinaryOperator::And => "and",
                BinaryOperator::Or => "or",
                BinaryOperator::StringConcat => "||",
                _ => return Err(SqlError::Plan(format!("Unsupported operator: {op}"))),
            };
            Ok(Expr::binary(name, plan_expr(left)?, plan_expr(right)?))
        }

        ast::Expr::UnaryOp { op, expr: inner } => match op {
            UnaryOperator::Not => Ok(Expr::call("not", vec![plan_expr(inner)?])),
            UnaryOperator::Plus => plan_expr(inner),
            UnaryOperator::Minus => match plan_expr(inner)? {
                Expr::Literal(Value::Int(i)) => Ok(Expr::lit(-i)),
                Expr::Literal(Value::Float(f)) => Ok(Expr::lit(-f)),
                e => Ok(Expr::call("neg", vec![e])),
            },
            _ => Err(SqlError::Plan(format!("Unsupported unary operator: {op}"))),
        },

        ast::Expr::IsNull(inner) => Ok(Expr::call("is_null", vec![plan_expr(inner)?])),
        ast::Expr::IsNotNull(inner) => Ok(negate(Expr::call("is_null", vec![plan_expr(inner)?]))),

        // x BETWEEN a AND b  ->  x >= a AND x <= b
        ast::Expr::Between {
            expr: inner,
            negated,
            low,
            high,
        } => {
            let x = plan_expr(inner)?;
            let ge = Expr::binary(">=", x.clone(), plan_expr(low)?);
            let le = Expr::binary("<=", x, plan_expr(high)?);
            Ok(negate_if(*negated, Expr::binary("and", ge, le)))
        }

        // x IN (a, b)  ->  x = a OR x = b
        ast::Expr::InList {
            expr: inner,
            list,
            negated,
        } => {
            let x = plan_expr(inner)?;
            let mut result: Option<Expr> = None;
            for item in list {
                let eq = Expr::binary("=", x.clone(), plan_expr(item)?);
                result = Some(match result {
                    Some(acc) => Expr::binary("or", acc, eq),
                    None => eq,
                });
            }
            match result {
                Some(e) => Ok(negate_if(*negated, e)),
                None => Ok(Expr::lit(*negated)),
            }
        }

        ast::Expr::Like {
            negated,
            expr: inner,
            pattern,
            ..
        } => {
            let like = Expr::binary("like", plan_expr(inner)?, plan_expr(pattern)?);
            Ok(negate_if(*negated, like))
        }

        // ILIKE lowers both sides
        ast::Expr::ILike {
            negated,
            expr: inner,
            pattern,
            ..
        } => {
            let lower = |e: Expr| Expr::call("lower", vec![e]);
            let like = Expr::binary(
                "like",
                lower(plan_expr(inner)?),
                lower(plan_expr(pattern)?),
            );
            Ok(negate_if(*negated, like))
        }

        ast::Expr::Cast {
            expr: inner,
            data_type,
            ..
        } => {
            let target = cast_function(data_type)?;
            Ok(Expr::call(target, vec![plan_expr(inner)?]))
        }

        // sqlparser parses these as dedicated variants
        ast::Expr::Ceil { expr: inner, .. } => Ok(Expr::call("ceil", vec![plan_expr(inner)?])),
        ast::Expr::Floor { expr: inner, .. } => Ok(Expr::call("floor", vec![plan_expr(inner)?])),
        ast::Expr::Trim {
            expr: inner,
            trim_where: None,
            trim_what: None,
            ..
        } => Ok(Expr::call("trim", vec![plan_expr(inner)?])),

        ast::Expr::Function(f) => plan_function(f),

        _ => Err(SqlError::Plan(format!("Unsupported expression: {expr}"))),
    }
}

fn plan_value(val: &SqlValue) -> Result<Value, SqlError> {
    match val {
        SqlValue::Number(n, _) => {
            if let Ok(i) = n.parse::<i64>() {
                Ok(Value::Int(i))
            } else {
                n.parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| SqlError::Plan(format!("Invalid number literal: {n}")))
            }
        }
        SqlValue::SingleQuotedString(s) => Ok(Value::text(s.as_str())),
        SqlValue::Boolean(b) => Ok(Value::Bool(*b)),
        SqlValue::Null => Ok(Value::Null),
        _ => Err(SqlError::Plan(format!("Unsupported value: {val}"))),
    }
}

fn plan_function(f: &ast::Function) -> Result<Expr, SqlError> {
    let name = f.name.to_string().to_lowercase();
    if f.over.is_some() {
        return Err(SqlError::Plan(format!(
            "Window function '{name}' is not supported"
        )));
    }
    if f.filter.is_some() {
        return Err(SqlError::Plan(format!(
            "FILTER clause on '{name}' is not supported"
        )));
    }

    let (args, distinct) = match &f.args {
        FunctionArguments::List(list) => {
            let mut args = Vec::with_capacity(list.args.len());
            for arg in &list.args {
                match arg {
                    FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) => args.push(plan_expr(e)?),
                    FunctionArg::Unnamed(FunctionArgExpr::Wildcard) => args.push(Expr::Wildcard),
                    _ => {
                        return Err(SqlError::Plan(format!(
                            "Unsupported argument syntax in {name}()"
                        )))
                    }
                }
            }
            let distinct = matches!(list.duplicate_treatment, Some(DuplicateTreatment::Distinct));
            (args, distinct)
        }
        FunctionArguments::None => (Vec::new(), false),
        FunctionArguments::Subquery(_) => {
            return Err(SqlError::Plan(format!(
                "Subquery arguments to {name}() are not supported"
            )))
        }
    };

    let canonical = match (canonical_name(&name), distinct) {
        ("count", true) => "count_distinct",
        (other, true) => {
            return Err(SqlError::Plan(format!(
                "DISTINCT is only supported in count(), not {other}()"
            )))
        }
        (other, false) => other,
    };
    let def = functions::lookup(canonical)
        .ok_or_else(|| SqlError::Engine(crate::Error::UnknownFunction(name.clone())))?;
    def.check_arity(args.len())?;
    Ok(Expr::call(def.name, args))
}

/// Spellings accepted for registry functions.
fn canonical_name(name: &str) -> &str {
    match name {
        "ceiling" => "ceil",
        "mean" => "avg",
        "len" | "char_length" | "character_length" => "length",
        "ifnull" => "coalesce",
        other => other,
    }
}

fn cast_function(dt: &DataType) -> Result<&'static str, SqlError> {
    match dt {
        DataType::Int(_)
        | DataType::Integer(_)
        | DataType::BigInt(_)
        | DataType::SmallInt(_)
        | DataType::Int4(_)
        | DataType::Int8(_)
        | DataType::Int64 => Ok("to_int"),
        DataType::Float(_)
        | DataType::Float64
        | DataType::Double
        | DataType::DoublePrecision
        | DataType::Real => Ok("to_float"),
        DataType::Varchar(_) | DataType::Text | DataType::String(_) => Ok("to_text"),
        _ => Err(SqlError::Plan(format!("Unsupported CAST target type: {dt}"))),
    }
}

fn negate(e: Expr) -> Expr {
    Expr::call("not", vec![e])
}

fn negate_if(negated: bool, e: Expr) -> Expr {
    if negated {
        negate(e)
    } else {
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::DuckDbDialect;
    use sqlparser::parser::Parser;

    fn parse(sql: &str) -> Result<Expr, SqlError> {
        let ast = Parser::new(&DuckDbDialect {})
            .try_with_sql(sql)
            .and_then(|mut p| p.parse_expr())
            .map_err(|e| SqlError::Parse(e.to_string()))?;
        plan_expr(&ast)
    }

    #[test]
    fn operators_become_registry_calls() {
        let e = parse("a + 2 * b").unwrap();
        assert_eq!(
            e,
            Expr::binary(
                "+",
                Expr::col("a"),
                Expr::binary("*", Expr::lit(2), Expr::col("b"))
            )
        );
        assert_eq!(e.label(), "a + (2 * b)");
    }

    #[test]
    fn negative_literals_fold() {
        assert_eq!(parse("-3").unwrap(), Expr::lit(-3));
        assert_eq!(parse("-x").unwrap(), Expr::call("neg", vec![Expr::col("x")]));
    }

    #[test]
    fn in_list_and_between_desugar() {
        let e = parse("x NOT IN (1, 2)").unwrap();
        assert_eq!(
            e,
            negate(Expr::binary(
                "or",
                Expr::binary("=", Expr::col("x"), Expr::lit(1)),
                Expr::binary("=", Expr::col("x"), Expr::lit(2)),
            ))
        );
        let e = parse("x BETWEEN 1 AND 3").unwrap();
        assert!(matches!(e, Expr::Call { ref name, .. } if name == "and"));
    }

    #[test]
    fn count_star_and_distinct() {
        assert_eq!(
            parse("COUNT(*)").unwrap(),
            Expr::call("count", vec![Expr::Wildcard])
        );
        assert_eq!(
            parse("count(DISTINCT lang)").unwrap(),
            Expr::call("count_distinct", vec![Expr::col("lang")])
        );
        assert!(matches!(parse("sum(DISTINCT x)"), Err(SqlError::Plan(_))));
    }

    #[test]
    fn casts_and_aliases() {
        assert_eq!(
            parse("CAST(x AS BIGINT)").unwrap(),
            Expr::call("to_int", vec![Expr::col("x")])
        );
        assert_eq!(
            parse("ceiling(x)").unwrap(),
            Expr::call("ceil", vec![Expr::col("x")])
        );
    }

    #[test]
    fn unknown_functions_and_windows_fail() {
        assert!(matches!(
            parse("frobnicate(x)"),
            Err(SqlError::Engine(crate::Error::UnknownFunction(_)))
        ));
        assert!(matches!(
            parse("row_number() OVER (ORDER BY x)"),
            Err(SqlError::Plan(_))
        ));
        assert!(matches!(
            parse("abs(1, 2)"),
            Err(SqlError::Engine(crate::Error::InvalidArgument(_)))
        ));
    }
}
