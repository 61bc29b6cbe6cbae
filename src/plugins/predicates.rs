use super::{ExpressionConverter, ExpressionPlugin, wrong_shape};
use crate::core::{Result, SqlError};
use crate::parser::ast::Expr;
use sqlparser::ast as sql_ast;

fn boxed(converter: &ExpressionConverter, expr: Box<sql_ast::Expr>) -> Result<Box<Expr>> {
    Ok(Box::new(converter.convert(*expr)?))
}

pub struct IsNullPlugin;

impl ExpressionPlugin for IsNullPlugin {
    fn name(&self) -> &'static str {
        "IS NULL"
    }

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool {
        matches!(expr, sql_ast::Expr::IsNull(_) | sql_ast::Expr::IsNotNull(_))
    }

    fn convert(&self, expr: sql_ast::Expr, converter: &ExpressionConverter) -> Result<Expr> {
        let (inner, negated) = match expr {
            sql_ast::Expr::IsNull(inner) => (inner, false),
            sql_ast::Expr::IsNotNull(inner) => (inner, true),
            other => return Err(wrong_shape(self, &other)),
        };
        Ok(Expr::IsNull {
            expr: boxed(converter, inner)?,
            negated,
        })
    }
}

/// `x [NOT] IN (a, b, ...)` with a literal list; subqueries are not accepted
pub struct InListPlugin;

impl ExpressionPlugin for InListPlugin {
    fn name(&self) -> &'static str {
        "IN"
    }

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool {
        matches!(expr, sql_ast::Expr::InList { .. })
    }

    fn convert(&self, expr: sql_ast::Expr, converter: &ExpressionConverter) -> Result<Expr> {
        match expr {
            sql_ast::Expr::InList { expr, list, negated } => Ok(Expr::In {
                expr: boxed(converter, expr)?,
                list: list
                    .into_iter()
                    .map(|item| converter.convert(item))
                    .collect::<Result<_>>()?,
                negated,
            }),
            other => Err(wrong_shape(self, &other)),
        }
    }
}

pub struct BetweenPlugin;

impl ExpressionPlugin for BetweenPlugin {
    fn name(&self) -> &'static str {
        "BETWEEN"
    }

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool {
        matches!(expr, sql_ast::Expr::Between { .. })
    }

    fn convert(&self, expr: sql_ast::Expr, converter: &ExpressionConverter) -> Result<Expr> {
        match expr {
            sql_ast::Expr::Between { expr, negated, low, high } => Ok(Expr::Between {
                expr: boxed(converter, expr)?,
                low: boxed(converter, low)?,
                high: boxed(converter, high)?,
                negated,
            }),
            other => Err(wrong_shape(self, &other)),
        }
    }
}

/// LIKE and ILIKE. The pattern may be any expression; ESCAPE is rejected.
pub struct LikePlugin;

impl ExpressionPlugin for LikePlugin {
    fn name(&self) -> &'static str {
        "LIKE"
    }

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool {
        matches!(expr, sql_ast::Expr::Like { .. } | sql_ast::Expr::ILike { .. })
    }

    fn convert(&self, expr: sql_ast::Expr, converter: &ExpressionConverter) -> Result<Expr> {
        let (case_insensitive, negated, inner, pattern, escape_char) = match expr {
            sql_ast::Expr::Like { negated, expr, pattern, escape_char, .. } => {
                (false, negated, expr, pattern, escape_char)
            }
            sql_ast::Expr::ILike { negated, expr, pattern, escape_char, .. } => {
                (true, negated, expr, pattern, escape_char)
            }
            other => return Err(wrong_shape(self, &other)),
        };

        if escape_char.is_some() {
            return Err(SqlError::UnsupportedOperation(
                "LIKE ... ESCAPE is not supported".into(),
            ));
        }

        Ok(Expr::Like {
            expr: boxed(converter, inner)?,
            pattern: boxed(converter, pattern)?,
            negated,
            case_insensitive,
        })
    }
}
