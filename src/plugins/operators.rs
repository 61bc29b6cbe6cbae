use super::{ExpressionConverter, ExpressionPlugin, wrong_shape};
use crate::core::{Result, SqlError};
use crate::parser::ast::{BinaryOp, Expr};
use sqlparser::ast::{self as sql_ast, BinaryOperator as SqlOp, UnaryOperator};

/// Internal operator for a sqlparser binary operator, if it is supported
pub(crate) fn binary_op(op: &SqlOp) -> Option<BinaryOp> {
    Some(match op {
        SqlOp::Plus => BinaryOp::Add,
        SqlOp::Minus => BinaryOp::Subtract,
        SqlOp::Multiply => BinaryOp::Multiply,
        SqlOp::Divide => BinaryOp::Divide,
        SqlOp::Modulo => BinaryOp::Modulo,
        SqlOp::Eq => BinaryOp::Eq,
        SqlOp::NotEq => BinaryOp::NotEq,
        SqlOp::Lt => BinaryOp::Lt,
        SqlOp::LtEq => BinaryOp::LtEq,
        SqlOp::Gt => BinaryOp::Gt,
        SqlOp::GtEq => BinaryOp::GtEq,
        SqlOp::And => BinaryOp::And,
        SqlOp::Or => BinaryOp::Or,
        _ => return None,
    })
}

/// Parentheses only group; they leave no node behind
pub struct NestedPlugin;

impl ExpressionPlugin for NestedPlugin {
    fn name(&self) -> &'static str {
        "NESTED"
    }

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool {
        matches!(expr, sql_ast::Expr::Nested(_))
    }

    fn convert(&self, expr: sql_ast::Expr, converter: &ExpressionConverter) -> Result<Expr> {
        match expr {
            sql_ast::Expr::Nested(inner) => converter.convert(*inner),
            other => Err(wrong_shape(self, &other)),
        }
    }
}

/// Arithmetic, comparison, AND and OR
pub struct BinaryOperatorPlugin;

impl ExpressionPlugin for BinaryOperatorPlugin {
    fn name(&self) -> &'static str {
        "BINARY"
    }

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool {
        matches!(expr, sql_ast::Expr::BinaryOp { op, .. } if binary_op(op).is_some())
    }

    fn convert(&self, expr: sql_ast::Expr, converter: &ExpressionConverter) -> Result<Expr> {
        match expr {
            sql_ast::Expr::BinaryOp { left, op, right } => {
                let op = binary_op(&op).ok_or_else(|| {
                    SqlError::UnsupportedOperation(format!("Unsupported binary operator: {}", op))
                })?;
                Ok(Expr::BinaryOp {
                    left: Box::new(converter.convert(*left)?),
                    op,
                    right: Box::new(converter.convert(*right)?),
                })
            }
            other => Err(wrong_shape(self, &other)),
        }
    }
}

/// NOT, unary minus and unary plus
pub struct UnaryPlugin;

impl ExpressionPlugin for UnaryPlugin {
    fn name(&self) -> &'static str {
        "UNARY"
    }

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool {
        matches!(
            expr,
            sql_ast::Expr::UnaryOp {
                op: UnaryOperator::Not | UnaryOperator::Minus | UnaryOperator::Plus,
                ..
            }
        )
    }

    fn convert(&self, expr: sql_ast::Expr, converter: &ExpressionConverter) -> Result<Expr> {
        match expr {
            sql_ast::Expr::UnaryOp { op: UnaryOperator::Not, expr } => Ok(Expr::Not {
                expr: Box::new(converter.convert(*expr)?),
            }),
            sql_ast::Expr::UnaryOp { op: UnaryOperator::Minus, expr } => Ok(Expr::Negate {
                expr: Box::new(converter.convert(*expr)?),
            }),
            sql_ast::Expr::UnaryOp { op: UnaryOperator::Plus, expr } => converter.convert(*expr),
            other => Err(wrong_shape(self, &other)),
        }
    }
}
