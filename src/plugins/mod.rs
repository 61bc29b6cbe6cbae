//! Conversion of sqlparser expressions into the internal [`Expr`] tree.
//!
//! Identifiers and literals are converted directly. Every other expression
//! goes to the first registered plugin that claims it.

pub mod operators;
pub mod predicates;

use crate::core::{Result, SqlError, Value};
use crate::parser::ast::Expr;
use operators::{BinaryOperatorPlugin, NestedPlugin, UnaryPlugin};
use predicates::{BetweenPlugin, InListPlugin, IsNullPlugin, LikePlugin};
use sqlparser::ast as sql_ast;
use tracing::trace;

pub trait ExpressionPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool;

    fn convert(&self, expr: sql_ast::Expr, converter: &ExpressionConverter) -> Result<Expr>;
}

pub struct ExpressionPluginRegistry {
    plugins: Vec<Box<dyn ExpressionPlugin>>,
}

impl ExpressionPluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    pub fn register(&mut self, plugin: Box<dyn ExpressionPlugin>) {
        trace!(plugin = plugin.name(), "registered expression plugin");
        self.plugins.push(plugin);
    }

    pub fn with_default_plugins() -> Self {
        let mut registry = Self::new();

        // Nested first so parentheses unwrap before anything else looks at them
        registry.register(Box::new(NestedPlugin));
        registry.register(Box::new(BinaryOperatorPlugin));
        registry.register(Box::new(UnaryPlugin));
        registry.register(Box::new(IsNullPlugin));
        registry.register(Box::new(InListPlugin));
        registry.register(Box::new(BetweenPlugin));
        registry.register(Box::new(LikePlugin));

        registry
    }

    pub fn find_plugin(&self, expr: &sql_ast::Expr) -> Option<&dyn ExpressionPlugin> {
        self.plugins
            .iter()
            .find(|plugin| plugin.can_handle(expr))
            .map(|boxed| &**boxed)
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }
}

impl Default for ExpressionPluginRegistry {
    fn default() -> Self {
        Self::with_default_plugins()
    }
}

pub struct ExpressionConverter {
    registry: ExpressionPluginRegistry,
}

impl ExpressionConverter {
    pub fn new() -> Self {
        let registry = ExpressionPluginRegistry::with_default_plugins();
        trace!(plugins = ?registry.plugin_names(), "expression converter ready");
        Self { registry }
    }

    pub fn convert(&self, expr: sql_ast::Expr) -> Result<Expr> {
        match &expr {
            sql_ast::Expr::Identifier(ident) => {
                return Ok(Expr::Column(ident.value.clone()));
            }
            sql_ast::Expr::CompoundIdentifier(idents) => {
                let parts: Vec<String> = idents.iter().map(|i| i.value.clone()).collect();
                return Ok(Expr::CompoundIdentifier(parts));
            }
            sql_ast::Expr::Value(val) => {
                return Ok(Expr::Literal(self.convert_value(&val.value)?));
            }
            _ => {}
        }

        if let Some(plugin) = self.registry.find_plugin(&expr) {
            return plugin.convert(expr, self);
        }

        Err(SqlError::UnsupportedOperation(format!(
            "Unsupported expression: {}",
            expr
        )))
    }

    pub fn convert_value(&self, val: &sql_ast::Value) -> Result<Value> {
        match val {
            sql_ast::Value::Number(n, _) => {
                if let Ok(i) = n.parse::<i64>() {
                    Ok(Value::Integer(i))
                } else if let Ok(f) = n.parse::<f64>() {
                    Ok(Value::Float(f))
                } else {
                    Err(SqlError::TypeMismatch(format!("Invalid number: {}", n)))
                }
            }
            sql_ast::Value::SingleQuotedString(s) | sql_ast::Value::DoubleQuotedString(s) => {
                Ok(Value::Text(s.clone()))
            }
            sql_ast::Value::Boolean(b) => Ok(Value::Boolean(*b)),
            sql_ast::Value::Null => Ok(Value::Null),
            _ => Err(SqlError::UnsupportedOperation(format!(
                "Unsupported literal: {}",
                val
            ))),
        }
    }
}

/// Error for a plugin handed an expression it did not claim
fn wrong_shape(plugin: &dyn ExpressionPlugin, expr: &sql_ast::Expr) -> SqlError {
    SqlError::ExecutionError(format!(
        "{} plugin cannot convert expression: {}",
        plugin.name(),
        expr
    ))
}

impl Default for ExpressionConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::BinaryOp;
    use sqlparser::dialect::PostgreSqlDialect;
    use sqlparser::parser::Parser;

    fn parse_expr(sql: &str) -> sql_ast::Expr {
        Parser::new(&PostgreSqlDialect {})
            .try_with_sql(sql)
            .unwrap()
            .parse_expr()
            .unwrap()
    }

    fn convert(sql: &str) -> Result<Expr> {
        ExpressionConverter::new().convert(parse_expr(sql))
    }

    #[test]
    fn test_default_registry_order() {
        let registry = ExpressionPluginRegistry::with_default_plugins();
        assert_eq!(registry.plugin_names()[0], "NESTED");
    }

    #[test]
    fn test_literals() {
        assert_eq!(convert("42").unwrap(), Expr::Literal(Value::Integer(42)));
        assert_eq!(convert("2.5").unwrap(), Expr::Literal(Value::Float(2.5)));
        assert_eq!(convert("'x'").unwrap(), Expr::Literal(Value::Text("x".into())));
        assert_eq!(convert("NULL").unwrap(), Expr::Literal(Value::Null));
        assert_eq!(convert("true").unwrap(), Expr::Literal(Value::Boolean(true)));
    }

    #[test]
    fn test_precedence_survives_conversion() {
        let expr = convert("a + 1 > 2 AND b = 'x'").unwrap();
        let Expr::BinaryOp { op, left, .. } = expr else {
            panic!("expected binary op");
        };
        assert_eq!(op, BinaryOp::And);
        assert!(matches!(*left, Expr::BinaryOp { op: BinaryOp::Gt, .. }));
    }

    #[test]
    fn test_nested_unwraps() {
        assert_eq!(convert("(a)").unwrap(), Expr::Column("a".into()));
    }

    #[test]
    fn test_predicate_forms() {
        assert!(matches!(convert("a IS NOT NULL").unwrap(), Expr::IsNull { negated: true, .. }));
        assert!(matches!(convert("a NOT IN (1, 2)").unwrap(), Expr::In { negated: true, .. }));
        assert!(matches!(convert("a BETWEEN 1 AND 3").unwrap(), Expr::Between { negated: false, .. }));
        assert!(matches!(
            convert("a ILIKE 'x%'").unwrap(),
            Expr::Like { case_insensitive: true, .. }
        ));
        assert!(matches!(convert("NOT a").unwrap(), Expr::Not { .. }));
        assert!(matches!(convert("-a").unwrap(), Expr::Negate { .. }));
    }

    #[test]
    fn test_unsupported_expression() {
        assert!(matches!(
            convert("upper(a)"),
            Err(SqlError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            convert("a || 'x'"),
            Err(SqlError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_unary_plus_is_dropped() {
        assert_eq!(convert("+a").unwrap(), Expr::Column("a".into()));
    }
}
