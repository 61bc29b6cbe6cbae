//! Row-level expression evaluation with SQL NULL semantics.

pub mod pattern;

use crate::core::{Result, Row, Schema, SqlError, Value};
use crate::parser::ast::{BinaryOp, Expr};
use pattern::eval_like;
use std::cmp::Ordering;

/// Evaluates expressions against rows of one schema
pub struct Evaluator<'a> {
    schema: &'a Schema,
    table: &'a str,
    /// Alias the FROM table is visible under, accepted as a column qualifier
    alias: Option<&'a str>,
}

impl<'a> Evaluator<'a> {
    pub fn new(schema: &'a Schema, table: &'a str, alias: Option<&'a str>) -> Self {
        Self { schema, table, alias }
    }

    /// Position of a column reference in the row
    pub fn column_position(&self, expr: &Expr) -> Result<usize> {
        let name = match expr {
            Expr::Column(name) => name,
            Expr::CompoundIdentifier(parts) => match parts.as_slice() {
                [qualifier, name]
                    if qualifier == self.table || Some(qualifier.as_str()) == self.alias =>
                {
                    name
                }
                _ => {
                    return Err(SqlError::ColumnNotFound(parts.join("."), self.table.to_string()));
                }
            },
            other => {
                return Err(SqlError::ExecutionError(format!(
                    "{} is not a column reference",
                    other
                )));
            }
        };

        self.schema
            .find_column_index(name)
            .ok_or_else(|| SqlError::ColumnNotFound(name.clone(), self.table.to_string()))
    }

    pub fn evaluate(&self, expr: &Expr, row: &Row) -> Result<Value> {
        match expr {
            Expr::Column(_) | Expr::CompoundIdentifier(_) => {
                let idx = self.column_position(expr)?;
                row.get(idx).cloned().ok_or_else(|| {
                    SqlError::ExecutionError(format!("Row is shorter than schema at column {}", idx))
                })
            }
            Expr::Literal(value) => Ok(value.clone()),
            Expr::BinaryOp { left, op, right } => self.evaluate_binary(left, *op, right, row),
            Expr::Not { expr } => Ok(match truth(&self.evaluate(expr, row)?)? {
                Some(b) => Value::Boolean(!b),
                None => Value::Null,
            }),
            Expr::Negate { expr } => match self.evaluate(expr, row)? {
                Value::Null => Ok(Value::Null),
                Value::Integer(i) => i
                    .checked_neg()
                    .map(Value::Integer)
                    .ok_or_else(|| SqlError::ExecutionError("Integer overflow".into())),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(SqlError::TypeMismatch(format!(
                    "Cannot negate {}",
                    other.type_name()
                ))),
            },
            Expr::IsNull { expr, negated } => {
                let is_null = self.evaluate(expr, row)?.is_null();
                Ok(Value::Boolean(is_null != *negated))
            }
            Expr::In { expr, list, negated } => self.evaluate_in(expr, list, *negated, row),
            Expr::Between { expr, low, high, negated } => {
                let value = self.evaluate(expr, row)?;
                let low = self.evaluate(low, row)?;
                let high = self.evaluate(high, row)?;

                let lower_ok = value.sql_compare(&low)?.map(|o| o != Ordering::Less);
                let upper_ok = value.sql_compare(&high)?.map(|o| o != Ordering::Greater);
                Ok(negate_if(and(lower_ok, upper_ok), *negated))
            }
            Expr::Like { expr, pattern, negated, case_insensitive } => {
                let value = self.evaluate(expr, row)?;
                let like = self.evaluate(pattern, row)?;
                match (&value, &like) {
                    (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                    (Value::Text(text), Value::Text(like)) => {
                        let matched = eval_like(text, like, *case_insensitive)?;
                        Ok(Value::Boolean(matched != *negated))
                    }
                    _ => Err(SqlError::TypeMismatch(format!(
                        "LIKE requires TEXT operands, got {} and {}",
                        value.type_name(),
                        like.type_name()
                    ))),
                }
            }
        }
    }

    /// WHERE semantics: only TRUE keeps a row
    pub fn matches(&self, predicate: &Expr, row: &Row) -> Result<bool> {
        Ok(truth(&self.evaluate(predicate, row)?)?.unwrap_or(false))
    }

    fn evaluate_binary(&self, left: &Expr, op: BinaryOp, right: &Expr, row: &Row) -> Result<Value> {
        match op {
            BinaryOp::And => {
                let l = truth(&self.evaluate(left, row)?)?;
                // Short-circuit: the right side is not evaluated
                if l == Some(false) {
                    return Ok(Value::Boolean(false));
                }
                let r = truth(&self.evaluate(right, row)?)?;
                Ok(to_value(and(l, r)))
            }
            BinaryOp::Or => {
                let l = truth(&self.evaluate(left, row)?)?;
                if l == Some(true) {
                    return Ok(Value::Boolean(true));
                }
                let r = truth(&self.evaluate(right, row)?)?;
                Ok(to_value(match (l, r) {
                    (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                }))
            }
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq => {
                let l = self.evaluate(left, row)?;
                let r = self.evaluate(right, row)?;
                let Some(ordering) = l.sql_compare(&r)? else {
                    return Ok(Value::Null);
                };
                let result = match op {
                    BinaryOp::Eq => ordering == Ordering::Equal,
                    BinaryOp::NotEq => ordering != Ordering::Equal,
                    BinaryOp::Lt => ordering == Ordering::Less,
                    BinaryOp::LtEq => ordering != Ordering::Greater,
                    BinaryOp::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                };
                Ok(Value::Boolean(result))
            }
            BinaryOp::Add
            | BinaryOp::Subtract
            | BinaryOp::Multiply
            | BinaryOp::Divide
            | BinaryOp::Modulo => {
                let l = self.evaluate(left, row)?;
                let r = self.evaluate(right, row)?;
                arithmetic(&l, op, &r)
            }
        }
    }

    fn evaluate_in(&self, expr: &Expr, list: &[Expr], negated: bool, row: &Row) -> Result<Value> {
        let value = self.evaluate(expr, row)?;
        if value.is_null() {
            return Ok(Value::Null);
        }

        let mut saw_null = false;
        for item in list {
            let candidate = self.evaluate(item, row)?;
            match value.sql_compare(&candidate)? {
                Some(Ordering::Equal) => return Ok(Value::Boolean(!negated)),
                Some(_) => {}
                None => saw_null = true,
            }
        }

        if saw_null {
            Ok(Value::Null)
        } else {
            Ok(Value::Boolean(negated))
        }
    }
}

/// Interpret a value as a SQL truth value
fn truth(value: &Value) -> Result<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Boolean(b) => Ok(Some(*b)),
        other => Err(SqlError::TypeMismatch(format!(
            "Expected BOOLEAN, got {}",
            other.type_name()
        ))),
    }
}

fn and(l: Option<bool>, r: Option<bool>) -> Option<bool> {
    match (l, r) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn to_value(truth: Option<bool>) -> Value {
    truth.map(Value::Boolean).unwrap_or(Value::Null)
}

fn negate_if(truth: Option<bool>, negated: bool) -> Value {
    to_value(truth.map(|b| b != negated))
}

fn arithmetic(l: &Value, op: BinaryOp, r: &Value) -> Result<Value> {
    match (l, r) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Integer(a), Value::Integer(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Subtract => a.checked_sub(*b),
                BinaryOp::Multiply => a.checked_mul(*b),
                BinaryOp::Divide | BinaryOp::Modulo if *b == 0 => {
                    return Err(SqlError::ExecutionError("Division by zero".into()));
                }
                BinaryOp::Divide => a.checked_div(*b),
                _ => a.checked_rem(*b),
            };
            result
                .map(Value::Integer)
                .ok_or_else(|| SqlError::ExecutionError("Integer overflow".into()))
        }
        (a, b) if a.is_numeric() && b.is_numeric() => {
            let x = a.as_f64().unwrap_or(f64::NAN);
            let y = b.as_f64().unwrap_or(f64::NAN);
            Ok(Value::Float(match op {
                BinaryOp::Add => x + y,
                BinaryOp::Subtract => x - y,
                BinaryOp::Multiply => x * y,
                BinaryOp::Divide => x / y,
                _ => x % y,
            }))
        }
        _ => Err(SqlError::TypeMismatch(format!(
            "Cannot apply {} to {} and {}",
            op,
            l.type_name(),
            r.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType};
    use crate::plugins::ExpressionConverter;
    use sqlparser::dialect::PostgreSqlDialect;
    use sqlparser::parser::Parser;

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("id", DataType::Integer),
            Column::new("name", DataType::Text),
            Column::new("score", DataType::Float),
        ])
    }

    fn eval(sql: &str, row: Row) -> Result<Value> {
        let expr = Parser::new(&PostgreSqlDialect {})
            .try_with_sql(sql)
            .unwrap()
            .parse_expr()
            .unwrap();
        let expr = ExpressionConverter::new().convert(expr).unwrap();
        let schema = schema();
        Evaluator::new(&schema, "t", Some("x")).evaluate(&expr, &row)
    }

    fn row() -> Row {
        vec![Value::Integer(7), Value::Text("Ada".into()), Value::Null]
    }

    #[test]
    fn test_arithmetic_and_comparison() {
        assert_eq!(eval("id * 2 + 1", row()).unwrap(), Value::Integer(15));
        assert_eq!(eval("id / 2", row()).unwrap(), Value::Integer(3));
        assert_eq!(eval("id / 2.0", row()).unwrap(), Value::Float(3.5));
        assert_eq!(eval("id >= 7", row()).unwrap(), Value::Boolean(true));
        assert_eq!(eval("-id", row()).unwrap(), Value::Integer(-7));
    }

    #[test]
    fn test_null_propagation() {
        assert_eq!(eval("score > 1", row()).unwrap(), Value::Null);
        assert_eq!(eval("score + 1", row()).unwrap(), Value::Null);
        assert_eq!(eval("score IS NULL", row()).unwrap(), Value::Boolean(true));
        assert_eq!(eval("NOT (score > 1)", row()).unwrap(), Value::Null);
    }

    #[test]
    fn test_three_valued_logic() {
        assert_eq!(eval("score > 1 AND id = 0", row()).unwrap(), Value::Boolean(false));
        assert_eq!(eval("score > 1 OR id = 7", row()).unwrap(), Value::Boolean(true));
        assert_eq!(eval("score > 1 OR id = 0", row()).unwrap(), Value::Null);
    }

    #[test]
    fn test_in_between_like() {
        assert_eq!(eval("id IN (1, 7)", row()).unwrap(), Value::Boolean(true));
        assert_eq!(eval("id NOT IN (1, 2)", row()).unwrap(), Value::Boolean(true));
        assert_eq!(eval("id IN (1, NULL)", row()).unwrap(), Value::Null);
        assert_eq!(eval("id BETWEEN 1 AND 7", row()).unwrap(), Value::Boolean(true));
        assert_eq!(eval("id NOT BETWEEN 1 AND 7", row()).unwrap(), Value::Boolean(false));
        assert_eq!(eval("name LIKE 'A%'", row()).unwrap(), Value::Boolean(true));
        assert_eq!(eval("name NOT ILIKE 'a%'", row()).unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_qualified_columns() {
        assert_eq!(eval("t.id", row()).unwrap(), Value::Integer(7));
        assert_eq!(eval("x.id", row()).unwrap(), Value::Integer(7));
        assert!(matches!(eval("y.id", row()), Err(SqlError::ColumnNotFound(_, _))));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(eval("id / 0", row()), Err(SqlError::ExecutionError(_))));
        assert!(matches!(eval("missing", row()), Err(SqlError::ColumnNotFound(_, _))));
        assert!(matches!(eval("name + 1", row()), Err(SqlError::TypeMismatch(_))));
        assert!(matches!(eval("id AND true", row()), Err(SqlError::TypeMismatch(_))));
    }
}
