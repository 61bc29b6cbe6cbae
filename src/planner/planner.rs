use crate::core::{Column, DataType, Result, Schema, SqlError, Value};
use crate::evaluator::Evaluator;
use crate::parser::ast::{BinaryOp, Expr, OrderByExpr, QueryStmt, SelectItem};
use super::logical_plan::*;

/// Query planner - converts AST to LogicalPlan
///
/// Operators are stacked in evaluation order: scan, filter, sort,
/// projection, distinct, limit. Sorting happens on source rows so ORDER BY can use
/// columns that are not projected; references to projection aliases and
/// ordinal positions are rewritten into the expressions they name.
pub struct QueryPlanner;

impl QueryPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Plan a query over a table with the given schema
    pub fn plan(&self, query: &QueryStmt, source_schema: &Schema) -> Result<LogicalPlan> {
        let evaluator = Evaluator::new(
            source_schema,
            &query.from.name,
            query.from.alias.as_deref(),
        );

        // Start with table scan
        let mut plan = LogicalPlan::TableScan(TableScanNode {
            table_name: query.from.name.clone(),
            alias: query.from.alias.clone(),
            schema: source_schema.clone(),
        });

        let (expressions, output_schema) =
            self.plan_projection(&query.projection, source_schema, &evaluator)?;

        // Apply WHERE clause
        if let Some(ref selection) = query.selection {
            check_columns(selection, &evaluator)?;
            plan = LogicalPlan::Filter(FilterNode {
                input: Box::new(plan),
                predicate: selection.clone(),
            });
        }

        // Apply ORDER BY
        if !query.order_by.is_empty() {
            let order_by = query
                .order_by
                .iter()
                .map(|order| {
                    let expr = resolve_order_key(&order.expr, &query.projection, &expressions, source_schema)?;
                    check_columns(&expr, &evaluator)?;
                    Ok(OrderByExpr {
                        expr,
                        descending: order.descending,
                        nulls_first: order.nulls_first,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            plan = LogicalPlan::Sort(SortNode {
                input: Box::new(plan),
                order_by,
            });
        }

        plan = LogicalPlan::Projection(ProjectionNode {
            input: Box::new(plan),
            expressions,
            schema: output_schema,
        });

        if query.distinct {
            plan = LogicalPlan::Distinct(DistinctNode {
                input: Box::new(plan),
            });
        }

        // LIMIT / OFFSET count output rows, so they go after DISTINCT
        if query.limit.is_some() || query.offset.is_some() {
            plan = LogicalPlan::Limit(LimitNode {
                input: Box::new(plan),
                limit: query.limit,
                offset: query.offset.unwrap_or(0),
            });
        }

        Ok(plan)
    }

    fn plan_projection(
        &self,
        projection: &[SelectItem],
        source_schema: &Schema,
        evaluator: &Evaluator<'_>,
    ) -> Result<(Vec<Expr>, Schema)> {
        let mut expressions = Vec::new();
        let mut columns = Vec::new();

        for item in projection {
            match item {
                SelectItem::Wildcard => {
                    for column in source_schema.columns() {
                        expressions.push(Expr::Column(column.name.clone()));
                        columns.push(column.clone());
                    }
                }
                SelectItem::Expr { expr, label, .. } => {
                    check_columns(expr, evaluator)?;
                    let (data_type, nullable) = infer_type(expr, source_schema, evaluator)?;
                    expressions.push(expr.clone());
                    columns.push(Column {
                        name: label.clone(),
                        data_type: data_type.unwrap_or(DataType::Text),
                        nullable,
                    });
                }
            }
        }

        Ok((expressions, Schema::new(columns)))
    }
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Map an ORDER BY key onto source-level expressions.
///
/// Output aliases take precedence over source columns of the same name.
fn resolve_order_key(
    key: &Expr,
    projection: &[SelectItem],
    expressions: &[Expr],
    source_schema: &Schema,
) -> Result<Expr> {
    match key {
        Expr::Column(name) => {
            let aliased = projection.iter().find_map(|item| match item {
                SelectItem::Expr { expr, alias: Some(alias), .. } if alias == name => Some(expr),
                _ => None,
            });
            match aliased {
                Some(expr) => Ok(expr.clone()),
                None if source_schema.find_column_index(name).is_some() => Ok(key.clone()),
                None => Err(SqlError::ColumnNotFound(name.clone(), "ORDER BY".into())),
            }
        }
        Expr::Literal(Value::Integer(position)) => usize::try_from(*position)
            .ok()
            .and_then(|p| p.checked_sub(1))
            .and_then(|idx| expressions.get(idx))
            .cloned()
            .ok_or_else(|| {
                SqlError::ExecutionError(format!(
                    "ORDER BY position {} is not in select list",
                    position
                ))
            }),
        other => Ok(other.clone()),
    }
}

/// Fail early on unknown columns, even when the table has no rows
fn check_columns(expr: &Expr, evaluator: &Evaluator<'_>) -> Result<()> {
    match expr {
        Expr::Column(_) | Expr::CompoundIdentifier(_) => evaluator.column_position(expr).map(|_| ()),
        Expr::Literal(_) => Ok(()),
        Expr::BinaryOp { left, right, .. } => {
            check_columns(left, evaluator)?;
            check_columns(right, evaluator)
        }
        Expr::Not { expr } | Expr::Negate { expr } | Expr::IsNull { expr, .. } => {
            check_columns(expr, evaluator)
        }
        Expr::In { expr, list, .. } => {
            check_columns(expr, evaluator)?;
            list.iter().try_for_each(|item| check_columns(item, evaluator))
        }
        Expr::Between { expr, low, high, .. } => {
            check_columns(expr, evaluator)?;
            check_columns(low, evaluator)?;
            check_columns(high, evaluator)
        }
        Expr::Like { expr, pattern, .. } => {
            check_columns(expr, evaluator)?;
            check_columns(pattern, evaluator)
        }
    }
}

/// Static output type of a projected expression with its nullability.
/// `None` means the type is unknown, as for a bare NULL literal.
fn infer_type(
    expr: &Expr,
    schema: &Schema,
    evaluator: &Evaluator<'_>,
) -> Result<(Option<DataType>, bool)> {
    match expr {
        Expr::Column(_) | Expr::CompoundIdentifier(_) => {
            let column = &schema.columns()[evaluator.column_position(expr)?];
            Ok((Some(column.data_type), column.nullable))
        }
        Expr::Literal(value) => Ok((value.data_type(), value.is_null())),
        Expr::Negate { expr } => match infer_type(expr, schema, evaluator)? {
            (Some(DataType::Text | DataType::Boolean), _) => Err(SqlError::TypeMismatch(
                format!("Cannot negate {}", expr),
            )),
            inferred => Ok(inferred),
        },
        Expr::BinaryOp { left, op, right } if is_arithmetic(*op) => {
            let (l, l_null) = infer_type(left, schema, evaluator)?;
            let (r, r_null) = infer_type(right, schema, evaluator)?;
            let nullable = l_null || r_null;
            match (l, r) {
                (None, other) | (other, None) => Ok((other, true)),
                (Some(DataType::Integer), Some(DataType::Integer)) => {
                    Ok((Some(DataType::Integer), nullable))
                }
                (
                    Some(DataType::Integer | DataType::Float),
                    Some(DataType::Integer | DataType::Float),
                ) => Ok((Some(DataType::Float), nullable)),
                (Some(l), Some(r)) => Err(SqlError::TypeMismatch(format!(
                    "Cannot apply {} to {} and {}",
                    op, l, r
                ))),
            }
        }
        _ => Ok((Some(DataType::Boolean), true)),
    }
}

fn is_arithmetic(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo
    )
}
