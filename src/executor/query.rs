use super::sort::sort_rows;
use super::{ExecutionContext, Executor};
use crate::core::{Result, Row, SqlError};
use crate::evaluator::Evaluator;
use crate::parser::ast::Statement;
use crate::planner::{LogicalPlan, QueryPlanner};
use crate::result::QueryResult;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

pub struct QueryExecutor {
    planner: QueryPlanner,
}

impl QueryExecutor {
    pub fn new() -> Self {
        Self {
            planner: QueryPlanner::new(),
        }
    }

    /// Run a plan bottom-up; `source` holds the scanned rows of the FROM table
    fn execute_plan(&self, plan: &LogicalPlan, evaluator: &Evaluator<'_>, source: Vec<Row>) -> Result<Vec<Row>> {
        match plan {
            LogicalPlan::TableScan(_) => Ok(source),
            LogicalPlan::Filter(filter) => {
                let rows = self.execute_plan(&filter.input, evaluator, source)?;
                let mut kept = Vec::with_capacity(rows.len());
                for row in rows {
                    if evaluator.matches(&filter.predicate, &row)? {
                        kept.push(row);
                    }
                }
                Ok(kept)
            }
            LogicalPlan::Sort(sort) => {
                let rows = self.execute_plan(&sort.input, evaluator, source)?;
                sort_rows(rows, &sort.order_by, evaluator)
            }
            LogicalPlan::Limit(limit) => {
                let rows = self.execute_plan(&limit.input, evaluator, source)?;
                let rows = rows.into_iter().skip(limit.offset);
                Ok(match limit.limit {
                    Some(n) => rows.take(n).collect(),
                    None => rows.collect(),
                })
            }
            LogicalPlan::Projection(proj) => {
                let rows = self.execute_plan(&proj.input, evaluator, source)?;
                rows.iter()
                    .map(|row| {
                        proj.expressions
                            .iter()
                            .map(|expr| evaluator.evaluate(expr, row))
                            .collect::<Result<Row>>()
                    })
                    .collect()
            }
            LogicalPlan::Distinct(distinct) => {
                let rows = self.execute_plan(&distinct.input, evaluator, source)?;
                let mut seen = HashSet::new();
                Ok(rows.into_iter().filter(|row| seen.insert(row.clone())).collect())
            }
        }
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for QueryExecutor {
    fn name(&self) -> &'static str {
        "SELECT"
    }

    fn can_handle(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Query(_))
    }

    async fn execute(&self, stmt: &Statement, ctx: &ExecutionContext<'_>) -> Result<QueryResult> {
        let Statement::Query(query) = stmt else {
            return Err(SqlError::ExecutionError(
                "QueryExecutor called with non-query statement".into(),
            ));
        };

        let source = ctx.resolve(&query.from.name)?;
        let plan = self.planner.plan(query, source.schema())?;

        let scan = plan.table_scan();
        let evaluator = Evaluator::new(&scan.schema, &scan.table_name, scan.alias.as_deref());

        // Sources may block on I/O, keep the scan off the async workers
        let scan_source = Arc::clone(source);
        let rows = tokio::task::spawn_blocking(move || scan_source.scan())
            .await
            .map_err(|e| SqlError::ExecutionError(format!("Scan task failed: {}", e)))??;
        debug!(table = %query.from.name, kind = %source.kind(), rows = rows.len(), "scanned source");

        let rows = self.execute_plan(&plan, &evaluator, rows)?;
        Ok(QueryResult::new(plan.schema().columns().to_vec(), rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType, Schema, Value};
    use crate::datasource::MemoryFrame;
    use crate::engine::TableBinding;
    use crate::parser::SqlParserAdapter;

    fn users() -> Vec<TableBinding> {
        let schema = Schema::new(vec![
            Column::new("id", DataType::Integer).not_null(),
            Column::new("name", DataType::Text),
            Column::new("age", DataType::Integer),
        ]);
        let rows = vec![
            vec![Value::Integer(1), Value::Text("Alice".into()), Value::Integer(30)],
            vec![Value::Integer(2), Value::Text("Bob".into()), Value::Integer(25)],
            vec![Value::Integer(3), Value::Text("Charlie".into()), Value::Integer(35)],
            vec![Value::Integer(4), Value::Text("Dana".into()), Value::Null],
        ];
        vec![TableBinding::new("users", Arc::new(MemoryFrame::new(schema, rows).unwrap()))]
    }

    async fn run(sql: &str) -> Result<QueryResult> {
        let stmt = SqlParserAdapter::new().parse(sql)?;
        let tables = users();
        let ctx = ExecutionContext::new(&tables);
        QueryExecutor::new().execute(&stmt, &ctx).await
    }

    #[tokio::test]
    async fn test_simple_scan() {
        let result = run("SELECT * FROM users").await.unwrap();
        assert_eq!(result.row_count(), 4);
        assert_eq!(result.column_names(), vec!["id", "name", "age"]);
    }

    #[tokio::test]
    async fn test_filter_execution() {
        let result = run("SELECT name FROM users WHERE age > 26").await.unwrap();
        assert_eq!(
            result.rows,
            vec![vec![Value::Text("Alice".into())], vec![Value::Text("Charlie".into())]]
        );
    }

    #[tokio::test]
    async fn test_sort_limit_offset() {
        let result = run("SELECT id FROM users ORDER BY age DESC LIMIT 2 OFFSET 1").await.unwrap();
        // NULL age sorts first under DESC
        assert_eq!(result.rows, vec![vec![Value::Integer(3)], vec![Value::Integer(1)]]);
    }

    #[tokio::test]
    async fn test_distinct() {
        let result = run("SELECT DISTINCT age > 26 AS older FROM users").await.unwrap();
        assert_eq!(result.row_count(), 3);
    }

    #[tokio::test]
    async fn test_limit_counts_distinct_rows() {
        let result = run("SELECT DISTINCT age > 26 AS older FROM users ORDER BY id LIMIT 2").await.unwrap();
        assert_eq!(
            result.rows,
            vec![vec![Value::Boolean(true)], vec![Value::Boolean(false)]]
        );
    }

    #[tokio::test]
    async fn test_missing_table_in_subset() {
        let result = run("SELECT * FROM orders").await;
        assert_eq!(result, Err(SqlError::TableNotFound("orders".into())));
    }
}
