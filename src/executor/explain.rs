use crate::core::{Column, DataType, Result, SqlError, Value};
use crate::executor::Executor;
use crate::executor::context::ExecutionContext;
use crate::parser::ast::Statement;
use crate::planner::QueryPlanner;
use crate::result::QueryResult;
use async_trait::async_trait;

/// Renders the logical plan of a SELECT without scanning any data
pub struct ExplainExecutor {
    planner: QueryPlanner,
}

impl ExplainExecutor {
    pub fn new() -> Self {
        Self {
            planner: QueryPlanner::new(),
        }
    }
}

impl Default for ExplainExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for ExplainExecutor {
    fn name(&self) -> &'static str {
        "EXPLAIN"
    }

    fn can_handle(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Explain(_))
    }

    async fn execute(&self, stmt: &Statement, ctx: &ExecutionContext<'_>) -> Result<QueryResult> {
        let Statement::Explain(query) = stmt else {
            return Err(SqlError::ExecutionError(
                "ExplainExecutor called with non-EXPLAIN statement".into(),
            ));
        };

        let source = ctx.resolve(&query.from.name)?;
        let plan = self.planner.plan(query, source.schema())?;

        let rows = plan
            .explain_lines()
            .into_iter()
            .map(|line| vec![Value::Text(line)])
            .collect();

        Ok(QueryResult::new(
            vec![Column::new("QUERY PLAN", DataType::Text).not_null()],
            rows,
        ))
    }
}
