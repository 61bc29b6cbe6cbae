use super::ExecutionContext;
use super::explain::ExplainExecutor;
use super::query::QueryExecutor;
use crate::core::{Result, SqlError};
use crate::parser::ast::Statement;
use crate::result::QueryResult;

use async_trait::async_trait;
use tracing::trace;

#[async_trait]
pub trait Executor: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_handle(&self, stmt: &Statement) -> bool;
    async fn execute(&self, stmt: &Statement, ctx: &ExecutionContext<'_>) -> Result<QueryResult>;
}

/// Ordered executors; the first one that accepts a statement runs it
pub struct ExecutorPipeline {
    executors: Vec<Box<dyn Executor>>,
}

impl ExecutorPipeline {
    pub fn new() -> Self {
        Self {
            executors: Vec::new(),
        }
    }

    pub fn with_default_executors() -> Self {
        let mut pipeline = Self::new();
        pipeline.register(Box::new(ExplainExecutor::new()));
        pipeline.register(Box::new(QueryExecutor::new()));
        pipeline
    }

    pub fn register(&mut self, executor: Box<dyn Executor>) {
        self.executors.push(executor);
    }

    pub fn executor_names(&self) -> Vec<&'static str> {
        self.executors.iter().map(|e| e.name()).collect()
    }

    pub async fn execute(
        &self,
        stmt: &Statement,
        ctx: &ExecutionContext<'_>,
    ) -> Result<QueryResult> {
        let executor = self
            .executors
            .iter()
            .find(|executor| executor.can_handle(stmt))
            .ok_or_else(|| {
                SqlError::UnsupportedOperation("No executor accepts this statement".into())
            })?;

        trace!(executor = executor.name(), tables = ctx.table_count(), "dispatching statement");
        executor.execute(stmt, ctx).await
    }
}

impl Default for ExecutorPipeline {
    fn default() -> Self {
        Self::with_default_executors()
    }
}
