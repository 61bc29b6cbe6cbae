//! Boundary to the execution facility.
//!
//! The front-end hands a [`QueryRequest`] to a [`QueryEngine`] and receives a
//! [`MetaToken`] back. Everything behind the token (scheduling, placement,
//! storage of results) belongs to the engine. [`LocalEngine`] runs queries
//! in-process on the tokio runtime.

mod local;

pub use local::LocalEngine;

use crate::core::{Result, SqlError};
use crate::datasource::DataSource;
use crate::result::QueryResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Handle correlating a submitted query with its eventual result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MetaToken(pub u64);

impl MetaToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MetaToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registry entry passed along with a query
#[derive(Debug, Clone)]
pub struct TableBinding {
    pub name: String,
    pub source: Arc<dyn DataSource>,
}

impl TableBinding {
    pub fn new(name: impl Into<String>, source: Arc<dyn DataSource>) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// SQL text plus the subset of the registry it may read
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub sql: String,
    pub tables: Vec<TableBinding>,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            tables: Vec::new(),
        }
    }

    /// Add a table; a name that is already bound keeps its first source
    pub fn with_table(mut self, name: impl Into<String>, source: Arc<dyn DataSource>) -> Self {
        let name = name.into();
        if !self.tables.iter().any(|binding| binding.name == name) {
            self.tables.push(TableBinding::new(name, source));
        }
        self
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|binding| binding.name.as_str()).collect()
    }
}

#[derive(Debug, Clone)]
pub enum QueryState {
    Queued,
    Running,
    Finished(Arc<QueryResult>),
    Failed(SqlError),
    Cancelled,
}

impl QueryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueryState::Finished(_) | QueryState::Failed(_) | QueryState::Cancelled
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            QueryState::Queued => "queued",
            QueryState::Running => "running",
            QueryState::Finished(_) => "finished",
            QueryState::Failed(_) => "failed",
            QueryState::Cancelled => "cancelled",
        }
    }
}

/// Point-in-time snapshot of a submitted query
#[derive(Debug, Clone, Serialize)]
pub struct QueryStatus {
    pub token: MetaToken,
    pub sql: String,
    pub state: &'static str,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub row_count: Option<usize>,
    pub error: Option<String>,
}

impl QueryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, "finished" | "failed" | "cancelled")
    }
}

#[async_trait]
pub trait QueryEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Accept a query for execution. Returns once the query is queued.
    async fn submit(&self, request: QueryRequest) -> Result<MetaToken>;

    async fn status(&self, token: MetaToken) -> Result<QueryStatus>;

    /// Wait for the query to finish and return its result
    async fn fetch(&self, token: MetaToken) -> Result<Arc<QueryResult>>;

    /// Stop an in-flight query. Finished queries are left as they are.
    async fn cancel(&self, token: MetaToken) -> Result<()>;

    /// Forget the query and its result
    async fn release(&self, token: MetaToken) -> Result<()>;
}
