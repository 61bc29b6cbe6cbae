// ============================================================================
// dfsql library
// ============================================================================

pub mod catalog;
pub mod config;
pub mod core;
pub mod datasource;
pub mod engine;
pub mod facade;
pub mod result;
mod evaluator;
mod executor;
mod parser;
mod planner;
mod plugins;

// Re-export main types for convenience
pub use catalog::Catalog;
pub use config::ContextConfig;
pub use core::{Column, DataType, ObjectKind, Result, Row, Schema, SqlError, Value};
pub use datasource::{DataSource, JsonSource, MaterializedView, MemoryFrame, SourceKind};
pub use engine::{LocalEngine, MetaToken, QueryEngine, QueryRequest, QueryState, QueryStatus, TableBinding};
pub use facade::{ResultSet, SqlContext};
pub use result::QueryResult;
