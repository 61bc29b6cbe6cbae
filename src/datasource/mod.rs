//! Table backing data.
//!
//! The registry treats every source as opaque: it never inspects a source's
//! shape when binding it. Only the executor reads from sources, through
//! [`DataSource::scan`].

mod json;
mod memory;
mod view;

pub use json::JsonSource;
pub use memory::MemoryFrame;
pub use view::MaterializedView;

use crate::core::{Result, Row, Schema};
use std::fmt;
use std::path::PathBuf;

/// Where a source's rows come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Memory,
    Json { path: PathBuf },
    View { sql: String },
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory frame"),
            Self::Json { path } => write!(f, "json file '{}'", path.display()),
            Self::View { sql } => write!(f, "materialized view of '{}'", sql),
        }
    }
}

pub trait DataSource: Send + Sync + fmt::Debug {
    fn kind(&self) -> SourceKind;

    fn schema(&self) -> &Schema;

    /// Number of rows, if known without scanning
    fn row_count(&self) -> Option<usize>;

    fn scan(&self) -> Result<Vec<Row>>;
}
