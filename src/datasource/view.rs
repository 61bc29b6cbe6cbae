use super::{DataSource, MemoryFrame, SourceKind};
use crate::core::{Result, Row, Schema};

/// Stored result of a view's defining query
#[derive(Debug, Clone)]
pub struct MaterializedView {
    sql: String,
    frame: MemoryFrame,
}

impl MaterializedView {
    pub fn new(sql: impl Into<String>, frame: MemoryFrame) -> Self {
        Self {
            sql: sql.into(),
            frame,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl DataSource for MaterializedView {
    fn kind(&self) -> SourceKind {
        SourceKind::View {
            sql: self.sql.clone(),
        }
    }

    fn schema(&self) -> &Schema {
        self.frame.schema()
    }

    fn row_count(&self) -> Option<usize> {
        self.frame.row_count()
    }

    fn scan(&self) -> Result<Vec<Row>> {
        self.frame.scan()
    }
}
