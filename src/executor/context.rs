use crate::core::{Result, SqlError};
use crate::datasource::DataSource;
use crate::engine::TableBinding;
use std::sync::Arc;

/// Tables visible to one query: exactly the subset the caller submitted
pub struct ExecutionContext<'a> {
    tables: &'a [TableBinding],
}

impl<'a> ExecutionContext<'a> {
    pub fn new(tables: &'a [TableBinding]) -> Self {
        Self { tables }
    }

    /// Number of tables bound for this query
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn resolve(&self, name: &str) -> Result<&'a Arc<dyn DataSource>> {
        self.tables
            .iter()
            .find(|binding| binding.name == name)
            .map(|binding| &binding.source)
            .ok_or_else(|| SqlError::TableNotFound(name.to_string()))
    }
}
