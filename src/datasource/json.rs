use super::{DataSource, MemoryFrame, SourceKind};
use crate::core::{Result, Row, Schema};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A frame loaded from a file holding a JSON array of objects
#[derive(Debug, Clone)]
pub struct JsonSource {
    path: PathBuf,
    frame: MemoryFrame,
}

impl JsonSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let text = fs::read_to_string(&path)?;
        let json: serde_json::Value = serde_json::from_str(&text)?;
        let frame = MemoryFrame::from_json_records(&json)?;

        debug!(
            path = %path.display(),
            rows = frame.rows().len(),
            columns = frame.schema().column_count(),
            "loaded json source"
        );

        Ok(Self { path, frame })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for JsonSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Json {
            path: self.path.clone(),
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
