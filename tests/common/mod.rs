#![allow(dead_code)]

use dfsql::{DataSource, MemoryFrame, Result, Row, Schema, SourceKind};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub fn orders() -> Arc<dyn DataSource> {
    let records = json!([
        {"id": 1, "customer": "alice", "amount": 120.0, "status": "shipped"},
        {"id": 2, "customer": "bob", "amount": 35.5, "status": "pending"},
        {"id": 3, "customer": "alice", "amount": 80.0, "status": "pending"},
        {"id": 4, "customer": "carol", "amount": null, "status": "cancelled"},
        {"id": 5, "customer": "dave", "amount": 210.25, "status": "shipped"}
    ]);
    Arc::new(MemoryFrame::from_json_records(&records).unwrap())
}

pub fn customers() -> Arc<dyn DataSource> {
    let records = json!([
        {"name": "alice", "city": "Lisbon"},
        {"name": "bob", "city": "Oslo"},
        {"name": "carol", "city": "Lisbon"}
    ]);
    Arc::new(MemoryFrame::from_json_records(&records).unwrap())
}

/// A source whose scan blocks for a fixed time
#[derive(Debug)]
pub struct SlowSource {
    frame: MemoryFrame,
    delay: Duration,
}

impl SlowSource {
    pub fn new(delay: Duration) -> Arc<dyn DataSource> {
        let records = json!([{"n": 1}, {"n": 2}, {"n": 3}]);
        Arc::new(Self {
            frame: MemoryFrame::from_json_records(&records).unwrap(),
            delay,
        })
    }
}

impl DataSource for SlowSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Memory
    }

    fn schema(&self) -> &Schema {
        self.frame.schema()
    }

    fn row_count(&self) -> Option<usize> {
        self.frame.row_count()
    }

    fn scan(&self) -> Result<Vec<Row>> {
        std::thread::sleep(self.delay);
        self.frame.scan()
    }
}
