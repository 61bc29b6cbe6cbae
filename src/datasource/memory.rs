use super::{DataSource, SourceKind};
use crate::core::{Column, DataType, Result, Row, Schema, SqlError, Value};
use crate::result::QueryResult;
use std::sync::Arc;

/// Rows held in memory behind a fixed schema
#[derive(Debug, Clone)]
pub struct MemoryFrame {
    schema: Schema,
    rows: Arc<Vec<Row>>,
}

impl MemoryFrame {
    /// Build a frame, validating every row against the schema.
    pub fn new(schema: Schema, rows: Vec<Row>) -> Result<Self> {
        for row in &rows {
            schema.validate_row(row)?;
        }

        Ok(Self {
            schema,
            rows: Arc::new(rows),
        })
    }

    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Arc::new(Vec::new()),
        }
    }

    /// Build a frame from a JSON array of flat objects.
    ///
    /// Columns appear in the order their keys are first seen. A column's type is
    /// the common type of its non-null values (integers widen to floats); a column
    /// with only nulls becomes TEXT. Missing keys read as NULL.
    pub fn from_json_records(json: &serde_json::Value) -> Result<Self> {
        let records = json
            .as_array()
            .ok_or_else(|| SqlError::ParseError("Expected a JSON array of objects".into()))?;

        let mut names: Vec<String> = Vec::new();
        let mut types: Vec<Option<DataType>> = Vec::new();
        let mut objects = Vec::with_capacity(records.len());

        for (idx, record) in records.iter().enumerate() {
            let object = record.as_object().ok_or_else(|| {
                SqlError::ParseError(format!("Record {} is not a JSON object", idx))
            })?;

            for (key, json_value) in object {
                let value = Value::from_json(json_value)?;
                let pos = match names.iter().position(|n| n == key) {
                    Some(pos) => pos,
                    None => {
                        names.push(key.clone());
                        types.push(None);
                        names.len() - 1
                    }
                };

                if let Some(observed) = value.data_type() {
                    types[pos] = match types[pos] {
                        None => Some(observed),
                        Some(current) => Some(current.unify(observed).ok_or_else(|| {
                            SqlError::TypeMismatch(format!(
                                "Column '{}' mixes {} and {} values",
                                key, current, observed
                            ))
                        })?),
                    };
                }
            }

            objects.push(object);
        }

        let columns: Vec<Column> = names
            .iter()
            .zip(types.iter())
            .map(|(name, ty)| Column::new(name.clone(), ty.unwrap_or(DataType::Text)))
            .collect();

        let mut rows = Vec::with_capacity(objects.len());
        for object in objects {
            let row = columns
                .iter()
                .map(|column| {
                    let value = match object.get(&column.name) {
                        Some(json_value) => Value::from_json(json_value)?,
                        None => Value::Null,
                    };
                    Ok(coerce(value, column.data_type))
                })
                .collect::<Result<Row>>()?;
            rows.push(row);
        }

        Self::new(Schema::new(columns), rows)
    }

    /// Materialize a finished query result.
    pub fn from_result(result: &QueryResult) -> Result<Self> {
        Self::new(Schema::new(result.columns.clone()), result.rows.clone())
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}

fn coerce(value: Value, data_type: DataType) -> Value {
    match (value, data_type) {
        (Value::Integer(i), DataType::Float) => Value::Float(i as f64),
        (value, _) => value,
    }
}

impl DataSource for MemoryFrame {
    fn kind(&self) -> SourceKind {
        SourceKind::Memory
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn row_count(&self) -> Option<usize> {
        Some(self.rows.len())
    }

    fn scan(&self) -> Result<Vec<Row>> {
        Ok(self.rows.as_ref().clone())
    }
}
