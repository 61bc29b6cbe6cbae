use std::fmt;
use thiserror::Error;

/// Kind of catalog object a name belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Database,
    Table,
    View,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database => write!(f, "Database"),
            Self::Table => write!(f, "Table"),
            Self::View => write!(f, "View"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SqlError {
    /// `existing` describes what currently owns the name (e.g. "table backed by json file 'a.json'")
    #[error("{kind} '{name}' already exists ({existing})")]
    DuplicateName {
        kind: ObjectKind,
        name: String,
        existing: String,
    },

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Database '{0}' not found")]
    DatabaseNotFound(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("View '{0}' not found")]
    ViewNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Unknown query token {0}")]
    UnknownToken(u64),

    #[error("Query {0} was cancelled")]
    Cancelled(u64),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Engine busy: {0}")]
    EngineBusy(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, SqlError>;

impl<T> From<std::sync::PoisonError<T>> for SqlError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for SqlError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for SqlError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}
