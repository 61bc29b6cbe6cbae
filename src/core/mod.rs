pub mod error;
pub mod types;
pub mod value;

pub use error::{ObjectKind, Result, SqlError};
pub use types::{Column, Row, Schema};
pub use value::{DataType, Value};
