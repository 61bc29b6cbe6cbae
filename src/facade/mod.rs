mod context;
mod result_set;

pub use context::SqlContext;
pub use result_set::ResultSet;
