pub mod context;
pub mod executor;
pub mod explain;
pub mod query;
mod sort;

pub use context::ExecutionContext;
pub use executor::{Executor, ExecutorPipeline};
