#![allow(clippy::module_inception)]
pub mod planner;
pub mod logical_plan;

pub use logical_plan::*;
pub use planner::QueryPlanner;