//! # Groundwork Planner
//!
//! Pure planning phase: dependency graph construction and batch
//! partitioning. Nothing in this crate performs I/O.

pub mod batches;
pub mod graph;

pub use batches::{plan, ExecutionBatch, ExecutionPlan};
pub use graph::DependencyGraph;
