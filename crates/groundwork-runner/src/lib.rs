//! # Groundwork Runner
//!
//! The effectful half of the engine: the [`Backend`] seam, the batch
//! [`Executor`], and the [`Run`] front door tying declaration, planning,
//! execution, and journaling together.

pub mod backend;
pub mod events;
pub mod executor;
pub mod result;
pub mod run;

pub use backend::Backend;
pub use events::{EventBus, ExecutionEvent, ExecutionEventKind};
pub use executor::Executor;
pub use result::{NodeFailure, RunOutcome, RunResult};
pub use run::{CancelHandle, Run};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::backend::Backend;
    pub use crate::events::{ExecutionEvent, ExecutionEventKind};
    pub use crate::result::{NodeFailure, RunOutcome, RunResult};
    pub use crate::run::{CancelHandle, Run};
    pub use groundwork_core::prelude::*;
    pub use groundwork_journal::{FileJournal, InMemoryJournal, JournalStore};
    pub use groundwork_planner::{DependencyGraph, ExecutionPlan};
}
