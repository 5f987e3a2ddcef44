//! # Groundwork Core
//!
//! Declaration-layer primitives for the Groundwork engine.
//!
//! This crate provides the fundamental building blocks:
//! - [`Module`] - named, immutable collection of action declarations
//! - [`ActionNode`] - one declared unit of backend work
//! - [`FutureValue`] - reference to another node's not-yet-known output
//! - [`GroundworkError`] - engine error taxonomy

pub mod config;
pub mod error;
pub mod future;
pub mod module;
pub mod node;
pub mod types;

// Re-exports for convenience
pub use config::RunConfig;
pub use error::{GroundworkError, Result};
pub use future::{FutureValue, DEFAULT_SELECTOR};
pub use module::{DeclareOptions, Module, ModuleBuilder};
pub use node::{ActionKind, ActionNode, ArgValue, NodeId};
pub use types::{AccountRef, BackendHandle, FailureReason, NodeState, OutputMap, OutputValue};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::RunConfig;
    pub use crate::error::{GroundworkError, Result};
    pub use crate::future::FutureValue;
    pub use crate::module::{DeclareOptions, Module, ModuleBuilder};
    pub use crate::node::{ActionKind, ActionNode, ArgValue, NodeId};
    pub use crate::types::{
        AccountRef, BackendHandle, FailureReason, NodeState, OutputMap, OutputValue,
    };
}
