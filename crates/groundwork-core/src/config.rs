//! Run configuration.
//!
//! Everything the executor needs from the environment is passed explicitly
//! here rather than read from ambient state, so runs stay independently
//! testable and parallelizable.

use serde::{Deserialize, Serialize};

/// Configuration for one run of a module against a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Identity slots available to the module (e.g., signer addresses).
    /// `ModuleBuilder::get_account(i)` indexes into this list.
    pub accounts: Vec<String>,

    /// Identity of the target backend/network (e.g., a chain id). Recorded
    /// in the journal so a resume against a different target is rejected
    /// by the fingerprint check.
    pub target: String,

    /// Maximum concurrent submissions within one batch.
    pub concurrency_limit: usize,

    /// Maximum time to wait for one node's confirmation, in milliseconds.
    pub confirm_timeout_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            target: "local".to_string(),
            concurrency_limit: 8,
            confirm_timeout_ms: 60_000,
        }
    }
}

impl RunConfig {
    /// Create a config for a named target.
    pub fn for_target(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    /// Set the identity slots.
    pub fn with_accounts(mut self, accounts: Vec<String>) -> Self {
        self.accounts = accounts;
        self
    }

    /// Set the intra-batch concurrency limit.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit.max(1);
        self
    }

    /// Set the per-node confirmation timeout.
    pub fn with_confirm_timeout(mut self, timeout_ms: u64) -> Self {
        self.confirm_timeout_ms = timeout_ms;
        self
    }
}
