//! The resource backend seam.
//!
//! The engine never talks to a network directly; everything effectful goes
//! through this trait. Implementations wrap whatever actually creates the
//! resources (an RPC endpoint, a cloud API, a test double).

use std::time::Duration;

use async_trait::async_trait;
use groundwork_core::{ActionNode, BackendHandle, NodeState, OutputMap, OutputValue, Result};

/// External system performing the declared work.
///
/// Backend operations are assumed non-cancellable once submitted; the
/// executor never aborts an in-flight call.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Submit a node with fully resolved arguments. Returns the
    /// backend-assigned identifier as soon as the submission is accepted.
    async fn submit(
        &self,
        node: &ActionNode,
        resolved_args: &[OutputValue],
    ) -> Result<BackendHandle>;

    /// Wait for confirmation of a submitted operation and return its
    /// outputs keyed by selector. Fails with `Reverted` or `Timeout`.
    async fn confirm(&self, handle: &BackendHandle, timeout: Duration) -> Result<OutputMap>;

    /// Current state of a previously submitted operation, used on resume
    /// to avoid double-submission.
    async fn query_status(&self, handle: &BackendHandle) -> Result<NodeState>;
}
