//! Batch execution against a backend.
//!
//! Batches run strictly in order; nodes within a batch run concurrently,
//! bounded by the configured submission limit. A consumer can therefore
//! always resolve its futures: every producer sits in a strictly earlier,
//! fully completed batch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use groundwork_core::{
    ActionNode, ArgValue, BackendHandle, FailureReason, GroundworkError, NodeId, OutputMap,
    OutputValue, Result, RunConfig,
};
use groundwork_journal::{JournalEntry, JournalStore, ResumedState};
use groundwork_planner::{DependencyGraph, ExecutionPlan};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::Backend;
use crate::events::{EventBus, ExecutionEventKind};
use crate::result::{NodeFailure, RunOutcome, RunResult};

/// Drives one planned run against a backend, recording every transition in
/// the journal.
pub struct Executor {
    run_id: Uuid,
    config: RunConfig,
    events: EventBus,
    cancel: watch::Receiver<bool>,
}

/// What one node execution produced.
enum NodeOutcome {
    Completed(NodeId, OutputMap),
    Failed(NodeId, FailureReason),
}

impl Executor {
    pub fn new(
        run_id: Uuid,
        config: RunConfig,
        events: EventBus,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            run_id,
            config,
            events,
            cancel,
        }
    }

    /// Execute the plan's batches in order.
    ///
    /// Nodes already Completed in `resumed` are skipped and their outputs
    /// seed the resolution map; nodes left in flight are re-queried by
    /// their recorded handle before any resubmission.
    pub async fn run(
        &self,
        graph: &DependencyGraph,
        plan: &ExecutionPlan,
        backend: Arc<dyn Backend>,
        journal: Arc<dyn JournalStore>,
        resumed: &ResumedState,
    ) -> Result<RunResult> {
        let mut completed = resumed.completed_outputs();
        let in_flight = resumed.in_flight_handles();
        let mut failures: Vec<NodeFailure> = Vec::new();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency_limit));

        let skipped = completed.len();
        if skipped > 0 {
            info!(run_id = %self.run_id, skipped, "resuming; completed nodes will not resubmit");
        }

        for batch in plan.batches() {
            if *self.cancel.borrow() {
                info!(run_id = %self.run_id, batch = batch.index, "cancelled; not scheduling further batches");
                break;
            }

            let mut pending: Vec<&ActionNode> = Vec::new();
            for id in &batch.node_ids {
                if completed.contains_key(id) {
                    debug!(node = %id, "already completed, skipping");
                    continue;
                }
                let node = graph.node(id).ok_or_else(|| GroundworkError::PlanningFailed {
                    message: format!("planned node {} missing from graph", id),
                })?;
                pending.push(node);
            }
            if pending.is_empty() {
                continue;
            }

            self.events.emit(ExecutionEventKind::BatchStarted {
                index: batch.index,
                size: pending.len(),
            });
            info!(
                run_id = %self.run_id,
                batch = batch.index,
                nodes = pending.len(),
                "batch started"
            );

            let tasks = pending.into_iter().map(|node| {
                let backend = backend.clone();
                let journal = journal.clone();
                let semaphore = semaphore.clone();
                let recorded_handle = in_flight.get(&node.id).cloned();
                let args = self.resolve_args(node, &completed);
                self.execute_node(node, args, backend, journal, semaphore, recorded_handle)
            });
            let outcomes = futures::future::join_all(tasks).await;

            let mut batch_failed = false;
            for outcome in outcomes {
                match outcome? {
                    NodeOutcome::Completed(id, outputs) => {
                        completed.insert(id, outputs);
                    }
                    NodeOutcome::Failed(id, reason) => {
                        batch_failed = true;
                        failures.push(NodeFailure {
                            node_id: id,
                            reason,
                        });
                    }
                }
            }

            if batch_failed {
                warn!(
                    run_id = %self.run_id,
                    batch = batch.index,
                    failures = failures.len(),
                    "batch failed; later batches will not start"
                );
                break;
            }

            self.events.emit(ExecutionEventKind::BatchCompleted {
                index: batch.index,
            });
        }

        let cancelled = *self.cancel.borrow();
        let outcome = if cancelled && (failures.is_empty() || all_cancelled(&failures)) {
            RunOutcome::Cancelled
        } else if failures.is_empty() {
            RunOutcome::Success
        } else {
            RunOutcome::Failed
        };

        self.events
            .emit(ExecutionEventKind::RunCompleted { outcome });

        Ok(RunResult {
            run_id: self.run_id,
            outcome,
            completed_outputs: completed,
            failures,
        })
    }

    /// Resolve a node's argument slots against completed outputs and the
    /// run configuration. Safe at this point by batch ordering.
    fn resolve_args(
        &self,
        node: &ActionNode,
        completed: &HashMap<NodeId, OutputMap>,
    ) -> Result<Vec<OutputValue>> {
        node.args
            .iter()
            .map(|arg| match arg {
                ArgValue::Literal { value } => Ok(value.clone()),
                ArgValue::Future { future } => future.resolve(completed),
                ArgValue::Account { account } => self
                    .config
                    .accounts
                    .get(account.index)
                    .map(|address| OutputValue::String(address.clone()))
                    .ok_or_else(|| GroundworkError::Submission {
                        node_id: node.id.clone(),
                        message: format!(
                            "account index {} out of range ({} configured)",
                            account.index,
                            self.config.accounts.len()
                        ),
                    }),
            })
            .collect()
    }

    /// Drive a single node to a terminal state for this attempt.
    ///
    /// Journal writes happen at every transition; an `Err` here means
    /// journaling itself failed and the run must stop.
    async fn execute_node(
        &self,
        node: &ActionNode,
        args: Result<Vec<OutputValue>>,
        backend: Arc<dyn Backend>,
        journal: Arc<dyn JournalStore>,
        semaphore: Arc<Semaphore>,
        recorded_handle: Option<BackendHandle>,
    ) -> Result<NodeOutcome> {
        let args = match args {
            Ok(args) => args,
            Err(err) => {
                let reason = FailureReason::Submission {
                    message: err.to_string(),
                };
                return self.fail_node(&journal, node, reason).await;
            }
        };

        if *self.cancel.borrow() {
            return self.fail_node(&journal, node, FailureReason::Cancelled).await;
        }

        // Resume path: ask the backend about the recorded handle before
        // even considering a resubmission.
        let mut handle = None;
        if let Some(recorded) = recorded_handle {
            match backend.query_status(&recorded).await {
                Ok(state) if state.is_in_flight() || state.is_terminal() => {
                    debug!(node = %node.id, handle = %recorded, ?state, "recovered in-flight handle");
                    handle = Some(recorded);
                }
                Ok(state) => {
                    debug!(node = %node.id, ?state, "backend never accepted recorded handle; resubmitting");
                }
                Err(err) => {
                    debug!(node = %node.id, error = %err, "status query failed; resubmitting");
                }
            }
        }

        let handle = match handle {
            Some(handle) => handle,
            None => {
                let permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| GroundworkError::Internal("semaphore closed".to_string()))?;
                let submitted = backend.submit(node, &args).await;
                drop(permit);

                match submitted {
                    Ok(handle) => {
                        // Journal the handle before confirmation so a crash
                        // here can re-query instead of double-submitting.
                        journal
                            .append(JournalEntry::submitted(
                                self.run_id,
                                node.id.clone(),
                                handle.clone(),
                            ))
                            .await?;
                        self.events
                            .emit_node(node.id.clone(), ExecutionEventKind::NodeSubmitted);
                        debug!(node = %node.id, %handle, "submitted");
                        handle
                    }
                    Err(err) => {
                        let reason = FailureReason::Submission {
                            message: err.to_string(),
                        };
                        return self.fail_node(&journal, node, reason).await;
                    }
                }
            }
        };

        let timeout = Duration::from_millis(self.config.confirm_timeout_ms);
        let confirmation = tokio::time::timeout(timeout, backend.confirm(&handle, timeout)).await;

        let outputs = match confirmation {
            Err(_) => {
                let reason = FailureReason::TimedOut {
                    duration_ms: self.config.confirm_timeout_ms,
                };
                return self.fail_node(&journal, node, reason).await;
            }
            Ok(Err(err)) => {
                let reason = match err {
                    GroundworkError::Timeout { duration_ms, .. } => {
                        FailureReason::TimedOut { duration_ms }
                    }
                    GroundworkError::Reverted { reason, .. } => {
                        FailureReason::Reverted { reason }
                    }
                    other => FailureReason::Reverted {
                        reason: other.to_string(),
                    },
                };
                return self.fail_node(&journal, node, reason).await;
            }
            Ok(Ok(outputs)) => outputs,
        };

        journal
            .append(JournalEntry::transition(
                self.run_id,
                node.id.clone(),
                groundwork_core::NodeState::Confirmed,
            ))
            .await?;
        self.events
            .emit_node(node.id.clone(), ExecutionEventKind::NodeConfirmed);

        journal
            .append(JournalEntry::completed(
                self.run_id,
                node.id.clone(),
                outputs.clone(),
            ))
            .await?;
        self.events
            .emit_node(node.id.clone(), ExecutionEventKind::NodeCompleted);
        info!(node = %node.id, "completed");

        Ok(NodeOutcome::Completed(node.id.clone(), outputs))
    }

    async fn fail_node(
        &self,
        journal: &Arc<dyn JournalStore>,
        node: &ActionNode,
        reason: FailureReason,
    ) -> Result<NodeOutcome> {
        warn!(node = %node.id, ?reason, "node failed");
        journal
            .append(JournalEntry::failed(
                self.run_id,
                node.id.clone(),
                reason.clone(),
            ))
            .await?;
        self.events.emit_node(
            node.id.clone(),
            ExecutionEventKind::NodeFailed {
                reason: reason.clone(),
            },
        );
        Ok(NodeOutcome::Failed(node.id.clone(), reason))
    }
}

fn all_cancelled(failures: &[NodeFailure]) -> bool {
    failures
        .iter()
        .all(|failure| failure.reason == FailureReason::Cancelled)
}
