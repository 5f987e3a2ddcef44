//! The Run front door.
//!
//! A Run is one end-to-end execution of a module against one backend and
//! target: build the graph, plan batches, execute, archive the journal on
//! terminal success. Build and planning errors surface here synchronously,
//! before any backend call.

use std::sync::Arc;

use groundwork_core::{GroundworkError, Module, Result, RunConfig};
use groundwork_journal::{JournalEntry, JournalStore, ResumedState};
use groundwork_planner::DependencyGraph;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::Backend;
use crate::events::{EventBus, ExecutionEvent, ExecutionEventKind};
use crate::executor::Executor;
use crate::result::{RunOutcome, RunResult};

/// Handle for signalling run-level cancellation.
///
/// Cancellation stops scheduling of not-yet-submitted nodes; in-flight
/// backend calls run to completion.
#[derive(Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.sender.send(true);
    }
}

/// One end-to-end execution of a module against a backend.
pub struct Run {
    run_id: Uuid,
    module: Module,
    config: RunConfig,
    backend: Arc<dyn Backend>,
    journal: Arc<dyn JournalStore>,
    events: EventBus,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl Run {
    pub fn new(
        module: Module,
        config: RunConfig,
        backend: Arc<dyn Backend>,
        journal: Arc<dyn JournalStore>,
    ) -> Self {
        let run_id = Uuid::new_v4();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            run_id,
            module,
            config,
            backend,
            journal,
            events: EventBus::new(run_id),
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Subscribe to this run's execution events.
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.events.subscribe()
    }

    /// A cloneable handle that cancels this run.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            sender: self.cancel_tx.clone(),
        }
    }

    /// Execute the module from scratch.
    pub async fn execute(&self) -> Result<RunResult> {
        self.journal
            .append(JournalEntry::run_started(
                self.run_id,
                self.module.fingerprint(),
                self.config.target.clone(),
            ))
            .await?;

        self.drive(ResumedState::default()).await
    }

    /// Resume from whatever the journal recorded.
    ///
    /// Completed nodes are not resubmitted; nodes left in flight are
    /// re-queried against the backend by their recorded handle. Fails with
    /// `FingerprintMismatch` if the journal belongs to a different module
    /// revision or target.
    pub async fn resume(&self) -> Result<RunResult> {
        let entries = self.journal.read_all().await?;
        let resumed = ResumedState::replay(&entries);

        if resumed.is_empty() {
            info!(run_id = %self.run_id, "journal empty; starting fresh");
            return self.execute().await;
        }

        let current = self.module.fingerprint();
        match resumed.module_fingerprint() {
            Some(recorded) if recorded == current => {}
            Some(recorded) => {
                return Err(GroundworkError::FingerprintMismatch {
                    recorded: recorded.to_string(),
                    current,
                });
            }
            None => {
                warn!(run_id = %self.run_id, "journal has node entries but no run header");
            }
        }
        if let Some(recorded) = resumed.target() {
            if recorded != self.config.target {
                return Err(GroundworkError::FingerprintMismatch {
                    recorded: format!("target {}", recorded),
                    current: format!("target {}", self.config.target),
                });
            }
        }

        // Keep appending under the original run identity.
        let run_id = resumed.run_id().unwrap_or(self.run_id);

        if resumed.is_finalized() {
            info!(run_id = %run_id, "journal already finalized; nothing to do");
            return Ok(RunResult {
                run_id,
                outcome: RunOutcome::Success,
                completed_outputs: resumed.completed_outputs(),
                failures: Vec::new(),
            });
        }

        self.drive_as(run_id, resumed).await
    }

    async fn drive(&self, resumed: ResumedState) -> Result<RunResult> {
        self.drive_as(self.run_id, resumed).await
    }

    async fn drive_as(&self, run_id: Uuid, resumed: ResumedState) -> Result<RunResult> {
        // Pure phases first: any error here reaches the caller before a
        // single backend call.
        let graph = DependencyGraph::build(&self.module)?;
        let plan = groundwork_planner::plan(&graph)?;

        info!(
            run_id = %run_id,
            module = self.module.name(),
            target = %self.config.target,
            nodes = graph.nodes().len(),
            batches = plan.batches().len(),
            "run starting"
        );
        self.events.emit(ExecutionEventKind::RunStarted);

        let executor = Executor::new(
            run_id,
            self.config.clone(),
            self.events.clone(),
            self.cancel_rx.clone(),
        );
        let result = executor
            .run(
                &graph,
                &plan,
                self.backend.clone(),
                self.journal.clone(),
                &resumed,
            )
            .await?;

        if result.is_success() {
            self.journal
                .append(JournalEntry::run_finalized(run_id))
                .await?;
            self.journal.finalize().await?;
            info!(run_id = %run_id, "run succeeded; journal archived");
        } else {
            warn!(
                run_id = %run_id,
                outcome = ?result.outcome,
                failures = result.failures.len(),
                "run did not complete"
            );
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{Script, ScriptedBackend};
    use groundwork_core::{NodeId, NodeState, OutputMap};
    use groundwork_journal::InMemoryJournal;
    use serde_json::json;

    fn destore_module() -> Module {
        // Mirrors the canonical two-contract deployment: a token, then a
        // store taking (signer, token address).
        Module::build("destore", |m| {
            let token = m.create("token", vec![])?;
            let signer = m.get_account(1);
            let store = m.create("store", vec![signer.into(), token.clone().into()])?;
            m.output("token", token);
            m.output("store", store);
            Ok(())
        })
        .unwrap()
    }

    fn id(module: &Module, name: &str) -> NodeId {
        module
            .nodes()
            .iter()
            .find(|n| n.local_name == name)
            .map(|n| n.id.clone())
            .unwrap()
    }

    fn config() -> RunConfig {
        RunConfig::for_target("testnet")
            .with_accounts(vec!["0xdeployer".to_string(), "0xsigner".to_string()])
    }

    #[tokio::test]
    async fn test_end_to_end_two_contract_run() {
        let module = destore_module();
        let token = id(&module, "token");
        let store = id(&module, "store");

        let backend = Arc::new(ScriptedBackend::new());
        backend.script(token.clone(), Script::Complete(json!("0xtoken")));
        backend.script(store.clone(), Script::Complete(json!("0xstore")));

        let run = Run::new(
            module.clone(),
            config(),
            backend.clone(),
            Arc::new(InMemoryJournal::new(Uuid::new_v4())),
        );
        let result = run.execute().await.unwrap();

        assert!(result.is_success());
        let outputs = result.module_outputs(&module).unwrap();
        assert_eq!(outputs["token"], json!("0xtoken"));
        assert_eq!(outputs["store"], json!("0xstore"));

        // the store saw the resolved signer and token address
        let seen = backend.seen_args.lock().unwrap();
        assert_eq!(seen[&store], vec![json!("0xsigner"), json!("0xtoken")]);
    }

    #[tokio::test]
    async fn test_build_errors_surface_before_backend_calls() {
        let module = destore_module();
        let backend = Arc::new(ScriptedBackend::new());

        // duplicate declaration never reaches Run at all
        let build_result = Module::build("dup", |m| {
            m.create("token", vec![])?;
            m.create("token", vec![])?;
            Ok(())
        });
        assert!(matches!(
            build_result,
            Err(GroundworkError::DuplicateNodeId { .. })
        ));

        // and a well-formed module makes no backend call until execute
        let _run = Run::new(
            module,
            config(),
            backend.clone(),
            Arc::new(InMemoryJournal::new(Uuid::new_v4())),
        );
        assert_eq!(backend.submits(), 0);
    }

    #[tokio::test]
    async fn test_success_archives_journal() {
        let journal = Arc::new(InMemoryJournal::new(Uuid::new_v4()));
        let run = Run::new(
            destore_module(),
            config(),
            Arc::new(ScriptedBackend::new()),
            journal.clone(),
        );

        run.execute().await.unwrap();

        assert!(journal.is_closed().await);
        let entries = journal.read_all().await.unwrap();
        assert!(matches!(entries.first(), Some(JournalEntry::RunStarted { .. })));
        assert!(matches!(entries.last(), Some(JournalEntry::RunFinalized { .. })));
    }

    #[tokio::test]
    async fn test_failed_run_leaves_journal_open_for_resume() {
        let module = destore_module();
        let token = id(&module, "token");

        let backend = Arc::new(ScriptedBackend::new());
        backend.script(token.clone(), Script::RejectSubmit("gas".to_string()));

        let journal = Arc::new(InMemoryJournal::new(Uuid::new_v4()));
        let run = Run::new(module, config(), backend, journal.clone());
        let result = run.execute().await.unwrap();

        assert_eq!(result.outcome, RunOutcome::Failed);
        assert!(!journal.is_closed().await);
    }

    #[tokio::test]
    async fn test_resume_after_partial_failure_completes_run() {
        let module = destore_module();
        let token = id(&module, "token");
        let store = id(&module, "store");

        // first attempt: token deploys, store reverts
        let backend = Arc::new(ScriptedBackend::new());
        backend.script(token.clone(), Script::Complete(json!("0xtoken")));
        backend.script(store.clone(), Script::Revert("flaky".to_string()));

        let journal = Arc::new(InMemoryJournal::new(Uuid::new_v4()));
        let run = Run::new(module.clone(), config(), backend.clone(), journal.clone());
        let first = run.execute().await.unwrap();
        assert_eq!(first.outcome, RunOutcome::Failed);

        // second attempt against the same journal: only the store resubmits
        backend.script(store.clone(), Script::Complete(json!("0xstore")));
        let submits_before = backend.submits();

        let rerun = Run::new(module.clone(), config(), backend.clone(), journal.clone());
        let second = rerun.resume().await.unwrap();

        assert!(second.is_success());
        assert_eq!(backend.submits() - submits_before, 1);
        assert_eq!(
            second.module_outputs(&module).unwrap()["token"],
            json!("0xtoken")
        );
    }

    #[tokio::test]
    async fn test_idempotent_resume_makes_no_backend_calls() {
        let module = destore_module();
        let token = id(&module, "token");
        let store = id(&module, "store");
        let run_id = Uuid::new_v4();

        let mut token_out = OutputMap::new();
        token_out.insert("result".to_string(), json!("0xtoken"));
        let mut store_out = OutputMap::new();
        store_out.insert("result".to_string(), json!("0xstore"));

        let entries = vec![
            JournalEntry::run_started(run_id, module.fingerprint(), "testnet".to_string()),
            JournalEntry::completed(run_id, token.clone(), token_out),
            JournalEntry::completed(run_id, store.clone(), store_out),
        ];
        let journal = Arc::new(InMemoryJournal::with_entries(run_id, entries));
        let backend = Arc::new(ScriptedBackend::new());

        let run = Run::new(module.clone(), config(), backend.clone(), journal);
        let result = run.resume().await.unwrap();

        assert!(result.is_success());
        assert_eq!(backend.submits(), 0);
        assert_eq!(
            result.module_outputs(&module).unwrap()["token"],
            json!("0xtoken")
        );
    }

    #[tokio::test]
    async fn test_resume_rejects_changed_module() {
        let module = destore_module();
        let run_id = Uuid::new_v4();
        let entries = vec![JournalEntry::run_started(
            run_id,
            "somebody-elses-fingerprint".to_string(),
            "testnet".to_string(),
        )];
        let journal = Arc::new(InMemoryJournal::with_entries(run_id, entries));

        let run = Run::new(
            module,
            config(),
            Arc::new(ScriptedBackend::new()),
            journal,
        );
        let err = run.resume().await.unwrap_err();
        assert!(matches!(err, GroundworkError::FingerprintMismatch { .. }));
    }

    #[tokio::test]
    async fn test_resume_rejects_changed_target() {
        let module = destore_module();
        let run_id = Uuid::new_v4();
        let entries = vec![JournalEntry::run_started(
            run_id,
            module.fingerprint(),
            "mainnet".to_string(),
        )];
        let journal = Arc::new(InMemoryJournal::with_entries(run_id, entries));

        let run = Run::new(
            module,
            config(), // targets "testnet"
            Arc::new(ScriptedBackend::new()),
            journal,
        );
        let err = run.resume().await.unwrap_err();
        assert!(matches!(err, GroundworkError::FingerprintMismatch { .. }));
    }

    #[tokio::test]
    async fn test_events_trace_a_successful_run() {
        let module = destore_module();
        let run = Run::new(
            module,
            config(),
            Arc::new(ScriptedBackend::new()),
            Arc::new(InMemoryJournal::new(Uuid::new_v4())),
        );
        let mut events = run.subscribe();

        run.execute().await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(event.kind);
        }

        assert_eq!(kinds.first(), Some(&ExecutionEventKind::RunStarted));
        assert_eq!(
            kinds.last(),
            Some(&ExecutionEventKind::RunCompleted {
                outcome: RunOutcome::Success
            })
        );
        assert!(kinds.contains(&ExecutionEventKind::BatchStarted { index: 0, size: 1 }));
        assert!(kinds.contains(&ExecutionEventKind::BatchCompleted { index: 1 }));
    }

    #[tokio::test]
    async fn test_cancel_stops_scheduling() {
        let module = destore_module();
        let backend = Arc::new(ScriptedBackend::new());
        let run = Run::new(
            module,
            config(),
            backend.clone(),
            Arc::new(InMemoryJournal::new(Uuid::new_v4())),
        );

        run.cancel_handle().cancel();
        let result = run.execute().await.unwrap();

        assert_eq!(result.outcome, RunOutcome::Cancelled);
        assert_eq!(backend.submits(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_nodes_are_journaled_for_resume() {
        // Cancel mid-run: batch 1 completes, then the store node must not
        // be scheduled. Cancellation between batches is racy to stage from
        // outside, so cancel before execute and check journal contents.
        let module = destore_module();
        let journal = Arc::new(InMemoryJournal::new(Uuid::new_v4()));
        let run = Run::new(
            module,
            config(),
            Arc::new(ScriptedBackend::new()),
            journal.clone(),
        );

        run.cancel_handle().cancel();
        run.execute().await.unwrap();

        let entries = journal.read_all().await.unwrap();
        // only the run header was written; no node ever transitioned
        assert_eq!(entries.len(), 1);
        assert!(matches!(entries[0], JournalEntry::RunStarted { .. }));
    }

    #[tokio::test]
    async fn test_resumed_in_flight_node_recovers_via_status_query() {
        let module = destore_module();
        let token = id(&module, "token");
        let run_id = Uuid::new_v4();

        let backend = Arc::new(ScriptedBackend::new());
        backend.script(token.clone(), Script::Complete(json!("0xtoken")));
        backend.know_handle("tx:123", token.clone(), NodeState::Submitted);

        let entries = vec![
            JournalEntry::run_started(run_id, module.fingerprint(), "testnet".to_string()),
            JournalEntry::submitted(
                run_id,
                token.clone(),
                groundwork_core::BackendHandle::new("tx:123"),
            ),
        ];
        let journal = Arc::new(InMemoryJournal::with_entries(run_id, entries));

        let run = Run::new(module, config(), backend.clone(), journal);
        let result = run.resume().await.unwrap();

        assert!(result.is_success());
        // the token node confirmed via its recorded handle; only the store
        // was newly submitted
        assert_eq!(backend.submits(), 1);
    }
}
