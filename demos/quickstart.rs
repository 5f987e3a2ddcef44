//! Quick Start Example
//!
//! Declares the canonical two-contract module (a token, then a store that
//! takes a signer and the token's address), plans it, and runs it against a
//! small simulated backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use groundwork_runner::prelude::*;
use serde_json::json;
use uuid::Uuid;

/// Simulated backend: every submission "deploys" after a short delay and
/// yields a fake address.
#[derive(Default)]
struct SimBackend {
    next_address: AtomicU64,
}

#[async_trait]
impl Backend for SimBackend {
    async fn submit(
        &self,
        node: &ActionNode,
        resolved_args: &[OutputValue],
    ) -> Result<BackendHandle> {
        println!("  📤 submit {} args={:?}", node.id, resolved_args);
        Ok(BackendHandle::new(format!("tx:{}", node.id)))
    }

    async fn confirm(&self, handle: &BackendHandle, _timeout: Duration) -> Result<OutputMap> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let address = format!("0x{:040x}", self.next_address.fetch_add(1, Ordering::SeqCst) + 1);
        println!("  ✅ confirm {} -> {}", handle, address);
        let mut outputs = OutputMap::new();
        outputs.insert("result".to_string(), json!(address));
        Ok(outputs)
    }

    async fn query_status(&self, _handle: &BackendHandle) -> Result<NodeState> {
        Ok(NodeState::Pending)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 1. Declare what to deploy
    let module = Module::build("destore", |m| {
        let token = m.create("token", vec![])?;
        let signer = m.get_account(1);
        let store = m.create("store", vec![signer.into(), token.clone().into()])?;
        m.output("token", token);
        m.output("store", store);
        Ok(())
    })?;

    // 2. Configure the run explicitly: accounts, target, limits
    let config = RunConfig::for_target("simnet")
        .with_accounts(vec!["0xdeployer".to_string(), "0xsigner".to_string()])
        .with_concurrency(4)
        .with_confirm_timeout(5_000);

    let journal = Arc::new(InMemoryJournal::new(Uuid::new_v4()));
    let run = Run::new(module.clone(), config, Arc::new(SimBackend::default()), journal);

    // 3. Watch progress while executing
    let mut events = run.subscribe();
    let watcher = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let ExecutionEventKind::BatchStarted { index, size } = event.kind {
                println!("🚀 batch {} started ({} node(s))", index, size);
            }
        }
    });

    let result = run.execute().await?;
    watcher.abort();

    // 4. Read back the named module outputs
    println!("outcome: {:?}", result.outcome);
    for (name, value) in result.module_outputs(&module)? {
        println!("  {} = {}", name, value);
    }

    Ok(())
}
