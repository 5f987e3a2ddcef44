//! Module declarations and the builder API.
//!
//! A Module is a named, immutable collection of action declarations
//! produced by a builder closure. Declaration is a pure phase: nothing here
//! touches a backend, which is what makes planning, dry-run validation, and
//! resume possible.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{GroundworkError, Result};
use crate::future::FutureValue;
use crate::node::{ActionKind, ActionNode, ArgValue, NodeId};
use crate::types::AccountRef;

/// Options for a single declaration.
#[derive(Debug, Clone, Default)]
pub struct DeclareOptions {
    /// Which identity slot submits this node (defaults to the backend's
    /// notion of a default account).
    pub account: Option<AccountRef>,
}

impl DeclareOptions {
    /// Declare with an explicit submitting account.
    pub fn from_account(account: AccountRef) -> Self {
        Self {
            account: Some(account),
        }
    }
}

/// A named, immutable collection of action declarations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    name: String,
    nodes: Vec<ActionNode>,
    outputs: HashMap<String, FutureValue>,
}

impl Module {
    /// Build a module by running a declaration closure against a fresh
    /// builder. Duplicate declarations fail here, before any planning.
    pub fn build<F>(name: impl Into<String>, declare: F) -> Result<Module>
    where
        F: FnOnce(&mut ModuleBuilder) -> Result<()>,
    {
        let mut builder = ModuleBuilder::new(name.into());
        declare(&mut builder)?;
        Ok(builder.finish())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> &[ActionNode] {
        &self.nodes
    }

    /// The named futures the builder exported.
    pub fn outputs(&self) -> &HashMap<String, FutureValue> {
        &self.outputs
    }

    /// Content hash binding a journal to this exact module revision.
    ///
    /// Covers the ordered node declarations; exported output names do not
    /// affect execution and are excluded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        for node in &self.nodes {
            // ActionNode serialization is stable: struct fields in order,
            // args as an ordered list.
            let encoded = serde_json::to_string(node).unwrap_or_default();
            hasher.update(encoded.as_bytes());
        }
        hex_encode(hasher.finalize())
    }
}

fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
}

/// Sequential declaration context handed to the builder closure.
#[derive(Debug)]
pub struct ModuleBuilder {
    name: String,
    nodes: Vec<ActionNode>,
    declared: HashSet<NodeId>,
    outputs: HashMap<String, FutureValue>,
}

impl ModuleBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            nodes: Vec::new(),
            declared: HashSet::new(),
            outputs: HashMap::new(),
        }
    }

    /// Register an action node and return the future of its default output.
    ///
    /// Fails with [`GroundworkError::DuplicateNodeId`] if (local name, kind)
    /// collides with an earlier declaration in this module.
    pub fn declare_action(
        &mut self,
        kind: ActionKind,
        local_name: impl Into<String>,
        args: Vec<ArgValue>,
        options: DeclareOptions,
    ) -> Result<FutureValue> {
        let local_name = local_name.into();
        let id = NodeId::new(&self.name, &local_name, kind.label());

        if !self.declared.insert(id.clone()) {
            return Err(GroundworkError::DuplicateNodeId { id });
        }

        self.nodes.push(ActionNode {
            id: id.clone(),
            module: self.name.clone(),
            local_name,
            kind,
            args,
            account: options.account,
        });

        Ok(FutureValue::new(id))
    }

    /// Declare a resource creation.
    pub fn create(&mut self, name: impl Into<String>, args: Vec<ArgValue>) -> Result<FutureValue> {
        self.declare_action(ActionKind::Create, name, args, DeclareOptions::default())
    }

    /// Declare a call against an existing resource.
    pub fn call(&mut self, name: impl Into<String>, args: Vec<ArgValue>) -> Result<FutureValue> {
        self.declare_action(ActionKind::Call, name, args, DeclareOptions::default())
    }

    /// Declare a read of an existing resource.
    pub fn read(&mut self, name: impl Into<String>, args: Vec<ArgValue>) -> Result<FutureValue> {
        self.declare_action(ActionKind::Read, name, args, DeclareOptions::default())
    }

    /// Resolve an identity slot without creating a node.
    pub fn get_account(&self, index: usize) -> AccountRef {
        AccountRef::new(index)
    }

    /// Export a named future as a module output.
    pub fn output(&mut self, name: impl Into<String>, future: FutureValue) {
        self.outputs.insert(name.into(), future);
    }

    fn finish(self) -> Module {
        Module {
            name: self.name,
            nodes: self.nodes,
            outputs: self.outputs,
        }
    }
}
