//! Action node declarations.
//!
//! An ActionNode is one declared unit of backend work with explicit inputs.
//! Nodes are immutable after declaration; all mutation during a run happens
//! in the journal, never on the node itself.

use serde::{Deserialize, Serialize};

use crate::future::FutureValue;
use crate::types::AccountRef;

/// Stable identity of a node: derived from (module name, local name, kind)
/// so that identical declarations produce identical ids across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Derive a node id from its declaration coordinates.
    pub fn new(module: &str, local_name: &str, kind: &str) -> Self {
        Self(format!("{}/{}#{}", module, local_name, kind))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of work a node performs against the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Create a new remote resource.
    Create,
    /// Invoke an operation on an existing resource.
    Call,
    /// Read a value from an existing resource.
    Read,
    /// Backend-specific variant (e.g., a contract library link).
    Custom(String),
}

impl ActionKind {
    /// Stable lowercase label used in node id derivation.
    pub fn label(&self) -> &str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Call => "call",
            ActionKind::Read => "read",
            ActionKind::Custom(name) => name,
        }
    }
}

/// One argument slot of a node: a literal, a reference to another node's
/// not-yet-known output, or an identity slot from the run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArgValue {
    /// A value known at declaration time.
    Literal { value: serde_json::Value },
    /// Another node's output, resolved by batch ordering at execution time.
    Future { future: FutureValue },
    /// An identity slot resolved from run configuration.
    Account { account: AccountRef },
}

impl ArgValue {
    /// Build a literal slot from any serializable value.
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        ArgValue::Literal { value: value.into() }
    }

    /// The future behind this slot, if it is one.
    pub fn as_future(&self) -> Option<&FutureValue> {
        match self {
            ArgValue::Future { future } => Some(future),
            _ => None,
        }
    }
}

impl From<FutureValue> for ArgValue {
    fn from(future: FutureValue) -> Self {
        ArgValue::Future { future }
    }
}

impl From<AccountRef> for ArgValue {
    fn from(account: AccountRef) -> Self {
        ArgValue::Account { account }
    }
}

/// A single declared unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionNode {
    /// Stable identity within the run.
    pub id: NodeId,

    /// The module this node was declared in.
    pub module: String,

    /// The name the builder declared it under.
    pub local_name: String,

    /// What the backend is asked to do.
    pub kind: ActionKind,

    /// Ordered argument slots.
    pub args: Vec<ArgValue>,

    /// Optional identity selector (e.g., which signer submits this node).
    pub account: Option<AccountRef>,
}

impl ActionNode {
    /// Iterate the future-valued argument slots of this node.
    pub fn future_args(&self) -> impl Iterator<Item = &FutureValue> {
        self.args.iter().filter_map(|arg| arg.as_future())
    }
}
