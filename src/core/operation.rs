//! Operation log: the append-only record of agent operations.
//!
//! Every submitted operation is stored immutably with a logical timestamp
//! drawn from a single atomic counter, so ordering is deterministic and
//! independent of wall-clock time. Corrections are new operations, never
//! in-place edits.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::agent::AgentId;
use crate::error::{Error, Result};

/// Unique identifier for a logged operation.
///
/// Uses UUID v4 for generation and provides a short form display
/// for human-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub Uuid);

impl OperationId {
    /// Create a new unique operation identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OperationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Open key-value payload attached to an operation.
///
/// Keys are free-form, but a small set is reserved with documented meaning:
/// - `commit`: opaque commit identifier from the version-control boundary
/// - `description`: human-readable summary of the change
/// - `source`: tool or subsystem that produced the operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(pub BTreeMap<String, serde_json::Value>);

impl Metadata {
    /// Reserved key: commit identifier from the VCS boundary.
    pub const COMMIT: &'static str = "commit";
    /// Reserved key: human-readable change summary.
    pub const DESCRIPTION: &'static str = "description";
    /// Reserved key: originating tool or subsystem.
    pub const SOURCE: &'static str = "source";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single logged operation.
///
/// Immutable once stored: the log never mutates an operation in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Unique identifier for this operation.
    pub id: OperationId,
    /// Agent that submitted the operation.
    pub agent_id: AgentId,
    /// Free-form operation kind tag (e.g. "edit", "rename", "delete").
    pub kind: String,
    /// Resource paths the operation touches. Never empty.
    pub resources: Vec<String>,
    /// Arbitrary metadata payload.
    pub metadata: Metadata,
    /// Logical timestamp. Strictly increasing across all appends.
    pub timestamp: u64,
}

impl Operation {
    /// Check whether the operation touches the given resource.
    pub fn touches(&self, resource: &str) -> bool {
        self.resources.iter().any(|r| r == resource)
    }
}

/// Append-only store of operations with a per-resource recency index.
///
/// The index lets `recent_by_resource` return the last W matching
/// operations without scanning the full history.
#[derive(Debug, Default)]
pub struct OperationLog {
    operations: HashMap<OperationId, Operation>,
    /// Operation ids per resource, in append (timestamp) order.
    by_resource: HashMap<String, Vec<OperationId>>,
    /// Logical clock shared by all appends.
    clock: AtomicU64,
    count: usize,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation and return its generated id.
    ///
    /// Identity validation against the registry happens at the coordinator
    /// seam; the log only enforces payload validity.
    ///
    /// # Errors
    /// Returns `InvalidOperation` if `resources` is empty.
    pub fn append(
        &mut self,
        agent_id: AgentId,
        kind: impl Into<String>,
        resources: Vec<String>,
        metadata: Metadata,
    ) -> Result<OperationId> {
        if resources.is_empty() {
            return Err(Error::InvalidOperation(
                "affected resource list is empty".to_string(),
            ));
        }

        let id = OperationId::new();
        let timestamp = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        let op = Operation {
            id,
            agent_id,
            kind: kind.into(),
            resources,
            metadata,
            timestamp,
        };

        for resource in &op.resources {
            self.by_resource
                .entry(resource.clone())
                .or_default()
                .push(id);
        }
        self.operations.insert(id, op);
        self.count += 1;
        Ok(id)
    }

    /// Look up an operation by id.
    ///
    /// # Errors
    /// Returns `NotFound` if no such operation was logged.
    pub fn get(&self, id: &OperationId) -> Result<&Operation> {
        self.operations
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("operation {}", id)))
    }

    pub fn contains(&self, id: &OperationId) -> bool {
        self.operations.contains_key(id)
    }

    /// The most recent `window` operations touching `resource`, newest first.
    ///
    /// Bounded by the window, not the log size: this is a documented
    /// approximation that trades completeness for bounded latency.
    pub fn recent_by_resource(&self, resource: &str, window: usize) -> Vec<&Operation> {
        let Some(ids) = self.by_resource.get(resource) else {
            return Vec::new();
        };
        ids.iter()
            .rev()
            .take(window)
            .filter_map(|id| self.operations.get(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
