//! Converge: causal coordination core for concurrent AI agents sharing a
//! versioned workspace.
//!
//! Tracks operations submitted by independent agents, maintains a causal
//! DAG of those operations, and classifies conflicts between operations
//! touching overlapping resources by graph topology instead of wall-clock
//! timestamps.
//!
//! The [`coordinator::Coordinator`] facade is the main entry point. The
//! version-control engine and cryptographic primitives are external
//! collaborators behind the [`git`] and [`integrity`] boundaries.

pub mod agent;
pub mod config;
pub mod coordinator;
pub mod core;
pub mod error;
pub mod git;
pub mod integrity;

pub use agent::{AgentId, AgentRecord, AgentRegistry, AgentStatus};
pub use config::Config;
pub use coordinator::{ConflictCounts, Coordinator, CoordinatorEvent, Stats};
pub use crate::core::{
    check_conflicts, CausalGraph, ConflictPolicy, ConflictReport, Metadata, Operation,
    OperationId, OperationLog, Resolution, Severity, Vertex, VertexId,
};
pub use error::{Error, Result};
pub use integrity::{Blake3Integrity, Fingerprint, IntegrityProvider, NoopIntegrity};
