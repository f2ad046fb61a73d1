//! Core domain models for operation coordination.
//!
//! This module contains the fundamental data structures of the coordination
//! core: the operation log, the causal graph, and the conflict engine.

pub mod conflict;
pub mod graph;
pub mod operation;

pub use conflict::{check_conflicts, ConflictPolicy, ConflictReport, Resolution, Severity};
pub use graph::{CausalGraph, Vertex, VertexId, DEFAULT_SEARCH_BOUND};
pub use operation::{Metadata, Operation, OperationId, OperationLog};
