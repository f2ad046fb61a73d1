//! Causal graph store: the DAG of operation history.
//!
//! Each logged operation maps to exactly one vertex. Edges point from a
//! vertex to its causal parents, so the graph is acyclic by construction:
//! parents must already exist at insertion time, and edges are only ever
//! added from the new vertex to existing ones.
//!
//! Search directions, documented once here and relied on everywhere:
//! - `is_ancestor(a, b)` walks upward from `b` along parent edges and
//!   returns true when it reaches `a`.
//! - `distance(a, b)` is the shortest chain of parent links connecting the
//!   two vertices ignoring edge direction, so concurrent vertices joined
//!   through a common ancestor still have a finite distance. Disconnected
//!   vertices have none.
//!
//! Both searches are depth-bounded. Exceeding the bound degrades to "no
//! relationship found" rather than an error.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

use crate::core::operation::OperationId;
use crate::error::{Error, Result};

/// Default depth bound for ancestor/distance searches.
///
/// Large enough to cover the default conflict window; configurable via
/// `Config::distance_search_bound`.
pub const DEFAULT_SEARCH_BOUND: usize = 256;

/// Unique identifier for a vertex in the causal graph.
///
/// Derived from the operation id it represents, so the operation-to-vertex
/// mapping is a pure lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(pub Uuid);

impl From<OperationId> for VertexId {
    fn from(op: OperationId) -> Self {
        Self(op.0)
    }
}

impl std::fmt::Display for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single vertex in the causal DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    /// Unique identifier for this vertex.
    pub id: VertexId,
    /// The operation this vertex represents.
    pub operation: OperationId,
    /// Causal predecessors. Empty for root vertices.
    pub parents: Vec<VertexId>,
    /// Creation order index, strictly increasing per insertion.
    pub order: u64,
}

/// The causal DAG of operations with an incrementally maintained tip set.
///
/// Tips are the current frontier: vertices with no recorded successor.
/// Vertex insertion and the tip update happen as one unit under `&mut self`,
/// so readers never observe a half-applied insert.
pub struct CausalGraph {
    /// The underlying directed graph. Edges point child -> parent.
    graph: DiGraph<Vertex, ()>,
    /// Index mapping from VertexId to NodeIndex for fast lookups.
    index: HashMap<VertexId, NodeIndex>,
    /// Operation-to-vertex lookup table.
    by_operation: HashMap<OperationId, VertexId>,
    /// Current frontier.
    tips: HashSet<VertexId>,
    /// Depth bound for all reachability searches.
    search_bound: usize,
    next_order: u64,
}

impl CausalGraph {
    pub fn new(search_bound: usize) -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            by_operation: HashMap::new(),
            tips: HashSet::new(),
            search_bound,
            next_order: 0,
        }
    }

    /// Insert a vertex for an operation.
    ///
    /// With `explicit_parents` of `None`, the parents default to a snapshot
    /// of the current tip set, taken atomically with the insert. The tip set
    /// is updated in the same step: all parents leave the frontier, the new
    /// vertex joins it.
    ///
    /// # Errors
    /// - `DuplicateVertex` if the operation already has a vertex.
    /// - `DanglingParent` if any supplied parent is unknown.
    pub fn insert_vertex(
        &mut self,
        operation: OperationId,
        explicit_parents: Option<Vec<VertexId>>,
    ) -> Result<VertexId> {
        if self.by_operation.contains_key(&operation) {
            return Err(Error::DuplicateVertex(operation.to_string()));
        }

        let parents = match explicit_parents {
            Some(parents) => {
                for parent in &parents {
                    if !self.index.contains_key(parent) {
                        return Err(Error::DanglingParent(parent.to_string()));
                    }
                }
                parents
            }
            None => {
                // Snapshot tips in creation order so parent lists are stable
                let mut tips: Vec<VertexId> = self.tips.iter().copied().collect();
                tips.sort_by_key(|id| self.get(id).map(|v| v.order).unwrap_or(u64::MAX));
                tips
            }
        };

        let id = VertexId::from(operation);
        let vertex = Vertex {
            id,
            operation,
            parents: parents.clone(),
            order: self.next_order,
        };
        self.next_order += 1;

        let node = self.graph.add_node(vertex);
        self.index.insert(id, node);
        self.by_operation.insert(operation, id);

        for parent in &parents {
            // Parents were validated above; tips are always known vertices
            if let Some(&parent_node) = self.index.get(parent) {
                self.graph.add_edge(node, parent_node, ());
            }
            self.tips.remove(parent);
        }
        self.tips.insert(id);

        Ok(id)
    }

    /// Snapshot of the current tip set.
    ///
    /// A copy, not a live view: callers cannot observe a torn state
    /// mid-update.
    pub fn tips(&self) -> HashSet<VertexId> {
        self.tips.clone()
    }

    /// Get a vertex by id.
    pub fn get(&self, id: &VertexId) -> Option<&Vertex> {
        self.index
            .get(id)
            .and_then(|&node| self.graph.node_weight(node))
    }

    /// Resolve the vertex for an operation, if one was inserted.
    pub fn vertex_for_operation(&self, operation: &OperationId) -> Option<VertexId> {
        self.by_operation.get(operation).copied()
    }

    pub fn contains(&self, id: &VertexId) -> bool {
        self.index.contains_key(id)
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// True if `a` is a causal ancestor of `b`.
    ///
    /// Bounded breadth-first search upward from `b` along parent edges.
    /// Fails closed: unknown ids or an exhausted depth bound yield false,
    /// since absence is a legitimate "no relationship" answer.
    pub fn is_ancestor(&self, a: &VertexId, b: &VertexId) -> bool {
        if a == b {
            return false;
        }
        let (Some(&target), Some(&start)) = (self.index.get(a), self.index.get(b)) else {
            return false;
        };

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back((start, 0usize));

        while let Some((node, depth)) = queue.pop_front() {
            if depth >= self.search_bound {
                continue;
            }
            for parent in self.graph.neighbors_directed(node, Direction::Outgoing) {
                if parent == target {
                    return true;
                }
                if visited.insert(parent) {
                    queue.push_back((parent, depth + 1));
                }
            }
        }
        false
    }

    /// Shortest number of parent links connecting `a` and `b`, ignoring
    /// direction, or `None` if they are disconnected or the search bound
    /// is exhausted first.
    pub fn distance(&self, a: &VertexId, b: &VertexId) -> Option<u64> {
        if a == b {
            return Some(0);
        }
        let (Some(&target), Some(&start)) = (self.index.get(a), self.index.get(b)) else {
            return None;
        };

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back((start, 0u64));

        while let Some((node, depth)) = queue.pop_front() {
            if depth as usize >= self.search_bound {
                continue;
            }
            for neighbor in self.graph.neighbors_undirected(node) {
                if neighbor == target {
                    return Some(depth + 1);
                }
                if visited.insert(neighbor) {
                    queue.push_back((neighbor, depth + 1));
                }
            }
        }
        None
    }
}

impl Default for CausalGraph {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_BOUND)
    }
}

impl std::fmt::Debug for CausalGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CausalGraph")
            .field("vertices", &self.vertex_count())
            .field("tips", &self.tips.len())
            .finish()
    }
}
