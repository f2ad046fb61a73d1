//! Coordination facade owning the agent registry, operation log, and
//! causal graph as one coherent module.
//!
//! Each store sits behind its own `RwLock`: mutations take exclusive
//! access, reads run concurrently. `check_conflicts` reads across stores
//! without a global snapshot lock, so a report may be stale by one
//! operation when inserts race with a check. That eventual consistency is
//! the documented contract; no read ever observes a half-applied insert.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::agent::{AgentId, AgentRecord, AgentRegistry, AgentStatus};
use crate::config::Config;
use crate::core::conflict::{self, ConflictPolicy, ConflictReport, Severity};
use crate::core::graph::{CausalGraph, VertexId};
use crate::core::operation::{Metadata, OperationId, OperationLog};
use crate::error::{Error, Result};

/// Events emitted by the coordinator for observers.
///
/// Delivery is non-blocking and lossy: a full or disconnected channel
/// drops the event rather than stalling a mutation.
#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    /// An operation was validated and logged.
    OperationLogged {
        /// The logged operation.
        operation: OperationId,
        /// The submitting agent.
        agent: AgentId,
        /// Logical timestamp assigned to the operation.
        timestamp: u64,
    },
    /// A vertex joined the causal graph.
    VertexInserted {
        /// The new vertex.
        vertex: VertexId,
        /// How many causal parents it was attached to.
        parent_count: usize,
    },
    /// A conflict check completed with at least one report.
    ConflictsDetected {
        /// The checked operation.
        candidate: OperationId,
        /// Number of reports produced.
        count: usize,
        /// Highest severity among the reports.
        max_severity: Severity,
    },
}

/// Per-severity conflict counts since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictCounts {
    pub minor: u64,
    pub moderate: u64,
    pub severe: u64,
}

/// Aggregate counters exposed by `Coordinator::stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub total_agents: usize,
    pub total_operations: usize,
    pub total_vertices: usize,
    pub tip_count: usize,
    pub conflicts: ConflictCounts,
}

/// The coordination core: a single-process, in-memory facade over the
/// registry, the log, and the graph.
///
/// Safe to share across threads; all methods take `&self`.
pub struct Coordinator {
    config: Config,
    policy: ConflictPolicy,
    registry: RwLock<AgentRegistry>,
    log: RwLock<OperationLog>,
    graph: RwLock<CausalGraph>,
    conflict_counts: RwLock<ConflictCounts>,
    events: Option<crossbeam_channel::Sender<CoordinatorEvent>>,
}

impl Coordinator {
    /// Create a coordinator from a validated config.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let policy = ConflictPolicy::from(&config);
        let graph = CausalGraph::new(config.distance_search_bound);
        info!(?config, "coordinator initialized");
        Ok(Self {
            config,
            policy,
            registry: RwLock::new(AgentRegistry::new()),
            log: RwLock::new(OperationLog::new()),
            graph: RwLock::new(graph),
            conflict_counts: RwLock::new(ConflictCounts::default()),
            events: None,
        })
    }

    /// Attach an event channel. Events are sent with `try_send` and
    /// dropped if the channel is full.
    pub fn with_events(mut self, tx: crossbeam_channel::Sender<CoordinatorEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn emit(&self, event: CoordinatorEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.try_send(event);
        }
    }

    // ========== Agent surface ==========

    /// Register an agent, returning its current status. Idempotent.
    pub fn register_agent(&self, id: &AgentId) -> Result<AgentStatus> {
        self.registry.write().register(id)
    }

    /// Update an agent's lifecycle status.
    pub fn set_agent_status(&self, id: &AgentId, status: AgentStatus) -> Result<()> {
        self.registry.write().set_status(id, status)
    }

    /// Snapshot of known agents in registration order.
    pub fn agents(&self) -> Vec<AgentRecord> {
        self.registry.read().iter().cloned().collect()
    }

    // ========== Operation surface ==========

    /// Validate, log, and graph a new operation.
    ///
    /// The operation's vertex is inserted automatically with the current
    /// tips as parents. Unknown agents are registered on the fly when the
    /// config allows it, rejected with `UnknownAgent` otherwise.
    pub fn append_operation(
        &self,
        agent: &AgentId,
        kind: impl Into<String>,
        resources: Vec<String>,
        metadata: Metadata,
    ) -> Result<OperationId> {
        self.append_operation_with_parents(agent, kind, resources, metadata, None)
    }

    /// As `append_operation`, but with an explicit parent override for the
    /// vertex. `None` defaults to the current tip set; `Some(vec![])`
    /// creates a detached root.
    pub fn append_operation_with_parents(
        &self,
        agent: &AgentId,
        kind: impl Into<String>,
        resources: Vec<String>,
        metadata: Metadata,
        parents: Option<Vec<VertexId>>,
    ) -> Result<OperationId> {
        {
            let mut registry = self.registry.write();
            if !registry.contains(agent) {
                if self.config.auto_register_agents {
                    registry.register(agent)?;
                } else {
                    return Err(Error::UnknownAgent(agent.to_string()));
                }
            }
        }

        // Validate explicit parents before logging anything. Vertices are
        // never removed, so a parent that exists now still exists at insert
        // time and the insert below cannot fail.
        if let Some(parents) = &parents {
            let graph = self.graph.read();
            for parent in parents {
                if !graph.contains(parent) {
                    return Err(Error::DanglingParent(parent.to_string()));
                }
            }
        }

        let (id, timestamp) = {
            let mut log = self.log.write();
            let id = log.append(agent.clone(), kind, resources, metadata)?;
            let timestamp = log.get(&id)?.timestamp;
            (id, timestamp)
        };
        self.emit(CoordinatorEvent::OperationLogged {
            operation: id,
            agent: agent.clone(),
            timestamp,
        });

        let vertex = {
            let mut graph = self.graph.write();
            graph.insert_vertex(id, parents)?
        };
        let parent_count = self
            .graph
            .read()
            .get(&vertex)
            .map(|v| v.parents.len())
            .unwrap_or(0);
        self.emit(CoordinatorEvent::VertexInserted {
            vertex,
            parent_count,
        });

        debug!(operation = %id, agent = %agent, timestamp, "operation appended");
        Ok(id)
    }

    /// Look up a logged operation.
    pub fn get_operation(&self, id: &OperationId) -> Result<crate::core::operation::Operation> {
        self.log.read().get(id).map(Clone::clone)
    }

    /// Resolve the vertex for an operation.
    pub fn vertex_for_operation(&self, id: &OperationId) -> Option<VertexId> {
        self.graph.read().vertex_for_operation(id)
    }

    // ========== Graph surface ==========

    /// Snapshot of the current tip set.
    pub fn tips(&self) -> std::collections::HashSet<VertexId> {
        self.graph.read().tips()
    }

    /// True if `a` is a causal ancestor of `b`.
    pub fn is_ancestor(&self, a: &VertexId, b: &VertexId) -> bool {
        self.graph.read().is_ancestor(a, b)
    }

    /// Bounded DAG distance between two vertices.
    pub fn distance(&self, a: &VertexId, b: &VertexId) -> Option<u64> {
        self.graph.read().distance(a, b)
    }

    // ========== Conflict surface ==========

    /// Check a candidate operation using the configured window size.
    pub fn check_conflicts(&self, candidate: &OperationId) -> Result<Vec<ConflictReport>> {
        self.check_conflicts_windowed(candidate, self.config.conflict_window_size)
    }

    /// Check a candidate operation against an explicit window size.
    ///
    /// Takes read locks on the log and graph in turn rather than a global
    /// snapshot; results may trail a racing insert by one operation.
    pub fn check_conflicts_windowed(
        &self,
        candidate: &OperationId,
        window: usize,
    ) -> Result<Vec<ConflictReport>> {
        let reports = {
            let log = self.log.read();
            let graph = self.graph.read();
            conflict::check_conflicts(candidate, window, &log, &graph, &self.policy)?
        };

        if !reports.is_empty() {
            {
                let mut counts = self.conflict_counts.write();
                for report in &reports {
                    match report.severity {
                        Severity::Minor => counts.minor += 1,
                        Severity::Moderate => counts.moderate += 1,
                        Severity::Severe => counts.severe += 1,
                    }
                }
            }
            // Reports are sorted by descending severity; first is the max
            let max_severity = reports[0].severity;
            self.emit(CoordinatorEvent::ConflictsDetected {
                candidate: *candidate,
                count: reports.len(),
                max_severity,
            });
        }
        Ok(reports)
    }

    // ========== Stats surface ==========

    /// Aggregate counts across all stores.
    pub fn stats(&self) -> Stats {
        let graph = self.graph.read();
        Stats {
            total_agents: self.registry.read().len(),
            total_operations: self.log.read().len(),
            total_vertices: graph.vertex_count(),
            tip_count: graph.tips().len(),
            conflicts: *self.conflict_counts.read(),
        }
    }

    /// Reset the per-severity conflict counters.
    pub fn reset_stats(&self) {
        *self.conflict_counts.write() = ConflictCounts::default();
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("Coordinator")
            .field("agents", &stats.total_agents)
            .field("operations", &stats.total_operations)
            .field("vertices", &stats.total_vertices)
            .finish()
    }
}
