//! Conflict engine: detects and classifies conflicts between a candidate
//! operation and recent operations touching overlapping resources.
//!
//! The engine only decides whether a conflict exists, how severe it is, and
//! which coordination strategy to apply. It never merges content.
//!
//! Reports are recomputed fresh on every check and never cached, because the
//! graph mutates between calls.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::config::Config;
use crate::core::graph::CausalGraph;
use crate::core::operation::{OperationId, OperationLog};
use crate::error::{Error, Result};

/// Ordinal conflict severity.
///
/// Ordering follows the tier: `Severe > Moderate > Minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Tier 1: distant or causally unrelated overlap.
    Minor,
    /// Tier 2: moderately recent overlap.
    Moderate,
    /// Tier 3: very recent overlap.
    Severe,
}

impl Severity {
    /// Numeric tier, 1 through 3.
    pub fn tier(&self) -> u8 {
        match self {
            Severity::Minor => 1,
            Severity::Moderate => 2,
            Severity::Severe => 3,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Minor => write!(f, "minor"),
            Severity::Moderate => write!(f, "moderate"),
            Severity::Severe => write!(f, "severe"),
        }
    }
}

/// Recommended coordination strategy for a conflict pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// The prior operation is a causal predecessor of the candidate; the
    /// candidate already builds on it.
    AutoMerge,
    /// Concurrent and causally close; needs a human or agent decision.
    ManualResolution,
    /// Concurrent but distant; safe to serialize.
    SequentialExecution,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::AutoMerge => write!(f, "auto_merge"),
            Resolution::ManualResolution => write!(f, "manual_resolution"),
            Resolution::SequentialExecution => write!(f, "sequential_execution"),
        }
    }
}

/// One detected conflict between the candidate and a prior operation.
///
/// Derived data: recomputed per check, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictReport {
    /// The operation being checked.
    pub candidate: OperationId,
    /// The earlier operation it conflicts with.
    pub prior: OperationId,
    /// Logical timestamp of the prior operation.
    pub prior_timestamp: u64,
    /// Classified severity tier.
    pub severity: Severity,
    /// True if the prior operation is a causal ancestor of the candidate.
    pub ancestor: bool,
    /// DAG distance between the two vertices, if connected within bounds.
    pub distance: Option<u64>,
    /// Recommended coordination strategy.
    pub resolution: Resolution,
}

/// Severity thresholds and resolution policy.
///
/// Thresholds are configuration, not magic constants. Defaults: distances
/// below 5 are severe, below 20 moderate, everything else (including no
/// path at all) minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictPolicy {
    /// Distances strictly below this are severe.
    pub severe_distance: u64,
    /// Distances strictly below this (and not severe) are moderate.
    pub moderate_distance: u64,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        Self {
            severe_distance: 5,
            moderate_distance: 20,
        }
    }
}

impl From<&Config> for ConflictPolicy {
    fn from(config: &Config) -> Self {
        Self {
            severe_distance: config.severe_distance,
            moderate_distance: config.moderate_distance,
        }
    }
}

impl ConflictPolicy {
    /// Classify a DAG distance into a severity tier.
    ///
    /// Unrelated pairs (no distance) still rank as minor conflicts rather
    /// than being dropped: resource overlap alone is conflict-relevant even
    /// without causal order.
    pub fn classify(&self, distance: Option<u64>) -> Severity {
        match distance {
            Some(d) if d < self.severe_distance => Severity::Severe,
            Some(d) if d < self.moderate_distance => Severity::Moderate,
            _ => Severity::Minor,
        }
    }

    /// Pick a resolution strategy for a pair.
    ///
    /// The ancestor check takes precedence over distance thresholds: a
    /// candidate that already builds on the prior operation is safe to
    /// auto-merge regardless of how close it is.
    pub fn recommend(&self, ancestor: bool, distance: Option<u64>) -> Resolution {
        if ancestor {
            return Resolution::AutoMerge;
        }
        match distance {
            Some(d) if d < self.severe_distance => Resolution::ManualResolution,
            _ => Resolution::SequentialExecution,
        }
    }
}

/// Check a candidate operation against the recent window of same-resource
/// operations.
///
/// Output is deterministic: sorted by descending severity, then ascending
/// prior logical timestamp, so repeated calls against an unchanged graph
/// produce identical reports.
///
/// # Errors
/// - `InvalidArgument` if `window` is zero.
/// - `NotFound` if the candidate operation was never logged.
pub fn check_conflicts(
    candidate: &OperationId,
    window: usize,
    log: &OperationLog,
    graph: &CausalGraph,
    policy: &ConflictPolicy,
) -> Result<Vec<ConflictReport>> {
    if window == 0 {
        return Err(Error::InvalidArgument(
            "conflict window size must be positive".to_string(),
        ));
    }
    let candidate_op = log.get(candidate)?;
    if candidate_op.resources.is_empty() {
        // Nothing to compare against
        return Ok(Vec::new());
    }

    // Union of recent same-resource operations, de-duplicated by id
    let mut priors: HashMap<OperationId, u64> = HashMap::new();
    for resource in &candidate_op.resources {
        for prior in log.recent_by_resource(resource, window) {
            if prior.id != *candidate {
                priors.insert(prior.id, prior.timestamp);
            }
        }
    }

    let candidate_vertex = graph.vertex_for_operation(candidate);
    let mut reports: Vec<ConflictReport> = priors
        .into_iter()
        .map(|(prior, prior_timestamp)| {
            let prior_vertex = graph.vertex_for_operation(&prior);
            // Fail closed on missing vertices: no relationship found
            let (ancestor, distance) = match (prior_vertex, candidate_vertex) {
                (Some(p), Some(c)) => (graph.is_ancestor(&p, &c), graph.distance(&p, &c)),
                _ => (false, None),
            };
            ConflictReport {
                candidate: *candidate,
                prior,
                prior_timestamp,
                severity: policy.classify(distance),
                ancestor,
                distance,
                resolution: policy.recommend(ancestor, distance),
            }
        })
        .collect();

    reports.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(a.prior_timestamp.cmp(&b.prior_timestamp))
    });

    debug!(
        candidate = %candidate,
        reports = reports.len(),
        "conflict check complete"
    );
    Ok(reports)
}
