//! Agent registry: identity and lifecycle state for known agents.
//!
//! Agents are identified by caller-supplied opaque string ids. Records are
//! never removed while logged operations may reference them; termination is
//! a status change, not a deletion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Opaque string identifier for an agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Agent lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Agent is actively submitting operations.
    Active,
    /// Agent is registered but not currently working.
    Idle,
    /// Agent has been shut down. The record remains for back-references.
    Terminated,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Active => write!(f, "active"),
            AgentStatus::Idle => write!(f, "idle"),
            AgentStatus::Terminated => write!(f, "terminated"),
        }
    }
}

/// Registration record for a single agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    /// The agent's opaque identifier.
    pub id: AgentId,
    /// When the agent was first registered.
    pub registered_at: DateTime<Utc>,
    /// Current lifecycle status.
    pub status: AgentStatus,
}

/// Tracks known agents and their lifecycle state.
///
/// Registration order is preserved so `iter` yields agents in the order
/// they were first seen.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: HashMap<AgentId, AgentRecord>,
    order: Vec<AgentId>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent, returning its current status.
    ///
    /// Idempotent: re-registering an existing agent leaves its record
    /// untouched and returns the existing status.
    ///
    /// # Errors
    /// Returns `InvalidIdentity` if the id is empty.
    pub fn register(&mut self, id: &AgentId) -> Result<AgentStatus> {
        if id.as_str().is_empty() {
            return Err(Error::InvalidIdentity("agent id is empty".to_string()));
        }
        if let Some(record) = self.agents.get(id) {
            return Ok(record.status);
        }
        let record = AgentRecord {
            id: id.clone(),
            registered_at: Utc::now(),
            status: AgentStatus::Active,
        };
        self.agents.insert(id.clone(), record);
        self.order.push(id.clone());
        Ok(AgentStatus::Active)
    }

    /// Update the lifecycle status of a registered agent.
    ///
    /// # Errors
    /// Returns `UnknownAgent` if the agent was never registered.
    pub fn set_status(&mut self, id: &AgentId, status: AgentStatus) -> Result<()> {
        let record = self
            .agents
            .get_mut(id)
            .ok_or_else(|| Error::UnknownAgent(id.to_string()))?;
        record.status = status;
        Ok(())
    }

    /// Get an agent's record, if registered.
    pub fn get(&self, id: &AgentId) -> Option<&AgentRecord> {
        self.agents.get(id)
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.agents.contains_key(id)
    }

    /// Iterate over known agents in registration order.
    ///
    /// The iterator borrows the registry, so it can be restarted by calling
    /// `iter` again.
    pub fn iter(&self) -> impl Iterator<Item = &AgentRecord> + '_ {
        self.order.iter().filter_map(|id| self.agents.get(id))
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
