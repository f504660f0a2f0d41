//! Resource type definitions

use crate::requester::{PendingClaim, Requester, RequesterId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A named, capability-tagged unit of exclusive allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource name (also an implicit capability)
    pub name: String,
    /// Explicit capability tags
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub capabilities: BTreeSet<String>,
    /// Free-form description shown to administrators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Execution currently holding the resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Requester>,
    /// Administrative hold, independent of the owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_by: Option<String>,
    /// Scheduler-level hold placed before an execution exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_claim: Option<PendingClaim>,
}

impl Resource {
    /// Create a free resource without capabilities
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: BTreeSet::new(),
            description: None,
            owner: None,
            reserved_by: None,
            pending_claim: None,
        }
    }

    /// Attach capability tags
    #[must_use]
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities
            .into_iter()
            .map(Into::into)
            .filter(|tag: &String| !tag.is_empty())
            .collect();
        self
    }

    /// Attach a description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Split a capability list such as `"linux arm64,gpu"` into tags
    #[must_use]
    pub fn parse_capabilities(raw: &str) -> BTreeSet<String> {
        raw.split(|c: char| c.is_whitespace() || c == ',')
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Whether the resource carries `tag`, counting its own name
    #[must_use]
    pub fn has_capability(&self, tag: &str) -> bool {
        self.name == tag || self.capabilities.contains(tag)
    }

    /// Whether the two resources have at least one explicit tag in common
    #[must_use]
    pub fn shares_capability_with(&self, other: &Resource) -> bool {
        self.capabilities
            .iter()
            .any(|tag| other.capabilities.contains(tag))
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.owner.is_some()
    }

    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.reserved_by.is_some()
    }

    #[must_use]
    pub fn is_claimed(&self) -> bool {
        self.pending_claim.is_some()
    }

    /// Free means no owner, no reservation and no pending claim
    #[must_use]
    pub fn is_free(&self) -> bool {
        !self.is_locked() && !self.is_reserved() && !self.is_claimed()
    }

    /// A lock may be committed only when nobody owns or reserved the resource
    #[must_use]
    pub fn can_lock(&self) -> bool {
        !self.is_locked() && !self.is_reserved()
    }

    #[must_use]
    pub fn is_locked_by(&self, requester: &RequesterId) -> bool {
        self.owner.as_ref().is_some_and(|owner| &owner.id == requester)
    }

    #[must_use]
    pub fn is_claimed_by(&self, claim: &PendingClaim) -> bool {
        self.pending_claim.as_ref() == Some(claim)
    }

    /// Whether a task of `project` other than `task_id` holds a claim here
    #[must_use]
    pub fn is_claimed_by_other_task(&self, project: &str, task_id: u64) -> bool {
        self.pending_claim
            .as_ref()
            .is_some_and(|claim| claim.project == project && claim.task_id != task_id)
    }

    /// Transition to `Locked(requester)`, dropping any pending claim
    pub fn lock(&mut self, requester: Requester) {
        self.pending_claim = None;
        self.owner = Some(requester);
    }

    /// Transition back to free; returns the previous owner
    pub fn unlock(&mut self) -> Option<Requester> {
        self.pending_claim = None;
        self.owner.take()
    }

    pub fn reserve(&mut self, by: impl Into<String>) {
        self.reserved_by = Some(by.into());
    }

    pub fn unreserve(&mut self) {
        self.reserved_by = None;
    }

    pub fn claim(&mut self, claim: PendingClaim) {
        self.pending_claim = Some(claim);
    }

    pub fn clear_claim(&mut self) {
        self.pending_claim = None;
    }

    /// Operator override: clear every hold
    pub fn reset(&mut self) {
        self.owner = None;
        self.reserved_by = None;
        self.pending_claim = None;
    }

    /// Current mutual-exclusion status, reservation first
    #[must_use]
    pub fn status(&self) -> ResourceStatus {
        if self.is_reserved() {
            ResourceStatus::Reserved
        } else if self.is_locked() {
            ResourceStatus::Locked
        } else if self.is_claimed() {
            ResourceStatus::Claimed
        } else {
            ResourceStatus::Free
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Resource status summary for listings and events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Free,
    Locked,
    Reserved,
    Claimed,
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Locked => write!(f, "locked"),
            Self::Reserved => write!(f, "reserved"),
            Self::Claimed => write!(f, "claimed"),
        }
    }
}
