//! Results of lock manager operations.

use lockyard_events::QueueReason;
use lockyard_types::{Grant, QueuePrecedence};

/// Result of [`crate::LockManager::acquire_or_queue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Resources were locked immediately
    Granted(Grant),
    /// The request waits in the queue
    Queued {
        ticket: u64,
        reason: QueueReason,
        /// The context already had an entry; it was left untouched
        merged: bool,
    },
}

impl AcquireOutcome {
    #[must_use]
    pub fn grant(&self) -> Option<&Grant> {
        match self {
            Self::Granted(grant) => Some(grant),
            Self::Queued { .. } => None,
        }
    }

    #[must_use]
    pub fn ticket(&self) -> Option<u64> {
        match self {
            Self::Granted(_) => None,
            Self::Queued { ticket, .. } => Some(*ticket),
        }
    }
}

/// Result of a release, unreserve or reset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseOutcome {
    /// Resources whose state actually changed
    pub released: Vec<String>,
    /// Queue entry granted by the wake-up scan that followed
    pub woken: Option<Grant>,
}

/// Result of [`crate::LockManager::cancel_requester`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancelOutcome {
    pub released: Vec<String>,
    /// Tickets of the withdrawn queue entries
    pub withdrawn: Vec<u64>,
    pub woken: Option<Grant>,
}

/// Result of a scheduler-level claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The task now holds claims on these resources
    Claimed(Vec<String>),
    /// Another task of the same project holds claims and goes first
    AnotherClaimAhead { task_id: u64 },
    /// Not enough free resources; the task holds no claim
    Insufficient { reason: String },
}

/// Behaviour switches of a lock manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    /// Initial state of fairness ranking
    pub fair_selection: bool,
    /// Precedence for scans that are not triggered by an owner's release
    pub default_precedence: QueuePrecedence,
    /// Create unknown named resources when a request is queued
    pub auto_create_resources: bool,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            fair_selection: false,
            default_precedence: QueuePrecedence::OldestFirst,
            auto_create_resources: false,
        }
    }
}
