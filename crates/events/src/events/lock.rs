use serde::{Deserialize, Serialize};

/// Why a request went to the wait queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueReason {
    /// Resources exist but no disjoint assignment is free right now
    Busy { detail: String },
    /// The request names resources the registry does not know
    UnknownResources { names: Vec<String> },
}

/// Lock/queue domain events: every grant, release, admission and hold transition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LockEvent {
    /// Resources locked immediately on request
    Acquired {
        requester: String,
        context: String,
        resources: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        variable: Option<String>,
    },

    /// Request could not be satisfied and now waits in the queue
    Queued {
        requester: String,
        context: String,
        ticket: u64,
        request: String,
        reason: QueueReason,
        position: usize,
    },

    /// A second submission from a context already waiting was merged
    AdmissionMerged {
        requester: String,
        context: String,
        ticket: u64,
    },

    /// Resources returned by their owner
    Released {
        requester: String,
        resources: Vec<String>,
    },

    /// A queued request was granted after a release
    Woken {
        requester: String,
        context: String,
        ticket: u64,
        resources: Vec<String>,
        waited_ms: u64,
    },

    /// A queued request was withdrawn without being granted
    Withdrawn {
        requester: String,
        context: String,
        ticket: u64,
    },

    /// Administrative hold placed
    Reserved { by: String, resources: Vec<String> },

    /// Administrative hold removed
    Unreserved { resources: Vec<String> },

    /// Operator override cleared every hold
    Reset { resources: Vec<String> },

    /// Scheduler-level claim placed for a task
    Claimed {
        project: String,
        task_id: u64,
        resources: Vec<String>,
    },

    /// Claim refused because another task of the same project is ahead
    ClaimBlocked {
        project: String,
        task_id: u64,
        ahead_task_id: u64,
    },

    /// Claims dropped for a task
    ClaimReleased {
        project: String,
        task_id: u64,
        resources: Vec<String>,
    },
}

impl LockEvent {
    /// Short transition name used as a log label
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Acquired { .. } => "acquired",
            Self::Queued { .. } => "queued",
            Self::AdmissionMerged { .. } => "admission_merged",
            Self::Released { .. } => "released",
            Self::Woken { .. } => "woken",
            Self::Withdrawn { .. } => "withdrawn",
            Self::Reserved { .. } => "reserved",
            Self::Unreserved { .. } => "unreserved",
            Self::Reset { .. } => "reset",
            Self::Claimed { .. } => "claimed",
            Self::ClaimBlocked { .. } => "claim_blocked",
            Self::ClaimReleased { .. } => "claim_released",
        }
    }

    /// Requester or task identity the event is about, used as correlation id
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        match self {
            Self::Acquired { requester, .. }
            | Self::Queued { requester, .. }
            | Self::AdmissionMerged { requester, .. }
            | Self::Released { requester, .. }
            | Self::Woken { requester, .. }
            | Self::Withdrawn { requester, .. } => Some(requester.clone()),
            Self::Reserved { by, .. } => Some(by.clone()),
            Self::Claimed {
                project, task_id, ..
            }
            | Self::ClaimBlocked {
                project, task_id, ..
            }
            | Self::ClaimReleased {
                project, task_id, ..
            } => Some(format!("{project}#{task_id}")),
            Self::Unreserved { .. } | Self::Reset { .. } => None,
        }
    }
}
