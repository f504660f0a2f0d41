//! Lock, queue and reservation error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum LockError {
    /// The request names at least one resource the registry has never seen.
    #[error("unknown resources: {}", .names.join(", "))]
    UnknownResource { names: Vec<String> },

    /// No disjoint assignment exists with the current registry state.
    #[error("request cannot be satisfied right now: {reason}")]
    Unsatisfiable { reason: String },

    #[error("resource {resource} is not free ({holder})")]
    ReservationConflict { resource: String, holder: String },

    #[error("context {context} already waits in the queue as ticket {ticket}")]
    DuplicateAdmission { context: String, ticket: u64 },

    #[error("resource {resource} is locked or reserved")]
    ResourceInUse { resource: String },

    #[error("resource {resource} already exists")]
    ResourceExists { resource: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl LockError {
    /// Convenience constructor for an unsatisfiable outcome
    pub fn unsatisfiable(reason: impl Into<String>) -> Self {
        Self::Unsatisfiable {
            reason: reason.into(),
        }
    }

    /// Whether the caller may queue the request and wait for a release
    #[must_use]
    pub fn is_queueable(&self) -> bool {
        matches!(
            self,
            Self::UnknownResource { .. } | Self::Unsatisfiable { .. }
        )
    }
}

impl UserFacingError for LockError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnknownResource { .. } => {
                Some("Create the resource first or enable auto_create_resources.")
            }
            Self::ReservationConflict { .. } | Self::ResourceInUse { .. } => {
                Some("Wait for the current holder to release the resource, or reset it.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unsatisfiable { .. }
                | Self::ReservationConflict { .. }
                | Self::ResourceInUse { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::UnknownResource { .. } => "lock.unknown_resource",
            Self::Unsatisfiable { .. } => "lock.unsatisfiable",
            Self::ReservationConflict { .. } => "lock.reservation_conflict",
            Self::DuplicateAdmission { .. } => "lock.duplicate_admission",
            Self::ResourceInUse { .. } => "lock.resource_in_use",
            Self::ResourceExists { .. } => "lock.resource_exists",
            Self::InvalidRequest { .. } => "lock.invalid_request",
        };
        Some(code)
    }
}
