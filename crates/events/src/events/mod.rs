use serde::{Deserialize, Serialize};

use crate::EventSource;
use lockyard_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod lock;
pub mod registry;

pub use lock::*;
pub use registry::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// Acquisition, queueing, release and hold transitions
    Lock(LockEvent),

    /// Resource lifecycle and persistence
    Registry(RegistryEvent),
}

impl AppEvent {
    /// Identify the source domain for this event.
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::Lock(_) => EventSource::LOCK,
            Self::Registry(_) => EventSource::REGISTRY,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::Registry(RegistryEvent::PersistFailed { .. }) => Level::ERROR,

            Self::Lock(
                LockEvent::AdmissionMerged { .. }
                | LockEvent::ClaimBlocked { .. }
                | LockEvent::Queued {
                    reason: QueueReason::Busy { .. },
                    ..
                },
            ) => Level::DEBUG,

            _ => Level::INFO,
        }
    }

    /// Get the log target for this event
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::Lock(_) => "lockyard::events::lock",
            Self::Registry(_) => "lockyard::events::registry",
        }
    }

    /// Correlation id derived from the event payload
    #[must_use]
    pub fn correlation_id(&self) -> Option<String> {
        match self {
            Self::Lock(event) => event.subject(),
            Self::Registry(
                RegistryEvent::ResourceCreated { name, .. }
                | RegistryEvent::ResourceDeleted { name }
                | RegistryEvent::CapabilitiesChanged { name, .. },
            ) => Some(name.clone()),
            _ => None,
        }
    }
}
