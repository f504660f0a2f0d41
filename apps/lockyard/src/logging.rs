//! Structured logging integration for events
//!
//! Converts domain events into tracing records with structured fields so
//! `--debug` and JSON log sinks see every lock transition.

use lockyard_events::{
    AppEvent, EventMessage, EventMeta, LockEvent, QueueReason, RegistryEvent,
};
use tracing::{debug, error, info};

/// Log an event at its level with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let meta = &message.meta;
    match &message.event {
        AppEvent::Lock(event) => log_lock_event(event, meta),
        AppEvent::Registry(event) => log_registry_event(event, meta.source.as_str()),
    }
}

fn log_lock_event(event: &LockEvent, meta: &EventMeta) {
    let source = meta.source.as_str();
    let correlation = meta.correlation_id.as_deref();
    let kind = event.kind();
    match event {
        LockEvent::Acquired {
            requester,
            context,
            resources,
            variable,
        } => {
            info!(source, kind, correlation, %requester, %context, resources = ?resources, variable = ?variable, "Resources acquired");
        }
        LockEvent::Queued {
            requester,
            ticket,
            request,
            reason,
            position,
            ..
        } => match reason {
            QueueReason::Busy { detail } => {
                debug!(source, kind, correlation, %requester, ticket, %request, position, %detail, "Request queued, resources busy");
            }
            QueueReason::UnknownResources { names } => {
                info!(source, kind, correlation, %requester, ticket, %request, position, unknown = ?names, "Request queued for unknown resources");
            }
        },
        LockEvent::AdmissionMerged {
            requester,
            context,
            ticket,
        } => {
            debug!(source, kind, correlation, %requester, %context, ticket, "Context already queued");
        }
        LockEvent::Released {
            requester,
            resources,
        } => {
            info!(source, kind, correlation, %requester, resources = ?resources, "Resources released");
        }
        LockEvent::Woken {
            requester,
            ticket,
            resources,
            waited_ms,
            ..
        } => {
            info!(source, kind, correlation, %requester, ticket, resources = ?resources, waited_ms, admission = ?meta.parent_id, "Queued request granted");
        }
        LockEvent::Withdrawn {
            requester, ticket, ..
        } => {
            info!(source, kind, correlation, %requester, ticket, "Queued request withdrawn");
        }
        LockEvent::Reserved { by, resources } => {
            info!(source, kind, %by, resources = ?resources, "Resources reserved");
        }
        LockEvent::Unreserved { resources } => {
            info!(source, kind, resources = ?resources, "Resources unreserved");
        }
        LockEvent::Reset { resources } => {
            info!(source, kind, resources = ?resources, "Resources reset");
        }
        LockEvent::Claimed {
            project,
            task_id,
            resources,
        } => {
            info!(source, kind, %project, task_id, resources = ?resources, "Resources claimed");
        }
        LockEvent::ClaimBlocked {
            project,
            task_id,
            ahead_task_id,
        } => {
            debug!(source, kind, %project, task_id, ahead_task_id, "Claim blocked by earlier task");
        }
        LockEvent::ClaimReleased {
            project,
            task_id,
            resources,
        } => {
            info!(source, kind, %project, task_id, resources = ?resources, "Claims released");
        }
    }
}

fn log_registry_event(event: &RegistryEvent, source: &str) {
    match event {
        RegistryEvent::Loaded { resources } => {
            info!(source, resources, "Registry loaded");
        }
        RegistryEvent::ResourceCreated {
            name,
            capabilities,
            auto_created,
        } => {
            info!(source, %name, capabilities = ?capabilities, auto_created, "Resource created");
        }
        RegistryEvent::ResourceDeleted { name } => {
            info!(source, %name, "Resource deleted");
        }
        RegistryEvent::CapabilitiesChanged { name, capabilities } => {
            info!(source, %name, capabilities = ?capabilities, "Capabilities changed");
        }
        RegistryEvent::FairSelectionChanged { enabled } => {
            info!(source, enabled, "Fair selection changed");
        }
        RegistryEvent::PersistFailed { failure } => {
            error!(
                source,
                code = ?failure.code,
                message = %failure.message,
                hint = ?failure.hint,
                retryable = failure.retryable,
                "Registry could not be saved"
            );
        }
    }
}
