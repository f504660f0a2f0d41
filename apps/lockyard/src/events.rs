//! Event handling and user feedback

use crate::logging::log_event_with_tracing;
use lockyard_events::{AppEvent, EventMessage, LockEvent, RegistryEvent};

/// Turns domain events into log records and short status lines
pub struct EventHandler {
    /// Print status lines to stderr
    show_status: bool,
}

impl EventHandler {
    pub fn new(show_status: bool) -> Self {
        Self { show_status }
    }

    pub fn handle_event(&mut self, message: &EventMessage) {
        log_event_with_tracing(message);
        if !self.show_status {
            return;
        }
        if let Some(line) = status_line(&message.event) {
            eprintln!("{line}");
        }
    }
}

/// One-line summary for the events an operator should notice
fn status_line(event: &AppEvent) -> Option<String> {
    match event {
        AppEvent::Registry(RegistryEvent::ResourceCreated {
            name,
            auto_created: true,
            ..
        }) => Some(format!("created resource {name} on first use")),
        AppEvent::Registry(RegistryEvent::PersistFailed { failure }) => Some(format!(
            "warning: registry not saved: {}",
            failure.message
        )),
        AppEvent::Lock(LockEvent::Woken {
            requester,
            resources,
            ..
        }) => Some(format!(
            "granted [{}] to waiting {requester}",
            resources.join(", ")
        )),
        _ => None,
    }
}
