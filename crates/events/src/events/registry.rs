use serde::{Deserialize, Serialize};

/// Registry domain events: resource lifecycle and persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RegistryEvent {
    /// Registry loaded from the persistence collaborator
    Loaded { resources: usize },

    /// Resource added by an administrator or on first reference
    ResourceCreated {
        name: String,
        capabilities: Vec<String>,
        auto_created: bool,
    },

    /// Resource removed
    ResourceDeleted { name: String },

    /// Capability tags replaced
    CapabilitiesChanged {
        name: String,
        capabilities: Vec<String>,
    },

    /// Fairness ranking toggled
    FairSelectionChanged { enabled: bool },

    /// Saving the registry failed; in-memory state is kept
    PersistFailed { failure: super::FailureContext },
}
