#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for lockyard
//!
//! This crate provides the data model shared by every other crate:
//! resources and their mutual-exclusion state, requester identities,
//! requirement groups, requests and grants.

pub mod grant;
pub mod request;
pub mod requester;
pub mod resource;

// Re-export commonly used types
pub use grant::{Grant, VariableBinding};
pub use request::{Environment, GroupSelector, QueuePrecedence, RequirementGroup, ResourceRequest};
pub use requester::{ContextId, PendingClaim, Requester, RequesterId};
pub use resource::{Resource, ResourceStatus};

use serde::{Deserialize, Serialize};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    #[default]
    Tty,
    Json,
}
