//! Grant type definitions

use crate::request::QueuePrecedence;
use crate::requester::Requester;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output variable binding for a grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableBinding {
    pub name: String,
    pub value: String,
}

/// A committed assignment: the resources now locked by a requester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub requester: Requester,
    /// Granted resource names, sorted
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<VariableBinding>,
    /// Precedence used when this grant is released
    pub precedence: QueuePrecedence,
    /// Queue ticket when the grant came out of the wait queue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<u64>,
    pub granted_at: DateTime<Utc>,
}

impl Grant {
    /// Build a grant; names are sorted for stable output
    pub fn new(
        requester: Requester,
        mut resources: Vec<String>,
        variable: Option<&str>,
        precedence: QueuePrecedence,
    ) -> Self {
        resources.sort();
        let variable = variable.map(|name| VariableBinding {
            name: name.to_string(),
            value: resources.join(","),
        });
        Self {
            requester,
            resources,
            variable,
            precedence,
            ticket: None,
            granted_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_ticket(mut self, ticket: u64) -> Self {
        self.ticket = Some(ticket);
        self
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] to {}", self.resources.join(", "), self.requester)
    }
}
