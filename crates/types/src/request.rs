//! Request type definitions

use crate::requester::PendingClaim;
use lockyard_errors::LockError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How a requirement group picks its resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupSelector {
    /// Explicit, ordered resource names
    Names(Vec<String>),
    /// Capability expression evaluated against every resource
    Capability(String),
}

/// One clause of a request
///
/// `quantity == 0` means every matching resource, all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementGroup {
    pub selector: GroupSelector,
    #[serde(default)]
    pub quantity: u32,
}

impl RequirementGroup {
    /// Group naming resources explicitly
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selector: GroupSelector::Names(names.into_iter().map(Into::into).collect()),
            quantity: 0,
        }
    }

    /// Group asking for exactly `quantity` resources matching `expression`
    pub fn capability(expression: impl Into<String>, quantity: u32) -> Self {
        Self {
            selector: GroupSelector::Capability(expression.into()),
            quantity,
        }
    }

    /// Group asking for every resource matching `expression`
    pub fn all(expression: impl Into<String>) -> Self {
        Self::capability(expression, 0)
    }

    #[must_use]
    pub fn resource_names(&self) -> &[String] {
        match &self.selector {
            GroupSelector::Names(names) => names,
            GroupSelector::Capability(_) => &[],
        }
    }

    #[must_use]
    pub fn expression(&self) -> Option<&str> {
        match &self.selector {
            GroupSelector::Capability(expr) if !expr.trim().is_empty() => Some(expr.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for RequirementGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selector {
            GroupSelector::Names(names) => write!(f, "[{}]", names.join(", ")),
            GroupSelector::Capability(expr) if self.quantity == 0 => write!(f, "all of '{expr}'"),
            GroupSelector::Capability(expr) => write!(f, "{} of '{expr}'", self.quantity),
        }
    }
}

/// Parses `name`, `=name` or `expr:qty` / `expr:all`; a bare word is a capability
/// expression for a single resource.
impl FromStr for RequirementGroup {
    type Err = LockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(names) = s.strip_prefix('=') {
            let names: Vec<String> = names
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect();
            if names.is_empty() {
                return Err(LockError::InvalidRequest {
                    message: format!("empty resource list in '{s}'"),
                });
            }
            return Ok(Self::names(names));
        }
        let (expr, quantity) = match s.rsplit_once(':') {
            Some((expr, "all")) => (expr, 0),
            Some((expr, qty)) => {
                let qty = qty.trim().parse().map_err(|_| LockError::InvalidRequest {
                    message: format!("invalid quantity in '{s}'"),
                })?;
                (expr, qty)
            }
            None => (s, 1),
        };
        if expr.trim().is_empty() {
            return Err(LockError::InvalidRequest {
                message: format!("empty capability expression in '{s}'"),
            });
        }
        Ok(Self::capability(expr.trim(), quantity))
    }
}

/// Key-value snapshot used to evaluate capability expressions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment(BTreeMap<String, String>);

impl Environment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Which queued request wins when resources are released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePrecedence {
    /// Admission order
    #[default]
    OldestFirst,
    /// The requester whose execution started most recently
    NewestFirst,
}

impl clap::ValueEnum for QueuePrecedence {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::OldestFirst, Self::NewestFirst]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::OldestFirst => clap::builder::PossibleValue::new("oldest-first"),
            Self::NewestFirst => clap::builder::PossibleValue::new("newest-first"),
        })
    }
}

impl fmt::Display for QueuePrecedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OldestFirst => write!(f, "oldest-first"),
            Self::NewestFirst => write!(f, "newest-first"),
        }
    }
}

impl FromStr for QueuePrecedence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oldest-first" | "oldest_first" | "fifo" => Ok(Self::OldestFirst),
            "newest-first" | "newest_first" | "inverse" => Ok(Self::NewestFirst),
            other => Err(format!("unknown queue precedence: {other}")),
        }
    }
}

/// A request for resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub groups: Vec<RequirementGroup>,
    #[serde(default)]
    pub environment: Environment,
    /// Variable receiving the comma-joined names of the granted resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(default)]
    pub precedence: QueuePrecedence,
    /// Scheduler claim this execution was started from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim: Option<PendingClaim>,
}

impl ResourceRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_group(mut self, group: RequirementGroup) -> Self {
        self.groups.push(group);
        self
    }

    #[must_use]
    pub fn with_names<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_group(RequirementGroup::names(names))
    }

    #[must_use]
    pub fn with_capability(self, expression: impl Into<String>, quantity: u32) -> Self {
        self.with_group(RequirementGroup::capability(expression, quantity))
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    #[must_use]
    pub fn with_precedence(mut self, precedence: QueuePrecedence) -> Self {
        self.precedence = precedence;
        self
    }

    #[must_use]
    pub fn with_claim(mut self, claim: PendingClaim) -> Self {
        self.claim = Some(claim);
        self
    }

    /// Every resource named explicitly, in request order
    pub fn named_resources(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|group| group.resource_names().iter().map(String::as_str))
    }

    /// Reject requests that can never mean anything
    ///
    /// # Errors
    ///
    /// Returns `LockError::InvalidRequest` when the request has no group or a
    /// name group without names.
    pub fn validate(&self) -> Result<(), LockError> {
        if self.groups.is_empty() {
            return Err(LockError::InvalidRequest {
                message: "request has no requirement group".to_string(),
            });
        }
        for group in &self.groups {
            if let GroupSelector::Names(names) = &group.selector {
                if names.is_empty() || names.iter().any(|n| n.trim().is_empty()) {
                    return Err(LockError::InvalidRequest {
                        message: format!("group {group} contains an empty resource name"),
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for ResourceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<String> = self.groups.iter().map(ToString::to_string).collect();
        write!(f, "{{{}}}", groups.join(", "))
    }
}
