//! Capability expression evaluation.

use lockyard_errors::{Error, LockError};
use lockyard_registry::ResourceRegistry;
use lockyard_types::{Environment, Resource};

/// Predicate deciding whether a resource satisfies a capability expression
pub trait CapabilityMatcher: Send + Sync {
    /// Evaluate `expression` for `resource` under `environment`
    ///
    /// # Errors
    ///
    /// Returns an error when the expression cannot be evaluated; callers
    /// treat that as "no match".
    fn matches(
        &self,
        expression: &str,
        resource: &Resource,
        environment: &Environment,
    ) -> Result<bool, Error>;
}

/// Whitespace/comma separated tag list with `!tag` negation and `$VAR`
/// expansion from the environment
#[derive(Debug, Clone, Copy, Default)]
pub struct TagMatcher;

/// Required and prohibited tags of an expanded expression
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagExpression {
    pub required: Vec<String>,
    pub prohibited: Vec<String>,
}

impl TagExpression {
    /// Expand and split `expression`
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when a referenced variable is not set.
    pub fn parse(expression: &str, environment: &Environment) -> Result<Self, Error> {
        let mut parsed = Self::default();
        for token in split_tokens(expression) {
            let (negated, token) = match token.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, token),
            };
            let target = if negated {
                &mut parsed.prohibited
            } else {
                &mut parsed.required
            };
            match variable_name(token) {
                Some(name) => {
                    let value = environment.get(name).ok_or_else(|| LockError::InvalidRequest {
                        message: format!("variable '{name}' is not set"),
                    })?;
                    target.extend(split_tokens(value).map(str::to_string));
                }
                None if token.is_empty() => {}
                None => target.push(token.to_string()),
            }
        }
        Ok(parsed)
    }

    #[must_use]
    pub fn is_satisfied_by(&self, resource: &Resource) -> bool {
        !self.required.is_empty()
            && self.required.iter().all(|tag| resource.has_capability(tag))
            && !self.prohibited.iter().any(|tag| resource.has_capability(tag))
    }
}

fn split_tokens(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
}

/// `$NAME` or `${NAME}`
fn variable_name(token: &str) -> Option<&str> {
    let rest = token.strip_prefix('$')?;
    let name = rest
        .strip_prefix('{')
        .and_then(|inner| inner.strip_suffix('}'))
        .unwrap_or(rest);
    (!name.is_empty()).then_some(name)
}

impl CapabilityMatcher for TagMatcher {
    fn matches(
        &self,
        expression: &str,
        resource: &Resource,
        environment: &Environment,
    ) -> Result<bool, Error> {
        Ok(TagExpression::parse(expression, environment)?.is_satisfied_by(resource))
    }
}

/// Resolves capability expressions against the registry
#[derive(Clone, Copy)]
pub struct CapabilityResolver<'a> {
    matcher: &'a dyn CapabilityMatcher,
}

impl<'a> CapabilityResolver<'a> {
    #[must_use]
    pub fn new(matcher: &'a dyn CapabilityMatcher) -> Self {
        Self { matcher }
    }

    /// Registry indices of every resource matching `expression`, in
    /// registry order
    #[must_use]
    pub fn resolve(
        &self,
        registry: &ResourceRegistry,
        expression: &str,
        environment: &Environment,
    ) -> Vec<usize> {
        registry
            .iter()
            .enumerate()
            .filter(|(_, resource)| self.evaluate(expression, resource, environment))
            .map(|(idx, _)| idx)
            .collect()
    }

    fn evaluate(&self, expression: &str, resource: &Resource, environment: &Environment) -> bool {
        match self.matcher.matches(expression, resource, environment) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::debug!(
                    expression,
                    resource = %resource.name,
                    error = %e,
                    "capability expression failed, treating as no match"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for CapabilityResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityResolver").finish_non_exhaustive()
    }
}
