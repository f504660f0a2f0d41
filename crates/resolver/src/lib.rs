#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Resource selection for lockyard
//!
//! Turns a list of requirement groups into one concrete, disjoint set of
//! registry resources:
//!
//! 1. [`capability`] evaluates capability expressions against resources
//! 2. [`selector`] narrows every group to its usable candidates
//! 3. [`fairness`] optionally reorders quantity-group candidates by contention
//! 4. [`assign`] runs an exact backtracking search over the quantity groups
//!
//! Every step is a pure function of the registry state it is handed.

pub mod assign;
pub mod capability;
pub mod fairness;
pub mod selector;

pub use assign::{assign, AssignStats, Assignment};
pub use capability::{CapabilityMatcher, CapabilityResolver, TagExpression, TagMatcher};
pub use selector::{select_candidates, Availability, CandidatePool, Candidates};

use lockyard_errors::LockError;
use lockyard_registry::ResourceRegistry;
use lockyard_types::{Environment, RequirementGroup};

/// Full selection pipeline over one registry snapshot
#[derive(Debug, Clone, Copy)]
pub struct ResourceSelector<'a> {
    registry: &'a ResourceRegistry,
    resolver: CapabilityResolver<'a>,
    fair_selection: bool,
}

impl<'a> ResourceSelector<'a> {
    #[must_use]
    pub fn new(registry: &'a ResourceRegistry, matcher: &'a dyn CapabilityMatcher) -> Self {
        Self {
            registry,
            resolver: CapabilityResolver::new(matcher),
            fair_selection: false,
        }
    }

    /// Rank quantity-group candidates by contention before assigning
    #[must_use]
    pub fn fair_selection(mut self, enabled: bool) -> Self {
        self.fair_selection = enabled;
        self
    }

    #[must_use]
    pub fn resolver(&self) -> CapabilityResolver<'a> {
        self.resolver
    }

    /// Pick resources for `groups`; the result is sorted by registry index
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource` when a named resource does not exist and
    /// `Unsatisfiable` when no disjoint assignment is usable right now.
    pub fn select(
        &self,
        groups: &[RequirementGroup],
        environment: &Environment,
        availability: &Availability,
    ) -> Result<Vec<usize>, LockError> {
        let Candidates { fixed, mut pools } = select_candidates(
            self.registry,
            self.resolver,
            groups,
            environment,
            availability,
        )?;

        if self.fair_selection {
            for pool in &mut pools {
                fairness::rank(self.registry, availability, &mut pool.candidates);
            }
        }

        let assignment = assign(&pools, self.registry.len()).ok_or_else(|| {
            let short: Vec<String> = pools
                .iter()
                .filter(|p| p.candidates.len() < p.quantity)
                .map(|p| {
                    format!(
                        "{} ({} usable)",
                        groups[p.group],
                        p.candidates.len()
                    )
                })
                .collect();
            if short.is_empty() {
                LockError::unsatisfiable("no disjoint assignment of usable resources")
            } else {
                LockError::unsatisfiable(format!("not enough resources for {}", short.join(", ")))
            }
        })?;

        let mut selected: Vec<usize> = fixed.into_iter().chain(assignment.resources()).collect();
        selected.sort_unstable();
        selected.dedup();
        Ok(selected)
    }

    /// Names of the resources at `indices`
    #[must_use]
    pub fn names(&self, indices: &[usize]) -> Vec<String> {
        indices
            .iter()
            .map(|&idx| self.registry.at(idx).name.clone())
            .collect()
    }
}
