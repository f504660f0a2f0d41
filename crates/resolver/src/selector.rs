//! Candidate selection: narrows the registry to the resources each
//! requirement group may use.

use crate::capability::CapabilityResolver;
use lockyard_errors::LockError;
use lockyard_registry::ResourceRegistry;
use lockyard_types::{Environment, GroupSelector, RequirementGroup};
use std::collections::BTreeSet;

/// Which resources count as usable for a selection
#[derive(Debug, Clone, Default)]
pub struct Availability {
    must_be_free: bool,
    allowed: BTreeSet<usize>,
}

impl Availability {
    /// Every resource is usable (preview of what a request would match)
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Only free resources are usable
    #[must_use]
    pub fn free() -> Self {
        Self {
            must_be_free: true,
            allowed: BTreeSet::new(),
        }
    }

    /// Also accept these registry indices as long as nobody owns or
    /// reserved them
    #[must_use]
    pub fn allowing(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.allowed.extend(indices);
        self
    }

    #[must_use]
    pub fn must_be_free(&self) -> bool {
        self.must_be_free
    }

    /// Whether the resource at `idx` may be handed out
    #[must_use]
    pub fn admits(&self, registry: &ResourceRegistry, idx: usize) -> bool {
        if !self.must_be_free {
            return true;
        }
        let resource = registry.at(idx);
        resource.is_free() || (self.allowed.contains(&idx) && resource.can_lock())
    }
}

/// One capability group that still needs a choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePool {
    /// Index of the group in the request
    pub group: usize,
    /// Usable candidates, registry order until ranked
    pub candidates: Vec<usize>,
    pub quantity: usize,
}

/// Outcome of candidate selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidates {
    /// Resources that are part of the result no matter what: name groups
    /// and quantity-0 groups
    pub fixed: BTreeSet<usize>,
    /// Quantity groups left to the assigner
    pub pools: Vec<CandidatePool>,
}

/// Select candidates for every group of a request
///
/// Name groups are resolved first, then quantity-0 groups, then quantity
/// groups. Resources taken by an earlier pass are not offered again.
///
/// # Errors
///
/// - `UnknownResource` listing every unknown name of the request
/// - `Unsatisfiable` when a named resource or a member of an "all" group is
///   not usable
pub fn select_candidates(
    registry: &ResourceRegistry,
    resolver: CapabilityResolver<'_>,
    groups: &[RequirementGroup],
    environment: &Environment,
    availability: &Availability,
) -> Result<Candidates, LockError> {
    let unknown =
        registry.unknown_names(groups.iter().flat_map(|g| g.resource_names()).map(String::as_str));
    if !unknown.is_empty() {
        return Err(LockError::UnknownResource { names: unknown });
    }

    let mut fixed = BTreeSet::new();
    for group in groups {
        if let GroupSelector::Names(names) = &group.selector {
            for name in names {
                let Some(idx) = registry.index_of(name) else {
                    continue;
                };
                if !availability.admits(registry, idx) {
                    return Err(LockError::unsatisfiable(format!(
                        "resource {name} is {}",
                        registry.at(idx).status()
                    )));
                }
                fixed.insert(idx);
            }
        }
    }

    for group in groups.iter().filter(|g| g.quantity == 0) {
        let Some(expression) = group.expression() else {
            continue;
        };
        let matches: Vec<usize> = resolver
            .resolve(registry, expression, environment)
            .into_iter()
            .filter(|idx| !fixed.contains(idx))
            .collect();
        if let Some(&busy) = matches.iter().find(|&&idx| !availability.admits(registry, idx)) {
            return Err(LockError::unsatisfiable(format!(
                "{group} needs {} which is {}",
                registry.at(busy).name,
                registry.at(busy).status()
            )));
        }
        fixed.extend(matches);
    }

    let mut pools = Vec::new();
    for (position, group) in groups.iter().enumerate() {
        if group.quantity == 0 {
            continue;
        }
        let Some(expression) = group.expression() else {
            continue;
        };
        let candidates = resolver
            .resolve(registry, expression, environment)
            .into_iter()
            .filter(|idx| !fixed.contains(idx) && availability.admits(registry, *idx))
            .collect();
        pools.push(CandidatePool {
            group: position,
            candidates,
            quantity: group.quantity as usize,
        });
    }

    Ok(Candidates { fixed, pools })
}
