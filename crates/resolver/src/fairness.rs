//! Contention-based ordering of quantity-group candidates.

use crate::selector::Availability;
use lockyard_registry::ResourceRegistry;

/// Cost of handing out `idx` from a pool of `pool_size` candidates
///
/// Siblings are every resource sharing an explicit capability with the
/// candidate, the candidate included. Busy siblings make a candidate more
/// expensive; so does carrying many capabilities.
#[must_use]
pub fn cost(
    registry: &ResourceRegistry,
    availability: &Availability,
    idx: usize,
    pool_size: usize,
) -> usize {
    let resource = registry.at(idx);
    let mut n_max = 0usize;
    let mut n_free = 0usize;
    for (other_idx, other) in registry.iter().enumerate() {
        if other_idx == idx || resource.shares_capability_with(other) {
            n_max += 1;
            if availability.admits(registry, other_idx) {
                n_free += 1;
            }
        }
    }
    (n_max - n_free) * (pool_size / n_max) + resource.capabilities.len()
}

/// Stable ascending sort of `candidates` by [`cost`]
pub fn rank(registry: &ResourceRegistry, availability: &Availability, candidates: &mut [usize]) {
    let pool_size = candidates.len();
    let mut costed: Vec<(usize, usize)> = candidates
        .iter()
        .map(|&idx| (cost(registry, availability, idx, pool_size), idx))
        .collect();
    costed.sort_by_key(|&(cost, _)| cost);

    if tracing::enabled!(tracing::Level::TRACE) {
        for (cost, idx) in &costed {
            tracing::trace!(resource = %registry.at(*idx).name, cost, "candidate cost");
        }
    }

    for (slot, (_, idx)) in candidates.iter_mut().zip(costed) {
        *slot = idx;
    }
}
