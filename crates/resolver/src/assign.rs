//! Exact backtracking assignment of disjoint resources to quantity groups.

use crate::selector::CandidatePool;

/// Search counters, logged at debug level
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AssignStats {
    pub nodes: u64,
    pub backtracks: u64,
}

/// Disjoint picks, one list per pool in pool order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub picks: Vec<Vec<usize>>,
    pub stats: AssignStats,
}

impl Assignment {
    /// Every picked registry index
    pub fn resources(&self) -> impl Iterator<Item = usize> + '_ {
        self.picks.iter().flatten().copied()
    }
}

struct Search<'a> {
    pools: &'a [CandidatePool],
    used: Vec<bool>,
    picks: Vec<Vec<usize>>,
    stats: AssignStats,
}

impl Search<'_> {
    /// Fill pool `pool` with `remaining` more picks taken at or after
    /// `cursor`, then every later pool
    fn run(&mut self, pool: usize, remaining: usize, cursor: usize) -> bool {
        self.stats.nodes += 1;

        let Some(current) = self.pools.get(pool) else {
            return true;
        };
        if remaining == 0 {
            let next = self.pools.get(pool + 1).map_or(0, |p| p.quantity);
            return self.run(pool + 1, next, 0);
        }

        let candidates = &current.candidates;
        let available = candidates
            .iter()
            .skip(cursor)
            .filter(|&&idx| !self.used[idx])
            .count();
        if remaining > available {
            self.stats.backtracks += 1;
            return false;
        }

        for position in cursor..candidates.len() {
            let idx = candidates[position];
            if self.used[idx] {
                continue;
            }
            self.used[idx] = true;
            self.picks[pool].push(idx);
            if self.run(pool, remaining - 1, position + 1) {
                return true;
            }
            self.picks[pool].pop();
            self.used[idx] = false;
            self.stats.backtracks += 1;
        }
        false
    }
}

/// Find a disjoint assignment satisfying every pool's quantity
///
/// `universe` bounds every candidate index. Candidates are tried in pool
/// order, so the first solution is deterministic for a given input.
#[must_use]
pub fn assign(pools: &[CandidatePool], universe: usize) -> Option<Assignment> {
    let mut search = Search {
        pools,
        used: vec![false; universe],
        picks: vec![Vec::new(); pools.len()],
        stats: AssignStats::default(),
    };
    let first = pools.first().map_or(0, |p| p.quantity);
    let found = search.run(0, first, 0);

    tracing::debug!(
        pools = pools.len(),
        nodes = search.stats.nodes,
        backtracks = search.stats.backtracks,
        found,
        "assignment search finished"
    );

    found.then(|| Assignment {
        picks: search.picks,
        stats: search.stats,
    })
}
