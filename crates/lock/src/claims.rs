//! Scheduler-level claims placed before an execution exists.
//!
//! A claim marks free resources for one queued task of a project so the
//! task's later acquisition finds them available. Only one task per project
//! holds claims at a time.

use crate::manager::{claim_indices, LockManager, Wakeup};
use crate::outcome::{ClaimOutcome, ReleaseOutcome};
use lockyard_errors::LockError;
use lockyard_events::{EventEmitter, LockEvent};
use lockyard_registry::ResourceRegistry;
use lockyard_resolver::Availability;
use lockyard_types::{PendingClaim, ResourceRequest};

impl LockManager {
    /// Claim resources for `request` on behalf of task `task_id` of `project`
    ///
    /// Claims the task already holds stay usable; those the new selection
    /// does not need are dropped. When nothing suitable is free, every claim
    /// of the task is dropped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for malformed requests.
    pub async fn claim(
        &self,
        project: &str,
        task_id: u64,
        request: &ResourceRequest,
    ) -> Result<ClaimOutcome, LockError> {
        request.validate()?;
        let mut state = self.state.lock().await;

        let ahead = state
            .registry
            .iter()
            .find(|r| r.is_claimed_by_other_task(project, task_id))
            .and_then(|r| r.pending_claim.as_ref())
            .map(|claim| claim.task_id);
        if let Some(ahead_task_id) = ahead {
            self.emit_lock(LockEvent::ClaimBlocked {
                project: project.to_string(),
                task_id,
                ahead_task_id,
            });
            return Ok(ClaimOutcome::AnotherClaimAhead {
                task_id: ahead_task_id,
            });
        }

        let own = PendingClaim::new(project, task_id);
        let held = claim_indices(&state.registry, Some(&own));
        let selection = self.selector(&state).select(
            &request.groups,
            &request.environment,
            &Availability::free().allowing(held.iter().copied()),
        );

        match selection {
            Ok(selected) => {
                for &idx in held.iter().filter(|idx| !selected.contains(idx)) {
                    state.registry.at_mut(idx).clear_claim();
                }
                for &idx in &selected {
                    state.registry.at_mut(idx).claim(own.clone());
                }
                let names: Vec<String> = selected
                    .iter()
                    .map(|&idx| state.registry.at(idx).name.clone())
                    .collect();
                self.emit_lock(LockEvent::Claimed {
                    project: project.to_string(),
                    task_id,
                    resources: names.clone(),
                });
                self.persist(state.registry.snapshot()).await;
                Ok(ClaimOutcome::Claimed(names))
            }
            Err(e @ (LockError::Unsatisfiable { .. } | LockError::UnknownResource { .. })) => {
                if !held.is_empty() {
                    let names = drop_claims(&mut state.registry, &held);
                    self.emit_lock(LockEvent::ClaimReleased {
                        project: project.to_string(),
                        task_id,
                        resources: names,
                    });
                    self.persist(state.registry.snapshot()).await;
                }
                Ok(ClaimOutcome::Insufficient {
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Drop every claim of a task; a waiting request may be granted
    pub async fn release_claims(&self, project: &str, task_id: u64) -> ReleaseOutcome {
        let mut state = self.state.lock().await;
        let own = PendingClaim::new(project, task_id);
        let held = claim_indices(&state.registry, Some(&own));
        if held.is_empty() {
            return ReleaseOutcome::default();
        }

        let released = drop_claims(&mut state.registry, &held);
        self.emit_lock(LockEvent::ClaimReleased {
            project: project.to_string(),
            task_id,
            resources: released.clone(),
        });

        let wakeup = self.next_wakeup(&mut state, self.settings.default_precedence, &held);
        self.persist(state.registry.snapshot()).await;
        drop(state);

        ReleaseOutcome {
            released,
            woken: wakeup.map(Wakeup::deliver),
        }
    }
}

fn drop_claims(registry: &mut ResourceRegistry, indices: &[usize]) -> Vec<String> {
    indices
        .iter()
        .map(|&idx| {
            let resource = registry.at_mut(idx);
            resource.clear_claim();
            resource.name.clone()
        })
        .collect()
}
