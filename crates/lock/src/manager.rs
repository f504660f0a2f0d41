//! The lock manager: sole owner of the registry and the wait queue.

use crate::continuation::{park, RequesterContinuation};
use crate::outcome::{AcquireOutcome, CancelOutcome, LockSettings, ReleaseOutcome};
use crate::queue::{QueueEntry, QueuedRequest, WaitQueue};
use chrono::{DateTime, Utc};
use lockyard_errors::{Error, LockError};
use lockyard_events::{
    AppEvent, EventEmitter, EventSender, FailureContext, LockEvent, QueueReason, RegistryEvent,
};
use lockyard_registry::{RegistryStore, ResourceRegistry};
use lockyard_resolver::{Availability, CapabilityMatcher, ResourceSelector, TagMatcher};
use lockyard_types::{
    ContextId, Environment, Grant, PendingClaim, QueuePrecedence, Requester, RequesterId,
    Resource, ResourceRequest, ResourceStatus,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Everything guarded by the manager's mutex
#[derive(Debug)]
pub(crate) struct LockState {
    pub(crate) registry: ResourceRegistry,
    pub(crate) queue: WaitQueue,
    pub(crate) next_ticket: u64,
    pub(crate) fair_selection: bool,
}

/// A grant whose requester still has to be resumed
pub(crate) struct Wakeup {
    continuation: Box<dyn RequesterContinuation>,
    grant: Grant,
}

impl Wakeup {
    /// Resume the requester; call only after the state lock is dropped
    pub(crate) fn deliver(self) -> Grant {
        let grant = self.grant.clone();
        self.continuation.resume(self.grant);
        grant
    }
}

/// Arbitrates access to the resources of one registry
///
/// Every operation runs under a single async mutex, so grants, releases and
/// administrative changes are totally ordered. The registry is saved
/// through the [`RegistryStore`] before the mutex is released; a failed
/// save is reported and never rolls back the in-memory state.
pub struct LockManager {
    pub(crate) state: Mutex<LockState>,
    pub(crate) store: Arc<dyn RegistryStore>,
    pub(crate) matcher: Arc<dyn CapabilityMatcher>,
    pub(crate) event_sender: Option<EventSender>,
    pub(crate) settings: LockSettings,
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl EventEmitter for LockManager {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

/// Registry indices holding a pending claim equal to `claim`
pub(crate) fn claim_indices(registry: &ResourceRegistry, claim: Option<&PendingClaim>) -> Vec<usize> {
    let Some(claim) = claim else {
        return Vec::new();
    };
    registry
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_claimed_by(claim))
        .map(|(idx, _)| idx)
        .collect()
}

/// Who or what keeps a resource from being free
pub(crate) fn describe_holder(resource: &Resource) -> String {
    match resource.status() {
        ResourceStatus::Reserved => format!(
            "reserved by {}",
            resource.reserved_by.as_deref().unwrap_or_default()
        ),
        ResourceStatus::Locked => match &resource.owner {
            Some(owner) => format!("locked by {owner}"),
            None => "locked".to_string(),
        },
        ResourceStatus::Claimed => match &resource.pending_claim {
            Some(claim) => format!("claimed by {claim}"),
            None => "claimed".to_string(),
        },
        ResourceStatus::Free => "free".to_string(),
    }
}

fn names_of(registry: &ResourceRegistry, indices: &[usize]) -> Vec<String> {
    indices
        .iter()
        .map(|&idx| registry.at(idx).name.clone())
        .collect()
}

fn millis_since(instant: DateTime<Utc>) -> u64 {
    u64::try_from((Utc::now() - instant).num_milliseconds()).unwrap_or(0)
}

fn collect_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let name = name.as_ref().trim();
        if !name.is_empty() && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}

impl LockManager {
    /// Manager over an empty registry using the default tag matcher
    #[must_use]
    pub fn new(store: Arc<dyn RegistryStore>, settings: LockSettings) -> Self {
        Self {
            state: Mutex::new(LockState {
                registry: ResourceRegistry::new(),
                queue: WaitQueue::default(),
                next_ticket: 1,
                fair_selection: settings.fair_selection,
            }),
            store,
            matcher: Arc::new(TagMatcher),
            event_sender: None,
            settings,
        }
    }

    /// Replace the capability predicate
    #[must_use]
    pub fn with_matcher(mut self, matcher: Arc<dyn CapabilityMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    #[must_use]
    pub fn settings(&self) -> LockSettings {
        self.settings
    }

    /// Replace the registry with the store's contents
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn load(&self) -> Result<usize, Error> {
        let resources = self.store.load().await?;
        let mut state = self.state.lock().await;
        state.registry = ResourceRegistry::from_resources(resources);
        let count = state.registry.len();
        self.emit_registry(RegistryEvent::Loaded { resources: count });
        Ok(count)
    }

    /// Add resource definitions that are not registered yet; returns how
    /// many were created
    pub async fn seed(&self, resources: impl IntoIterator<Item = Resource>) -> usize {
        let mut state = self.state.lock().await;
        let mut created = 0;
        for resource in resources {
            let name = resource.name.clone();
            let capabilities: Vec<String> = resource.capabilities.iter().cloned().collect();
            if state.registry.insert(resource) {
                created += 1;
                self.emit_registry(RegistryEvent::ResourceCreated {
                    name,
                    capabilities,
                    auto_created: false,
                });
            }
        }
        if created > 0 {
            self.persist(state.registry.snapshot()).await;
        }
        created
    }

    pub(crate) fn selector<'a>(&'a self, state: &'a LockState) -> ResourceSelector<'a> {
        ResourceSelector::new(&state.registry, self.matcher.as_ref())
            .fair_selection(state.fair_selection)
    }

    pub(crate) async fn persist(&self, snapshot: Vec<Resource>) {
        if let Err(e) = self.store.save(&snapshot).await {
            tracing::warn!(error = %e, "failed to persist resource registry, keeping in-memory state");
            self.emit_registry(RegistryEvent::PersistFailed {
                failure: FailureContext::from_error(&e),
            });
        }
    }

    /// Lock `indices` for `requester` and build the grant
    fn commit(
        state: &mut LockState,
        indices: &[usize],
        requester: &Requester,
        request: &ResourceRequest,
    ) -> Grant {
        for &idx in indices {
            let resource = state.registry.at_mut(idx);
            debug_assert!(resource.can_lock(), "selected resource must be lockable");
            resource.lock(requester.clone());
        }
        Grant::new(
            requester.clone(),
            names_of(&state.registry, indices),
            request.variable.as_deref(),
            request.precedence,
        )
    }

    /// Select and lock for `request` right now
    fn grant_now(
        &self,
        state: &mut LockState,
        request: &ResourceRequest,
        requester: &Requester,
    ) -> Result<Grant, LockError> {
        let allowed = claim_indices(&state.registry, request.claim.as_ref());
        let selected = self.selector(state).select(
            &request.groups,
            &request.environment,
            &Availability::free().allowing(allowed),
        )?;
        let grant = Self::commit(state, &selected, requester, request);
        self.emit_lock(LockEvent::Acquired {
            requester: requester.id.to_string(),
            context: requester.context.to_string(),
            resources: grant.resources.clone(),
            variable: grant
                .variable
                .as_ref()
                .map(|binding| format!("{}={}", binding.name, binding.value)),
        });
        Ok(grant)
    }

    /// Grant at most one queue entry
    ///
    /// `freed` lists resources that count as free for every entry; each
    /// entry additionally may use resources claimed by its own task.
    pub(crate) fn next_wakeup(
        &self,
        state: &mut LockState,
        precedence: QueuePrecedence,
        freed: &[usize],
    ) -> Option<Wakeup> {
        let mut chosen: Option<(usize, Vec<usize>)> = None;
        {
            let selector = self.selector(state);
            let mut newest: Option<DateTime<Utc>> = None;
            for (position, entry) in state.queue.iter().enumerate() {
                let availability = Availability::free()
                    .allowing(freed.iter().copied())
                    .allowing(claim_indices(&state.registry, entry.request.claim.as_ref()));
                let Ok(selected) = selector.select(
                    &entry.request.groups,
                    &entry.request.environment,
                    &availability,
                ) else {
                    continue;
                };
                match precedence {
                    QueuePrecedence::OldestFirst => {
                        chosen = Some((position, selected));
                        break;
                    }
                    QueuePrecedence::NewestFirst => {
                        let started = entry.requester.started_at;
                        if newest.is_none_or(|best| started > best) {
                            newest = Some(started);
                            chosen = Some((position, selected));
                        }
                    }
                }
            }
        }

        let (position, selected) = chosen?;
        let entry = state.queue.remove(position);
        let grant = Self::commit(state, &selected, &entry.requester, &entry.request)
            .with_ticket(entry.ticket);
        tracing::debug!(
            ticket = entry.ticket,
            requester = %entry.requester,
            %precedence,
            "queued request granted"
        );
        self.emit_linked(
            AppEvent::Lock(LockEvent::Woken {
                requester: entry.requester.id.to_string(),
                context: entry.requester.context.to_string(),
                ticket: entry.ticket,
                resources: grant.resources.clone(),
                waited_ms: millis_since(entry.admitted_at),
            }),
            Some(entry.admission_event),
        );
        Some(Wakeup {
            continuation: entry.continuation,
            grant,
        })
    }

    /// Lock the resources for `request` now, without queueing
    ///
    /// Resources claimed by the request's own task count as free.
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource`, `Unsatisfiable` or `InvalidRequest`.
    pub async fn try_acquire(
        &self,
        request: &ResourceRequest,
        requester: &Requester,
    ) -> Result<Grant, LockError> {
        request.validate()?;
        let mut state = self.state.lock().await;
        let grant = self.grant_now(&mut state, request, requester)?;
        self.persist(state.registry.snapshot()).await;
        Ok(grant)
    }

    /// Lock the resources now or queue the request
    ///
    /// A context that already waits keeps its entry: the new submission is
    /// reported as merged and `continuation` is dropped. When the request is
    /// granted immediately, a stale entry of the same context is withdrawn.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for malformed requests.
    pub async fn acquire_or_queue(
        &self,
        request: &ResourceRequest,
        requester: &Requester,
        continuation: Box<dyn RequesterContinuation>,
    ) -> Result<AcquireOutcome, LockError> {
        request.validate()?;
        let mut state = self.state.lock().await;

        let created = if self.settings.auto_create_resources {
            self.auto_create(&mut state, request)
        } else {
            false
        };

        let reason = match self.grant_now(&mut state, request, requester) {
            Ok(grant) => {
                if let Some(position) = state.queue.position_of(&requester.context) {
                    let stale = state.queue.remove(position);
                    self.emit_lock(LockEvent::Withdrawn {
                        requester: stale.requester.id.to_string(),
                        context: stale.requester.context.to_string(),
                        ticket: stale.ticket,
                    });
                }
                self.persist(state.registry.snapshot()).await;
                return Ok(AcquireOutcome::Granted(grant));
            }
            Err(LockError::UnknownResource { names }) => QueueReason::UnknownResources { names },
            Err(LockError::Unsatisfiable { reason }) => QueueReason::Busy { detail: reason },
            Err(other) => return Err(other),
        };

        if created {
            self.persist(state.registry.snapshot()).await;
        }

        if let Some(position) = state.queue.position_of(&requester.context) {
            let (ticket, reason) = state
                .queue
                .get(position)
                .map(|entry| (entry.ticket, entry.reason.clone()))
                .unwrap_or((0, reason));
            self.emit_lock(LockEvent::AdmissionMerged {
                requester: requester.id.to_string(),
                context: requester.context.to_string(),
                ticket,
            });
            return Ok(AcquireOutcome::Queued {
                ticket,
                reason,
                merged: true,
            });
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        let position = state.queue.len();
        let admission_event = self.emit_linked(
            AppEvent::Lock(LockEvent::Queued {
                requester: requester.id.to_string(),
                context: requester.context.to_string(),
                ticket,
                request: request.to_string(),
                reason: reason.clone(),
                position,
            }),
            None,
        );
        state.queue.push(QueueEntry {
            ticket,
            requester: requester.clone(),
            request: request.clone(),
            reason: reason.clone(),
            admitted_at: Utc::now(),
            admission_event,
            continuation,
        });
        Ok(AcquireOutcome::Queued {
            ticket,
            reason,
            merged: false,
        })
    }

    /// Acquire, waiting in the queue when needed
    ///
    /// Wrap in `tokio::time::timeout` and call [`LockManager::withdraw`] on
    /// expiry to bound the wait.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateAdmission` when the context already waits,
    /// `Cancelled` when the entry is withdrawn, and request errors from
    /// [`LockManager::acquire_or_queue`].
    pub async fn acquire_or_wait(
        &self,
        request: &ResourceRequest,
        requester: &Requester,
    ) -> Result<Grant, Error> {
        let (parked, receiver) = park();
        match self
            .acquire_or_queue(request, requester, Box::new(parked))
            .await?
        {
            AcquireOutcome::Granted(grant) => Ok(grant),
            AcquireOutcome::Queued {
                ticket,
                merged: true,
                ..
            } => Err(LockError::DuplicateAdmission {
                context: requester.context.to_string(),
                ticket,
            }
            .into()),
            AcquireOutcome::Queued { .. } => receiver.wait().await,
        }
    }

    /// Create unknown named resources of `request`; true if any was created
    fn auto_create(&self, state: &mut LockState, request: &ResourceRequest) -> bool {
        let unknown = state.registry.unknown_names(request.named_resources());
        for name in &unknown {
            if state.registry.create(name, BTreeSet::new()) {
                tracing::debug!(resource = %name, "auto-created resource");
                self.emit_registry(RegistryEvent::ResourceCreated {
                    name: name.clone(),
                    capabilities: Vec::new(),
                    auto_created: true,
                });
            }
        }
        !unknown.is_empty()
    }

    /// Free every listed resource owned by `owner`, then grant at most one
    /// queue entry
    ///
    /// Resources that are unknown, free or owned by someone else are skipped.
    pub async fn release<I, S>(
        &self,
        owner: &RequesterId,
        resources: I,
        precedence: QueuePrecedence,
    ) -> ReleaseOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = collect_names(resources);
        let mut state = self.state.lock().await;

        let mut freed = Vec::new();
        for name in &names {
            let Some(idx) = state.registry.index_of(name) else {
                continue;
            };
            let resource = state.registry.at_mut(idx);
            if resource.is_locked_by(owner) {
                resource.unlock();
                freed.push(idx);
            }
        }
        if freed.is_empty() {
            tracing::debug!(%owner, "release found nothing to free");
            return ReleaseOutcome::default();
        }

        let released = names_of(&state.registry, &freed);
        self.emit_lock(LockEvent::Released {
            requester: owner.to_string(),
            resources: released.clone(),
        });

        let wakeup = self.next_wakeup(&mut state, precedence, &freed);
        self.persist(state.registry.snapshot()).await;
        drop(state);

        ReleaseOutcome {
            released,
            woken: wakeup.map(Wakeup::deliver),
        }
    }

    /// Release everything a grant locked, with the grant's precedence
    pub async fn release_grant(&self, grant: &Grant) -> ReleaseOutcome {
        self.release(&grant.requester.id, &grant.resources, grant.precedence)
            .await
    }

    /// Run one wake-up scan with nothing freshly freed
    pub async fn poll_queue(&self, precedence: QueuePrecedence) -> Option<Grant> {
        let mut state = self.state.lock().await;
        let wakeup = self.next_wakeup(&mut state, precedence, &[])?;
        self.persist(state.registry.snapshot()).await;
        drop(state);
        Some(wakeup.deliver())
    }

    /// Drop a queued entry without resuming it; false if there was none
    pub async fn withdraw(&self, context: &ContextId) -> bool {
        let mut state = self.state.lock().await;
        let Some(position) = state.queue.position_of(context) else {
            return false;
        };
        let entry = state.queue.remove(position);
        self.emit_lock(LockEvent::Withdrawn {
            requester: entry.requester.id.to_string(),
            context: entry.requester.context.to_string(),
            ticket: entry.ticket,
        });
        true
    }

    /// Withdraw every entry of an execution and release all it owns
    pub async fn cancel_requester(&self, requester: &RequesterId) -> CancelOutcome {
        let mut state = self.state.lock().await;

        let withdrawn: Vec<u64> = state
            .queue
            .drain_requester(requester)
            .into_iter()
            .map(|entry| {
                self.emit_lock(LockEvent::Withdrawn {
                    requester: entry.requester.id.to_string(),
                    context: entry.requester.context.to_string(),
                    ticket: entry.ticket,
                });
                entry.ticket
            })
            .collect();

        let freed: Vec<usize> = state
            .registry
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_locked_by(requester))
            .map(|(idx, _)| idx)
            .collect();
        if freed.is_empty() {
            return CancelOutcome {
                withdrawn,
                ..CancelOutcome::default()
            };
        }
        for &idx in &freed {
            state.registry.at_mut(idx).unlock();
        }
        let released = names_of(&state.registry, &freed);
        self.emit_lock(LockEvent::Released {
            requester: requester.to_string(),
            resources: released.clone(),
        });

        let wakeup = self.next_wakeup(&mut state, self.settings.default_precedence, &freed);
        self.persist(state.registry.snapshot()).await;
        drop(state);

        CancelOutcome {
            released,
            withdrawn,
            woken: wakeup.map(Wakeup::deliver),
        }
    }

    /// Place an administrative hold on free resources
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource`, or `ReservationConflict` naming the first
    /// resource that is not free; nothing changes in either case.
    pub async fn reserve<I, S>(&self, resources: I, by: &str) -> Result<(), LockError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = collect_names(resources);
        let mut state = self.state.lock().await;
        Self::check_known(&state.registry, &names)?;

        for name in &names {
            if let Some(resource) = state.registry.get(name) {
                if !resource.is_free() {
                    return Err(LockError::ReservationConflict {
                        resource: name.clone(),
                        holder: describe_holder(resource),
                    });
                }
            }
        }
        for name in &names {
            if let Some(resource) = state.registry.get_mut(name) {
                resource.reserve(by);
            }
        }
        self.emit_lock(LockEvent::Reserved {
            by: by.to_string(),
            resources: names,
        });
        self.persist(state.registry.snapshot()).await;
        Ok(())
    }

    /// Remove administrative holds, then grant at most one queue entry
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource` if any name is not registered.
    pub async fn unreserve<I, S>(&self, resources: I) -> Result<ReleaseOutcome, LockError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = collect_names(resources);
        let mut state = self.state.lock().await;
        Self::check_known(&state.registry, &names)?;

        let mut freed = Vec::new();
        for name in &names {
            if let Some(idx) = state.registry.index_of(name) {
                let resource = state.registry.at_mut(idx);
                if resource.is_reserved() {
                    resource.unreserve();
                    freed.push(idx);
                }
            }
        }
        let released = names_of(&state.registry, &freed);
        self.emit_lock(LockEvent::Unreserved {
            resources: released.clone(),
        });
        Ok(self.finish_freeing(state, released, &freed).await)
    }

    /// Clear owner, claim and reservation unconditionally, then grant at
    /// most one queue entry
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource` if any name is not registered.
    pub async fn reset<I, S>(&self, resources: I) -> Result<ReleaseOutcome, LockError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = collect_names(resources);
        let mut state = self.state.lock().await;
        Self::check_known(&state.registry, &names)?;

        let mut freed = Vec::new();
        for name in &names {
            if let Some(idx) = state.registry.index_of(name) {
                let resource = state.registry.at_mut(idx);
                if !resource.is_free() {
                    resource.reset();
                    freed.push(idx);
                }
            }
        }
        let released = names_of(&state.registry, &freed);
        self.emit_lock(LockEvent::Reset {
            resources: released.clone(),
        });
        Ok(self.finish_freeing(state, released, &freed).await)
    }

    async fn finish_freeing(
        &self,
        mut state: tokio::sync::MutexGuard<'_, LockState>,
        released: Vec<String>,
        freed: &[usize],
    ) -> ReleaseOutcome {
        let wakeup = if freed.is_empty() {
            None
        } else {
            self.next_wakeup(&mut state, self.settings.default_precedence, freed)
        };
        self.persist(state.registry.snapshot()).await;
        drop(state);
        ReleaseOutcome {
            released,
            woken: wakeup.map(Wakeup::deliver),
        }
    }

    fn check_known(registry: &ResourceRegistry, names: &[String]) -> Result<(), LockError> {
        let unknown = registry.unknown_names(names.iter().map(String::as_str));
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(LockError::UnknownResource { names: unknown })
        }
    }

    /// Register a new free resource; a waiting request may be granted
    ///
    /// # Errors
    ///
    /// Returns `ResourceExists` for taken names and `InvalidRequest` for
    /// blank ones.
    pub async fn create_resource(
        &self,
        name: &str,
        capabilities: BTreeSet<String>,
        description: Option<String>,
    ) -> Result<(), LockError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LockError::InvalidRequest {
                message: "resource name must not be empty".to_string(),
            });
        }
        let mut resource = Resource::new(name).with_capabilities(capabilities);
        resource.description = description;
        let capabilities: Vec<String> = resource.capabilities.iter().cloned().collect();

        let mut state = self.state.lock().await;
        if !state.registry.insert(resource) {
            return Err(LockError::ResourceExists {
                resource: name.to_string(),
            });
        }
        self.emit_registry(RegistryEvent::ResourceCreated {
            name: name.to_string(),
            capabilities,
            auto_created: false,
        });
        self.finish_admin_change(state).await;
        Ok(())
    }

    /// Remove a resource nobody owns or reserved
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource` or `ResourceInUse`.
    pub async fn delete_resource(&self, name: &str) -> Result<Resource, LockError> {
        let mut state = self.state.lock().await;
        let removed = state.registry.delete(name)?;
        self.emit_registry(RegistryEvent::ResourceDeleted {
            name: removed.name.clone(),
        });
        self.persist(state.registry.snapshot()).await;
        Ok(removed)
    }

    /// Replace the capability tags of a resource
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource` for missing names.
    pub async fn set_capabilities(
        &self,
        name: &str,
        capabilities: BTreeSet<String>,
    ) -> Result<(), LockError> {
        let mut state = self.state.lock().await;
        let tags: Vec<String> = capabilities.iter().cloned().collect();
        state.registry.set_capabilities(name, capabilities)?;
        self.emit_registry(RegistryEvent::CapabilitiesChanged {
            name: name.to_string(),
            capabilities: tags,
        });
        self.finish_admin_change(state).await;
        Ok(())
    }

    /// Persist, then give the queue a chance at the changed registry
    async fn finish_admin_change(&self, mut state: tokio::sync::MutexGuard<'_, LockState>) {
        let wakeup = self.next_wakeup(&mut state, self.settings.default_precedence, &[]);
        self.persist(state.registry.snapshot()).await;
        drop(state);
        if let Some(wakeup) = wakeup {
            wakeup.deliver();
        }
    }

    pub async fn set_fair_selection(&self, enabled: bool) {
        let mut state = self.state.lock().await;
        if state.fair_selection != enabled {
            state.fair_selection = enabled;
            self.emit_registry(RegistryEvent::FairSelectionChanged { enabled });
        }
    }

    pub async fn fair_selection(&self) -> bool {
        self.state.lock().await.fair_selection
    }

    /// Snapshot of every resource in registry order
    pub async fn resources(&self) -> Vec<Resource> {
        self.state.lock().await.registry.snapshot()
    }

    pub async fn resource(&self, name: &str) -> Option<Resource> {
        self.state.lock().await.registry.get(name).cloned()
    }

    /// Snapshot of the wait queue in admission order
    pub async fn queue(&self) -> Vec<QueuedRequest> {
        self.state.lock().await.queue.snapshot()
    }

    pub async fn queue_len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    /// Names of the resources owned by `requester`
    pub async fn locked_by(&self, requester: &RequesterId) -> Vec<String> {
        self.state
            .lock()
            .await
            .registry
            .locked_by(requester)
            .map(|r| r.name.clone())
            .collect()
    }

    /// Every capability tag in use, optionally with resource names
    pub async fn capabilities(&self, with_names: bool) -> BTreeSet<String> {
        self.state.lock().await.registry.all_capabilities(with_names)
    }

    /// How many resources matching `expression` are free
    pub async fn free_amount(&self, expression: &str, environment: &Environment) -> usize {
        let state = self.state.lock().await;
        let selector = self.selector(&state);
        selector
            .resolver()
            .resolve(&state.registry, expression, environment)
            .into_iter()
            .filter(|&idx| state.registry.at(idx).is_free())
            .count()
    }

    /// What `request` would be granted, without locking anything
    ///
    /// With `only_free` unset, resource state is ignored entirely.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`LockManager::try_acquire`].
    pub async fn preview(
        &self,
        request: &ResourceRequest,
        only_free: bool,
    ) -> Result<Vec<String>, LockError> {
        request.validate()?;
        let state = self.state.lock().await;
        let availability = if only_free {
            Availability::free().allowing(claim_indices(&state.registry, request.claim.as_ref()))
        } else {
            Availability::any()
        };
        let selector = self.selector(&state);
        let selected = selector.select(&request.groups, &request.environment, &availability)?;
        Ok(selector.names(&selected))
    }
}
