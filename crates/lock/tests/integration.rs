//! Integration tests for lock crate

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use lockyard_errors::{Error, LockError};
    use lockyard_events::{AppEvent, LockEvent, RegistryEvent};
    use lockyard_lock::*;
    use lockyard_registry::{JsonFileStore, MemoryStore, RegistryStore};
    use lockyard_types::{
        ContextId, Environment, QueuePrecedence, Requester, RequesterId, Resource,
        ResourceRequest, ResourceStatus,
    };
    use std::collections::{BTreeSet, HashSet};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn requester(id: &str) -> Requester {
        Requester::new(id, Utc::now())
    }

    fn names(list: &[&str]) -> ResourceRequest {
        ResourceRequest::new().with_names(list.iter().copied())
    }

    async fn manager_with(resources: Vec<Resource>) -> (LockManager, Arc<MemoryStore>) {
        manager_with_settings(resources, LockSettings::default()).await
    }

    async fn manager_with_settings(
        resources: Vec<Resource>,
        settings: LockSettings,
    ) -> (LockManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_resources(resources));
        let manager = LockManager::new(store.clone(), settings);
        manager.load().await.unwrap();
        (manager, store)
    }

    fn plain(list: &[&str]) -> Vec<Resource> {
        list.iter().map(|name| Resource::new(*name)).collect()
    }

    async fn queue_parked(
        manager: &LockManager,
        request: &ResourceRequest,
        who: &Requester,
    ) -> (AcquireOutcome, GrantReceiver) {
        let (parked, receiver) = park();
        let outcome = manager
            .acquire_or_queue(request, who, Box::new(parked))
            .await
            .unwrap();
        (outcome, receiver)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requesters_never_share_a_resource() {
        let (manager, _) = manager_with(plain(&["r1", "r2", "r3", "r4"])).await;
        let manager = Arc::new(manager);
        let held: Arc<Mutex<HashSet<String>>> = Arc::default();

        let tasks = (0..24).map(|i| {
            let manager = manager.clone();
            let held = held.clone();
            tokio::spawn(async move {
                let wanted = [format!("r{}", i % 4 + 1), format!("r{}", (i + 1) % 4 + 1)];
                let request = ResourceRequest::new().with_names(wanted);
                let grant = manager
                    .acquire_or_wait(&request, &requester(&format!("job#{i}")))
                    .await
                    .unwrap();
                {
                    let mut held = held.lock().unwrap();
                    for name in &grant.resources {
                        assert!(held.insert(name.clone()), "{name} granted twice");
                    }
                }
                tokio::time::sleep(std::time::Duration::from_millis(2)).await;
                {
                    let mut held = held.lock().unwrap();
                    for name in &grant.resources {
                        held.remove(name);
                    }
                }
                manager.release_grant(&grant).await;
            })
        });
        for result in futures::future::join_all(tasks).await {
            result.unwrap();
        }

        assert_eq!(manager.queue_len().await, 0);
        assert!(manager
            .resources()
            .await
            .iter()
            .all(|r| r.status() == ResourceStatus::Free));
    }

    #[tokio::test]
    async fn test_all_or_nothing() {
        let (manager, _) = manager_with(plain(&["r1", "r2"])).await;
        manager
            .try_acquire(&names(&["r1"]), &requester("job#1"))
            .await
            .unwrap();

        let err = manager
            .try_acquire(&names(&["r1", "r2"]), &requester("job#2"))
            .await
            .unwrap_err();
        assert!(matches!(err, LockError::Unsatisfiable { .. }));
        assert!(manager.resource("r2").await.unwrap().is_free());
    }

    #[tokio::test]
    async fn test_capability_groups_on_acquire() {
        let printers = vec![
            Resource::new("p1").with_capabilities(["pr"]),
            Resource::new("p2").with_capabilities(["pr"]),
            Resource::new("p3").with_capabilities(["pr"]),
        ];
        let (manager, _) = manager_with(printers).await;
        manager
            .try_acquire(&names(&["p2"]), &requester("job#1"))
            .await
            .unwrap();

        // quantity 0 wants every match, so one busy printer blocks the lot
        let all = ResourceRequest::new().with_capability("pr", 0);
        let err = manager
            .try_acquire(&all, &requester("job#2"))
            .await
            .unwrap_err();
        assert!(matches!(err, LockError::Unsatisfiable { .. }));
        assert!(manager.resource("p1").await.unwrap().is_free());
        assert!(manager.resource("p3").await.unwrap().is_free());

        let two = ResourceRequest::new()
            .with_capability("pr", 1)
            .with_capability("pr", 1);
        let grant = manager.try_acquire(&two, &requester("job#3")).await.unwrap();
        assert_eq!(grant.resources, ["p1", "p3"]);

        let mixed = names(&["does-not-exist"]).with_capability("pr", 1);
        let err = manager
            .try_acquire(&mixed, &requester("job#4"))
            .await
            .unwrap_err();
        assert!(matches!(err, LockError::UnknownResource { .. }));
    }

    #[tokio::test]
    async fn test_variable_and_ticket_on_grants() {
        let (manager, _) = manager_with(plain(&["b", "a"])).await;
        let grant = manager
            .try_acquire(
                &names(&["b", "a"]).with_variable("LOCKED"),
                &requester("job#1"),
            )
            .await
            .unwrap();
        assert_eq!(grant.resources, ["a", "b"]);
        assert_eq!(grant.variable.unwrap().value, "a,b");
        assert_eq!(grant.ticket, None);
    }

    #[tokio::test]
    async fn test_oldest_first_wakeups() {
        let (manager, _) = manager_with(plain(&["r1"])).await;
        let holder = manager
            .try_acquire(&names(&["r1"]), &requester("holder"))
            .await
            .unwrap();

        let mut receivers = Vec::new();
        for id in ["a", "b", "c"] {
            let (outcome, receiver) = queue_parked(&manager, &names(&["r1"]), &requester(id)).await;
            assert!(matches!(
                outcome,
                AcquireOutcome::Queued {
                    reason: QueueReason::Busy { .. },
                    merged: false,
                    ..
                }
            ));
            receivers.push(receiver);
        }
        let tickets: Vec<u64> = manager.queue().await.iter().map(|q| q.ticket).collect();
        assert_eq!(tickets, [1, 2, 3]);

        let mut previous = holder;
        for (expected, receiver) in ["a", "b", "c"].into_iter().zip(receivers) {
            let outcome = manager.release_grant(&previous).await;
            assert_eq!(outcome.released, ["r1"]);
            let grant = receiver.wait().await.unwrap();
            assert_eq!(grant.requester.id.as_str(), expected);
            assert_eq!(outcome.woken.as_ref(), Some(&grant));
            previous = grant;
        }
        assert_eq!(manager.queue_len().await, 0);
    }

    #[tokio::test]
    async fn test_one_release_grants_at_most_one_waiter() {
        let (manager, _) = manager_with(plain(&["r1", "r2"])).await;
        let holder = manager
            .try_acquire(&names(&["r1", "r2"]), &requester("holder"))
            .await
            .unwrap();
        let (_, first) = queue_parked(&manager, &names(&["r1"]), &requester("a")).await;
        let (_, second) = queue_parked(&manager, &names(&["r2"]), &requester("b")).await;

        let outcome = manager.release_grant(&holder).await;
        assert_eq!(outcome.released, ["r1", "r2"]);
        let woken = outcome.woken.unwrap();
        assert_eq!(woken.requester.id.as_str(), "a");
        assert_eq!(first.wait().await.unwrap(), woken);
        assert_eq!(manager.queue_len().await, 1);
        assert!(manager.resource("r2").await.unwrap().is_free());

        let polled = manager
            .poll_queue(QueuePrecedence::OldestFirst)
            .await
            .unwrap();
        assert_eq!(polled.requester.id.as_str(), "b");
        assert_eq!(polled.resources, ["r2"]);
        assert_eq!(second.wait().await.unwrap(), polled);
        assert_eq!(manager.queue_len().await, 0);
        assert!(manager
            .poll_queue(QueuePrecedence::OldestFirst)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_wakeup_event_links_to_admission() {
        let (manager, _) = manager_with(plain(&["r1"])).await;
        let (tx, mut rx) = lockyard_events::channel();
        let manager = manager.with_event_sender(tx);
        let holder = manager
            .try_acquire(&names(&["r1"]), &requester("holder"))
            .await
            .unwrap();
        let (_, receiver) = queue_parked(&manager, &names(&["r1"]), &requester("a")).await;
        manager.release_grant(&holder).await;
        receiver.wait().await.unwrap();

        let mut admission = None;
        let mut wake_parent = None;
        while let Ok(message) = rx.try_recv() {
            match message.event {
                AppEvent::Lock(LockEvent::Queued { .. }) => admission = Some(message.meta.event_id),
                AppEvent::Lock(LockEvent::Woken { .. }) => wake_parent = message.meta.parent_id,
                _ => assert!(message.meta.parent_id.is_none()),
            }
        }
        assert!(admission.is_some());
        assert_eq!(wake_parent, admission);
    }

    #[tokio::test]
    async fn test_newest_first_prefers_latest_start() {
        let (manager, _) = manager_with(plain(&["r1"])).await;
        let holder = manager
            .try_acquire(&names(&["r1"]), &requester("holder"))
            .await
            .unwrap();

        let base = Utc::now();
        for (id, offset) in [("a", 0), ("b", 10), ("c", 5)] {
            let who = Requester::new(id, base + Duration::seconds(offset));
            queue_parked(&manager, &names(&["r1"]), &who).await;
        }

        let first = manager
            .release(&holder.requester.id, ["r1"], QueuePrecedence::NewestFirst)
            .await
            .woken
            .unwrap();
        assert_eq!(first.requester.id.as_str(), "b");

        let second = manager
            .release(&first.requester.id, ["r1"], QueuePrecedence::NewestFirst)
            .await
            .woken
            .unwrap();
        assert_eq!(second.requester.id.as_str(), "c");
    }

    #[tokio::test]
    async fn test_release_ignores_foreign_and_unknown_resources() {
        let (manager, _) = manager_with(plain(&["r1", "r2"])).await;
        manager
            .try_acquire(&names(&["r1"]), &requester("job#1"))
            .await
            .unwrap();

        let outcome = manager
            .release(
                &RequesterId::new("job#2"),
                ["r1", "r2", "ghost"],
                QueuePrecedence::OldestFirst,
            )
            .await;
        assert_eq!(outcome, ReleaseOutcome::default());
        assert_eq!(
            manager.locked_by(&RequesterId::new("job#1")).await,
            ["r1"]
        );
    }

    #[tokio::test]
    async fn test_unknown_resource_waits_until_created() {
        let (manager, _) = manager_with(plain(&["r1"])).await;
        let err = manager
            .try_acquire(&names(&["ghost"]), &requester("job#0"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LockError::UnknownResource {
                names: vec!["ghost".into()]
            }
        );

        let (outcome, receiver) =
            queue_parked(&manager, &names(&["ghost"]), &requester("job#1")).await;
        assert!(matches!(
            outcome,
            AcquireOutcome::Queued {
                reason: QueueReason::UnknownResources { .. },
                ..
            }
        ));

        manager
            .create_resource("ghost", BTreeSet::new(), None)
            .await
            .unwrap();
        let grant = receiver.wait().await.unwrap();
        assert_eq!(grant.resources, ["ghost"]);
    }

    #[tokio::test]
    async fn test_auto_create_grants_unknown_names() {
        let settings = LockSettings {
            auto_create_resources: true,
            ..LockSettings::default()
        };
        let (manager, store) = manager_with_settings(Vec::new(), settings).await;
        let (parked, _receiver) = park();
        let outcome = manager
            .acquire_or_queue(&names(&["fresh"]), &requester("job#1"), Box::new(parked))
            .await
            .unwrap();
        assert_eq!(outcome.grant().unwrap().resources, ["fresh"]);
        let stored = store.contents().unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].is_locked());
    }

    #[tokio::test]
    async fn test_reservation_blocks_until_unreserved() {
        let (manager, _) = manager_with(plain(&["r1"])).await;
        manager.reserve(["r1"], "alice").await.unwrap();

        assert!(manager
            .try_acquire(&names(&["r1"]), &requester("job#1"))
            .await
            .is_err());
        let (_, receiver) = queue_parked(&manager, &names(&["r1"]), &requester("job#1")).await;

        let outcome = manager.unreserve(["r1"]).await.unwrap();
        assert_eq!(outcome.released, ["r1"]);
        assert_eq!(receiver.wait().await.unwrap().resources, ["r1"]);

        let err = manager.reserve(["r1"], "bob").await.unwrap_err();
        assert_eq!(
            err,
            LockError::ReservationConflict {
                resource: "r1".into(),
                holder: "locked by job#1".into()
            }
        );
        assert!(matches!(
            manager.reserve(["nope"], "bob").await,
            Err(LockError::UnknownResource { .. })
        ));
    }

    #[tokio::test]
    async fn test_reset_frees_and_wakes() {
        let (manager, _) = manager_with(plain(&["r1"])).await;
        manager
            .try_acquire(&names(&["r1"]), &requester("stuck"))
            .await
            .unwrap();
        let (_, receiver) = queue_parked(&manager, &names(&["r1"]), &requester("next")).await;

        let outcome = manager.reset(["r1"]).await.unwrap();
        assert_eq!(outcome.released, ["r1"]);
        assert_eq!(
            receiver.wait().await.unwrap().requester.id.as_str(),
            "next"
        );

        manager
            .release(&RequesterId::new("next"), ["r1"], QueuePrecedence::OldestFirst)
            .await;
        // resetting a free resource changes nothing
        assert!(manager.reset(["r1"]).await.unwrap().released.is_empty());
        assert!(matches!(
            manager.reset(["missing"]).await,
            Err(LockError::UnknownResource { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_context_is_merged() {
        let (manager, _) = manager_with(plain(&["r1"])).await;
        manager
            .try_acquire(&names(&["r1"]), &requester("holder"))
            .await
            .unwrap();

        let who = requester("job#1").with_context("job#1/branch-a");
        let (first, _receiver) = queue_parked(&manager, &names(&["r1"]), &who).await;
        let (second, _dropped) = queue_parked(&manager, &names(&["r1"]), &who).await;
        assert_eq!(first.ticket(), second.ticket());
        assert!(matches!(second, AcquireOutcome::Queued { merged: true, .. }));
        assert_eq!(manager.queue_len().await, 1);

        let err = manager
            .acquire_or_wait(&names(&["r1"]), &who)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Lock(LockError::DuplicateAdmission { .. })
        ));

        // another branch of the same execution queues separately
        let sibling = requester("job#1").with_context("job#1/branch-b");
        let (third, _) = queue_parked(&manager, &names(&["r1"]), &sibling).await;
        assert!(matches!(third, AcquireOutcome::Queued { merged: false, .. }));
        assert_eq!(manager.queue_len().await, 2);
    }

    #[tokio::test]
    async fn test_withdrawn_waiter_is_cancelled() {
        let (manager, _) = manager_with(plain(&["r1"])).await;
        let holder = manager
            .try_acquire(&names(&["r1"]), &requester("holder"))
            .await
            .unwrap();
        let (_, receiver) = queue_parked(&manager, &names(&["r1"]), &requester("job#1")).await;

        assert!(manager.withdraw(&ContextId::new("job#1")).await);
        assert!(!manager.withdraw(&ContextId::new("job#1")).await);
        assert!(matches!(receiver.wait().await, Err(Error::Cancelled)));

        let outcome = manager.release_grant(&holder).await;
        assert!(outcome.woken.is_none());
    }

    #[tokio::test]
    async fn test_wait_with_timeout_and_withdraw() {
        let (manager, _) = manager_with(plain(&["r1"])).await;
        manager
            .try_acquire(&names(&["r1"]), &requester("holder"))
            .await
            .unwrap();

        let who = requester("impatient");
        let request = names(&["r1"]);
        let waited = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            manager.acquire_or_wait(&request, &who),
        )
        .await;
        assert!(waited.is_err());
        assert!(manager.withdraw(&who.context).await);
        assert_eq!(manager.queue_len().await, 0);
    }

    #[tokio::test]
    async fn test_cancel_requester_releases_and_withdraws() {
        let (manager, _) = manager_with(plain(&["r1", "r2"])).await;
        manager
            .try_acquire(&names(&["r1"]), &requester("job#1"))
            .await
            .unwrap();
        manager
            .try_acquire(&names(&["r2"]), &requester("job#2"))
            .await
            .unwrap();

        let branch = requester("job#1").with_context("job#1/b");
        let (_, cancelled) = queue_parked(&manager, &names(&["r2"]), &branch).await;
        let (_, waiting) = queue_parked(&manager, &names(&["r1"]), &requester("job#3")).await;

        let outcome = manager.cancel_requester(&RequesterId::new("job#1")).await;
        assert_eq!(outcome.released, ["r1"]);
        assert_eq!(outcome.withdrawn, [1]);
        assert!(matches!(cancelled.wait().await, Err(Error::Cancelled)));
        assert_eq!(
            waiting.wait().await.unwrap().requester.id.as_str(),
            "job#3"
        );
    }

    #[tokio::test]
    async fn test_claims_serialise_tasks_of_a_project() {
        let gpus = vec![
            Resource::new("gpu-1").with_capabilities(["gpu"]),
            Resource::new("gpu-2").with_capabilities(["gpu"]),
        ];
        let (manager, _) = manager_with(gpus).await;
        let request = ResourceRequest::new().with_capability("gpu", 1);

        let first = manager.claim("train", 1, &request).await.unwrap();
        assert_eq!(first, ClaimOutcome::Claimed(vec!["gpu-1".into()]));
        // claiming again keeps the same resource
        assert_eq!(manager.claim("train", 1, &request).await.unwrap(), first);

        let blocked = manager.claim("train", 2, &request).await.unwrap();
        assert_eq!(blocked, ClaimOutcome::AnotherClaimAhead { task_id: 1 });

        let greedy = ResourceRequest::new().with_capability("gpu", 2);
        let err = manager
            .try_acquire(&greedy, &requester("other"))
            .await
            .unwrap_err();
        assert!(matches!(err, LockError::Unsatisfiable { .. }));

        let own = request
            .clone()
            .with_claim(lockyard_types::PendingClaim::new("train", 1));
        let grant = manager
            .try_acquire(&own, &requester("train#1"))
            .await
            .unwrap();
        assert_eq!(grant.resources, ["gpu-1"]);
        assert!(manager.resource("gpu-1").await.unwrap().pending_claim.is_none());
    }

    #[tokio::test]
    async fn test_insufficient_claim_drops_held_claims() {
        let gpus = vec![
            Resource::new("gpu-1").with_capabilities(["gpu"]),
            Resource::new("gpu-2").with_capabilities(["gpu"]),
        ];
        let (manager, _) = manager_with(gpus).await;
        let one = ResourceRequest::new().with_capability("gpu", 1);
        manager.claim("train", 7, &one).await.unwrap();

        let three = ResourceRequest::new().with_capability("gpu", 3);
        let outcome = manager.claim("train", 7, &three).await.unwrap();
        assert!(matches!(outcome, ClaimOutcome::Insufficient { .. }));
        assert!(manager.resources().await.iter().all(Resource::is_free));

        manager.claim("train", 7, &one).await.unwrap();
        let released = manager.release_claims("train", 7).await;
        assert_eq!(released.released, ["gpu-1"]);
        assert!(manager.resources().await.iter().all(Resource::is_free));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_memory_state() {
        let (manager, store) = manager_with(plain(&["r1"])).await;
        let (tx, mut rx) = lockyard_events::channel();
        let manager = manager.with_event_sender(tx);
        store.set_fail_saves(true);

        let grant = manager
            .try_acquire(&names(&["r1"]), &requester("job#1"))
            .await
            .unwrap();
        assert_eq!(grant.resources, ["r1"]);
        assert!(manager.resource("r1").await.unwrap().is_locked());
        assert!(store.contents().unwrap()[0].is_free());

        let mut saw_failure = false;
        while let Ok(message) = rx.try_recv() {
            if matches!(
                message.event,
                AppEvent::Registry(RegistryEvent::PersistFailed { .. })
            ) {
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }

    #[tokio::test]
    async fn test_state_survives_restart_with_json_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resources.json");

        let store: Arc<dyn RegistryStore> = Arc::new(JsonFileStore::new(&path));
        let manager = LockManager::new(store.clone(), LockSettings::default());
        manager.load().await.unwrap();
        manager
            .create_resource("db", Resource::parse_capabilities("postgres"), None)
            .await
            .unwrap();
        manager
            .try_acquire(&names(&["db"]), &requester("job#9"))
            .await
            .unwrap();

        let restarted = LockManager::new(Arc::new(JsonFileStore::new(&path)), LockSettings::default());
        assert_eq!(restarted.load().await.unwrap(), 1);
        let db = restarted.resource("db").await.unwrap();
        assert!(db.is_locked_by(&RequesterId::new("job#9")));
        assert!(db.has_capability("postgres"));

        assert!(matches!(
            restarted.delete_resource("db").await,
            Err(LockError::ResourceInUse { .. })
        ));
    }

    #[tokio::test]
    async fn test_fairness_toggle_changes_choice() {
        let layers = vec![
            Resource::new("x").with_capabilities(["L1", "L2"]),
            Resource::new("y").with_capabilities(["L1"]),
            Resource::new("z").with_capabilities(["L2"]),
        ];
        let (manager, _) = manager_with(layers).await;
        let request = ResourceRequest::new()
            .with_capability("L1", 1)
            .with_capability("L2", 1);

        assert_eq!(manager.preview(&request, true).await.unwrap(), ["x", "z"]);
        manager.set_fair_selection(true).await;
        assert!(manager.fair_selection().await);
        let grant = manager
            .try_acquire(&request, &requester("job#1"))
            .await
            .unwrap();
        assert_eq!(grant.resources, ["y", "z"]);
    }

    #[tokio::test]
    async fn test_free_amount_and_preview() {
        let printers = vec![
            Resource::new("p1").with_capabilities(["printer", "color"]),
            Resource::new("p2").with_capabilities(["printer"]),
            Resource::new("p3").with_capabilities(["printer"]),
        ];
        let (manager, _) = manager_with(printers).await;
        manager
            .try_acquire(&names(&["p2"]), &requester("job#1"))
            .await
            .unwrap();

        let env = Environment::new();
        assert_eq!(manager.free_amount("printer", &env).await, 2);
        assert_eq!(manager.free_amount("printer !color", &env).await, 1);

        let all = ResourceRequest::new().with_capability("printer", 0);
        assert!(manager.preview(&all, true).await.is_err());
        assert_eq!(
            manager.preview(&all, false).await.unwrap(),
            ["p1", "p2", "p3"]
        );
    }

    #[tokio::test]
    async fn test_admin_changes_persist_and_validate() {
        let (manager, store) = manager_with(plain(&["r1"])).await;
        assert!(matches!(
            manager.create_resource("r1", BTreeSet::new(), None).await,
            Err(LockError::ResourceExists { .. })
        ));
        assert!(matches!(
            manager.create_resource("  ", BTreeSet::new(), None).await,
            Err(LockError::InvalidRequest { .. })
        ));

        manager
            .set_capabilities("r1", Resource::parse_capabilities("linux arm64"))
            .await
            .unwrap();
        let saved = store.contents().unwrap();
        assert!(saved[0].has_capability("arm64"));

        let removed = manager.delete_resource("r1").await.unwrap();
        assert_eq!(removed.name, "r1");
        assert!(store.contents().unwrap().is_empty());
        assert!(manager.poll_queue(QueuePrecedence::OldestFirst).await.is_none());
    }

    #[tokio::test]
    async fn test_seed_adds_only_missing_resources() {
        let (manager, _) = manager_with(plain(&["r1"])).await;
        let created = manager
            .seed([Resource::new("r1"), Resource::new("r2")])
            .await;
        assert_eq!(created, 1);
        assert_eq!(manager.resources().await.len(), 2);
    }

    #[tokio::test]
    async fn test_callback_continuation_runs_after_release() {
        let (manager, _) = manager_with(plain(&["r1"])).await;
        let holder = manager
            .try_acquire(&names(&["r1"]), &requester("holder"))
            .await
            .unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        manager
            .acquire_or_queue(
                &names(&["r1"]),
                &requester("cb"),
                from_fn(move |grant| tx.send(grant.resources).unwrap()),
            )
            .await
            .unwrap();
        manager.release_grant(&holder).await;
        assert_eq!(rx.recv().unwrap(), ["r1"]);
    }
}
