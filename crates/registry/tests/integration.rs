//! Integration tests for registry persistence

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use lockyard_errors::{Error, StorageError};
    use lockyard_registry::*;
    use lockyard_types::{PendingClaim, Requester, Resource};

    fn sample() -> Vec<Resource> {
        let mut locked = Resource::new("r2").with_capabilities(["linux"]);
        locked.lock(Requester::new(
            "job#7",
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        ));
        let mut claimed = Resource::new("r3");
        claimed.claim(PendingClaim::new("proj", 11));
        let mut reserved = Resource::new("r4").with_description("lab bench");
        reserved.reserve("alice");
        vec![
            Resource::new("r1").with_capabilities(["linux", "gpu"]),
            locked,
            claimed,
            reserved,
        ]
    }

    #[tokio::test]
    async fn test_json_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state").join("resources.json"));

        assert!(store.load().await.unwrap().is_empty());

        let resources = sample();
        store.save(&resources).await.unwrap();
        assert!(!store.path().with_extension("json.tmp").exists());

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, resources);

        let registry = ResourceRegistry::from_resources(loaded);
        let names: Vec<&str> = registry.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["r1", "r2", "r3", "r4"]);
    }

    #[tokio::test]
    async fn test_json_store_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("resources.json"));
        store.save(&sample()).await.unwrap();
        store.save(&[Resource::new("only")]).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "only");
    }

    #[tokio::test]
    async fn test_corrupted_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resources.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::CorruptedData { .. })
        ));
    }

    #[tokio::test]
    async fn test_memory_store_failure_toggle() {
        let store = MemoryStore::with_resources(vec![Resource::new("seed")]);
        assert_eq!(store.load().await.unwrap().len(), 1);

        store.set_fail_saves(true);
        assert!(store.save(&sample()).await.is_err());
        assert_eq!(store.save_count(), 0);
        assert_eq!(store.contents().unwrap().len(), 1);

        store.set_fail_saves(false);
        store.save(&sample()).await.unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.contents().unwrap().len(), 4);
    }
}
