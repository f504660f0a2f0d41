//! Registry persistence collaborators.

use async_trait::async_trait;
use lockyard_errors::{Error, StorageError};
use lockyard_types::Resource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::fs;

/// Durable home of the registry
///
/// `save` receives the complete registry after every mutating operation and
/// is called in commit order.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Load every persisted resource in registry order
    async fn load(&self) -> Result<Vec<Resource>, Error>;

    /// Persist a full snapshot
    async fn save(&self, resources: &[Resource]) -> Result<(), Error>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Serialize)]
struct RegistryDocumentRef<'a> {
    resources: &'a [Resource],
}

/// JSON file store written with temp-file + rename
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RegistryStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<Resource>, Error> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "registry file missing, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(StorageError::from_io_with_path(&e, &self.path).into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let document: RegistryDocument =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::CorruptedData {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(document.resources)
    }

    async fn save(&self, resources: &[Resource]) -> Result<(), Error> {
        let payload = serde_json::to_vec_pretty(&RegistryDocumentRef { resources }).map_err(
            |e| StorageError::SerializeFailed {
                message: e.to_string(),
            },
        )?;
        let tmp_path = self.path.with_extension("json.tmp");

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StorageError::from_io_with_path(&e, parent))?;
            }
        }

        fs::write(&tmp_path, payload)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, &tmp_path))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| StorageError::AtomicRenameFailed {
                message: format!("{} -> {}: {e}", tmp_path.display(), self.path.display()),
            })?;

        tracing::trace!(path = %self.path.display(), resources = resources.len(), "registry saved");
        Ok(())
    }
}

/// In-memory store; can be told to fail saves
#[derive(Debug, Default)]
pub struct MemoryStore {
    resources: Mutex<Vec<Resource>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `resources`
    #[must_use]
    pub fn with_resources(resources: Vec<Resource>) -> Self {
        Self {
            resources: Mutex::new(resources),
            ..Self::default()
        }
    }

    /// Make every following `save` fail with an IO error
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Last saved snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the internal mutex was poisoned.
    pub fn contents(&self) -> Result<Vec<Resource>, Error> {
        self.resources
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| Error::internal("memory store poisoned"))
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn load(&self) -> Result<Vec<Resource>, Error> {
        self.contents()
    }

    async fn save(&self, resources: &[Resource]) -> Result<(), Error> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::IoError {
                message: "memory store configured to fail".to_string(),
            }
            .into());
        }
        let mut guard = self
            .resources
            .lock()
            .map_err(|_| Error::internal("memory store poisoned"))?;
        *guard = resources.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
