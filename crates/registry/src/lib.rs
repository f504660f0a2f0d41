#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Resource registry for lockyard
//!
//! The registry is an insertion-ordered arena of resources with a name index.
//! Selection code works on arena indices; the order of the arena is the
//! stable order every tie-break falls back to. Persistence is delegated to a
//! [`RegistryStore`].

mod store;

pub use store::{JsonFileStore, MemoryStore, RegistryStore};

use lockyard_errors::LockError;
use lockyard_types::{Resource, RequesterId};
use std::collections::{BTreeSet, HashMap};

/// Ordered collection of every known resource
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: Vec<Resource>,
    index: HashMap<String, usize>,
}

impl ResourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from persisted resources, keeping the first of any
    /// duplicated name
    #[must_use]
    pub fn from_resources(resources: impl IntoIterator<Item = Resource>) -> Self {
        let mut registry = Self::new();
        for resource in resources {
            let name = resource.name.clone();
            if !registry.insert(resource) {
                tracing::warn!(resource = %name, "duplicate resource in registry snapshot ignored");
            }
        }
        registry
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.index_of(name).map(|idx| &self.resources[idx])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Resource> {
        self.index_of(name).map(|idx| &mut self.resources[idx])
    }

    /// Resource at an arena index
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds; indices come from this registry.
    #[must_use]
    pub fn at(&self, idx: usize) -> &Resource {
        &self.resources[idx]
    }

    pub fn at_mut(&mut self, idx: usize) -> &mut Resource {
        &mut self.resources[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Resource] {
        &self.resources
    }

    /// Clone of the whole registry, in insertion order
    #[must_use]
    pub fn snapshot(&self) -> Vec<Resource> {
        self.resources.clone()
    }

    /// Add a new free resource; returns `false` if the name is taken
    pub fn create(&mut self, name: &str, capabilities: BTreeSet<String>) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.insert(Resource::new(name).with_capabilities(capabilities))
    }

    /// Add a resource with its full state; returns `false` if the name is taken
    pub fn insert(&mut self, resource: Resource) -> bool {
        if self.index.contains_key(&resource.name) {
            return false;
        }
        self.index
            .insert(resource.name.clone(), self.resources.len());
        self.resources.push(resource);
        true
    }

    /// Remove a resource that nobody owns or reserved
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource` for missing names and `ResourceInUse` for
    /// owned or reserved resources.
    pub fn delete(&mut self, name: &str) -> Result<Resource, LockError> {
        let idx = self.index_of(name).ok_or_else(|| LockError::UnknownResource {
            names: vec![name.to_string()],
        })?;
        if !self.resources[idx].can_lock() {
            return Err(LockError::ResourceInUse {
                resource: name.to_string(),
            });
        }
        let removed = self.resources.remove(idx);
        self.reindex();
        Ok(removed)
    }

    /// Replace the explicit capability tags of a resource
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource` for missing names.
    pub fn set_capabilities(
        &mut self,
        name: &str,
        capabilities: BTreeSet<String>,
    ) -> Result<(), LockError> {
        let resource = self
            .get_mut(name)
            .ok_or_else(|| LockError::UnknownResource {
                names: vec![name.to_string()],
            })?;
        resource.capabilities = capabilities
            .into_iter()
            .filter(|tag| !tag.is_empty())
            .collect();
        Ok(())
    }

    /// Every explicit capability tag, optionally including resource names
    #[must_use]
    pub fn all_capabilities(&self, with_names: bool) -> BTreeSet<String> {
        let mut tags: BTreeSet<String> = self
            .resources
            .iter()
            .flat_map(|r| r.capabilities.iter().cloned())
            .collect();
        if with_names {
            tags.extend(self.resources.iter().map(|r| r.name.clone()));
        }
        tags
    }

    /// Names in `names` that are not registered, deduplicated, in input order
    pub fn unknown_names<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut unknown: Vec<String> = Vec::new();
        for name in names {
            if !self.index.contains_key(name) && !unknown.iter().any(|n| n == name) {
                unknown.push(name.to_string());
            }
        }
        unknown
    }

    /// Resources currently owned by `requester`
    pub fn locked_by<'a>(
        &'a self,
        requester: &'a RequesterId,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources
            .iter()
            .filter(move |r| r.is_locked_by(requester))
    }

    /// Resources holding a pending claim of any task of `project`
    pub fn claimed_by<'a>(&'a self, project: &'a str) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources.iter().filter(move |r| {
            r.pending_claim
                .as_ref()
                .is_some_and(|claim| claim.project == project)
        })
    }

    fn reindex(&mut self) {
        self.index = self
            .resources
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.name.clone(), idx))
            .collect();
    }
}
