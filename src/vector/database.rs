//! Embedded vector database: a directory of named collections.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::vector::collection::{Collection, CollectionDescriptor};
use crate::vector::types::DistanceMetric;

#[derive(Debug)]
pub struct VectorDatabase {
    root: PathBuf,
    collections: BTreeMap<String, Collection>,
}

impl VectorDatabase {
    /// Opens (or initializes) a database rooted at `root`, loading every
    /// collection found below it.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| StoreError::Unavailable {
            name: root.display().to_string(),
            reason: format!("cannot create database directory: {e}"),
        })?;

        let read_dir = std::fs::read_dir(&root).map_err(|e| StoreError::Unavailable {
            name: root.display().to_string(),
            reason: format!("cannot read database directory: {e}"),
        })?;

        let mut collections = BTreeMap::new();
        for entry in read_dir {
            let entry = entry.map_err(|source| StoreError::Io {
                path: root.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.join("collection.json").is_file() {
                continue;
            }
            let collection = Collection::load(&path)?;
            collections.insert(collection.name().to_string(), collection);
        }

        info!(
            "Opened vector database at {} ({} collections)",
            root.display(),
            collections.len()
        );
        Ok(Self { root, collections })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Creates a new, empty collection. Fails if the name is taken.
    pub fn create_collection(
        &mut self,
        name: &str,
        metric: DistanceMetric,
    ) -> StoreResult<&mut Collection> {
        validate_name(name)?;
        if self.collections.contains_key(name) {
            return Err(StoreError::CollectionExists {
                name: name.to_string(),
            });
        }

        debug!("Creating collection '{name}' with metric {metric}");
        let collection = Collection::new(name, self.root.join(name), metric);
        Ok(self.collections.entry(name.to_string()).or_insert(collection))
    }

    pub fn get_collection(&self, name: &str) -> StoreResult<&Collection> {
        self.collections
            .get(name)
            .ok_or_else(|| StoreError::CollectionNotFound {
                name: name.to_string(),
            })
    }

    pub fn get_collection_mut(&mut self, name: &str) -> StoreResult<&mut Collection> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| StoreError::CollectionNotFound {
                name: name.to_string(),
            })
    }

    /// Returns the existing collection or creates it with `metric`.
    ///
    /// An existing collection keeps the metric it was created with.
    pub fn get_or_create_collection(
        &mut self,
        name: &str,
        metric: DistanceMetric,
    ) -> StoreResult<&mut Collection> {
        if let Some(existing) = self.collections.get(name) {
            if existing.metric() != metric {
                warn!(
                    "Collection '{}' uses metric {}, ignoring requested {}",
                    name,
                    existing.metric(),
                    metric
                );
            }
            return self.get_collection_mut(name);
        }
        self.create_collection(name, metric)
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    pub fn list_collections(&self) -> Vec<CollectionDescriptor> {
        self.collections.values().map(Collection::descriptor).collect()
    }

    /// Drops a collection from memory and disk.
    pub fn delete_collection(&mut self, name: &str) -> StoreResult<()> {
        if self.collections.remove(name).is_none() {
            return Err(StoreError::CollectionNotFound {
                name: name.to_string(),
            });
        }
        let dir = self.root.join(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|source| StoreError::Io { path: dir, source })?;
        }
        Ok(())
    }

    pub fn persist(&self, name: &str) -> StoreResult<()> {
        self.get_collection(name)?.persist()
    }

    pub fn persist_all(&self) -> StoreResult<()> {
        for collection in self.collections.values() {
            collection.persist()?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> StoreResult<()> {
    let invalid = |reason| StoreError::InvalidName {
        name: name.to_string(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("name cannot be empty"));
    }
    if name.starts_with('.') {
        return Err(invalid("name cannot start with '.'"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(invalid("only ASCII letters, digits, '_', '-' and '.' are allowed"));
    }
    Ok(())
}

/// Thread-safe handle to a [`VectorDatabase`].
///
/// Many concurrent queries can hold read guards; ingestion takes the write
/// guard and must not overlap with query traffic.
#[derive(Clone)]
pub struct SharedVectorDatabase {
    inner: Arc<RwLock<VectorDatabase>>,
}

impl SharedVectorDatabase {
    pub fn new(database: VectorDatabase) -> Self {
        Self {
            inner: Arc::new(RwLock::new(database)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, VectorDatabase> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, VectorDatabase> {
        self.inner.write()
    }
}

impl std::fmt::Debug for SharedVectorDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_read() {
            Some(db) => write!(f, "SharedVectorDatabase {{ database: {db:?} }}"),
            None => write!(f, "SharedVectorDatabase {{ <locked> }}"),
        }
    }
}
