//! A named set of vectors with per-entry metadata.
//!
//! Entries live in memory and are written out by [`Collection::persist`]:
//! `collection.json` describes the collection, `segment_0.vec` holds the
//! vectors and `metadata.json` the per-entry metadata.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::vector::storage::MmapVectorStorage;
use crate::vector::types::{DistanceMetric, VectorDimension, VectorError};

/// Free-form metadata attached to an entry.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

const DESCRIPTOR_FILE: &str = "collection.json";
const METADATA_FILE: &str = "metadata.json";

/// One stored vector and its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub vector: Vec<f32>,
    pub metadata: Metadata,
}

/// On-disk description of a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    pub name: String,
    pub metric: DistanceMetric,
    pub dimension: Option<VectorDimension>,
    pub count: usize,
    pub created_at: u64,
    pub updated_at: u64,
    pub version: u32,
}

impl CollectionDescriptor {
    const CURRENT_VERSION: u32 = 1;
}

/// Full snapshot of a collection as parallel sequences, in id order.
#[derive(Debug, Default)]
pub struct CollectionScan<'a> {
    pub ids: Vec<&'a str>,
    pub metadatas: Vec<&'a Metadata>,
    pub embeddings: Vec<&'a [f32]>,
}

impl CollectionScan<'_> {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    dir: PathBuf,
    metric: DistanceMetric,
    dimension: Option<VectorDimension>,
    entries: BTreeMap<String, Entry>,
    created_at: u64,
    updated_at: u64,
}

impl Collection {
    /// Creates an empty, not yet persisted collection stored under `dir`.
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>, metric: DistanceMetric) -> Self {
        let now = unix_timestamp();
        Self {
            name: name.into(),
            dir: dir.into(),
            metric,
            dimension: None,
            entries: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Loads a persisted collection from its directory.
    pub fn load(dir: &Path) -> StoreResult<Self> {
        let descriptor_path = dir.join(DESCRIPTOR_FILE);
        let json = std::fs::read_to_string(&descriptor_path).map_err(|source| StoreError::Io {
            path: descriptor_path.clone(),
            source,
        })?;
        let descriptor: CollectionDescriptor =
            serde_json::from_str(&json).map_err(|e| StoreError::Serialization {
                collection: dir.display().to_string(),
                message: format!("Failed to parse {DESCRIPTOR_FILE}: {e}"),
            })?;
        let name = descriptor.name.clone();

        if descriptor.version > CollectionDescriptor::CURRENT_VERSION {
            return Err(StoreError::Unavailable {
                name,
                reason: format!(
                    "descriptor version {} is newer than supported version {}",
                    descriptor.version,
                    CollectionDescriptor::CURRENT_VERSION
                ),
            });
        }

        let mut metadata: BTreeMap<String, Metadata> = {
            let path = dir.join(METADATA_FILE);
            if path.exists() {
                let json = std::fs::read_to_string(&path)
                    .map_err(|source| StoreError::Io { path, source })?;
                serde_json::from_str(&json).map_err(|e| StoreError::Serialization {
                    collection: name.clone(),
                    message: format!("Failed to parse {METADATA_FILE}: {e}"),
                })?
            } else {
                BTreeMap::new()
            }
        };

        let mut entries = BTreeMap::new();
        if let Some(dimension) = descriptor.dimension {
            let vector_error = |source| StoreError::Vector {
                collection: name.clone(),
                source,
            };
            let storage = MmapVectorStorage::open(dir).map_err(vector_error)?;
            if storage.dimension() != dimension {
                return Err(vector_error(VectorError::DimensionMismatch {
                    expected: dimension.get(),
                    actual: storage.dimension().get(),
                }));
            }
            for (id, vector) in storage.read_all().map_err(vector_error)? {
                let metadata = metadata.remove(&id).unwrap_or_default();
                entries.insert(id, Entry { vector, metadata });
            }
        }

        if entries.len() != descriptor.count {
            tracing::warn!(
                "Collection '{}' expected {} entries but found {}",
                name,
                descriptor.count,
                entries.len()
            );
        }

        debug!("Loaded collection '{}' with {} entries", name, entries.len());

        Ok(Self {
            name,
            dir: dir.to_path_buf(),
            metric: descriptor.metric,
            dimension: descriptor.dimension,
            entries,
            created_at: descriptor.created_at,
            updated_at: descriptor.updated_at,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Dimension fixed by the first upsert, `None` while empty.
    pub fn dimension(&self) -> Option<VectorDimension> {
        self.dimension
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    /// Inserts or replaces the entry for `id`.
    pub fn upsert(&mut self, id: &str, vector: Vec<f32>, metadata: Metadata) -> StoreResult<()> {
        if vector.is_empty() {
            return Err(StoreError::EmptyVector {
                collection: self.name.clone(),
                id: id.to_string(),
            });
        }

        let dimension = match self.dimension {
            Some(dimension) => dimension,
            None => {
                let dimension = VectorDimension::new(vector.len()).map_err(|source| {
                    StoreError::Vector {
                        collection: self.name.clone(),
                        source,
                    }
                })?;
                self.dimension = Some(dimension);
                dimension
            }
        };
        dimension
            .validate_vector(&vector)
            .map_err(|source| StoreError::Vector {
                collection: self.name.clone(),
                source,
            })?;

        self.entries
            .insert(id.to_string(), Entry { vector, metadata });
        self.updated_at = unix_timestamp();
        Ok(())
    }

    /// Removes an entry, returning whether it existed.
    pub fn delete(&mut self, id: &str) -> bool {
        let removed = self.entries.remove(id).is_some();
        if removed {
            self.updated_at = unix_timestamp();
        }
        removed
    }

    /// Full read of the collection.
    pub fn scan(&self) -> CollectionScan<'_> {
        let mut scan = CollectionScan::default();
        for (id, entry) in &self.entries {
            scan.ids.push(id);
            scan.metadatas.push(&entry.metadata);
            scan.embeddings.push(&entry.vector);
        }
        scan
    }

    /// Exact nearest-neighbor search over every entry.
    ///
    /// Returns at most `k` `(id, distance)` pairs, closest first, ties by id.
    /// An empty collection yields an empty result.
    pub fn query(&self, vector: &[f32], k: usize) -> StoreResult<Vec<(String, f32)>> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        let vector_error = |source| StoreError::Vector {
            collection: self.name.clone(),
            source,
        };
        dimension.validate_vector(vector).map_err(vector_error)?;

        let mut scored = Vec::with_capacity(self.entries.len());
        for (id, entry) in &self.entries {
            let distance = self
                .metric
                .distance(vector, &entry.vector)
                .map_err(vector_error)?;
            scored.push((id.as_str(), distance));
        }

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(id, distance)| (id.to_string(), distance))
            .collect())
    }

    pub fn descriptor(&self) -> CollectionDescriptor {
        CollectionDescriptor {
            name: self.name.clone(),
            metric: self.metric,
            dimension: self.dimension,
            count: self.entries.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: CollectionDescriptor::CURRENT_VERSION,
        }
    }

    /// Writes segment, metadata and descriptor to the collection directory.
    pub fn persist(&self) -> StoreResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        if let Some(dimension) = self.dimension {
            let records: Vec<(&str, &[f32])> = self
                .entries
                .iter()
                .map(|(id, entry)| (id.as_str(), entry.vector.as_slice()))
                .collect();
            MmapVectorStorage::write_segment(&self.dir, dimension, &records).map_err(|source| {
                StoreError::Vector {
                    collection: self.name.clone(),
                    source,
                }
            })?;
        }

        let metadata: BTreeMap<&str, &Metadata> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.metadata.is_empty())
            .map(|(id, entry)| (id.as_str(), &entry.metadata))
            .collect();
        self.write_json(METADATA_FILE, &metadata)?;
        self.write_json(DESCRIPTOR_FILE, &self.descriptor())?;

        debug!(
            "Persisted collection '{}' ({} entries) to {}",
            self.name,
            self.entries.len(),
            self.dir.display()
        );
        Ok(())
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(value).map_err(|e| StoreError::Serialization {
            collection: self.name.clone(),
            message: e.to_string(),
        })?;
        let path = self.dir.join(file);
        std::fs::write(&path, json).map_err(|source| StoreError::Io { path, source })
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Reads a string field from entry metadata.
///
/// Looks at the top-level key first, then inside a serialized `_json` blob,
/// which is how metadata exported from document stores usually arrives.
/// Blank strings count as absent; anything else is returned verbatim.
pub fn metadata_str(metadata: &Metadata, key: &str) -> Option<String> {
    let direct = metadata.get(key).and_then(|v| v.as_str()).map(str::to_string);
    let value = direct.or_else(|| {
        let blob = metadata.get("_json")?.as_str()?;
        let parsed: serde_json::Value = serde_json::from_str(blob).ok()?;
        parsed.get(key)?.as_str().map(str::to_string)
    })?;

    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Builds a metadata map with a single `type` tag.
pub fn tag_metadata(tag: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("type".to_string(), serde_json::Value::from(tag));
    metadata
}
