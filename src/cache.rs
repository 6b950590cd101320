//! Process-wide phenotype embedding cache.
//!
//! Built once from a full scan of the embedding collection and then shared
//! read-only by the aggregate builder and the query service.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

use crate::types::{EmbeddingVector, PhenotypeId};
use crate::vector::{Collection, CollectionScan, Metadata, metadata_str};

/// Metadata key holding the phenotype id of an embedding entry.
pub const ORIGINAL_ID_FIELD: &str = "original_id";

/// Metadata key holding the human readable term label.
pub const LABEL_FIELD: &str = "label";

#[derive(Debug, Clone, Default)]
pub struct EmbeddingCache {
    vectors: HashMap<PhenotypeId, EmbeddingVector>,
    labels: HashMap<PhenotypeId, String>,
    skipped_entries: usize,
}

impl EmbeddingCache {
    /// Builds the cache from parallel metadata and embedding sequences.
    ///
    /// Entries without an `original_id` or with an empty vector are skipped.
    /// A later entry with the same id replaces an earlier one.
    pub fn build<'a, M, E>(metadatas: M, embeddings: E) -> Self
    where
        M: IntoIterator<Item = &'a Metadata>,
        E: IntoIterator<Item = &'a [f32]>,
    {
        let mut cache = Self::default();
        let mut dimensions = BTreeSet::new();
        let mut embeddings = embeddings.into_iter();

        for metadata in metadatas {
            let Some(vector) = embeddings.next() else {
                warn!("Embedding scan returned fewer vectors than metadata entries");
                cache.skipped_entries += 1;
                continue;
            };
            let Some(id) = metadata_str(metadata, ORIGINAL_ID_FIELD) else {
                debug!("Skipping embedding entry without '{ORIGINAL_ID_FIELD}'");
                cache.skipped_entries += 1;
                continue;
            };
            if vector.is_empty() {
                debug!("Skipping empty embedding for {id}");
                cache.skipped_entries += 1;
                continue;
            }

            let id = PhenotypeId::new(id);
            dimensions.insert(vector.len());
            if let Some(label) = metadata_str(metadata, LABEL_FIELD) {
                cache.labels.insert(id.clone(), label);
            }
            if cache.vectors.insert(id.clone(), vector.to_vec()).is_some() {
                debug!("Duplicate embedding for {id}, keeping the later entry");
            }
        }

        if dimensions.len() > 1 {
            warn!(
                "Embedding source mixes vector dimensions {:?}; aggregations over mixed terms will fail",
                dimensions
            );
        }

        cache
    }

    /// Builds the cache from a full collection scan.
    pub fn from_scan(scan: &CollectionScan<'_>) -> Self {
        Self::build(scan.metadatas.iter().copied(), scan.embeddings.iter().copied())
    }

    pub fn from_collection(collection: &Collection) -> Self {
        let cache = Self::from_scan(&collection.scan());
        info!(
            "Cached {} phenotype embeddings from '{}' ({} entries skipped)",
            cache.len(),
            collection.name(),
            cache.skipped_entries()
        );
        cache
    }

    /// Builds a cache directly from id/vector pairs, skipping empty vectors.
    pub fn from_pairs<I, P>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, EmbeddingVector)>,
        P: Into<PhenotypeId>,
    {
        let mut cache = Self::default();
        for (id, vector) in pairs {
            if vector.is_empty() {
                cache.skipped_entries += 1;
                continue;
            }
            cache.vectors.insert(id.into(), vector);
        }
        cache
    }

    /// Returns the embedding for `id`, or `None` when the term has none.
    pub fn get(&self, id: &str) -> Option<&[f32]> {
        self.vectors.get(id).map(Vec::as_slice)
    }

    pub fn label(&self, id: &str) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.vectors.contains_key(id)
    }

    /// Looks up several ids at once, keeping the input order.
    pub fn lookup_many<'a, S>(&self, ids: &'a [S]) -> Vec<(&'a str, Option<&[f32]>)>
    where
        S: AsRef<str>,
    {
        ids.iter()
            .map(|id| (id.as_ref(), self.get(id.as_ref())))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PhenotypeId, &[f32])> {
        self.vectors.iter().map(|(id, v)| (id, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn skipped_entries(&self) -> usize {
        self.skipped_entries
    }
}
