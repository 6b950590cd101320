//! Disease vector store abstraction.
//!
//! The builder and the query service only see [`DiseaseVectorStore`]; the
//! embedded database plugs in through [`CollectionStore`], tests through an
//! in-memory double.

use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::types::DiseaseId;
use crate::vector::{Collection, tag_metadata};

/// Metadata tag attached to every disease aggregate.
pub const DISEASE_TAG: &str = "disease";

/// A disease returned by a nearest-neighbor query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub id: DiseaseId,
    pub distance: f32,
}

impl Neighbor {
    pub fn new(id: impl Into<DiseaseId>, distance: f32) -> Self {
        Self {
            id: id.into(),
            distance,
        }
    }
}

/// Store holding one aggregate vector per disease.
pub trait DiseaseVectorStore {
    /// Name used in errors and logs.
    fn name(&self) -> &str;

    /// Inserts or replaces the vector for `id`.
    fn upsert(&mut self, id: &DiseaseId, vector: &[f32], tag: &str) -> StoreResult<()>;

    /// Up to `k` diseases closest to `vector`, ascending by distance.
    fn query(&self, vector: &[f32], k: usize) -> StoreResult<Vec<Neighbor>>;

    /// Stored vector for `id`, if any.
    fn get(&self, id: &DiseaseId) -> StoreResult<Option<Vec<f32>>>;
}

/// [`DiseaseVectorStore`] over a collection of the embedded database.
#[derive(Debug)]
pub struct CollectionStore<'a> {
    collection: &'a mut Collection,
}

impl<'a> CollectionStore<'a> {
    pub fn new(collection: &'a mut Collection) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &Collection {
        self.collection
    }
}

impl DiseaseVectorStore for CollectionStore<'_> {
    fn name(&self) -> &str {
        self.collection.name()
    }

    fn upsert(&mut self, id: &DiseaseId, vector: &[f32], tag: &str) -> StoreResult<()> {
        self.collection
            .upsert(id.as_str(), vector.to_vec(), tag_metadata(tag))
    }

    fn query(&self, vector: &[f32], k: usize) -> StoreResult<Vec<Neighbor>> {
        query_collection(self.collection, vector, k)
    }

    fn get(&self, id: &DiseaseId) -> StoreResult<Option<Vec<f32>>> {
        Ok(get_vector(self.collection, id))
    }
}

/// Read-only view for query paths holding a shared borrow of the database.
///
/// Upserts through this view always fail.
#[derive(Debug, Clone, Copy)]
pub struct ReadOnlyStore<'a> {
    collection: &'a Collection,
}

impl<'a> ReadOnlyStore<'a> {
    pub fn new(collection: &'a Collection) -> Self {
        Self { collection }
    }
}

impl DiseaseVectorStore for ReadOnlyStore<'_> {
    fn name(&self) -> &str {
        self.collection.name()
    }

    fn upsert(&mut self, id: &DiseaseId, _vector: &[f32], _tag: &str) -> StoreResult<()> {
        Err(StoreError::Unavailable {
            name: self.collection.name().to_string(),
            reason: format!("read-only view, cannot upsert '{id}'"),
        })
    }

    fn query(&self, vector: &[f32], k: usize) -> StoreResult<Vec<Neighbor>> {
        query_collection(self.collection, vector, k)
    }

    fn get(&self, id: &DiseaseId) -> StoreResult<Option<Vec<f32>>> {
        Ok(get_vector(self.collection, id))
    }
}

fn query_collection(
    collection: &Collection,
    vector: &[f32],
    k: usize,
) -> StoreResult<Vec<Neighbor>> {
    Ok(collection
        .query(vector, k)?
        .into_iter()
        .map(|(id, distance)| Neighbor::new(id, distance))
        .collect())
}

fn get_vector(collection: &Collection, id: &DiseaseId) -> Option<Vec<f32>> {
    collection.get(id.as_str()).map(|entry| entry.vector.clone())
}
