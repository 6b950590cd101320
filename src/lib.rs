//! Phenotype-to-disease matching over averaged ontology embeddings.
//!
//! Diseases are represented by the mean embedding of their annotated
//! phenotype terms; a patient's observed terms are averaged the same way and
//! ranked against every disease by vector distance.

pub mod aggregate;
pub mod annotation;
pub mod builder;
pub mod cache;
pub mod config;
pub mod display;
pub mod error;
pub mod ingest;
pub mod io;
pub mod query;
pub mod store;
pub mod types;
pub mod vector;

// Explicit exports for better API clarity
pub use aggregate::Aggregator;
pub use annotation::AnnotationIndex;
pub use builder::{BuildFailure, BuildReport, DiseaseAggregateBuilder};
pub use cache::EmbeddingCache;
pub use config::Settings;
pub use error::{
    IngestError, IngestResult, PhenomatchError, PhenomatchResult, StoreError, StoreResult,
};
pub use ingest::{IngestReport, Pipeline};
pub use query::{PhenotypeSimilarity, QueryOutcome, QueryService};
pub use store::{CollectionStore, DiseaseVectorStore, Neighbor, ReadOnlyStore};
pub use types::{AnnotationRecord, DiseaseId, EmbeddingVector, PhenotypeId};
pub use vector::{
    Collection, DistanceMetric, SharedVectorDatabase, VectorDatabase, VectorError,
};
