//! Embedded vector storage and exact nearest-neighbor search.
//!
//! # Architecture
//! A [`VectorDatabase`] is a directory of named [`Collection`]s. Each collection
//! keeps its entries in memory for search and persists them as a memory-mapped
//! segment file plus JSON metadata. The distance metric is fixed per
//! collection when it is created.

mod collection;
mod database;
mod storage;
mod types;

pub use collection::{
    Collection, CollectionDescriptor, CollectionScan, Entry, Metadata, metadata_str, tag_metadata,
};
pub use database::{SharedVectorDatabase, VectorDatabase};
pub use storage::MmapVectorStorage;
pub use types::{DistanceMetric, VectorDimension, VectorError, cosine_similarity};
