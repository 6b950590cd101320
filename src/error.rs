//! Error types for the phenotype-to-disease matching pipeline
//!
//! Each layer has its own `thiserror` enum; `PhenomatchError` wraps them for
//! callers that drive the whole pipeline (the CLI, integration tests).

use std::path::PathBuf;
use thiserror::Error;

use crate::vector::VectorError;

/// Errors raised by the embedded vector database and its collections.
///
/// Every variant names the collection involved: a missing or unreadable
/// collection is never reported as an empty result.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(
        "Collection '{name}' does not exist\nSuggestion: Import embeddings or run 'phenomatch ingest' first"
    )]
    CollectionNotFound { name: String },

    #[error("Collection '{name}' already exists")]
    CollectionExists { name: String },

    #[error("Invalid collection name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("Vector store unavailable for collection '{name}': {reason}")]
    Unavailable { name: String, reason: String },

    #[error("Vector operation failed in collection '{collection}': {source}")]
    Vector {
        collection: String,
        #[source]
        source: VectorError,
    },

    #[error("Rejected empty vector for '{id}' in collection '{collection}'")]
    EmptyVector { collection: String, id: String },

    #[error("Failed to (de)serialize collection '{collection}': {message}")]
    Serialization { collection: String, message: String },

    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// True for failures that mean the store could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::CollectionNotFound { .. } | Self::Unavailable { .. } | Self::Io { .. }
        )
    }
}

/// Errors while reading annotation or embedding sources.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read '{path}': {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Annotation source is not configured\nSuggestion: Set annotations.path or pass --annotations")]
    MissingAnnotationSource,

    #[error("Embedding cache is empty\nSuggestion: Check that the '{collection}' entries carry an 'original_id' field")]
    EmptyEmbeddingCache { collection: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Top-level error type for the pipeline.
#[derive(Error, Debug)]
pub enum PhenomatchError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Vector(#[from] VectorError),

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Disease '{id}' has no aggregate vector in '{collection}'")]
    DiseaseNotFound { id: String, collection: String },
}

impl PhenomatchError {
    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::Store(StoreError::CollectionNotFound { .. }) => "COLLECTION_NOT_FOUND",
            Self::Store(StoreError::Unavailable { .. } | StoreError::Io { .. }) => {
                "STORE_UNAVAILABLE"
            }
            Self::Store(_) => "STORE_ERROR",
            Self::Ingest(_) => "INGEST_ERROR",
            Self::Vector(VectorError::DimensionMismatch { .. }) => "DIMENSION_MISMATCH",
            Self::Vector(_) => "VECTOR_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::DiseaseNotFound { .. } => "DISEASE_NOT_FOUND",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Store(StoreError::CollectionNotFound { .. }) => vec![
                "Run 'phenomatch collections' to see what exists",
                "Run 'phenomatch import-embeddings <FILE>' and 'phenomatch ingest'",
            ],
            Self::Store(StoreError::Unavailable { .. } | StoreError::Io { .. }) => vec![
                "Check that db_path in settings.toml points to a readable directory",
                "Check disk space and permissions",
            ],
            Self::Vector(VectorError::DimensionMismatch { .. }) => vec![
                "All embeddings must come from a single embedding model",
                "Re-import the embedding collection from one source",
            ],
            Self::Ingest(IngestError::MissingAnnotationSource) => {
                vec!["Pass --annotations <FILE> or set annotations.source = \"collection\""]
            }
            Self::DiseaseNotFound { .. } => vec![
                "The disease may have no phenotype with a cached embedding",
                "Run 'phenomatch ingest' to rebuild disease vectors",
            ],
            _ => vec![],
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for ingest operations
pub type IngestResult<T> = Result<T, IngestError>;

/// Result type alias for pipeline operations
pub type PhenomatchResult<T> = Result<T, PhenomatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_names_collection() {
        let err = StoreError::CollectionNotFound {
            name: "DiseaseAvgEmbeddings".to_string(),
        };
        assert!(err.to_string().contains("DiseaseAvgEmbeddings"));
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_status_codes() {
        let err: PhenomatchError = StoreError::CollectionNotFound {
            name: "ont_hp".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), "COLLECTION_NOT_FOUND");
        assert!(!err.recovery_suggestions().is_empty());

        let err: PhenomatchError = VectorError::DimensionMismatch {
            expected: 3,
            actual: 2,
        }
        .into();
        assert_eq!(err.status_code(), "DIMENSION_MISMATCH");
    }
}
