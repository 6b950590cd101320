//! Exit codes for CLI operations following Unix conventions.
//!
//! # Exit Code Semantics
//!
//! - `0`: Success - ranking produced (an empty ranking is still success)
//! - `1`: General error - unspecified failure
//! - `2`: Blocking error - the vector store cannot be used at all
//! - `3-125`: Specific recoverable errors
//! - `126-255`: Reserved by shell

use crate::error::{IngestError, PhenomatchError, StoreError};
use crate::query::QueryOutcome;
use crate::vector::VectorError;

/// Standard exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Operation succeeded (code 0)
    Success = 0,

    /// Unspecified error occurred (code 1)
    GeneralError = 1,

    /// Store missing or unreadable (code 2)
    BlockingError = 2,

    /// No phenotype matched or disease unknown (code 3)
    NotFound = 3,

    /// Source file could not be read (code 5)
    IoError = 5,

    /// Configuration error (code 6)
    ConfigError = 6,

    /// Embeddings of different lengths were mixed (code 7)
    DimensionMismatch = 7,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl ExitCode {
    /// `NotFound` for [`QueryOutcome::NoMatch`], `Success` otherwise.
    pub fn from_outcome(outcome: &QueryOutcome) -> Self {
        match outcome {
            QueryOutcome::NoMatch => ExitCode::NotFound,
            QueryOutcome::Ranked(_) => ExitCode::Success,
        }
    }

    /// Map a pipeline error to the exit code scripts can branch on.
    pub fn from_error(error: &PhenomatchError) -> Self {
        match error {
            PhenomatchError::DiseaseNotFound { .. } => ExitCode::NotFound,

            PhenomatchError::Store(e) | PhenomatchError::Ingest(IngestError::Store(e))
                if e.is_unavailable() =>
            {
                ExitCode::BlockingError
            }
            PhenomatchError::Store(StoreError::Vector {
                source: VectorError::DimensionMismatch { .. },
                ..
            })
            | PhenomatchError::Vector(VectorError::DimensionMismatch { .. }) => {
                ExitCode::DimensionMismatch
            }

            PhenomatchError::Ingest(IngestError::SourceRead { .. }) => ExitCode::IoError,
            PhenomatchError::Ingest(IngestError::MissingAnnotationSource)
            | PhenomatchError::Config { .. } => ExitCode::ConfigError,

            _ => ExitCode::GeneralError,
        }
    }

    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, ExitCode::BlockingError)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }

    /// Get a human-readable description of the exit code.
    pub fn description(&self) -> &str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::GeneralError => "General error",
            ExitCode::BlockingError => "Vector store unavailable",
            ExitCode::NotFound => "Not found",
            ExitCode::IoError => "I/O error",
            ExitCode::ConfigError => "Configuration error",
            ExitCode::DimensionMismatch => "Embedding dimension mismatch",
        }
    }
}
