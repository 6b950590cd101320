//! JSON-lines import into an embedding collection.
//!
//! One entry per line:
//!
//! ```text
//! {"id": "HP:0000118", "embedding": [0.1, 0.2], "metadata": {"label": "Phenotypic abnormality"}}
//! ```
//!
//! `metadata` is optional. When it has no `original_id` the line id is used.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::annotation::AnnotationIndex;
use crate::cache::ORIGINAL_ID_FIELD;
use crate::error::{IngestError, IngestResult, StoreError};
use crate::vector::{Collection, Metadata};

#[derive(Debug, Deserialize)]
struct EmbeddingLine {
    id: String,
    embedding: Vec<f32>,
    #[serde(default)]
    metadata: Metadata,
}

/// Counts from one import run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportStats {
    pub imported: usize,
    pub skipped: usize,
    /// First few rejected lines as `(line number, reason)`.
    pub errors: Vec<(usize, String)>,
}

impl ImportStats {
    const MAX_ERRORS: usize = 20;

    fn reject(&mut self, line: usize, reason: String) {
        debug!("Skipping line {line}: {reason}");
        if self.errors.len() < Self::MAX_ERRORS {
            self.errors.push((line, reason));
        }
        self.skipped += 1;
    }
}

/// Imports a JSON-lines embedding file into `collection`.
pub fn import_embeddings(
    path: impl AsRef<Path>,
    collection: &mut Collection,
) -> IngestResult<ImportStats> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| IngestError::SourceRead {
        path: path.to_path_buf(),
        source,
    })?;

    let stats = import_embeddings_from_reader(BufReader::new(file), path, collection)?;

    info!(
        "Imported {} embeddings into '{}' from {} ({} lines skipped)",
        stats.imported,
        collection.name(),
        path.display(),
        stats.skipped
    );
    if let Some((line, reason)) = stats.errors.first() {
        warn!(
            "{} embedding lines were rejected, first at line {line}: {reason}",
            stats.skipped
        );
    }
    Ok(stats)
}

/// Reads a delimited annotation file into an index.
///
/// An index without a single disease is returned as is; the builder then has
/// nothing to commit.
pub fn import_annotations_file(path: impl AsRef<Path>) -> IngestResult<AnnotationIndex> {
    let path = path.as_ref();
    let index = AnnotationIndex::from_file(path)?;
    if index.is_empty() {
        warn!("No usable annotation rows in {}", path.display());
    } else if index.skipped_rows() > 0 {
        warn!(
            "Skipped {} malformed annotation rows in {}",
            index.skipped_rows(),
            path.display()
        );
    }
    Ok(index)
}

/// Imports JSON lines from any buffered reader; `source` names it in errors.
///
/// Blank lines are ignored. Lines that fail to parse, carry an empty vector
/// or a vector of the wrong dimension are skipped and counted.
pub fn import_embeddings_from_reader<R: BufRead>(
    reader: R,
    source: &Path,
    collection: &mut Collection,
) -> IngestResult<ImportStats> {
    let mut stats = ImportStats::default();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|e| IngestError::SourceRead {
            path: source.to_path_buf(),
            source: e,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let parsed: EmbeddingLine = match serde_json::from_str(trimmed) {
            Ok(parsed) => parsed,
            Err(e) => {
                stats.reject(line_no, format!("invalid JSON: {e}"));
                continue;
            }
        };

        let EmbeddingLine {
            id,
            embedding,
            mut metadata,
        } = parsed;
        if id.trim().is_empty() {
            stats.reject(line_no, "blank id".to_string());
            continue;
        }
        metadata
            .entry(ORIGINAL_ID_FIELD)
            .or_insert_with(|| serde_json::Value::from(id.as_str()));

        match collection.upsert(&id, embedding, metadata) {
            Ok(()) => stats.imported += 1,
            Err(e @ (StoreError::EmptyVector { .. } | StoreError::Vector { .. })) => {
                stats.reject(line_no, e.to_string());
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(stats)
}
