//! End-to-end ingestion: embeddings and annotations in, disease vectors out.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::annotation::AnnotationIndex;
use crate::builder::{BuildReport, DiseaseAggregateBuilder};
use crate::cache::EmbeddingCache;
use crate::config::{AnnotationSource, Settings};
use crate::error::{IngestError, PhenomatchResult};
use crate::ingest::import_annotations_file;
use crate::store::CollectionStore;
use crate::vector::{VectorDatabase, tag_metadata};

/// Metadata tag on mirrored phenotype vectors.
pub const PHENOTYPE_TAG: &str = "HP";

/// Statistics collected during one ingest run
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Phenotype embeddings held in the cache
    pub embeddings_cached: usize,

    /// Embedding entries without an id or vector
    pub embeddings_skipped: usize,

    /// Diseases in the annotation index
    pub diseases: usize,

    /// Distinct (disease, phenotype) pairs
    pub annotations: usize,

    /// Annotation rows rejected as malformed
    pub annotation_rows_skipped: usize,

    /// Phenotype vectors written to the phenotype collection
    pub phenotypes_mirrored: usize,

    /// Outcome of the disease aggregate batch
    pub build: BuildReport,

    /// Time elapsed during ingestion
    pub elapsed: Duration,
}

/// Loads the phenotype embedding cache from the configured collection.
pub fn load_cache(database: &VectorDatabase, settings: &Settings) -> PhenomatchResult<EmbeddingCache> {
    let name = &settings.collections.embeddings;
    let cache = EmbeddingCache::from_collection(database.get_collection(name)?);
    if cache.is_empty() {
        return Err(IngestError::EmptyEmbeddingCache {
            collection: name.clone(),
        }
        .into());
    }
    Ok(cache)
}

/// Loads the annotation index from the configured source.
///
/// `file_override` takes precedence over the configured file and source.
pub fn load_annotations(
    database: &VectorDatabase,
    settings: &Settings,
    file_override: Option<&Path>,
) -> PhenomatchResult<AnnotationIndex> {
    if let Some(path) = file_override {
        return Ok(import_annotations_file(path)?);
    }

    match settings.annotations.source {
        AnnotationSource::File => {
            let path = settings
                .resolved_annotations_path()
                .ok_or(IngestError::MissingAnnotationSource)?;
            Ok(import_annotations_file(path)?)
        }
        AnnotationSource::Collection => Ok(AnnotationIndex::from_collection(
            database.get_collection(&settings.collections.annotations)?,
        )),
    }
}

/// Drives one ingestion run against an open database.
#[derive(Debug)]
pub struct Pipeline<'a> {
    settings: &'a Settings,
    database: &'a mut VectorDatabase,
}

impl<'a> Pipeline<'a> {
    pub fn new(settings: &'a Settings, database: &'a mut VectorDatabase) -> Self {
        Self { settings, database }
    }

    /// Builds the cache and index, mirrors phenotype vectors, computes every
    /// disease aggregate and persists both output collections.
    pub fn ingest(&mut self, annotations: Option<&Path>) -> PhenomatchResult<IngestReport> {
        let started = Instant::now();
        let collections = &self.settings.collections;
        let metric = self.settings.search.metric;

        let cache = load_cache(self.database, self.settings)?;
        let index = load_annotations(self.database, self.settings, annotations)?;

        let mut report = IngestReport {
            embeddings_cached: cache.len(),
            embeddings_skipped: cache.skipped_entries(),
            diseases: index.disease_count(),
            annotations: index.annotation_count(),
            annotation_rows_skipped: index.skipped_rows(),
            ..Default::default()
        };

        let phenotypes = self
            .database
            .get_or_create_collection(&collections.phenotype_embeddings, metric)?;
        for (id, vector) in cache.iter() {
            phenotypes.upsert(id.as_str(), vector.to_vec(), tag_metadata(PHENOTYPE_TAG))?;
            report.phenotypes_mirrored += 1;
        }
        debug!(
            "Mirrored {} phenotype vectors into '{}'",
            report.phenotypes_mirrored, collections.phenotype_embeddings
        );

        let diseases = self
            .database
            .get_or_create_collection(&collections.disease_embeddings, metric)?;
        let mut store = CollectionStore::new(diseases);
        report.build = DiseaseAggregateBuilder::new(&index, &cache).run(&mut store)?;

        self.database.persist(&collections.phenotype_embeddings)?;
        self.database.persist(&collections.disease_embeddings)?;

        report.elapsed = started.elapsed();
        info!(
            "Ingest finished in {:.2}s: {} diseases committed",
            report.elapsed.as_secs_f64(),
            report.build.committed
        );
        Ok(report)
    }
}
