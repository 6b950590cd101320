//! Batch computation of per-disease aggregate vectors.

use tracing::{debug, info, warn};

use crate::aggregate::Aggregator;
use crate::annotation::AnnotationIndex;
use crate::cache::EmbeddingCache;
use crate::error::{StoreError, StoreResult};
use crate::store::{DISEASE_TAG, DiseaseVectorStore};
use crate::types::DiseaseId;

/// Outcome of one builder run.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub committed: usize,
    pub skipped_empty: usize,
    pub failures: Vec<BuildFailure>,
}

impl BuildReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A disease whose aggregate could not be computed or stored.
#[derive(Debug)]
pub struct BuildFailure {
    pub disease: DiseaseId,
    pub reason: String,
}

/// Computes one averaged vector per annotated disease and upserts it.
#[derive(Debug, Clone, Copy)]
pub struct DiseaseAggregateBuilder<'a> {
    index: &'a AnnotationIndex,
    cache: &'a EmbeddingCache,
}

impl<'a> DiseaseAggregateBuilder<'a> {
    pub fn new(index: &'a AnnotationIndex, cache: &'a EmbeddingCache) -> Self {
        Self { index, cache }
    }

    /// Runs the batch in ascending disease order.
    ///
    /// Diseases with no cached phenotype are skipped without writing a
    /// placeholder. A per-disease failure is recorded in the report and the
    /// batch continues; an unreachable store aborts the run.
    pub fn run<S>(&self, store: &mut S) -> StoreResult<BuildReport>
    where
        S: DiseaseVectorStore + ?Sized,
    {
        let mut report = BuildReport::default();

        for (disease, phenotypes) in self.index.iter() {
            let average = match Aggregator::average(phenotypes, self.cache) {
                Ok(Some(average)) => average,
                Ok(None) => {
                    debug!("No cached embeddings for {disease}, skipping");
                    report.skipped_empty += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Failed to aggregate {disease}: {e}");
                    report.failures.push(BuildFailure {
                        disease: disease.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match store.upsert(disease, &average, DISEASE_TAG) {
                Ok(()) => report.committed += 1,
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => {
                    warn!("Failed to store aggregate for {disease}: {e}");
                    report.failures.push(BuildFailure {
                        disease: disease.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Disease aggregates: {} committed, {} skipped (no embeddings), {} failed",
            report.committed,
            report.skipped_empty,
            report.failed()
        );
        Ok(report)
    }
}

fn is_fatal(error: &StoreError) -> bool {
    error.is_unavailable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Neighbor;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct MemoryStore {
        vectors: BTreeMap<DiseaseId, Vec<f32>>,
        upserts: usize,
        unavailable: bool,
    }

    impl DiseaseVectorStore for MemoryStore {
        fn name(&self) -> &str {
            "memory"
        }

        fn upsert(&mut self, id: &DiseaseId, vector: &[f32], tag: &str) -> StoreResult<()> {
            assert_eq!(tag, DISEASE_TAG);
            if self.unavailable {
                return Err(StoreError::Unavailable {
                    name: "memory".to_string(),
                    reason: "offline".to_string(),
                });
            }
            self.upserts += 1;
            self.vectors.insert(id.clone(), vector.to_vec());
            Ok(())
        }

        fn query(&self, _vector: &[f32], _k: usize) -> StoreResult<Vec<Neighbor>> {
            Ok(Vec::new())
        }

        fn get(&self, id: &DiseaseId) -> StoreResult<Option<Vec<f32>>> {
            Ok(self.vectors.get(id).cloned())
        }
    }

    fn fixtures() -> (AnnotationIndex, EmbeddingCache) {
        let index = AnnotationIndex::from_rows(vec![
            vec!["OMIM:1", "D1", "", "HP:A"],
            vec!["OMIM:1", "D1", "", "HP:B"],
            vec!["OMIM:2", "D2", "", "HP:missing"],
            vec!["OMIM:3", "D3", "", "HP:A"],
            vec!["OMIM:3", "D3", "", "HP:short"],
        ]);
        let cache = EmbeddingCache::from_pairs([
            ("HP:A", vec![1.0, 2.0, 3.0]),
            ("HP:B", vec![4.0, 5.0, 6.0]),
            ("HP:short", vec![1.0]),
        ]);
        (index, cache)
    }

    #[test]
    fn test_run_commits_skips_and_records_failures() {
        let (index, cache) = fixtures();
        let mut store = MemoryStore::default();

        let report = DiseaseAggregateBuilder::new(&index, &cache)
            .run(&mut store)
            .unwrap();

        assert_eq!(report.committed, 1);
        assert_eq!(report.skipped_empty, 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].disease.as_str(), "OMIM:3");
        assert_eq!(
            store.get(&"OMIM:1".into()).unwrap(),
            Some(vec![2.5, 3.5, 4.5])
        );
        assert!(store.get(&"OMIM:2".into()).unwrap().is_none());
    }

    #[test]
    fn test_run_twice_is_idempotent() {
        let (index, cache) = fixtures();
        let mut store = MemoryStore::default();
        let builder = DiseaseAggregateBuilder::new(&index, &cache);

        builder.run(&mut store).unwrap();
        let first = store.vectors.clone();
        builder.run(&mut store).unwrap();

        assert_eq!(store.vectors, first);
        assert_eq!(store.vectors.len(), 1);
        assert_eq!(store.upserts, 2);
    }

    #[test]
    fn test_unavailable_store_aborts_run() {
        let (index, cache) = fixtures();
        let mut store = MemoryStore {
            unavailable: true,
            ..Default::default()
        };

        let result = DiseaseAggregateBuilder::new(&index, &cache).run(&mut store);
        assert!(matches!(result, Err(StoreError::Unavailable { .. })));
    }
}
