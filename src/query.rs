//! Ranking diseases for a set of observed phenotypes.

use std::num::NonZeroUsize;

use serde::Serialize;
use tracing::debug;

use crate::aggregate::Aggregator;
use crate::annotation::AnnotationIndex;
use crate::cache::EmbeddingCache;
use crate::error::{PhenomatchError, PhenomatchResult};
use crate::store::{DiseaseVectorStore, Neighbor};
use crate::types::{DiseaseId, PhenotypeId};
use crate::vector::{VectorError, cosine_similarity};

/// Result of a disease query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// None of the query phenotypes has a cached embedding.
    NoMatch,
    /// Diseases ascending by distance, ties by id. May be empty.
    Ranked(Vec<Neighbor>),
}

impl QueryOutcome {
    pub fn is_no_match(&self) -> bool {
        matches!(self, Self::NoMatch)
    }

    pub fn neighbors(&self) -> &[Neighbor] {
        match self {
            Self::NoMatch => &[],
            Self::Ranked(neighbors) => neighbors,
        }
    }
}

/// How closely one annotated phenotype matches its disease aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhenotypeSimilarity {
    pub phenotype: PhenotypeId,
    pub label: Option<String>,
    /// `None` when the phenotype has no cached embedding.
    pub similarity: Option<f32>,
}

/// Read-only query front end over the cache and the disease store.
#[derive(Debug)]
pub struct QueryService<'a, S: ?Sized> {
    cache: &'a EmbeddingCache,
    store: &'a S,
}

impl<'a, S> QueryService<'a, S>
where
    S: DiseaseVectorStore + ?Sized,
{
    pub fn new(cache: &'a EmbeddingCache, store: &'a S) -> Self {
        Self { cache, store }
    }

    /// Ranks diseases by distance to the average of `phenotypes`.
    ///
    /// Returns [`QueryOutcome::NoMatch`] when no phenotype has an embedding.
    /// Non-finite distances reported by the store are dropped.
    pub fn query<P>(&self, phenotypes: &[P], k: NonZeroUsize) -> PhenomatchResult<QueryOutcome>
    where
        P: AsRef<str>,
    {
        let Some(query_vector) = Aggregator::average(phenotypes, self.cache)? else {
            debug!("No cached embeddings among {} query phenotypes", phenotypes.len());
            return Ok(QueryOutcome::NoMatch);
        };

        let k = k.get();
        let mut neighbors = self.store.query(&query_vector, k)?;

        let before = neighbors.len();
        neighbors.retain(|n| n.distance.is_finite());
        if neighbors.len() != before {
            debug!(
                "Dropped {} non-finite distances from '{}'",
                before - neighbors.len(),
                self.store.name()
            );
        }

        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        neighbors.truncate(k);

        Ok(QueryOutcome::Ranked(neighbors))
    }

    /// Cosine similarity of each annotated phenotype to the stored disease
    /// vector, most similar first; phenotypes without embeddings come last.
    pub fn explain(
        &self,
        disease: &DiseaseId,
        index: &AnnotationIndex,
    ) -> PhenomatchResult<Vec<PhenotypeSimilarity>> {
        let disease_vector =
            self.store
                .get(disease)?
                .ok_or_else(|| PhenomatchError::DiseaseNotFound {
                    id: disease.to_string(),
                    collection: self.store.name().to_string(),
                })?;

        let mut rows = Vec::new();
        for phenotype in index.phenotypes(disease.as_str()).into_iter().flatten() {
            let similarity = match self.cache.get(phenotype.as_str()) {
                Some(vector) if vector.len() != disease_vector.len() => {
                    return Err(VectorError::DimensionMismatch {
                        expected: disease_vector.len(),
                        actual: vector.len(),
                    }
                    .into());
                }
                Some(vector) => Some(cosine_similarity(vector, &disease_vector)),
                None => None,
            };
            rows.push(PhenotypeSimilarity {
                phenotype: phenotype.clone(),
                label: self.cache.label(phenotype.as_str()).map(str::to_string),
                similarity,
            });
        }

        rows.sort_by(|a, b| match (a.similarity, b.similarity) {
            (Some(x), Some(y)) => y.total_cmp(&x).then_with(|| a.phenotype.cmp(&b.phenotype)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.phenotype.cmp(&b.phenotype),
        });
        Ok(rows)
    }
}
