//! Mean-of-embeddings aggregation shared by ingestion and querying.

use crate::cache::EmbeddingCache;
use crate::types::EmbeddingVector;
use crate::vector::VectorError;

/// Averages phenotype embeddings into a single vector.
///
/// Used both to build per-disease aggregates and to turn a caller's
/// phenotype list into a query vector, so the two always agree.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator;

impl Aggregator {
    /// Element-wise mean of the cached embeddings for `ids`.
    ///
    /// Ids without a cached embedding are ignored. Returns `Ok(None)` when no
    /// id contributes. Contributing vectors of different lengths are an error.
    /// Sums are accumulated in `f64` so the result does not depend on order
    /// beyond rounding.
    pub fn average<I, S>(
        ids: I,
        cache: &EmbeddingCache,
    ) -> Result<Option<EmbeddingVector>, VectorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::average_vectors(ids.into_iter().filter_map(|id| cache.get(id.as_ref())))
    }

    /// Element-wise mean of already resolved vectors.
    pub fn average_vectors<'a>(
        vectors: impl IntoIterator<Item = &'a [f32]>,
    ) -> Result<Option<EmbeddingVector>, VectorError> {
        let mut sums: Vec<f64> = Vec::new();
        let mut count = 0usize;

        for vector in vectors {
            if count == 0 {
                sums = vec![0.0; vector.len()];
            } else if vector.len() != sums.len() {
                return Err(VectorError::DimensionMismatch {
                    expected: sums.len(),
                    actual: vector.len(),
                });
            }
            for (sum, value) in sums.iter_mut().zip(vector) {
                *sum += f64::from(*value);
            }
            count += 1;
        }

        if count == 0 {
            return Ok(None);
        }

        let n = count as f64;
        Ok(Some(sums.into_iter().map(|sum| (sum / n) as f32).collect()))
    }
}
