//! Exact nearest-neighbour index over chunk embeddings.
//!
//! Brute-force Euclidean search. Immutable after construction, so any number
//! of readers may search it concurrently.

use emberbot_core::error::RetrievalError;

/// One search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<'a> {
    pub text: &'a str,
    pub distance: f32,
}

/// A flat (chunk, vector) index.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    chunks: Vec<String>,
    vectors: Vec<Vec<f32>>,
    dimension: usize,
}

impl FlatIndex {
    /// Build from chunk texts and their embeddings.
    pub fn new(
        chunks: Vec<String>,
        vectors: Vec<Vec<f32>>,
        dimension: usize,
    ) -> Result<Self, RetrievalError> {
        if chunks.len() != vectors.len() {
            return Err(RetrievalError::EmbeddingFailed(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(RetrievalError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }
        if chunks.is_empty() {
            return Ok(Self::placeholder(dimension));
        }
        Ok(Self {
            chunks,
            vectors,
            dimension,
        })
    }

    /// A degenerate index holding one zero vector and no chunk text.
    pub fn placeholder(dimension: usize) -> Self {
        Self {
            chunks: Vec::new(),
            vectors: vec![vec![0.0; dimension]],
            dimension,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of real chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// The `top_k` chunks closest to `query`, nearest first.
    ///
    /// Ties keep index order. A placeholder index yields no hits.
    pub fn nearest(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit<'_>>, RetrievalError> {
        if query.len() != self.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if self.is_placeholder() || top_k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, l2_distance(v, query)))
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(top_k.min(self.chunks.len()));

        Ok(scored
            .into_iter()
            .map(|(i, distance)| SearchHit {
                text: &self.chunks[i],
                distance,
            })
            .collect())
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> FlatIndex {
        FlatIndex::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![5.0, 5.0]],
            2,
        )
        .unwrap()
    }

    #[test]
    fn nearest_orders_by_distance() {
        let idx = index();
        let hits = idx.nearest(&[0.9, 0.0], 3).unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.text).collect();
        assert_eq!(texts, vec!["b", "a", "c"]);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn top_k_larger_than_corpus() {
        assert_eq!(index().nearest(&[0.0, 0.0], 10).unwrap().len(), 3);
    }

    #[test]
    fn placeholder_has_no_hits() {
        let idx = FlatIndex::placeholder(4);
        assert!(idx.is_placeholder());
        assert!(idx.nearest(&[0.0; 4], 3).unwrap().is_empty());
    }

    #[test]
    fn empty_build_becomes_placeholder() {
        let idx = FlatIndex::new(vec![], vec![], 8).unwrap();
        assert!(idx.is_placeholder());
        assert_eq!(idx.dimension(), 8);
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let err = index().nearest(&[1.0, 2.0, 3.0], 1).unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::DimensionMismatch { expected: 2, actual: 3 }
        ));
    }

    #[test]
    fn ties_keep_insertion_order() {
        let idx = FlatIndex::new(
            vec!["x".into(), "y".into()],
            vec![vec![1.0], vec![-1.0]],
            1,
        )
        .unwrap();
        let hits = idx.nearest(&[0.0], 2).unwrap();
        assert_eq!(hits[0].text, "x");
    }
}
