use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::embed::EmbeddingProvider;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredEntry {
    pub index: usize,
    pub score: f32,
}

/// Ranks a fixed corpus, bound at construction, against a free-text query.
///
/// Results are sorted by descending score, ties keep corpus order, and at
/// most `k` entries come back.
pub trait SimilarityBackend: Send + Sync {
    fn rank(&self, query: &str, k: usize) -> Result<Vec<ScoredEntry>>;

    fn corpus_len(&self) -> usize;
}

impl SimilarityBackend for Box<dyn SimilarityBackend> {
    fn rank(&self, query: &str, k: usize) -> Result<Vec<ScoredEntry>> {
        (**self).rank(query, k)
    }

    fn corpus_len(&self) -> usize {
        (**self).corpus_len()
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, na, nb) = a
        .iter()
        .zip(b.iter())
        .fold((0.0f32, 0.0f32, 0.0f32), |(d, aa, bb), (x, y)| {
            (d + (x * y), aa + (x * x), bb + (y * y))
        });

    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}

/// Sort `scores` (one per corpus position) and keep the best `k`.
pub fn top_k(scores: impl IntoIterator<Item = f32>, k: usize) -> Vec<ScoredEntry> {
    let mut scored: Vec<ScoredEntry> = scores
        .into_iter()
        .enumerate()
        .map(|(index, score)| ScoredEntry { index, score })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    scored
}

/// Dense-vector backend: the corpus is embedded once up front and queries
/// are ranked by cosine similarity.
pub struct EmbeddingIndex<E> {
    provider: E,
    embeddings: Vec<Vec<f32>>,
}

impl<E: EmbeddingProvider> EmbeddingIndex<E> {
    pub fn build<S: AsRef<str> + Sync>(provider: E, corpus: &[S]) -> Result<Self> {
        let embeddings = corpus
            .par_iter()
            .enumerate()
            .map(|(i, text)| {
                provider
                    .embed(text.as_ref())
                    .with_context(|| format!("embed corpus entry {i}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            provider,
            embeddings,
        })
    }
}

impl<E: EmbeddingProvider> SimilarityBackend for EmbeddingIndex<E> {
    fn rank(&self, query: &str, k: usize) -> Result<Vec<ScoredEntry>> {
        let q = self.provider.embed(query).context("embed query")?;
        Ok(top_k(
            self.embeddings.iter().map(|e| cosine_similarity(&q, e)),
            k,
        ))
    }

    fn corpus_len(&self) -> usize {
        self.embeddings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbeddingProvider;

    #[test]
    fn cosine_works_for_unit_vectors() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        let c = vec![0.0, 1.0, 0.0];

        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&a, &c) - 0.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &[1.0]), 0.0);
    }

    #[test]
    fn top_k_sorts_descending_and_keeps_order_on_ties() {
        let ranked = top_k([0.2, 0.9, 0.5, 0.9], 3);
        let idx: Vec<usize> = ranked.iter().map(|s| s.index).collect();
        assert_eq!(idx, vec![1, 3, 2]);

        assert_eq!(top_k([0.1], 3).len(), 1);
    }

    #[test]
    fn embedding_index_finds_overlapping_entry() {
        let corpus = [
            "Gelatin is protein-based and used in edible films.",
            "Alginate is derived from seaweed and used for coatings.",
            "Nanoclay enhances mechanical properties.",
        ];
        let index = EmbeddingIndex::build(HashEmbeddingProvider::default(), &corpus).unwrap();
        assert_eq!(index.corpus_len(), 3);

        let hits = index.rank("which one comes from seaweed", 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].index, 1);
        assert!(hits[0].score > hits[1].score);
    }
}
