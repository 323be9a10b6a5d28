use std::collections::HashMap;

use anyhow::Result;

use crate::retrieval::{top_k, ScoredEntry, SimilarityBackend};

type SparseVec = HashMap<usize, f32>;

/// TF-IDF over the corpus with smoothed idf and L2-normalized rows, scored
/// by cosine similarity. Tokens are lower-cased runs of two or more word
/// characters; query terms outside the corpus vocabulary are ignored.
#[derive(Debug, Clone)]
pub struct TfidfIndex {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    rows: Vec<SparseVec>,
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
}

fn l2_normalize(v: &mut SparseVec) {
    let norm = v.values().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.values_mut().for_each(|x| *x /= norm);
    }
}

impl TfidfIndex {
    pub fn fit<S: AsRef<str>>(corpus: &[S]) -> Self {
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut counts: Vec<HashMap<usize, f32>> = Vec::with_capacity(corpus.len());

        for doc in corpus {
            let mut tf: HashMap<usize, f32> = HashMap::new();
            for token in tokenize(doc.as_ref()) {
                let next = vocabulary.len();
                let id = *vocabulary.entry(token).or_insert(next);
                *tf.entry(id).or_default() += 1.0;
            }
            counts.push(tf);
        }

        let mut df = vec![0usize; vocabulary.len()];
        for tf in &counts {
            for id in tf.keys() {
                df[*id] += 1;
            }
        }

        let n = corpus.len() as f32;
        let idf: Vec<f32> = df
            .iter()
            .map(|d| ((1.0 + n) / (1.0 + *d as f32)).ln() + 1.0)
            .collect();

        let rows = counts
            .into_iter()
            .map(|tf| {
                let mut row: SparseVec = tf.into_iter().map(|(id, c)| (id, c * idf[id])).collect();
                l2_normalize(&mut row);
                row
            })
            .collect();

        Self {
            vocabulary,
            idf,
            rows,
        }
    }

    fn transform(&self, text: &str) -> SparseVec {
        let mut v = SparseVec::new();
        for token in tokenize(text) {
            if let Some(&id) = self.vocabulary.get(&token) {
                *v.entry(id).or_default() += self.idf[id];
            }
        }
        l2_normalize(&mut v);
        v
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }
}

impl SimilarityBackend for TfidfIndex {
    fn rank(&self, query: &str, k: usize) -> Result<Vec<ScoredEntry>> {
        let q = self.transform(query);
        let scores = self.rows.iter().map(|row| {
            q.iter()
                .filter_map(|(id, w)| row.get(id).map(|r| r * w))
                .fold(0.0f32, |acc, x| acc + x)
        });
        Ok(top_k(scores, k))
    }

    fn corpus_len(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_drops_single_characters() {
        let tokens: Vec<String> = tokenize("Vitamin E and C, O2!").collect();
        assert_eq!(tokens, vec!["vitamin", "and", "o2"]);
    }

    #[test]
    fn identical_text_scores_one() {
        let corpus = ["Chitosan is a natural polymer.", "Pectin is plant derived."];
        let index = TfidfIndex::fit(&corpus);
        let hits = index.rank("Chitosan is a natural polymer.", 2).unwrap();
        assert_eq!(hits[0].index, 0);
        assert!((hits[0].score - 1.0).abs() < 1e-5);
        assert!(hits[1].score < hits[0].score);
    }

    #[test]
    fn unknown_vocabulary_scores_zero() {
        let corpus = ["Gelatin films", "Alginate coatings"];
        let index = TfidfIndex::fit(&corpus);
        let hits = index.rank("quantum chromodynamics", 2).unwrap();
        assert!(hits
            .iter()
            .all(|h| h.score == 0.0 && h.score.is_sign_positive()));
        assert_eq!(hits[0].index, 0);
    }

    #[test]
    fn rare_terms_outweigh_common_ones() {
        let corpus = [
            "packaging made of starch",
            "packaging made of gelatin",
            "packaging made of pectin",
        ];
        let index = TfidfIndex::fit(&corpus);
        assert_eq!(index.vocabulary_len(), 6);
        let hits = index.rank("packaging pectin", 3).unwrap();
        assert_eq!(hits[0].index, 2);
    }
}
