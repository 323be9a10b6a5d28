use anyhow::Result;

/// Turns a piece of text into a dense vector. Scores produced downstream
/// assume vectors from one provider are comparable by cosine similarity.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

impl EmbeddingProvider for Box<dyn EmbeddingProvider> {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }
}

pub const DEFAULT_HASH_DIM: usize = 384;

/// Model-free bag-of-words embedding: each alphanumeric token is FNV-hashed
/// into a bucket and the count vector is L2-normalized.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dim: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn bucket(&self, token: &str) -> usize {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        for b in token.as_bytes() {
            h ^= u64::from(*b);
            h = h.wrapping_mul(0x0100_0000_01b3);
        }
        (h % self.dim as u64) as usize
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIM)
    }
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dim];

        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            v[self.bucket(token)] += 1.0;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }

        Ok(v)
    }
}
