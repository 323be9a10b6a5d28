use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::embed::{HashEmbeddingProvider, DEFAULT_HASH_DIM};
use crate::minilm_embed::MiniLmEmbeddingProvider;
use crate::retrieval::{EmbeddingIndex, SimilarityBackend};
use crate::tfidf::TfidfIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Hash,
    #[default]
    Tfidf,
    Minilm,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hash => "hash",
            Self::Tfidf => "tfidf",
            Self::Minilm => "minilm",
        };
        f.write_str(name)
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hash" => Ok(Self::Hash),
            "tfidf" | "tf-idf" => Ok(Self::Tfidf),
            "minilm" => Ok(Self::Minilm),
            other => Err(format!(
                "unknown backend '{other}' (expected hash, tfidf or minilm)"
            )),
        }
    }
}

/// Checkpoint and tokenizer for the neural backend.
#[derive(Debug, Clone, Default)]
pub struct ModelFiles {
    pub model_path: Option<PathBuf>,
    pub tokenizer_path: Option<PathBuf>,
}

pub fn build_backend<S: AsRef<str> + Sync>(
    kind: BackendKind,
    corpus: &[S],
    files: &ModelFiles,
) -> Result<Box<dyn SimilarityBackend>> {
    let backend: Box<dyn SimilarityBackend> = match kind {
        BackendKind::Hash => Box::new(EmbeddingIndex::build(
            HashEmbeddingProvider::new(DEFAULT_HASH_DIM),
            corpus,
        )?),
        BackendKind::Tfidf => Box::new(TfidfIndex::fit(corpus)),
        BackendKind::Minilm => match (&files.model_path, &files.tokenizer_path) {
            (Some(model), Some(tokenizer)) => {
                info!(model = %model.display(), "loading sentence embedding model");
                let provider = MiniLmEmbeddingProvider::load(model, tokenizer)?;
                Box::new(EmbeddingIndex::build(provider, corpus)?)
            }
            _ => bail!("the minilm backend needs both --model-path and --tokenizer-path"),
        },
    };

    info!(backend = %kind, entries = backend.corpus_len(), "similarity backend ready");
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        assert_eq!("TFIDF".parse::<BackendKind>(), Ok(BackendKind::Tfidf));
        assert_eq!("hash".parse::<BackendKind>(), Ok(BackendKind::Hash));
        assert!("bm25".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::Minilm.to_string(), "minilm");
    }

    #[test]
    fn minilm_without_files_is_rejected() {
        let err = build_backend(BackendKind::Minilm, &["a"], &ModelFiles::default())
            .err()
            .expect("must fail");
        assert!(err.to_string().contains("--model-path"));
    }

    #[test]
    fn model_free_backends_cover_the_corpus() {
        let corpus = ["one fact", "another fact"];
        for kind in [BackendKind::Hash, BackendKind::Tfidf] {
            let backend = build_backend(kind, &corpus, &ModelFiles::default()).unwrap();
            assert_eq!(backend.corpus_len(), 2);
        }
    }
}
