//! Sentence embeddings from a BERT-style sentence-transformer
//! (all-MiniLM-L6-v2 by default) loaded from a `.safetensors` checkpoint.

use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{embedding, layer_norm, linear, Embedding, LayerNorm, Linear, VarBuilder};
use serde::Deserialize;
use tokenizers::{Tokenizer, TruncationParams};

use crate::embed::EmbeddingProvider;

/// sentence-transformers truncates MiniLM inputs at 256 word pieces.
const MAX_SEQ_LEN: usize = 256;

#[derive(Debug, Clone, Deserialize)]
pub struct BertConfig {
    pub hidden_size: usize,
    pub intermediate_size: usize,
    pub num_attention_heads: usize,
    pub num_hidden_layers: usize,
    pub vocab_size: usize,
    pub max_position_embeddings: usize,
    pub type_vocab_size: usize,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
}

fn default_layer_norm_eps() -> f64 {
    1e-12
}

impl Default for BertConfig {
    fn default() -> Self {
        Self {
            hidden_size: 384,
            intermediate_size: 1536,
            num_attention_heads: 12,
            num_hidden_layers: 6,
            vocab_size: 30522,
            max_position_embeddings: 512,
            type_vocab_size: 2,
            layer_norm_eps: default_layer_norm_eps(),
        }
    }
}

impl BertConfig {
    /// Reads `config.json` next to the checkpoint, falling back to the
    /// all-MiniLM-L6-v2 shape when there is none.
    fn for_checkpoint(model_path: &Path) -> Result<Self> {
        let path = model_path.with_file_name("config.json");
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
    }

    fn head_dim(&self) -> usize {
        self.hidden_size / self.num_attention_heads
    }
}

struct Attention {
    query: Linear,
    key: Linear,
    value: Linear,
    dense: Linear,
    norm: LayerNorm,
    heads: usize,
    head_dim: usize,
}

impl Attention {
    fn load(vb: VarBuilder, cfg: &BertConfig) -> Result<Self> {
        let h = cfg.hidden_size;
        let inner = vb.pp("self");
        let out = vb.pp("output");
        Ok(Self {
            query: linear(h, h, inner.pp("query"))?,
            key: linear(h, h, inner.pp("key"))?,
            value: linear(h, h, inner.pp("value"))?,
            dense: linear(h, h, out.pp("dense"))?,
            norm: layer_norm(h, cfg.layer_norm_eps, out.pp("LayerNorm"))?,
            heads: cfg.num_attention_heads,
            head_dim: cfg.head_dim(),
        })
    }

    fn split_heads(&self, x: &Tensor) -> Result<Tensor> {
        let (batch, seq, _) = x.dims3()?;
        Ok(x.reshape((batch, seq, self.heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()?)
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (batch, seq, hidden) = x.dims3()?;
        let q = self.split_heads(&self.query.forward(x)?)?;
        let k = self.split_heads(&self.key.forward(x)?)?;
        let v = self.split_heads(&self.value.forward(x)?)?;

        let scores = (q.matmul(&k.t()?.contiguous()?)? / (self.head_dim as f64).sqrt())?;
        let weights = candle_nn::ops::softmax(&scores, D::Minus1)?;
        let context = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, seq, hidden))?;

        let projected = self.dense.forward(&context)?;
        Ok(self.norm.forward(&(x + projected)?)?)
    }
}

struct FeedForward {
    up: Linear,
    down: Linear,
    norm: LayerNorm,
}

impl FeedForward {
    fn load(vb: VarBuilder, cfg: &BertConfig) -> Result<Self> {
        Ok(Self {
            up: linear(
                cfg.hidden_size,
                cfg.intermediate_size,
                vb.pp("intermediate").pp("dense"),
            )?,
            down: linear(
                cfg.intermediate_size,
                cfg.hidden_size,
                vb.pp("output").pp("dense"),
            )?,
            norm: layer_norm(
                cfg.hidden_size,
                cfg.layer_norm_eps,
                vb.pp("output").pp("LayerNorm"),
            )?,
        })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let h = self.down.forward(&self.up.forward(x)?.gelu_erf()?)?;
        Ok(self.norm.forward(&(x + h)?)?)
    }
}

struct Encoder {
    words: Embedding,
    positions: Embedding,
    token_types: Embedding,
    embed_norm: LayerNorm,
    layers: Vec<(Attention, FeedForward)>,
    device: Device,
}

impl Encoder {
    fn load(vb: VarBuilder, cfg: &BertConfig, device: Device) -> Result<Self> {
        let emb = vb.pp("embeddings");
        let words = embedding(cfg.vocab_size, cfg.hidden_size, emb.pp("word_embeddings"))?;
        let positions = embedding(
            cfg.max_position_embeddings,
            cfg.hidden_size,
            emb.pp("position_embeddings"),
        )?;
        let token_types = embedding(
            cfg.type_vocab_size,
            cfg.hidden_size,
            emb.pp("token_type_embeddings"),
        )?;
        let embed_norm = layer_norm(cfg.hidden_size, cfg.layer_norm_eps, emb.pp("LayerNorm"))?;

        let layers = (0..cfg.num_hidden_layers)
            .map(|i| {
                let lvb = vb.pp(format!("encoder.layer.{i}"));
                Ok((
                    Attention::load(lvb.pp("attention"), cfg)?,
                    FeedForward::load(lvb, cfg)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            words,
            positions,
            token_types,
            embed_norm,
            layers,
            device,
        })
    }

    /// Mean-pooled, L2-normalized sentence vector for one token sequence.
    fn encode(&self, ids: &[u32]) -> Result<Vec<f32>> {
        let ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let seq = ids.dim(1)?;
        let pos = Tensor::arange(0u32, seq as u32, &self.device)?.unsqueeze(0)?;
        let types = ids.zeros_like()?;

        let x = (self.words.forward(&ids)? + self.positions.forward(&pos)?)?;
        let mut x = self.embed_norm.forward(&(x + self.token_types.forward(&types)?)?)?;
        for (attention, ffn) in &self.layers {
            x = ffn.forward(&attention.forward(&x)?)?;
        }

        let pooled = x.mean(1)?.squeeze(0)?;
        let norm = pooled.sqr()?.sum_all()?.sqrt()?.to_scalar::<f32>()?;
        let pooled = if norm > 0.0 {
            (pooled / f64::from(norm))?
        } else {
            pooled
        };
        Ok(pooled.to_vec1::<f32>()?)
    }
}

pub struct MiniLmEmbeddingProvider {
    encoder: Encoder,
    tokenizer: Tokenizer,
}

/// Disables padding and truncates to `max_len` pieces, special tokens
/// included, so long inputs still end in `[SEP]`.
fn prepare_tokenizer(mut tokenizer: Tokenizer, max_len: usize) -> Result<Tokenizer> {
    tokenizer.with_padding(None);
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_len,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("configure truncation: {e}"))?;
    Ok(tokenizer)
}

fn token_ids(tokenizer: &Tokenizer, text: &str) -> Result<Vec<u32>> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;
    Ok(encoding.get_ids().to_vec())
}

impl MiniLmEmbeddingProvider {
    pub fn load(model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
        let cfg = BertConfig::for_checkpoint(model_path)?;
        let device = Device::Cpu;

        // SAFETY: the checkpoint is opened read-only and not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[model_path], DType::F32, &device) }
            .with_context(|| format!("map {}", model_path.display()))?;
        let vb = if vb.contains_tensor("bert.embeddings.word_embeddings.weight") {
            vb.pp("bert")
        } else {
            vb
        };
        let encoder = Encoder::load(vb, &cfg, device).context("load encoder weights")?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer {}: {e}", tokenizer_path.display()))?;
        let max_len = MAX_SEQ_LEN.min(cfg.max_position_embeddings);
        let tokenizer = prepare_tokenizer(tokenizer, max_len)?;

        Ok(Self { encoder, tokenizer })
    }
}

impl EmbeddingProvider for MiniLmEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let ids = token_ids(&self.tokenizer, text)?;
        self.encoder.encode(&ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::cosine_similarity;
    use std::path::PathBuf;
    use std::str::FromStr;

    fn model_files() -> Option<(PathBuf, PathBuf)> {
        let base = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../models");
        let model = base.join("all-MiniLM-L6-v2.safetensors");
        let tokenizer = base.join("all-MiniLM-L6-v2-tokenizer.json");
        if model.exists() && tokenizer.exists() {
            Some((model, tokenizer))
        } else {
            eprintln!("Skipping: all-MiniLM-L6-v2 model or tokenizer not found");
            None
        }
    }

    /// Word-level vocabulary with BERT-style `[CLS] ... [SEP]` wrapping.
    fn tiny_tokenizer() -> Tokenizer {
        let raw = r#"{
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": {"type": "Whitespace"},
            "post_processor": {"type": "BertProcessing", "sep": ["[SEP]", 1], "cls": ["[CLS]", 0]},
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": {"[CLS]": 0, "[SEP]": 1, "[UNK]": 2, "film": 3},
                "unk_token": "[UNK]"
            }
        }"#;
        Tokenizer::from_str(raw).unwrap()
    }

    #[test]
    fn long_inputs_keep_the_closing_separator() {
        let tokenizer = prepare_tokenizer(tiny_tokenizer(), 8).unwrap();
        let text = vec!["film"; 20].join(" ");
        let ids = token_ids(&tokenizer, &text).unwrap();
        assert_eq!(ids, vec![0, 3, 3, 3, 3, 3, 3, 1]);

        let short = token_ids(&tokenizer, "film film").unwrap();
        assert_eq!(short, vec![0, 3, 3, 1]);
    }

    #[test]
    fn default_config_matches_minilm() {
        let cfg = BertConfig::default();
        assert_eq!(cfg.head_dim(), 32);
    }

    #[test]
    fn config_parses_hf_layout() {
        let raw = r#"{"hidden_size": 384, "intermediate_size": 1536,
            "num_attention_heads": 12, "num_hidden_layers": 6, "vocab_size": 30522,
            "max_position_embeddings": 512, "type_vocab_size": 2, "model_type": "bert"}"#;
        let cfg: BertConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.num_hidden_layers, 6);
        assert_eq!(cfg.layer_norm_eps, 1e-12);
    }

    #[test]
    fn embeddings_are_normalized_and_semantic() {
        let Some((model, tokenizer)) = model_files() else {
            return;
        };
        let provider = MiniLmEmbeddingProvider::load(&model, &tokenizer).unwrap();

        let a = provider.embed("Which polymer is made from seaweed?").unwrap();
        let b = provider
            .embed("Alginate is derived from seaweed and used for coatings.")
            .unwrap();
        let c = provider.embed("Thermal stability refers to melting point.").unwrap();

        assert_eq!(a.len(), 384);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01, "norm {norm}");
        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
    }
}
