use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use packbot_core::{BackendKind, ModelFiles, DEFAULT_MODEL_PATH};

#[derive(Debug, Parser)]
#[command(
    name = "packbot-server",
    version,
    about = "Packaging FAQ chatbot and packaging-type predictor over HTTP"
)]
pub struct ServerConfig {
    #[arg(long, env = "PACKBOT_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    #[arg(long, env = "PACKBOT_BACKEND", default_value_t = BackendKind::Tfidf)]
    pub backend: BackendKind,

    /// Sentence-transformer checkpoint (.safetensors), minilm backend only.
    #[arg(long, env = "PACKBOT_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    #[arg(long, env = "PACKBOT_TOKENIZER_PATH")]
    pub tokenizer_path: Option<PathBuf>,

    /// Packaging classifier written by `packbot retrain`.
    #[arg(long, env = "PACKBOT_PREDICTOR_MODEL", default_value = DEFAULT_MODEL_PATH)]
    pub predictor_model: PathBuf,
}

impl ServerConfig {
    pub fn model_files(&self) -> ModelFiles {
        ModelFiles {
            model_path: self.model_path.clone(),
            tokenizer_path: self.tokenizer_path.clone(),
        }
    }
}
