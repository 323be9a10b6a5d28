pub mod alias;
pub mod backend;
pub mod embed;
pub mod error;
pub mod eval;
pub mod fuzzy;
pub mod knowledge;
pub mod minilm_embed;
pub mod model;
pub mod normalize;
pub mod predictor;
pub mod resolver;
pub mod retrieval;
pub mod storage;
pub mod tfidf;

pub use alias::{AliasIndex, DEFAULT_ALIASES};
pub use backend::{build_backend, BackendKind, ModelFiles};
pub use embed::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{AliasError, PredictError};
pub use eval::{evaluate_cases, EvalCase, EvalOutcome, EvalSummary};
pub use fuzzy::{fuzzy_best, sequence_ratio, FuzzyMatch};
pub use knowledge::{KnowledgeBase, PACKAGING_FACTS};
pub use minilm_embed::MiniLmEmbeddingProvider;
pub use model::{AnswerDecision, Candidate, Method};
pub use normalize::normalize;
pub use predictor::dataset::{load_csv, synthetic, TrainingRow, DEFAULT_SAMPLES, DEFAULT_SEED};
pub use predictor::features::{PackagingFeatures, PredictRequest};
pub use predictor::{PackagingModel, PlasticProbability, Prediction, PredictionReport, DEFAULT_MODEL_PATH};
pub use resolver::{Resolver, CONF_THRESH, FUZZY_CUTOFF, LOWER_CONF_THRESH, TOP_K};
pub use retrieval::{cosine_similarity, EmbeddingIndex, ScoredEntry, SimilarityBackend};
pub use storage::{load_model_json, save_model_json};
pub use tfidf::TfidfIndex;
