pub mod config;
pub mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use packbot_core::{build_backend, load_model_json, KnowledgeBase, PackagingModel, Resolver};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use config::ServerConfig;

/// Read-only state shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    pub predictor: Arc<PackagingModel>,
}

impl AppState {
    pub fn new(resolver: Resolver, predictor: PackagingModel) -> Self {
        Self {
            resolver: Arc::new(resolver),
            predictor: Arc::new(predictor),
        }
    }
}

/// Loads everything the service needs. Any failure here is fatal: the
/// server does not start without its backend and classifier.
pub fn build_state(config: &ServerConfig) -> Result<AppState> {
    let kb = Arc::new(KnowledgeBase::packaging());
    info!(
        entries = kb.len(),
        aliases = kb.aliases().len(),
        "knowledge base loaded"
    );

    let backend = build_backend(config.backend, kb.corpus(), &config.model_files())
        .with_context(|| format!("initialise {} similarity backend", config.backend))?;

    let predictor = load_model_json(&config.predictor_model)
        .context("load packaging model (run `packbot retrain` to create one)")?;
    info!(
        path = %config.predictor_model.display(),
        samples = predictor.samples,
        "packaging model loaded"
    );

    Ok(AppState::new(Resolver::new(kb, backend), predictor))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(routes::chat))
        .route("/predict", post(routes::predict))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
