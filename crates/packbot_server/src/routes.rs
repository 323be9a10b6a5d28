use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use packbot_core::PredictRequest;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected chat body");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let message = req.message.unwrap_or_default();
    let resolver = Arc::clone(&state.resolver);
    match tokio::task::spawn_blocking(move || resolver.resolve(&message)).await {
        Ok(Ok(decision)) => {
            info!(method = ?decision.method, score = ?decision.score, "chat answered");
            Json(decision).into_response()
        }
        Ok(Err(err)) => {
            error!(error = %format!("{err:#}"), "chat resolution failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
        }
        Err(err) => {
            error!(error = %err, "chat worker panicked");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected predict body");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    match state.predictor.predict_request(&req) {
        Ok(report) => {
            info!(prediction = %report.prediction, "prediction served");
            Json(report).into_response()
        }
        Err(err) if err.is_validation() => {
            warn!(error = %err, "invalid prediction request");
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        Err(err) => {
            error!(error = %err, "prediction failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "corpus_size": state.resolver.knowledge().len(),
    }))
}
