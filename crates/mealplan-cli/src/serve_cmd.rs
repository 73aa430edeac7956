use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use mealplan_core::demo::demo_meal_plan;
use mealplan_core::model::{ModelClient, ModelError, OpenAiClient, UpstreamKind};
use mealplan_core::preferences::{ValidationError, validate_request};
use mealplan_core::{GenerateError, MealPlanGenerator};

use crate::config::MealPlanConfig;
use crate::rate_limit::{self, LimitScope, RateLimiter, RateLimits};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Failure envelope: `{success: false, error, message, retryAfter?}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: String,
    retry_after: Option<u64>,
}

impl ApiError {
    fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error,
            message: message.into(),
            retry_after: None,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Validation error", err.to_string())
    }
}

impl From<GenerateError> for ApiError {
    fn from(err: GenerateError) -> Self {
        match err.model_error() {
            Some(model_err @ ModelError::Upstream {
                kind: UpstreamKind::RateLimited,
                ..
            }) => Self {
                retry_after: Some(60),
                ..Self::new(
                    StatusCode::TOO_MANY_REQUESTS,
                    "Rate limit exceeded",
                    model_err.to_string(),
                )
            },
            Some(ModelError::Configuration(_))
            | Some(ModelError::Upstream {
                kind: UpstreamKind::InvalidCredentials,
                ..
            }) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error",
                "Service temporarily unavailable",
            ),
            _ => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Generation failed",
                err.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "error": self.error,
            "message": self.message,
        });
        if let Some(secs) = self.retry_after {
            body["retryAfter"] = json!(secs);
        }
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<MealPlanGenerator>,
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn build_router(state: AppState, limits: RateLimits) -> Router {
    let strict = RateLimiter::new(limits.strict, LimitScope::Strict);
    let general = RateLimiter::new(limits.general, LimitScope::General);

    let meal_plan = Router::new()
        .route("/generate", post(generate_plan))
        .route("/demo", get(demo_plan))
        .layer(middleware::from_fn_with_state(strict, rate_limit::enforce));

    Router::new()
        .nest("/api/meal-plan", meal_plan)
        .route("/api/health", get(health))
        .layer(middleware::from_fn_with_state(general, rate_limit::enforce))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(config: &MealPlanConfig) -> Result<()> {
    if config.provider.api_key.is_none() {
        tracing::warn!(
            "no model API key configured; /api/meal-plan/generate will fail until one is set"
        );
    }
    let client: Arc<dyn ModelClient> = Arc::new(OpenAiClient::new(config.provider.clone())?);
    let generator = Arc::new(MealPlanGenerator::new(client, config.generation.clone()));
    let app = build_router(
        AppState {
            generator: generator.clone(),
        },
        config.limits,
    );

    let addr = config.socket_addr()?;
    tracing::info!(
        client = generator.client_name(),
        model = %config.provider.model,
        "mealplan serve listening on http://{addr}"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    tracing::info!("mealplan serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn generate_plan(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    generate_for_request(&state, &body)
        .instrument(tracing::info_span!("generate", %request_id))
        .await
}

async fn generate_for_request(state: &AppState, body: &[u8]) -> Result<Response, ApiError> {
    let raw: Value = serde_json::from_slice(body).map_err(|_| ValidationError::MalformedBody)?;
    let prefs = validate_request(&raw)?;

    tracing::info!(
        selected_days = ?prefs.selected_days,
        selected_meals = ?prefs.selected_meals,
        "meal plan request"
    );

    let outcome = state.generator.generate(&prefs).await.map_err(|e| {
        tracing::error!(error = %e, "meal plan generation failed");
        ApiError::from(e)
    })?;

    tracing::info!(
        model_calls = outcome.model_calls,
        repaired = ?outcome.repaired,
        "meal plan generated"
    );

    Ok(Json(json!({
        "success": true,
        "data": outcome.plan,
        "timestamp": timestamp(),
    }))
    .into_response())
}

async fn demo_plan() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": demo_meal_plan(),
        "timestamp": timestamp(),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": timestamp(),
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
