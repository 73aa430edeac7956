//! `mealplan generate` command: request a plan from a running server.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use thiserror::Error;

use mealplan_core::demo::demo_meal_plan;
use mealplan_core::plan::MealPlan;
use mealplan_core::preferences::{UserPreferences, validate_preferences};

use crate::render::render_plan;

/// Generation can take several model calls; leave room for all of them.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum ClientError {
    /// No HTTP response at all (connection refused, timeout, reset).
    #[error("could not reach the meal plan server: {0}")]
    Network(#[source] reqwest::Error),

    #[error("{}", api_message(*.status, .message))]
    Api { status: u16, message: String },

    #[error("unexpected response from the meal plan server: {0}")]
    InvalidResponse(String),
}

fn api_message(status: u16, message: &str) -> String {
    match status {
        429 => format!("rate limited by the server: {message}"),
        400 => format!("invalid preferences: {message}"),
        500..=599 => format!("server error ({status}): {message}"),
        _ => format!("request failed ({status}): {message}"),
    }
}

/// Where a plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    Server,
    DemoFallback,
}

/// Read and validate a preferences file (the `preferences` object itself).
pub fn load_preferences(path: &Path) -> Result<UserPreferences> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read preferences file {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("preferences file {} is not valid JSON", path.display()))?;
    let object = value
        .as_object()
        .with_context(|| format!("preferences file {} must hold a JSON object", path.display()))?;
    let prefs = validate_preferences(object)
        .with_context(|| format!("invalid preferences in {}", path.display()))?;
    Ok(prefs)
}

/// POST `prefs` to `{server}/api/meal-plan/generate` and decode the plan.
pub async fn request_plan(server: &str, prefs: &UserPreferences) -> Result<MealPlan, ClientError> {
    let http = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(ClientError::Network)?;
    let url = format!("{}/api/meal-plan/generate", server.trim_end_matches('/'));

    let response = http
        .post(&url)
        .json(&json!({ "preferences": prefs }))
        .send()
        .await
        .map_err(ClientError::Network)?;

    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

    if !status.is_success() {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no message")
            .to_string();
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let data = body
        .get("data")
        .cloned()
        .ok_or_else(|| ClientError::InvalidResponse("missing data field".to_string()))?;
    serde_json::from_value(data).map_err(|e| ClientError::InvalidResponse(e.to_string()))
}

/// Like [`request_plan`], but serve the built-in demo plan when the
/// server cannot be reached. HTTP error statuses are not masked.
pub async fn fetch_plan_or_demo(
    server: &str,
    prefs: &UserPreferences,
) -> Result<(MealPlan, PlanSource), ClientError> {
    match request_plan(server, prefs).await {
        Ok(plan) => Ok((plan, PlanSource::Server)),
        Err(ClientError::Network(e)) => {
            tracing::warn!(error = %e, server, "server unreachable, using demo meal plan");
            Ok((demo_meal_plan(), PlanSource::DemoFallback))
        }
        Err(e) => Err(e),
    }
}

/// Run the generate command.
pub async fn run_generate(preferences: &Path, server: &str, as_json: bool) -> Result<()> {
    let prefs = load_preferences(preferences)?;
    let (plan, source) = fetch_plan_or_demo(server, &prefs).await?;

    if source == PlanSource::DemoFallback {
        eprintln!("warning: could not reach {server}; showing the demo meal plan instead");
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", render_plan(&plan));
    }
    Ok(())
}

/// Run the demo command.
pub fn run_demo(as_json: bool) -> Result<()> {
    let plan = demo_meal_plan();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", render_plan(&plan));
    }
    Ok(())
}
