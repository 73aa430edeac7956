//! OpenAI Responses API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};

use super::envelope::extract_text;
use super::trait_def::ModelClient;
use super::types::{ModelError, ModelRequest, UpstreamKind};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-5-mini";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings for [`OpenAiClient`].
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// [`ModelClient`] backed by `POST {base_url}/responses`.
pub struct OpenAiClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl OpenAiClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.config.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, request: &ModelRequest) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "input": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "max_output_tokens": request.max_output_tokens,
        });
        if let Some(effort) = request.reasoning_effort {
            body["reasoning"] = json!({ "effort": effort.as_str() });
        }
        body
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ModelError::Configuration("no API key configured".to_string()))?;

        tracing::debug!(
            model = %self.config.model,
            max_output_tokens = request.max_output_tokens,
            "sending model request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| ModelError::upstream(UpstreamKind::ServiceError, e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ModelError::upstream(UpstreamKind::ServiceError, e.to_string()))?;

        if !status.is_success() {
            let err = map_provider_error(status, &text);
            tracing::warn!(status = status.as_u16(), error = %err, "model request failed");
            return Err(err);
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            ModelError::upstream(
                UpstreamKind::ServiceError,
                format!("malformed response envelope: {e}"),
            )
        })?;
        extract_text(&body)
    }
}

/// Map a non-success provider response to a [`ModelError`].
///
/// The `error.code` field wins over the HTTP status when both are present.
pub fn map_provider_error(status: StatusCode, body: &str) -> ModelError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    let code = error.and_then(|e| e.get("code")).and_then(Value::as_str);
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    let kind = match code.map(UpstreamKind::from_code) {
        Some(kind) if kind != UpstreamKind::ServiceError => kind,
        _ => match status {
            StatusCode::TOO_MANY_REQUESTS => UpstreamKind::RateLimited,
            StatusCode::UNAUTHORIZED => UpstreamKind::InvalidCredentials,
            _ => UpstreamKind::ServiceError,
        },
    };
    ModelError::upstream(kind, message)
}
