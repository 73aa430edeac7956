use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inference effort hint forwarded to reasoning-capable models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Minimal,
    #[default]
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Minimal => "minimal",
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasoningEffort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minimal" => Ok(ReasoningEffort::Minimal),
            "low" => Ok(ReasoningEffort::Low),
            "medium" => Ok(ReasoningEffort::Medium),
            "high" => Ok(ReasoningEffort::High),
            other => Err(format!(
                "invalid reasoning effort {other:?} (expected minimal, low, medium, or high)"
            )),
        }
    }
}

/// One model call: a system/user message pair plus output limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    pub system: String,
    pub user: String,
    pub max_output_tokens: u32,
    pub reasoning_effort: Option<ReasoningEffort>,
}

/// Provider-reported failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    RateLimited,
    InvalidCredentials,
    QuotaExceeded,
    ServiceError,
}

impl UpstreamKind {
    /// Map a provider error code (e.g. `rate_limit_exceeded`) to a kind.
    pub fn from_code(code: &str) -> Self {
        match code {
            "rate_limit_exceeded" => UpstreamKind::RateLimited,
            "invalid_api_key" => UpstreamKind::InvalidCredentials,
            "insufficient_quota" => UpstreamKind::QuotaExceeded,
            _ => UpstreamKind::ServiceError,
        }
    }
}

/// Errors from a single model call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The client is missing credentials or is otherwise misconfigured.
    #[error("model client is not configured: {0}")]
    Configuration(String),

    /// The response envelope held no text in any known shape.
    #[error("No content received from the language model")]
    NoContent,

    #[error("{}", upstream_message(*.kind, .message))]
    Upstream { kind: UpstreamKind, message: String },
}

impl ModelError {
    pub fn upstream(kind: UpstreamKind, message: impl Into<String>) -> Self {
        ModelError::Upstream {
            kind,
            message: message.into(),
        }
    }

    /// The upstream kind, if this is a provider-side failure.
    pub fn upstream_kind(&self) -> Option<UpstreamKind> {
        match self {
            ModelError::Upstream { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

fn upstream_message(kind: UpstreamKind, message: &str) -> String {
    match kind {
        UpstreamKind::RateLimited => "Rate limit exceeded. Please try again later.".to_string(),
        UpstreamKind::InvalidCredentials => "Invalid API key configuration.".to_string(),
        UpstreamKind::QuotaExceeded => {
            "Insufficient API quota. Please check your provider billing.".to_string()
        }
        UpstreamKind::ServiceError => format!("AI service error: {message}"),
    }
}
