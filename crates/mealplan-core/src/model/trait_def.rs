//! The `ModelClient` trait -- the adapter interface for language models.
//!
//! The trait is object-safe so the generator can hold an
//! `Arc<dyn ModelClient>` and tests can swap in a scripted fake.

use async_trait::async_trait;

use super::types::{ModelError, ModelRequest};

/// Adapter interface for a text-completion backend.
///
/// Implementors send one system/user message pair and return the model's
/// raw text output. Interpreting that text (JSON extraction, schema checks,
/// repair) is the caller's job.
///
/// # Object Safety
///
/// Every method returns a concrete type, so `Arc<dyn ModelClient>` works.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Human-readable name for this client (e.g. "openai").
    fn name(&self) -> &str;

    /// Run one completion and return the text output.
    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError>;
}

// Compile-time assertion: ModelClient must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn ModelClient) {}
};
