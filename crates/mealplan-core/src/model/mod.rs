//! Language-model client interface.
//!
//! The generator talks to the model only through the [`ModelClient`]
//! trait, so tests can substitute a scripted fake and the HTTP client is
//! constructed explicitly with its configuration.
//!
//! # Architecture
//!
//! ```text
//! MealPlanGenerator
//!     |
//!     v
//! Arc<dyn ModelClient> --complete(ModelRequest)--> raw text
//!     |
//!     +-- OpenAiClient: POST {base_url}/responses
//!             |
//!             v
//!         EnvelopeShape::PRIORITY (output_text, output[].content[], choices[])
//! ```

pub mod envelope;
pub mod openai;
pub mod trait_def;
pub mod types;

pub use envelope::{EnvelopeShape, extract_text};
pub use openai::{OpenAiClient, ProviderConfig};
pub use trait_def::ModelClient;
pub use types::{ModelError, ModelRequest, ReasoningEffort, UpstreamKind};
