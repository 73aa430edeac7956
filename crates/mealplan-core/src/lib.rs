//! Core library for the meal plan service.
//!
//! Request validation, prompt construction, the language-model client
//! abstraction, output extraction and schema checks, and the bounded
//! repair loop that ties them together.

pub mod demo;
pub mod extract;
pub mod model;
pub mod plan;
pub mod preferences;
pub mod prompt;
pub mod repair;
pub mod schema;

pub use repair::{FailureClass, GenerateError, GenerationOutcome, GenerationSettings, MealPlanGenerator};
