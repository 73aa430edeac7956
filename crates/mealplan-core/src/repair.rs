//! Meal plan generation with bounded validation-and-repair.
//!
//! A request runs through a small state machine:
//!
//! ```text
//! Parsing    -> Validating                 (output parsed)
//! Parsing    -> Repairing(parse, 1)        (output not JSON)
//! Repairing(parse)  -> Validating          (repair output parsed)
//! Repairing(parse)  -> Failed
//! Validating -> Done                       (schema clean)
//! Validating -> Repairing(schema, 1)       (schema errors)
//! Repairing(schema) -> Done
//! Repairing(schema) -> Failed
//! ```
//!
//! Each failure class gets one repair attempt of its own, so a request
//! costs at most three model calls.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::extract::{ExtractError, extract_json};
use crate::model::{ModelClient, ModelError, ModelRequest, ReasoningEffort};
use crate::preferences::UserPreferences;
use crate::prompt::{PromptPair, build_parse_repair_prompt, build_prompts, build_schema_repair_prompt};
use crate::schema::validate_plan;

/// Why a repair call was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The model output was not parseable JSON.
    Parse,
    /// The JSON did not satisfy the meal-plan schema.
    Schema,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureClass::Parse => f.write_str("parse"),
            FailureClass::Schema => f.write_str("schema"),
        }
    }
}

/// Position of a generation request in the repair protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairState {
    Parsing,
    Validating,
    Repairing { class: FailureClass, attempt: u8 },
    Done,
    Failed,
}

impl RepairState {
    /// Check whether `from -> to` is an edge of the repair graph.
    pub fn is_valid_transition(from: RepairState, to: RepairState) -> bool {
        use FailureClass::{Parse, Schema};
        use RepairState::*;

        matches!(
            (from, to),
            (Parsing, Validating)
                | (Parsing, Repairing { class: Parse, attempt: 1 })
                | (Repairing { class: Parse, .. }, Validating)
                | (Repairing { class: Parse, .. }, Failed)
                | (Validating, Done)
                | (Validating, Repairing { class: Schema, attempt: 1 })
                | (Repairing { class: Schema, .. }, Done)
                | (Repairing { class: Schema, .. }, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RepairState::Done | RepairState::Failed)
    }
}

/// Output budgets and reasoning effort for model calls.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub max_output_tokens: u32,
    pub repair_max_output_tokens: u32,
    pub reasoning_effort: ReasoningEffort,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_output_tokens: 6000,
            repair_max_output_tokens: 3000,
            reasoning_effort: ReasoningEffort::Low,
        }
    }
}

/// A successfully generated plan.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    /// The validated model JSON, as parsed.
    pub plan: Value,
    pub model_calls: u32,
    /// Failure classes that were repaired on the way, in order.
    pub repaired: Vec<FailureClass>,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Failed to parse AI response as JSON after repair: {repair} (first attempt: {first})")]
    Parse {
        first: ExtractError,
        repair: ExtractError,
    },

    /// Carries the validation errors of the first plan, not the repair's.
    #[error("AI response failed meal plan validation: {}", .errors.join("; "))]
    Schema { errors: Vec<String> },

    #[error("internal error: invalid repair transition {from:?} -> {to:?}")]
    InvalidTransition { from: RepairState, to: RepairState },
}

impl GenerateError {
    pub fn model_error(&self) -> Option<&ModelError> {
        match self {
            GenerateError::Model(e) => Some(e),
            _ => None,
        }
    }
}

/// Bookkeeping for a single `generate` call.
struct Run {
    state: RepairState,
    model_calls: u32,
    repaired: Vec<FailureClass>,
}

impl Run {
    fn new() -> Self {
        Self {
            state: RepairState::Parsing,
            model_calls: 0,
            repaired: Vec::new(),
        }
    }

    fn advance(&mut self, to: RepairState) -> Result<(), GenerateError> {
        let from = self.state;
        if !RepairState::is_valid_transition(from, to) {
            return Err(GenerateError::InvalidTransition { from, to });
        }
        if let RepairState::Repairing { class, attempt } = to {
            tracing::warn!(class = %class, attempt, "repairing model output");
            self.repaired.push(class);
        }
        if to.is_terminal() {
            tracing::debug!(state = ?to, model_calls = self.model_calls, "generation finished");
        }
        self.state = to;
        Ok(())
    }

    fn finish(mut self, plan: Value) -> Result<GenerationOutcome, GenerateError> {
        self.advance(RepairState::Done)?;
        Ok(GenerationOutcome {
            plan,
            model_calls: self.model_calls,
            repaired: self.repaired,
        })
    }
}

/// Drives prompt building, model calls, extraction, validation, and repair.
pub struct MealPlanGenerator {
    client: Arc<dyn ModelClient>,
    settings: GenerationSettings,
}

impl MealPlanGenerator {
    pub fn new(client: Arc<dyn ModelClient>, settings: GenerationSettings) -> Self {
        Self { client, settings }
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    /// Generate a plan for `prefs`, repairing at most once per failure class.
    pub async fn generate(
        &self,
        prefs: &UserPreferences,
    ) -> Result<GenerationOutcome, GenerateError> {
        let mut run = Run::new();

        let raw = self
            .call(&mut run, build_prompts(prefs), self.settings.max_output_tokens)
            .await?;

        let plan = match extract_json(&raw) {
            Ok(plan) => {
                run.advance(RepairState::Validating)?;
                plan
            }
            Err(first) => {
                tracing::debug!(error = %first, "initial model output is not JSON");
                run.advance(RepairState::Repairing {
                    class: FailureClass::Parse,
                    attempt: 1,
                })?;
                let repaired = self.repair(&mut run, build_parse_repair_prompt(&raw)).await?;
                match extract_json(&repaired) {
                    Ok(plan) => {
                        run.advance(RepairState::Validating)?;
                        plan
                    }
                    Err(repair) => {
                        run.advance(RepairState::Failed)?;
                        tracing::error!(error = %repair, "parse repair failed");
                        return Err(GenerateError::Parse { first, repair });
                    }
                }
            }
        };

        let report = validate_plan(&plan, prefs);
        if report.is_valid() {
            return run.finish(plan);
        }

        run.advance(RepairState::Repairing {
            class: FailureClass::Schema,
            attempt: 1,
        })?;
        tracing::debug!(errors = ?report.errors, "plan failed validation");
        let prompt = build_schema_repair_prompt(&plan.to_string(), &report.errors);
        let repaired = self.repair(&mut run, prompt).await?;

        match extract_json(&repaired) {
            Ok(fixed) if validate_plan(&fixed, prefs).is_valid() => run.finish(fixed),
            _ => {
                run.advance(RepairState::Failed)?;
                tracing::error!(errors = report.errors.len(), "schema repair failed");
                Err(GenerateError::Schema {
                    errors: report.errors,
                })
            }
        }
    }

    async fn repair(&self, run: &mut Run, prompt: PromptPair) -> Result<String, GenerateError> {
        self.call(run, prompt, self.settings.repair_max_output_tokens)
            .await
    }

    async fn call(
        &self,
        run: &mut Run,
        prompt: PromptPair,
        max_output_tokens: u32,
    ) -> Result<String, GenerateError> {
        let request = ModelRequest {
            system: prompt.system,
            user: prompt.user,
            max_output_tokens,
            reasoning_effort: Some(self.settings.reasoning_effort),
        };
        run.model_calls += 1;
        tracing::debug!(
            client = self.client.name(),
            call = run.model_calls,
            max_output_tokens,
            state = ?run.state,
            "calling model"
        );
        Ok(self.client.complete(&request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use FailureClass::{Parse, Schema};
    use RepairState::*;

    #[test]
    fn valid_transitions() {
        let valid = [
            (Parsing, Validating),
            (Parsing, Repairing { class: Parse, attempt: 1 }),
            (Repairing { class: Parse, attempt: 1 }, Validating),
            (Repairing { class: Parse, attempt: 1 }, Failed),
            (Validating, Done),
            (Validating, Repairing { class: Schema, attempt: 1 }),
            (Repairing { class: Schema, attempt: 1 }, Done),
            (Repairing { class: Schema, attempt: 1 }, Failed),
        ];
        for (from, to) in valid {
            assert!(RepairState::is_valid_transition(from, to), "{from:?} -> {to:?}");
        }
    }

    #[test]
    fn second_attempts_are_not_edges() {
        let invalid = [
            (Repairing { class: Parse, attempt: 1 }, Repairing { class: Parse, attempt: 2 }),
            (Repairing { class: Schema, attempt: 1 }, Repairing { class: Schema, attempt: 2 }),
            (Parsing, Repairing { class: Schema, attempt: 1 }),
            (Validating, Repairing { class: Parse, attempt: 1 }),
            (Repairing { class: Parse, attempt: 1 }, Done),
            (Parsing, Done),
            (Done, Parsing),
            (Failed, Repairing { class: Parse, attempt: 1 }),
        ];
        for (from, to) in invalid {
            assert!(!RepairState::is_valid_transition(from, to), "{from:?} -> {to:?}");
        }
    }

    #[test]
    fn run_rejects_illegal_advance() {
        let mut run = Run::new();
        let err = run.advance(Done).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidTransition { from: Parsing, to: Done }));
        assert_eq!(run.state, Parsing);
    }

    #[test]
    fn run_records_repairs() {
        let mut run = Run::new();
        run.advance(Repairing { class: Parse, attempt: 1 }).unwrap();
        run.advance(Validating).unwrap();
        run.advance(Repairing { class: Schema, attempt: 1 }).unwrap();
        let outcome = run.finish(Value::Null).unwrap();
        assert_eq!(outcome.repaired, vec![Parse, Schema]);
    }

    #[test]
    fn terminal_states() {
        assert!(Done.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Validating.is_terminal());
    }

    #[test]
    fn default_settings() {
        let settings = GenerationSettings::default();
        assert_eq!(settings.max_output_tokens, 6000);
        assert_eq!(settings.repair_max_output_tokens, 3000);
        assert_eq!(settings.reasoning_effort, ReasoningEffort::Low);
    }
}
