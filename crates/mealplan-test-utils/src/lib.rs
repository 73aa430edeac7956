//! Shared test utilities for meal plan integration tests.
//!
//! Provides a scripted [`ModelClient`] that replays canned replies and
//! records every request it receives, plus canonical preference and plan
//! fixtures.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use mealplan_core::model::{ModelClient, ModelError, ModelRequest};
use mealplan_core::preferences::{MealType, NutritionTargets, UserPreferences, Weekday};

/// A fake model that returns scripted replies in order.
///
/// Once the script is exhausted, the last reply is repeated when
/// constructed with [`ScriptedModel::repeating`]; otherwise further calls
/// fail with [`ModelError::NoContent`].
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    fallback: Option<Result<String, ModelError>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: impl IntoIterator<Item = Result<String, ModelError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replies with plain text, in order.
    pub fn with_texts<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        Self::new(texts.into_iter().map(|t| Ok(t.into())))
    }

    /// Returns `reply` for every call.
    pub fn repeating(reply: Result<String, ModelError>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Some(reply),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.replies.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(reply), _) => reply,
            (None, Some(reply)) => reply.clone(),
            (None, None) => Err(ModelError::NoContent),
        }
    }
}

/// 2000 kcal / 150 g protein / 250 g carbs / 65 g fat, monday and tuesday,
/// lunch and dinner, no free-text fields.
pub fn sample_preferences() -> UserPreferences {
    UserPreferences {
        nutrition_targets: NutritionTargets {
            calories: 2000.0,
            protein: 150.0,
            carbs: 250.0,
            fat: 65.0,
        },
        selected_days: vec![Weekday::Monday, Weekday::Tuesday],
        selected_meals: vec![MealType::Lunch, MealType::Dinner],
        style_preferences: None,
        dietary_restrictions: None,
        previous_week_menu: None,
    }
}

/// The request body the HTTP endpoint expects for [`sample_preferences`].
pub fn sample_request_body() -> Value {
    json!({
        "preferences": {
            "nutritionTargets": { "calories": 2000, "protein": 150, "carbs": 250, "fat": 65 },
            "selectedDays": ["monday", "tuesday"],
            "selectedMeals": ["lunch", "dinner"]
        }
    })
}

/// A schema-valid plan covering exactly `days` x `meals`.
pub fn plan_json_for(days: &[Weekday], meals: &[MealType]) -> Value {
    let mut weekly = Map::new();
    let mut totals = Map::new();
    for day in days {
        let mut slots = Map::new();
        for meal in meals {
            slots.insert(
                meal.as_str().to_string(),
                json!({
                    "name": format!("{} {}", day.as_str(), meal.as_str()),
                    "calories": 600, "protein": 40, "carbs": 70, "fat": 18,
                    "ingredients": [
                        { "name": "brown rice", "quantity": 90, "unit": "g", "optional": false },
                        { "name": "chicken breast", "quantity": 150, "unit": "g", "optional": false },
                        { "name": "olive oil", "quantity": 1, "unit": "tbsp", "optional": true }
                    ]
                }),
            );
        }
        let n = meals.len() as u32;
        totals.insert(
            day.as_str().to_string(),
            json!({ "calories": 600 * n, "protein": 40 * n, "carbs": 70 * n, "fat": 18 * n }),
        );
        weekly.insert(day.as_str().to_string(), Value::Object(slots));
    }
    json!({
        "weekly_plan": weekly,
        "daily_totals": totals,
        "shopping_list": [
            { "name": "brown rice", "quantity": 90 * days.len() * meals.len(), "unit": "g" }
        ],
        "notes": "Fixture plan."
    })
}

/// [`plan_json_for`] applied to [`sample_preferences`].
pub fn sample_plan_json() -> Value {
    let prefs = sample_preferences();
    plan_json_for(&prefs.selected_days, &prefs.selected_meals)
}
