//! User preferences and the request validator.
//!
//! [`validate_request`] works on the raw request body rather than a
//! deserialized struct so that every malformation class maps to its own
//! human-readable message. On success it hands back a typed
//! [`UserPreferences`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Days and meals
// ---------------------------------------------------------------------------

/// A day of the week, serialized in lowercase (`"monday"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// All seven days in canonical (Monday-first) order.
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Weekday::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("unknown day: {s:?}"))
    }
}

/// A meal slot, serialized in lowercase (`"lunch"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    pub const ALL: [MealType; 3] = [MealType::Breakfast, MealType::Lunch, MealType::Dinner];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MealType::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown meal type: {s:?}"))
    }
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// Daily macronutrient targets. Protein, carbs and fat are in grams.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionTargets {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// Everything the user asked for, as accepted by [`validate_request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub nutrition_targets: NutritionTargets,
    pub selected_days: Vec<Weekday>,
    pub selected_meals: Vec<MealType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_preferences: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary_restrictions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_week_menu: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reasons a meal-plan request is rejected before any model call.
///
/// The `Display` text is what the HTTP layer returns as `message`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Request body must be valid JSON")]
    MalformedBody,

    #[error("Preferences object is required")]
    MissingPreferences,

    #[error("Valid nutrition targets are required")]
    InvalidNutritionTargets,

    #[error("Valid selected days are required")]
    InvalidSelectedDays,

    #[error("Valid selected meals are required")]
    InvalidSelectedMeals,

    #[error("Style preferences must be a string")]
    StylePreferencesNotString,

    #[error("Dietary restrictions must be a string")]
    DietaryRestrictionsNotString,

    #[error("Previous week menu must be a string")]
    PreviousWeekMenuNotString,
}

/// Validate a raw request body of the form `{"preferences": {...}}`.
pub fn validate_request(body: &Value) -> Result<UserPreferences, ValidationError> {
    let prefs = body
        .get("preferences")
        .and_then(Value::as_object)
        .ok_or(ValidationError::MissingPreferences)?;
    validate_preferences(prefs)
}

/// Validate the `preferences` object itself.
pub fn validate_preferences(
    prefs: &Map<String, Value>,
) -> Result<UserPreferences, ValidationError> {
    let nutrition_targets =
        parse_targets(prefs.get("nutritionTargets")).ok_or(ValidationError::InvalidNutritionTargets)?;

    let selected_days: Vec<Weekday> = parse_choice_list(prefs.get("selectedDays"))
        .ok_or(ValidationError::InvalidSelectedDays)?;

    let selected_meals: Vec<MealType> = parse_choice_list(prefs.get("selectedMeals"))
        .ok_or(ValidationError::InvalidSelectedMeals)?;

    let style_preferences = optional_text(prefs.get("stylePreferences"))
        .map_err(|_| ValidationError::StylePreferencesNotString)?;
    let dietary_restrictions = optional_text(prefs.get("dietaryRestrictions"))
        .map_err(|_| ValidationError::DietaryRestrictionsNotString)?;
    let previous_week_menu = optional_text(prefs.get("previousWeekMenu"))
        .map_err(|_| ValidationError::PreviousWeekMenuNotString)?;

    Ok(UserPreferences {
        nutrition_targets,
        selected_days,
        selected_meals,
        style_preferences,
        dietary_restrictions,
        previous_week_menu,
    })
}

fn parse_targets(value: Option<&Value>) -> Option<NutritionTargets> {
    let obj = value?.as_object()?;
    let field = |name: &str| {
        obj.get(name)
            .and_then(Value::as_f64)
            .filter(|n| n.is_finite() && *n >= 0.0)
    };
    Some(NutritionTargets {
        calories: field("calories")?,
        protein: field("protein")?,
        carbs: field("carbs")?,
        fat: field("fat")?,
    })
}

/// Parse a non-empty array whose entries must all name a known variant.
fn parse_choice_list<T: FromStr>(value: Option<&Value>) -> Option<Vec<T>> {
    let items = value?.as_array()?;
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|v| v.as_str().and_then(|s| s.parse().ok()))
        .collect()
}

/// Absent, null, and empty strings are all "not provided".
fn optional_text(value: Option<&Value>) -> Result<Option<String>, ()> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(()),
    }
}
