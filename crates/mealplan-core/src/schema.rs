//! Structural validation of a parsed meal plan against the request.
//!
//! Every failure is recorded; validation never stops at the first problem,
//! so the full list can be fed back to the model in a repair prompt.

use serde_json::{Map, Value};

use crate::preferences::UserPreferences;

/// Outcome of [`validate_plan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    pub errors: Vec<String>,
}

impl SchemaReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check `plan` covers every requested (day, meal) pair with well-formed
/// ingredients, and has the required top-level sections.
pub fn validate_plan(plan: &Value, prefs: &UserPreferences) -> SchemaReport {
    let mut errors = Vec::new();
    let empty = Map::new();

    let weekly_plan = match plan.get("weekly_plan").and_then(Value::as_object) {
        Some(obj) => obj,
        None => {
            errors.push("weekly_plan must be an object".to_string());
            &empty
        }
    };
    if !plan.get("daily_totals").is_some_and(Value::is_object) {
        errors.push("daily_totals must be an object".to_string());
    }
    if !plan.get("shopping_list").is_some_and(Value::is_array) {
        errors.push("shopping_list must be an array".to_string());
    }

    for day in &prefs.selected_days {
        let Some(day_value) = weekly_plan.get(day.as_str()) else {
            errors.push(format!("missing day: {day}"));
            continue;
        };
        let Some(day_meals) = day_value.as_object() else {
            errors.push(format!("day {day} must be an object"));
            continue;
        };

        for meal in &prefs.selected_meals {
            let meal_value = day_meals.get(meal.as_str());
            let Some(meal_value) = meal_value.filter(|v| !v.is_null()) else {
                errors.push(format!("missing meal {meal} for {day}"));
                continue;
            };
            let Some(meal_obj) = meal_value.as_object() else {
                errors.push(format!("meal {meal} for {day} must be an object"));
                continue;
            };
            check_ingredients(meal_obj, &format!("{day} {meal}"), &mut errors);
        }
    }

    SchemaReport { errors }
}

fn check_ingredients(meal: &Map<String, Value>, slot: &str, errors: &mut Vec<String>) {
    let Some(ingredients) = meal.get("ingredients").and_then(Value::as_array) else {
        errors.push(format!("ingredients for {slot} must be an array"));
        return;
    };
    if ingredients.is_empty() {
        errors.push(format!("ingredients for {slot} must not be empty"));
        return;
    }

    for (i, entry) in ingredients.iter().enumerate() {
        let Some(ing) = entry.as_object() else {
            errors.push(format!("ingredient {i} for {slot} must be an object"));
            continue;
        };
        if !is_non_empty_str(ing.get("name")) {
            errors.push(format!("ingredient {i} for {slot} must have a non-empty string name"));
        }
        if !ing.get("quantity").is_some_and(Value::is_number) {
            errors.push(format!("ingredient {i} for {slot} must have a numeric quantity"));
        }
        if !is_non_empty_str(ing.get("unit")) {
            errors.push(format!("ingredient {i} for {slot} must have a non-empty string unit"));
        }
        if !ing.get("optional").is_some_and(Value::is_boolean) {
            errors.push(format!("ingredient {i} for {slot} must have a boolean optional flag"));
        }
    }
}

fn is_non_empty_str(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::{MealType, NutritionTargets, Weekday};
    use serde_json::json;

    fn prefs(days: &[Weekday], meals: &[MealType]) -> UserPreferences {
        UserPreferences {
            nutrition_targets: NutritionTargets {
                calories: 2000.0,
                protein: 150.0,
                carbs: 250.0,
                fat: 65.0,
            },
            selected_days: days.to_vec(),
            selected_meals: meals.to_vec(),
            style_preferences: None,
            dietary_restrictions: None,
            previous_week_menu: None,
        }
    }

    fn meal_json() -> Value {
        json!({
            "name": "Lentil soup",
            "calories": 450, "protein": 25, "carbs": 60, "fat": 10,
            "ingredients": [
                { "name": "red lentils", "quantity": 80, "unit": "g", "optional": false },
                { "name": "olive oil", "quantity": 1, "unit": "tbsp", "optional": true }
            ]
        })
    }

    fn plan_for(days: &[&str], meals: &[&str]) -> Value {
        let mut weekly = Map::new();
        for day in days {
            let mut slots = Map::new();
            for meal in meals {
                slots.insert(meal.to_string(), meal_json());
            }
            weekly.insert(day.to_string(), Value::Object(slots));
        }
        json!({
            "weekly_plan": weekly,
            "daily_totals": {},
            "shopping_list": [],
            "notes": ""
        })
    }

    #[test]
    fn complete_plan_is_valid() {
        let plan = plan_for(&["monday", "tuesday"], &["lunch", "dinner"]);
        let report = validate_plan(
            &plan,
            &prefs(&[Weekday::Monday, Weekday::Tuesday], &[MealType::Lunch, MealType::Dinner]),
        );
        assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);
    }

    #[test]
    fn extra_days_and_meals_are_ignored() {
        let plan = plan_for(&["monday", "friday"], &["breakfast", "lunch"]);
        let report = validate_plan(&plan, &prefs(&[Weekday::Monday], &[MealType::Lunch]));
        assert!(report.is_valid());
    }

    #[test]
    fn one_error_per_missing_day_only() {
        let plan = plan_for(&["monday"], &["lunch"]);
        let report = validate_plan(
            &plan,
            &prefs(
                &[Weekday::Monday, Weekday::Wednesday, Weekday::Sunday],
                &[MealType::Lunch],
            ),
        );
        assert_eq!(
            report.errors,
            vec!["missing day: wednesday".to_string(), "missing day: sunday".to_string()]
        );
    }

    #[test]
    fn missing_meal_is_named() {
        let plan = plan_for(&["monday"], &["lunch"]);
        let report = validate_plan(
            &plan,
            &prefs(&[Weekday::Monday], &[MealType::Lunch, MealType::Dinner]),
        );
        assert_eq!(report.errors, vec!["missing meal dinner for monday".to_string()]);
    }

    #[test]
    fn non_object_day_is_reported_once() {
        let mut plan = plan_for(&["monday", "tuesday"], &["lunch", "dinner"]);
        plan["weekly_plan"]["monday"] = Value::Null;
        plan["weekly_plan"]["tuesday"] = json!("rest day");
        let report = validate_plan(
            &plan,
            &prefs(&[Weekday::Monday, Weekday::Tuesday], &[MealType::Lunch, MealType::Dinner]),
        );
        assert_eq!(
            report.errors,
            vec![
                "day monday must be an object".to_string(),
                "day tuesday must be an object".to_string(),
            ]
        );
    }

    #[test]
    fn missing_top_level_sections_each_reported() {
        let report = validate_plan(&json!({}), &prefs(&[Weekday::Monday], &[MealType::Lunch]));
        assert_eq!(
            report.errors,
            vec![
                "weekly_plan must be an object".to_string(),
                "daily_totals must be an object".to_string(),
                "shopping_list must be an array".to_string(),
                "missing day: monday".to_string(),
            ]
        );
    }

    #[test]
    fn shopping_list_object_is_rejected() {
        let mut plan = plan_for(&["monday"], &["lunch"]);
        plan["shopping_list"] = json!({ "rice": { "quantity": 1, "unit": "kg" } });
        let report = validate_plan(&plan, &prefs(&[Weekday::Monday], &[MealType::Lunch]));
        assert_eq!(report.errors, vec!["shopping_list must be an array".to_string()]);
    }

    #[test]
    fn ingredient_field_errors_name_day_and_meal() {
        let required = ["name", "quantity", "unit", "optional"];
        for field in required {
            let mut plan = plan_for(&["tuesday"], &["dinner"]);
            plan["weekly_plan"]["tuesday"]["dinner"]["ingredients"][1]
                .as_object_mut()
                .unwrap()
                .remove(field);
            let report = validate_plan(&plan, &prefs(&[Weekday::Tuesday], &[MealType::Dinner]));
            assert_eq!(report.errors.len(), 1, "field {field}: {:?}", report.errors);
            let msg = &report.errors[0];
            assert!(msg.contains("tuesday") && msg.contains("dinner"), "{msg}");
            assert!(msg.contains(field), "{msg}");
        }
    }

    #[test]
    fn string_ingredients_are_rejected() {
        let mut plan = plan_for(&["monday"], &["lunch"]);
        plan["weekly_plan"]["monday"]["lunch"]["ingredients"] = json!(["rice", "beans"]);
        let report = validate_plan(&plan, &prefs(&[Weekday::Monday], &[MealType::Lunch]));
        assert_eq!(
            report.errors,
            vec![
                "ingredient 0 for monday lunch must be an object".to_string(),
                "ingredient 1 for monday lunch must be an object".to_string(),
            ]
        );
    }

    #[test]
    fn wrongly_typed_fields_accumulate() {
        let mut plan = plan_for(&["monday"], &["lunch"]);
        plan["weekly_plan"]["monday"]["lunch"]["ingredients"][0] =
            json!({ "name": "", "quantity": "80", "unit": "g", "optional": "no" });
        let report = validate_plan(&plan, &prefs(&[Weekday::Monday], &[MealType::Lunch]));
        assert_eq!(report.errors.len(), 3, "{:?}", report.errors);
    }

    #[test]
    fn non_array_and_empty_ingredients() {
        let mut plan = plan_for(&["monday"], &["lunch", "dinner"]);
        plan["weekly_plan"]["monday"]["lunch"]["ingredients"] = json!("rice, beans");
        plan["weekly_plan"]["monday"]["dinner"]["ingredients"] = json!([]);
        let report = validate_plan(
            &plan,
            &prefs(&[Weekday::Monday], &[MealType::Lunch, MealType::Dinner]),
        );
        assert_eq!(
            report.errors,
            vec![
                "ingredients for monday lunch must be an array".to_string(),
                "ingredients for monday dinner must not be empty".to_string(),
            ]
        );
    }
}
