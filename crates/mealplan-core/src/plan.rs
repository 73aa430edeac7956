//! Typed view of a weekly meal plan.
//!
//! The generate endpoint passes the model's JSON through untouched; these
//! types are for code that builds or reads plans (the demo plan, the CLI
//! renderer, the HTTP client).
//!
//! Decoding is lenient. The schema validator only checks the requested
//! (day, meal) slots and their ingredients, so anything a served plan may
//! carry beyond that (partial totals, free-form shopping entries, extra
//! days) must still decode. Entries that do not fit the typed shape are
//! dropped rather than failing the whole plan.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::preferences::{MealType, Weekday};

/// One ingredient line of a meal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: f64,
    /// Short unit token, e.g. `g`, `ml`, `tbsp`, `piece`.
    pub unit: String,
    /// Pantry staples and garnishes the cook may skip.
    #[serde(default)]
    pub optional: bool,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
            optional: false,
        }
    }

    /// Mark the ingredient as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// A single meal. Macros default to zero when the model omits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub ingredients: Vec<Ingredient>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl NutritionTotals {
    /// Sum the macros of a set of meals.
    pub fn of<'a>(meals: impl IntoIterator<Item = &'a Meal>) -> Self {
        meals.into_iter().fold(Self::default(), |acc, m| Self {
            calories: acc.calories + m.calories,
            protein: acc.protein + m.protein,
            carbs: acc.carbs + m.carbs,
            fat: acc.fat + m.fat,
        })
    }
}

/// Week-wide total of one ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
}

/// A weekly meal plan.
///
/// Day and meal keys are the lowercase names (`"monday"`, `"lunch"`).
/// They are kept as strings so plans carrying keys outside the request
/// still deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    #[serde(deserialize_with = "lenient_days")]
    pub weekly_plan: BTreeMap<String, BTreeMap<String, Meal>>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub daily_totals: BTreeMap<String, NutritionTotals>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub shopping_list: Vec<ShoppingItem>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
}

impl MealPlan {
    pub fn meal(&self, day: Weekday, meal: MealType) -> Option<&Meal> {
        self.weekly_plan.get(day.as_str())?.get(meal.as_str())
    }

    /// Days present in the plan, in canonical week order.
    pub fn planned_days(&self) -> Vec<Weekday> {
        Weekday::ALL
            .into_iter()
            .filter(|d| self.weekly_plan.contains_key(d.as_str()))
            .collect()
    }

    /// Meal types used on at least one day, in canonical order.
    pub fn planned_meals(&self) -> Vec<MealType> {
        MealType::ALL
            .into_iter()
            .filter(|m| self.weekly_plan.values().any(|day| day.contains_key(m.as_str())))
            .collect()
    }

    /// Recompute `daily_totals` from the meals of each day.
    pub fn recompute_daily_totals(&mut self) {
        self.daily_totals = self
            .weekly_plan
            .iter()
            .map(|(day, meals)| (day.clone(), NutritionTotals::of(meals.values())))
            .collect();
    }
}

fn entries<T: DeserializeOwned>(value: Value) -> Vec<T> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn keyed_entries<T: DeserializeOwned>(value: Value) -> BTreeMap<String, T> {
    match value {
        Value::Object(obj) => obj
            .into_iter()
            .filter_map(|(key, item)| serde_json::from_value(item).ok().map(|t| (key, t)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Array of `T`, skipping elements that do not decode. Non-arrays are empty.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Value::deserialize(deserializer).map(entries)
}

/// Object of `T`, skipping values that do not decode. Non-objects are empty.
fn lenient_map<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Value::deserialize(deserializer).map(keyed_entries)
}

/// Days that are objects, each keeping only the meals that decode.
fn lenient_days<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, BTreeMap<String, Meal>>, D::Error>
where
    D: Deserializer<'de>,
{
    let days = match Value::deserialize(deserializer)? {
        Value::Object(obj) => obj,
        _ => return Ok(BTreeMap::new()),
    };
    Ok(days
        .into_iter()
        .filter(|(_, meals)| meals.is_object())
        .map(|(day, meals)| (day, keyed_entries(meals)))
        .collect())
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        _ => None,
    })
}

/// Aggregate every ingredient in the plan into a week-wide shopping list.
///
/// Lines are merged when their names match case-insensitively and their
/// units match exactly; quantities in different units stay separate.
/// The result is sorted by name, then unit.
pub fn aggregate_shopping_list(plan: &MealPlan) -> Vec<ShoppingItem> {
    let mut totals: BTreeMap<(String, String), ShoppingItem> = BTreeMap::new();

    for meals in plan.weekly_plan.values() {
        for meal in meals.values() {
            for ing in &meal.ingredients {
                let key = (ing.name.trim().to_lowercase(), ing.unit.clone());
                totals
                    .entry(key)
                    .and_modify(|item| item.quantity += ing.quantity)
                    .or_insert_with(|| ShoppingItem {
                        name: ing.name.trim().to_string(),
                        quantity: ing.quantity,
                        unit: ing.unit.clone(),
                    });
            }
        }
    }

    totals.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meal(name: &str, calories: f64, ingredients: Vec<Ingredient>) -> Meal {
        Meal {
            name: name.to_string(),
            calories,
            protein: 10.0,
            carbs: 20.0,
            fat: 5.0,
            ingredients,
        }
    }

    fn two_day_plan() -> MealPlan {
        let mut plan = MealPlan::default();
        plan.weekly_plan.insert(
            "tuesday".to_string(),
            BTreeMap::from([(
                "dinner".to_string(),
                meal(
                    "Rice bowl",
                    600.0,
                    vec![
                        Ingredient::new("Rice", 150.0, "g"),
                        Ingredient::new("olive oil", 1.0, "tbsp").optional(),
                    ],
                ),
            )]),
        );
        plan.weekly_plan.insert(
            "monday".to_string(),
            BTreeMap::from([
                (
                    "lunch".to_string(),
                    meal("Salad", 400.0, vec![Ingredient::new("olive oil", 2.0, "tbsp")]),
                ),
                (
                    "dinner".to_string(),
                    meal("Risotto", 700.0, vec![Ingredient::new("rice", 100.0, "g")]),
                ),
            ]),
        );
        plan
    }

    #[test]
    fn shopping_list_merges_same_name_and_unit() {
        let list = aggregate_shopping_list(&two_day_plan());
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "olive oil");
        assert_eq!(list[0].quantity, 3.0);
        assert_eq!(list[1].quantity, 250.0);
        assert_eq!(list[1].unit, "g");
    }

    #[test]
    fn shopping_list_keeps_distinct_units_apart() {
        let mut plan = two_day_plan();
        plan.weekly_plan
            .get_mut("monday")
            .unwrap()
            .get_mut("lunch")
            .unwrap()
            .ingredients
            .push(Ingredient::new("Rice", 1.0, "cup"));
        let list = aggregate_shopping_list(&plan);
        let rice: Vec<_> = list.iter().filter(|i| i.name.eq_ignore_ascii_case("rice")).collect();
        assert_eq!(rice.len(), 2);
    }

    #[test]
    fn planned_days_and_meals_use_canonical_order() {
        let plan = two_day_plan();
        assert_eq!(plan.planned_days(), vec![Weekday::Monday, Weekday::Tuesday]);
        assert_eq!(plan.planned_meals(), vec![MealType::Lunch, MealType::Dinner]);
        assert_eq!(plan.meal(Weekday::Monday, MealType::Lunch).unwrap().name, "Salad");
        assert!(plan.meal(Weekday::Tuesday, MealType::Lunch).is_none());
    }

    #[test]
    fn recompute_daily_totals_sums_meals() {
        let mut plan = two_day_plan();
        plan.recompute_daily_totals();
        assert_eq!(plan.daily_totals["monday"].calories, 1100.0);
        assert_eq!(plan.daily_totals["monday"].protein, 20.0);
        assert_eq!(plan.daily_totals["tuesday"].calories, 600.0);
    }

    #[test]
    fn partial_totals_and_loose_shopping_entries_deserialize() {
        let json = serde_json::json!({
            "weekly_plan": {
                "monday": {
                    "lunch": {
                        "name": "Rice bowl",
                        "calories": 600,
                        "ingredients": [
                            { "name": "rice", "quantity": 150, "unit": "g", "optional": false },
                            "a pinch of salt"
                        ]
                    },
                    "dinner": "leftovers"
                },
                "friday": "rest day"
            },
            "daily_totals": { "monday": { "calories": 1200 }, "tuesday": 900 },
            "shopping_list": [
                { "name": "brown rice", "quantity": "360 g" },
                { "name": "olive oil", "quantity": 2 },
                { "name": "oats", "quantity": 80, "unit": "g" }
            ],
            "notes": ["not", "text"]
        });
        let plan: MealPlan = serde_json::from_value(json).unwrap();

        assert_eq!(plan.weekly_plan.len(), 1);
        let monday = &plan.weekly_plan["monday"];
        assert_eq!(monday.len(), 1);
        assert_eq!(monday["lunch"].protein, 0.0);
        assert_eq!(monday["lunch"].ingredients.len(), 1);

        assert_eq!(plan.daily_totals.len(), 1);
        assert_eq!(plan.daily_totals["monday"].calories, 1200.0);
        assert_eq!(plan.daily_totals["monday"].protein, 0.0);

        let names: Vec<&str> = plan.shopping_list.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["olive oil", "oats"]);
        assert_eq!(plan.shopping_list[0].unit, "");
        assert!(plan.notes.is_none());
    }

    #[test]
    fn missing_shopping_list_and_notes_deserialize() {
        let json = r#"{"weekly_plan": {}, "daily_totals": {}}"#;
        let plan: MealPlan = serde_json::from_str(json).unwrap();
        assert!(plan.shopping_list.is_empty());
        assert!(plan.notes.is_none());
    }
}
