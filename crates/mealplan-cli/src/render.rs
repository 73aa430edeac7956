//! Plain-text rendering of a meal plan for the terminal.

use std::fmt::Write;

use mealplan_core::plan::{MealPlan, NutritionTotals};
use mealplan_core::preferences::Weekday;

const DAY_WIDTH: usize = 11;
const MEAL_WIDTH: usize = 30;

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width - 2 {
        let head: String = s.chars().take(width - 5).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

fn day_totals(plan: &MealPlan, day: Weekday) -> NutritionTotals {
    plan.daily_totals.get(day.as_str()).copied().unwrap_or_else(|| {
        plan.weekly_plan
            .get(day.as_str())
            .map(|meals| NutritionTotals::of(meals.values()))
            .unwrap_or_default()
    })
}

/// Render `plan` as a table: one row per day, one column per meal type,
/// then daily totals, the shopping list, and notes.
pub fn render_plan(plan: &MealPlan) -> String {
    let days = plan.planned_days();
    let meals = plan.planned_meals();
    let mut out = String::new();

    if days.is_empty() {
        out.push_str("No meals planned.\n");
        return out;
    }

    let _ = write!(out, "{:<DAY_WIDTH$}", "DAY");
    for meal in &meals {
        let _ = write!(out, "{:<MEAL_WIDTH$}", meal.as_str().to_uppercase());
    }
    let _ = writeln!(out, "{:>8}", "KCAL");
    let _ = writeln!(out, "{}", "-".repeat(DAY_WIDTH + MEAL_WIDTH * meals.len() + 8));

    for day in &days {
        let _ = write!(out, "{:<DAY_WIDTH$}", title_case(day.as_str()));
        for meal in &meals {
            let name = plan.meal(*day, *meal).map(|m| m.name.as_str()).unwrap_or("-");
            let _ = write!(out, "{:<MEAL_WIDTH$}", truncate(name, MEAL_WIDTH));
        }
        let _ = writeln!(out, "{:>8.0}", day_totals(plan, *day).calories);
    }

    out.push_str("\nDaily totals:\n");
    for day in &days {
        let t = day_totals(plan, *day);
        let _ = writeln!(
            out,
            "  {:<DAY_WIDTH$}{:>6.0} kcal  P {:.0}g  C {:.0}g  F {:.0}g",
            title_case(day.as_str()),
            t.calories,
            t.protein,
            t.carbs,
            t.fat
        );
    }

    if !plan.shopping_list.is_empty() {
        out.push_str("\nShopping list:\n");
        for item in &plan.shopping_list {
            let _ = writeln!(out, "  - {}: {} {}", item.name, item.quantity, item.unit);
        }
    }

    if let Some(notes) = plan.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        let _ = writeln!(out, "\nNotes: {notes}");
    }

    out
}
