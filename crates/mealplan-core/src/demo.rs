//! Fixed sample plan served by the demo endpoint and used as the CLI's
//! offline fallback.

use std::collections::BTreeMap;

use crate::plan::{Ingredient, Meal, MealPlan, aggregate_shopping_list};

fn meal(name: &str, macros: [f64; 4], ingredients: Vec<Ingredient>) -> Meal {
    let [calories, protein, carbs, fat] = macros;
    Meal {
        name: name.to_string(),
        calories,
        protein,
        carbs,
        fat,
        ingredients,
    }
}

/// Build the demo plan: Monday and Tuesday, all three meals.
pub fn demo_meal_plan() -> MealPlan {
    let monday = BTreeMap::from([
        (
            "breakfast".to_string(),
            meal(
                "Greek Yogurt with Berries and Granola",
                [280.0, 20.0, 35.0, 8.0],
                vec![
                    Ingredient::new("Greek yogurt", 200.0, "g"),
                    Ingredient::new("mixed berries", 80.0, "g"),
                    Ingredient::new("granola", 30.0, "g"),
                    Ingredient::new("honey", 1.0, "tsp").optional(),
                    Ingredient::new("almonds", 10.0, "g").optional(),
                ],
            ),
        ),
        (
            "lunch".to_string(),
            meal(
                "Grilled Chicken Caesar Salad",
                [420.0, 35.0, 15.0, 25.0],
                vec![
                    Ingredient::new("chicken breast", 150.0, "g"),
                    Ingredient::new("romaine lettuce", 100.0, "g"),
                    Ingredient::new("parmesan", 15.0, "g"),
                    Ingredient::new("olive oil", 1.0, "tbsp"),
                    Ingredient::new("croutons", 20.0, "g").optional(),
                    Ingredient::new("salt", 1.0, "pinch").optional(),
                    Ingredient::new("black pepper", 1.0, "pinch").optional(),
                ],
            ),
        ),
        (
            "dinner".to_string(),
            meal(
                "Baked Salmon with Quinoa and Vegetables",
                [520.0, 40.0, 45.0, 20.0],
                vec![
                    Ingredient::new("salmon fillet", 150.0, "g"),
                    Ingredient::new("quinoa", 60.0, "g"),
                    Ingredient::new("broccoli", 100.0, "g"),
                    Ingredient::new("bell peppers", 1.0, "piece"),
                    Ingredient::new("lemon", 0.5, "piece"),
                    Ingredient::new("olive oil", 1.0, "tbsp"),
                    Ingredient::new("salt", 1.0, "pinch").optional(),
                ],
            ),
        ),
    ]);

    let tuesday = BTreeMap::from([
        (
            "breakfast".to_string(),
            meal(
                "Oatmeal with Banana and Nuts",
                [300.0, 12.0, 50.0, 10.0],
                vec![
                    Ingredient::new("steel-cut oats", 50.0, "g"),
                    Ingredient::new("milk", 200.0, "ml"),
                    Ingredient::new("banana", 1.0, "piece"),
                    Ingredient::new("walnuts", 15.0, "g"),
                    Ingredient::new("cinnamon", 1.0, "pinch").optional(),
                ],
            ),
        ),
        (
            "lunch".to_string(),
            meal(
                "Turkey and Avocado Wrap",
                [380.0, 28.0, 30.0, 18.0],
                vec![
                    Ingredient::new("whole wheat tortilla", 1.0, "piece"),
                    Ingredient::new("turkey breast", 100.0, "g"),
                    Ingredient::new("avocado", 0.5, "piece"),
                    Ingredient::new("spinach", 30.0, "g"),
                    Ingredient::new("tomato", 1.0, "piece"),
                ],
            ),
        ),
        (
            "dinner".to_string(),
            meal(
                "Lean Beef Stir-fry with Brown Rice",
                [480.0, 35.0, 50.0, 15.0],
                vec![
                    Ingredient::new("lean beef", 140.0, "g"),
                    Ingredient::new("brown rice", 70.0, "g"),
                    Ingredient::new("mixed vegetables", 150.0, "g"),
                    Ingredient::new("soy sauce", 1.0, "tbsp"),
                    Ingredient::new("ginger", 5.0, "g"),
                    Ingredient::new("vegetable oil", 1.0, "tbsp"),
                ],
            ),
        ),
    ]);

    let mut plan = MealPlan {
        weekly_plan: BTreeMap::from([
            ("monday".to_string(), monday),
            ("tuesday".to_string(), tuesday),
        ]),
        daily_totals: BTreeMap::new(),
        shopping_list: Vec::new(),
        notes: Some("This is a demo meal plan served from the backend.".to_string()),
    };
    plan.recompute_daily_totals();
    plan.shopping_list = aggregate_shopping_list(&plan);
    plan
}
