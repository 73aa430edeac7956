//! Prompt construction for the initial request and the two repair paths.
//!
//! All functions here are pure string builders.

use crate::preferences::{MealType, UserPreferences, Weekday};

/// A system/user message pair sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// JSON shape the model must produce, quoted verbatim in every prompt.
const OUTPUT_SCHEMA: &str = r#"{
  "weekly_plan": {
    "<day>": {
      "<meal>": {
        "name": "meal name",
        "calories": 0,
        "protein": 0,
        "carbs": 0,
        "fat": 0,
        "ingredients": [
          {"name": "ingredient", "quantity": 0, "unit": "g", "optional": false}
        ]
      }
    }
  },
  "daily_totals": {
    "<day>": {"calories": 0, "protein": 0, "carbs": 0, "fat": 0}
  },
  "shopping_list": [
    {"name": "ingredient", "quantity": 0, "unit": "g"}
  ],
  "notes": "any additional notes about the plan"
}"#;

const OUTPUT_RULES: &str = "\
OUTPUT RULES:
- Respond with a single JSON object only. Do not wrap it in markdown code fences and do not add any text before or after it.
- The object must contain exactly the keys \"weekly_plan\", \"daily_totals\", \"shopping_list\" and \"notes\".
- Every meal must have an \"ingredients\" list. Each ingredient is an object with exactly the fields \"name\" (string), \"quantity\" (number), \"unit\" (short string such as g, ml, tbsp, piece) and \"optional\" (boolean).
- List common pantry staples such as oil, salt, pepper, butter and water as ingredients instead of omitting them, with \"optional\" set appropriately.
- \"shopping_list\" aggregates the quantities of every ingredient across the whole week, one entry per ingredient and unit.
- If you cannot produce valid JSON, respond with {\"error\": \"<message>\"} instead of free text.
";

/// Build the system prompt: role, planning instructions, and output contract.
pub fn system_prompt() -> String {
    let mut prompt = String::with_capacity(3072);

    prompt.push_str(
        "You are an expert nutritionist and meal planning assistant. \
         Your task is to generate a weekly meal plan that meets specific \
         nutritional targets and user preferences.\n\n",
    );
    prompt.push_str(
        "INSTRUCTIONS:\n\
         1. Create meals only for the requested days and meal types.\n\
         2. Keep each day's total nutrition close to the user's macronutrient targets.\n\
         3. Avoid repeating meals from the previous week's menu if one is provided.\n\
         4. Respect dietary restrictions and style preferences.\n\
         5. Provide varied, balanced, practical meals a home cook can prepare.\n\
         6. Include approximate nutrition for each meal and realistic ingredient quantities.\n\n",
    );
    prompt.push_str(OUTPUT_RULES);
    prompt.push_str("\nOUTPUT FORMAT:\n");
    prompt.push_str(OUTPUT_SCHEMA);
    prompt.push('\n');

    prompt
}

fn join<T: ToString>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Build the system and user prompts for a fresh generation request.
///
/// Free-text fields are interpolated verbatim.
pub fn build_prompts(prefs: &UserPreferences) -> PromptPair {
    let t = &prefs.nutrition_targets;
    let user = format!(
        "\nNUTRITIONAL TARGETS:\n\
         - Calories: {calories}\n\
         - Protein: {protein}g\n\
         - Carbs: {carbs}g\n\
         - Fat: {fat}g\n\n\
         DAYS TO PLAN: {days}\n\
         MEAL TYPES: {meals}\n\n\
         STYLE PREFERENCES: {style}\n\
         DIETARY RESTRICTIONS: {diet}\n\n\
         PREVIOUS WEEK'S MENU TO AVOID:\n\
         {previous}\n\n\
         Please generate a meal plan that meets these requirements.",
        calories = t.calories,
        protein = t.protein,
        carbs = t.carbs,
        fat = t.fat,
        days = join::<Weekday>(&prefs.selected_days),
        meals = join::<MealType>(&prefs.selected_meals),
        style = prefs
            .style_preferences
            .as_deref()
            .unwrap_or("No specific preferences"),
        diet = prefs
            .dietary_restrictions
            .as_deref()
            .unwrap_or("None specified"),
        previous = prefs
            .previous_week_menu
            .as_deref()
            .unwrap_or("No previous menu provided"),
    );

    PromptPair {
        system: system_prompt(),
        user,
    }
}

/// Follow-up prompt after the model's output could not be parsed as JSON.
pub fn build_parse_repair_prompt(raw_output: &str) -> PromptPair {
    let user = format!(
        "Your previous response could not be parsed as JSON.\n\n\
         PREVIOUS RESPONSE:\n{raw_output}\n\n\
         Return the same meal plan as a single valid JSON object matching this schema exactly, \
         with no markdown fences and no text outside the object:\n{OUTPUT_SCHEMA}\n\n\
         Every ingredient must be an object with \"name\", \"quantity\", \"unit\" and \"optional\"."
    );
    PromptPair {
        system: system_prompt(),
        user,
    }
}

/// Follow-up prompt after the model's JSON failed schema validation.
pub fn build_schema_repair_prompt(previous_json: &str, errors: &[String]) -> PromptPair {
    let error_list = errors
        .iter()
        .map(|e| format!("- {e}"))
        .collect::<Vec<_>>()
        .join("\n");
    let user = format!(
        "Your previous meal plan JSON failed validation with these errors:\n{error_list}\n\n\
         PREVIOUS JSON:\n{previous_json}\n\n\
         Fix every error listed above and return the corrected meal plan as JSON only: \
         a single object with no markdown fences and no commentary."
    );
    PromptPair {
        system: system_prompt(),
        user,
    }
}
