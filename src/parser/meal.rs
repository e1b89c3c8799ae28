use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use super::sections::RecipeSection;
use crate::recipe::MealType;

static LEADING_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)").unwrap());
static SODIUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^<(\d+)mg").unwrap());

const MAX_NAME_CHARS: usize = 80;
const DEFAULT_COOK_TIME: u32 = 30;
const DEFAULT_SERVINGS: u32 = 4;
const HEART_HEALTHY_SODIUM_ESTIMATE: u32 = 450;
const SODIUM_ESTIMATE: u32 = 600;
const PROTEIN_ESTIMATE_G: u32 = 25;
const FIBER_ESTIMATE_G: u32 = 5;

/// One row of the CRM meal import file. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Cook_Time_Minutes")]
    pub cook_time_minutes: u32,
    #[serde(rename = "Sodium_mg")]
    pub sodium_mg: u32,
    #[serde(rename = "Protein_g")]
    pub protein_g: u32,
    #[serde(rename = "Fiber_g")]
    pub fiber_g: u32,
    #[serde(rename = "Meal_Type", serialize_with = "as_display")]
    pub meal_type: MealType,
    #[serde(rename = "Is_Heart_Healthy", serialize_with = "upper_bool")]
    pub is_heart_healthy: bool,
    #[serde(rename = "Is_Diabetic_Friendly", serialize_with = "upper_bool")]
    pub is_diabetic_friendly: bool,
    #[serde(rename = "Recipe_Content")]
    pub recipe_content: String,
}

impl MealRow {
    pub const COLUMNS: [&'static str; 9] = [
        "Name",
        "Cook_Time_Minutes",
        "Sodium_mg",
        "Protein_g",
        "Fiber_g",
        "Meal_Type",
        "Is_Heart_Healthy",
        "Is_Diabetic_Friendly",
        "Recipe_Content",
    ];
}

fn upper_bool<S: Serializer>(v: &bool, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(if *v { "TRUE" } else { "FALSE" })
}

fn as_display<S: Serializer>(v: &MealType, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(v)
}

fn leading_number(value: &str) -> Option<u32> {
    LEADING_NUMBER_RE.captures(value)?[1].parse().ok()
}

fn sodium_cap(value: &str) -> Option<u32> {
    SODIUM_RE.captures(value)?[1].parse().ok()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

pub fn meal_row(section: &RecipeSection) -> MealRow {
    let name = &section.name;
    let cook_time = section.field("Cook Time", leading_number).unwrap_or(DEFAULT_COOK_TIME);
    let servings = section.field("Servings", leading_number).unwrap_or(DEFAULT_SERVINGS);
    let dietary = section
        .field("Dietary", non_empty)
        .map(|d| d.to_lowercase())
        .unwrap_or_default();
    let category = section.field("Category", non_empty);
    let key_ingredients = section.field("Key Ingredients", non_empty);

    let is_heart_healthy = dietary.contains("heart-healthy") || dietary.contains("heart healthy");
    let is_diabetic_friendly =
        dietary.contains("diabetic-friendly") || dietary.contains("diabetic friendly");

    let sodium_mg = section.field("Sodium", sodium_cap).unwrap_or(if is_heart_healthy {
        HEART_HEALTHY_SODIUM_ESTIMATE
    } else {
        SODIUM_ESTIMATE
    });

    let mut recipe_content = format!("Cook Time: {} minutes\nServings: {}\n\n", cook_time, servings);
    if let Some(ingredients) = &key_ingredients {
        recipe_content.push_str(&format!("Key Ingredients: {}\n\n", ingredients));
    }
    recipe_content.push_str("Full recipe details available in original database.");

    MealRow {
        name: name.chars().take(MAX_NAME_CHARS).collect(),
        cook_time_minutes: cook_time,
        sodium_mg,
        protein_g: PROTEIN_ESTIMATE_G,
        fiber_g: FIBER_ESTIMATE_G,
        meal_type: MealType::from_category(category.as_deref(), name),
        is_heart_healthy,
        is_diabetic_friendly,
        recipe_content,
    }
}
