use std::fmt;

use serde::Serialize;

pub const DEFAULT_SERVINGS: u32 = 4;
pub const HEART_HEALTHY_SODIUM_MG: u32 = 600;
pub const DIABETIC_FRIENDLY_SUGAR_G: f64 = 10.0;
pub const WEEKNIGHT_MINUTES: u32 = 30;

const INGREDIENT_DELIMITER: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum Source {
    #[value(name = "mealdb")]
    MealDb,
    Edamam,
    Spoonacular,
}

impl Source {
    /// Provider order used for runs and summaries.
    pub const ALL: [Source; 3] = [Source::MealDb, Source::Edamam, Source::Spoonacular];
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Source::MealDb => "TheMealDB",
            Source::Edamam => "Edamam",
            Source::Spoonacular => "Spoonacular",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MealType {
    Breakfast,
    Lunch,
    #[default]
    Dinner,
    Snack,
    Other(String),
}

impl MealType {
    /// Meal type from a free-form category label. The recipe name is only
    /// consulted when a category is present but matches nothing.
    pub fn from_category(category: Option<&str>, name: &str) -> Self {
        let Some(category) = category else {
            return MealType::Dinner;
        };
        let category = category.to_lowercase();
        if category.contains("breakfast") || category.contains("brunch") {
            MealType::Breakfast
        } else if category.contains("snack") || category.contains("dessert") {
            MealType::Snack
        } else if name.to_lowercase().contains("smoothie") {
            MealType::Breakfast
        } else {
            MealType::Dinner
        }
    }

    /// Meal type from a provider label such as "breakfast" or "lunch/dinner".
    pub fn from_label(label: &str) -> Self {
        let titled = title_case(label.trim());
        match titled.as_str() {
            "Breakfast" => MealType::Breakfast,
            "Lunch" => MealType::Lunch,
            "Dinner" => MealType::Dinner,
            "Snack" => MealType::Snack,
            _ => MealType::Other(titled),
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MealType::Breakfast => f.write_str("Breakfast"),
            MealType::Lunch => f.write_str("Lunch"),
            MealType::Dinner => f.write_str("Dinner"),
            MealType::Snack => f.write_str("Snack"),
            MealType::Other(s) => f.write_str(s),
        }
    }
}

/// Whole-recipe nutrient amounts as reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NutrientTotals {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
}

/// Per-serving nutrition.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Nutrition {
    pub calories: u32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: u32,
}

impl NutrientTotals {
    pub fn per_serving(&self, servings: u32) -> Nutrition {
        let servings = f64::from(if servings == 0 { DEFAULT_SERVINGS } else { servings });
        Nutrition {
            calories: non_negative(self.calories / servings) as u32,
            protein_g: round1(self.protein_g / servings),
            carbs_g: round1(self.carbs_g / servings),
            fat_g: round1(self.fat_g / servings),
            fiber_g: round1(self.fiber_g / servings),
            sugar_g: round1(self.sugar_g / servings),
            sodium_mg: non_negative(self.sodium_mg / servings) as u32,
        }
    }
}

/// Serving count from a provider value; absent, zero, negative and
/// non-finite values fall back to the default.
pub fn servings_or_default(raw: Option<f64>) -> u32 {
    match raw {
        Some(v) if v.is_finite() && v >= 1.0 => v as u32,
        _ => DEFAULT_SERVINGS,
    }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

fn round1(v: f64) -> f64 {
    (non_negative(v) * 10.0).round() / 10.0
}

/// Capitalize the first letter of every alphabetic run, lowercase the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Canonical recipe record collected from a provider. Never mutated once
/// it has been admitted to a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub name: String,
    pub ingredients: Vec<String>,
    pub instructions: String,
    pub meal_type: MealType,
    pub cuisine: String,
    pub servings: u32,
    pub prep_time_minutes: u32,
    pub cook_time_minutes: u32,
    pub nutrition: Nutrition,
    pub source: Source,
    pub source_url: String,
    pub image_url: String,
}

impl Recipe {
    pub fn new(name: impl Into<String>, source: Source) -> Self {
        Recipe {
            name: name.into(),
            ingredients: Vec::new(),
            instructions: String::new(),
            meal_type: MealType::Dinner,
            cuisine: "Unknown".to_string(),
            servings: DEFAULT_SERVINGS,
            prep_time_minutes: 0,
            cook_time_minutes: 0,
            nutrition: Nutrition::default(),
            source,
            source_url: String::new(),
            image_url: String::new(),
        }
    }

    /// Saturates: provider minute values are unchecked.
    pub fn total_time_minutes(&self) -> u32 {
        self.prep_time_minutes.saturating_add(self.cook_time_minutes)
    }

    pub fn is_heart_healthy(&self) -> bool {
        self.nutrition.sodium_mg < HEART_HEALTHY_SODIUM_MG
    }

    pub fn is_diabetic_friendly(&self) -> bool {
        self.nutrition.sugar_g < DIABETIC_FRIENDLY_SUGAR_G
    }

    pub fn is_weeknight_friendly(&self) -> bool {
        self.total_time_minutes() <= WEEKNIGHT_MINUTES
    }
}

/// One row of the aggregated CSV. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub name: String,
    pub ingredients: String,
    pub instructions: String,
    pub meal_type: String,
    pub cuisine: String,
    pub servings: u32,
    pub prep_time_minutes: u32,
    pub cook_time_minutes: u32,
    pub total_time_minutes: u32,
    pub calories: u32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: u32,
    pub source: String,
    pub source_url: String,
    pub image_url: String,
    pub is_heart_healthy: bool,
    pub is_diabetic_friendly: bool,
    pub is_weeknight_friendly: bool,
}

impl ExportRow {
    pub const COLUMNS: [&'static str; 22] = [
        "name",
        "ingredients",
        "instructions",
        "meal_type",
        "cuisine",
        "servings",
        "prep_time_minutes",
        "cook_time_minutes",
        "total_time_minutes",
        "calories",
        "protein_g",
        "carbs_g",
        "fat_g",
        "fiber_g",
        "sugar_g",
        "sodium_mg",
        "source",
        "source_url",
        "image_url",
        "is_heart_healthy",
        "is_diabetic_friendly",
        "is_weeknight_friendly",
    ];
}

impl From<&Recipe> for ExportRow {
    fn from(r: &Recipe) -> Self {
        ExportRow {
            name: r.name.clone(),
            ingredients: r.ingredients.join(INGREDIENT_DELIMITER),
            instructions: r.instructions.clone(),
            meal_type: r.meal_type.to_string(),
            cuisine: r.cuisine.clone(),
            servings: r.servings,
            prep_time_minutes: r.prep_time_minutes,
            cook_time_minutes: r.cook_time_minutes,
            total_time_minutes: r.total_time_minutes(),
            calories: r.nutrition.calories,
            protein_g: r.nutrition.protein_g,
            carbs_g: r.nutrition.carbs_g,
            fat_g: r.nutrition.fat_g,
            fiber_g: r.nutrition.fiber_g,
            sugar_g: r.nutrition.sugar_g,
            sodium_mg: r.nutrition.sodium_mg,
            source: r.source.to_string(),
            source_url: r.source_url.clone(),
            image_url: r.image_url.clone(),
            is_heart_healthy: r.is_heart_healthy(),
            is_diabetic_friendly: r.is_diabetic_friendly(),
            is_weeknight_friendly: r.is_weeknight_friendly(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_servings_fall_back_before_dividing() {
        assert_eq!(servings_or_default(Some(0.0)), 4);
        assert_eq!(servings_or_default(None), 4);
        assert_eq!(servings_or_default(Some(-2.0)), 4);
        assert_eq!(servings_or_default(Some(f64::NAN)), 4);
        assert_eq!(servings_or_default(Some(6.7)), 6);

        let totals = NutrientTotals {
            calories: 2000.0,
            sodium_mg: 1000.0,
            protein_g: 50.0,
            ..Default::default()
        };
        let n = totals.per_serving(0);
        assert_eq!(n.calories, 500);
        assert_eq!(n.sodium_mg, 250);
        assert_eq!(n.protein_g, 12.5);
    }

    #[test]
    fn per_serving_rounding() {
        let totals = NutrientTotals {
            calories: 1001.0,
            sugar_g: 10.0,
            fat_g: 7.0,
            ..Default::default()
        };
        let n = totals.per_serving(3);
        assert_eq!(n.calories, 333);
        assert_eq!(n.sugar_g, 3.3);
        assert_eq!(n.fat_g, 2.3);
    }

    #[test]
    fn derived_flags() {
        let mut r = Recipe::new("Quick Salad", Source::MealDb);
        r.prep_time_minutes = 10;
        r.cook_time_minutes = 20;
        r.nutrition.sodium_mg = 599;
        r.nutrition.sugar_g = 9.9;
        assert_eq!(r.total_time_minutes(), 30);
        assert!(r.is_weeknight_friendly());
        assert!(r.is_heart_healthy());
        assert!(r.is_diabetic_friendly());

        r.cook_time_minutes = 21;
        r.nutrition.sodium_mg = 600;
        r.nutrition.sugar_g = 10.0;
        assert!(!r.is_weeknight_friendly());
        assert!(!r.is_heart_healthy());
        assert!(!r.is_diabetic_friendly());
    }

    #[test]
    fn export_row_joins_ingredients() {
        let mut r = Recipe::new("Toast", Source::Spoonacular);
        r.ingredients = vec!["1 slice bread".into(), "butter".into()];
        r.prep_time_minutes = 2;
        r.cook_time_minutes = 3;
        let row = ExportRow::from(&r);
        assert_eq!(row.ingredients, "1 slice bread | butter");
        assert_eq!(row.total_time_minutes, 5);
        assert_eq!(row.source, "Spoonacular");
        assert_eq!(row.meal_type, "Dinner");
    }

    #[test]
    fn absurd_times_saturate_instead_of_overflowing() {
        let mut r = Recipe::new("Forever Stew", Source::Spoonacular);
        r.prep_time_minutes = u32::MAX;
        r.cook_time_minutes = 10;
        assert_eq!(r.total_time_minutes(), u32::MAX);
        assert!(!r.is_weeknight_friendly());

        let row = ExportRow::from(&r);
        assert_eq!(row.total_time_minutes, u32::MAX);
        assert!(!row.is_weeknight_friendly);
    }

    #[test]
    fn category_rules() {
        assert_eq!(MealType::from_category(None, "Berry Smoothie"), MealType::Dinner);
        assert_eq!(MealType::from_category(Some("Brunch Ideas"), "Eggs"), MealType::Breakfast);
        assert_eq!(MealType::from_category(Some("Dessert"), "Pie"), MealType::Snack);
        assert_eq!(MealType::from_category(Some("Drinks"), "Berry Smoothie"), MealType::Breakfast);
        assert_eq!(MealType::from_category(Some("Dinner"), "Grilled Salmon"), MealType::Dinner);
    }

    #[test]
    fn provider_labels() {
        assert_eq!(MealType::from_label("breakfast"), MealType::Breakfast);
        assert_eq!(MealType::from_label("lunch/dinner").to_string(), "Lunch/Dinner");
        assert_eq!(title_case("south east asian"), "South East Asian");
    }
}
