use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::http::get_json;
use super::{minutes, FetchPlan, Provider, QueryContext, Tally, Throttle};
use crate::error::FetchError;
use crate::recipe::{servings_or_default, MealType, NutrientTotals, Recipe, Source};

const BASE_URL: &str = "https://api.spoonacular.com/recipes/complexSearch";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
// Free tier is 150 points/day; one page costs about one point.
const REQUEST_DELAY: Duration = Duration::from_secs(1);
const PAGE_SIZE: usize = 10;

/// Results are decoded one at a time; see `decode_result`.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SpoonacularRecipe {
    title: Option<String>,
    extended_ingredients: Option<Vec<Ingredient>>,
    servings: Option<f64>,
    preparation_minutes: Option<f64>,
    cooking_minutes: Option<f64>,
    ready_in_minutes: Option<f64>,
    nutrition: Option<NutritionBlock>,
    dish_types: Option<Vec<String>>,
    cuisines: Option<Vec<String>>,
    source_url: Option<String>,
    image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Ingredient {
    original: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NutritionBlock {
    nutrients: Vec<Nutrient>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Nutrient {
    name: String,
    amount: f64,
}

/// One page of the offset-paginated search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    offset: usize,
    query: Option<String>,
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.query {
            Some(q) => write!(f, "offset {} ({})", self.offset, q),
            None => write!(f, "offset {}", self.offset),
        }
    }
}

/// Offset pages covering `target`, each carrying the optional text filter.
fn pages(plan: &FetchPlan) -> Vec<Page> {
    let query = Some(plan.queries.join(" ")).filter(|q| !q.trim().is_empty());
    (0..plan.target)
        .step_by(PAGE_SIZE)
        .map(|offset| Page {
            offset,
            query: query.clone(),
        })
        .collect()
}

/// Offset-paginated search with nutrition included. Needs an API key.
pub struct SpoonacularAdapter {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl SpoonacularAdapter {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        SpoonacularAdapter {
            client,
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn search(&self, api_key: &str, page: &Page) -> Result<SearchResponse, FetchError> {
        let offset = page.offset.to_string();
        let number = PAGE_SIZE.to_string();
        let mut query = vec![
            ("apiKey", api_key),
            ("number", number.as_str()),
            ("offset", offset.as_str()),
            ("addRecipeNutrition", "true"),
            ("fillIngredients", "true"),
        ];
        if let Some(q) = &page.query {
            query.push(("query", q.as_str()));
        }
        get_json(&self.client, &self.base_url, &query, REQUEST_TIMEOUT).await
    }
}

#[async_trait]
impl Provider for SpoonacularAdapter {
    type Query = Page;

    fn source(&self) -> Source {
        Source::Spoonacular
    }

    fn min_interval(&self) -> Duration {
        REQUEST_DELAY
    }

    fn disabled_reason(&self) -> Option<String> {
        self.api_key
            .is_none()
            .then(|| "SPOONACULAR_API_KEY not set (sign up at https://spoonacular.com/food-api)".to_string())
    }

    async fn queries(
        &self,
        plan: &FetchPlan,
        _throttle: &mut Throttle,
    ) -> Result<Vec<Page>, FetchError> {
        Ok(pages(plan))
    }

    async fn run_query(&self, page: &Page, ctx: &mut QueryContext<'_>) -> Result<Tally, FetchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| FetchError::Payload("API key missing".to_string()))?;

        ctx.wait().await;
        let response = self.search(api_key, page).await?;

        let mut tally = Tally {
            exhausted: response.results.is_empty(),
            ..Tally::default()
        };
        for result in response.results {
            if ctx.is_full() {
                break;
            }
            let raw = match decode_result(result) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Malformed Spoonacular result at {}: {}", page, e);
                    tally.failed += 1;
                    continue;
                }
            };
            match map_recipe(raw) {
                Some(recipe) => {
                    ctx.admit(recipe, &mut tally);
                }
                None => {
                    warn!("Spoonacular result at {} has no title, skipping", page);
                    tally.failed += 1;
                }
            }
        }
        Ok(tally)
    }
}

fn decode_result(result: Value) -> Result<SpoonacularRecipe, serde_json::Error> {
    serde_json::from_value(result)
}

fn meal_type(dish_types: &[String]) -> MealType {
    let has = |words: &[&str]| {
        dish_types
            .iter()
            .any(|d| words.iter().any(|w| d.to_lowercase().contains(w)))
    };
    if has(&["breakfast", "brunch"]) {
        MealType::Breakfast
    } else if has(&["snack", "appetizer", "dessert"]) {
        MealType::Snack
    } else if has(&["lunch"]) {
        MealType::Lunch
    } else {
        MealType::Dinner
    }
}

fn map_recipe(raw: SpoonacularRecipe) -> Option<Recipe> {
    let name = raw.title.filter(|t| !t.trim().is_empty())?;
    let servings = servings_or_default(raw.servings);

    let nutrients = raw.nutrition.map(|n| n.nutrients).unwrap_or_default();
    let amount = |label: &str| {
        nutrients
            .iter()
            .find(|n| n.name == label)
            .map(|n| n.amount)
            .unwrap_or(0.0)
    };
    let totals = NutrientTotals {
        calories: amount("Calories"),
        protein_g: amount("Protein"),
        carbs_g: amount("Carbohydrates"),
        fat_g: amount("Fat"),
        fiber_g: amount("Fiber"),
        sugar_g: amount("Sugar"),
        sodium_mg: amount("Sodium"),
    };

    let prep = minutes(raw.preparation_minutes);
    let mut cook = minutes(raw.cooking_minutes);
    if prep == 0 && cook == 0 {
        cook = minutes(raw.ready_in_minutes);
    }

    let ingredients = raw
        .extended_ingredients
        .unwrap_or_default()
        .into_iter()
        .filter_map(|i| i.original)
        .collect();

    Some(Recipe {
        ingredients,
        meal_type: meal_type(&raw.dish_types.unwrap_or_default()),
        cuisine: raw
            .cuisines
            .and_then(|c| c.into_iter().find(|c| !c.trim().is_empty()))
            .unwrap_or_else(|| "Various".to_string()),
        servings,
        prep_time_minutes: prep,
        cook_time_minutes: cook,
        nutrition: totals.per_serving(servings),
        source_url: raw.source_url.unwrap_or_default(),
        image_url: raw.image.unwrap_or_default(),
        ..Recipe::new(name, Source::Spoonacular)
    })
}
