use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::http::get_json;
use super::{minutes, FetchPlan, Provider, QueryContext, Tally, Throttle};
use crate::config::EdamamCredentials;
use crate::error::FetchError;
use crate::recipe::{servings_or_default, title_case, MealType, NutrientTotals, Recipe, Source};

const BASE_URL: &str = "https://api.edamam.com/api/recipes/v2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
// Free tier allows 10 requests/minute.
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(6);
const HITS_PER_SEARCH: &str = "10";

pub const DEFAULT_TERMS: &[&str] = &[
    "chicken", "beef", "salmon", "pasta", "vegetarian",
    "soup", "salad", "pork", "shrimp", "turkey",
];

/// Hits stay untyped until each is decoded, so one malformed hit does not
/// cost the rest of the page.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    recipe: EdamamRecipe,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EdamamRecipe {
    label: Option<String>,
    ingredient_lines: Option<Vec<String>>,
    url: Option<String>,
    image: Option<String>,
    meal_type: Option<Vec<String>>,
    cuisine_type: Option<Vec<String>>,
    #[serde(rename = "yield")]
    servings: Option<f64>,
    total_time: Option<f64>,
    total_nutrients: Option<HashMap<String, Nutrient>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Nutrient {
    quantity: Option<f64>,
}

/// Free-text recipe search. Needs an app id/key pair.
pub struct EdamamAdapter {
    client: Client,
    credentials: Option<EdamamCredentials>,
    base_url: String,
}

impl EdamamAdapter {
    pub fn new(client: Client, credentials: Option<EdamamCredentials>) -> Self {
        EdamamAdapter {
            client,
            credentials,
            base_url: BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn search(
        &self,
        credentials: &EdamamCredentials,
        term: &str,
    ) -> Result<SearchResponse, FetchError> {
        let query = [
            ("type", "public"),
            ("q", term),
            ("app_id", credentials.app_id.as_str()),
            ("app_key", credentials.app_key.as_str()),
            ("to", HITS_PER_SEARCH),
        ];
        get_json(&self.client, &self.base_url, &query, REQUEST_TIMEOUT).await
    }
}

#[async_trait]
impl Provider for EdamamAdapter {
    type Query = String;

    fn source(&self) -> Source {
        Source::Edamam
    }

    fn min_interval(&self) -> Duration {
        RATE_LIMIT_DELAY
    }

    fn disabled_reason(&self) -> Option<String> {
        self.credentials
            .is_none()
            .then(|| "EDAMAM_APP_ID / EDAMAM_APP_KEY not set (sign up at https://developer.edamam.com/)".to_string())
    }

    async fn queries(
        &self,
        plan: &FetchPlan,
        _throttle: &mut Throttle,
    ) -> Result<Vec<String>, FetchError> {
        if plan.queries.is_empty() {
            Ok(DEFAULT_TERMS.iter().map(|t| t.to_string()).collect())
        } else {
            Ok(plan.queries.clone())
        }
    }

    async fn run_query(
        &self,
        term: &String,
        ctx: &mut QueryContext<'_>,
    ) -> Result<Tally, FetchError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| FetchError::Payload("credentials missing".to_string()))?;

        ctx.wait().await;
        let response = self.search(credentials, term).await?;

        let mut tally = Tally::default();
        for hit in response.hits {
            if ctx.is_full() {
                break;
            }
            let raw = match decode_hit(hit) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Malformed Edamam hit for '{}': {}", term, e);
                    tally.failed += 1;
                    continue;
                }
            };
            match map_recipe(raw) {
                Some(recipe) => {
                    ctx.admit(recipe, &mut tally);
                }
                None => {
                    warn!("Edamam hit for '{}' has no label, skipping", term);
                    tally.failed += 1;
                }
            }
        }
        Ok(tally)
    }
}

fn decode_hit(hit: Value) -> Result<EdamamRecipe, serde_json::Error> {
    serde_json::from_value::<Hit>(hit).map(|h| h.recipe)
}

fn first_titled(values: Option<Vec<String>>) -> Option<String> {
    values?
        .into_iter()
        .map(|v| title_case(v.trim()))
        .find(|v| !v.is_empty())
}

fn map_recipe(raw: EdamamRecipe) -> Option<Recipe> {
    let name = raw.label.filter(|l| !l.trim().is_empty())?;
    let servings = servings_or_default(raw.servings);

    let nutrients = raw.total_nutrients.unwrap_or_default();
    let amount = |code: &str| {
        nutrients
            .get(code)
            .and_then(|n| n.quantity)
            .unwrap_or(0.0)
    };
    let totals = NutrientTotals {
        calories: amount("ENERC_KCAL"),
        protein_g: amount("PROCNT"),
        carbs_g: amount("CHOCDF"),
        fat_g: amount("FAT"),
        fiber_g: amount("FIBTG"),
        sugar_g: amount("SUGAR"),
        sodium_mg: amount("NA"),
    };

    let url = raw.url.unwrap_or_default();
    Some(Recipe {
        ingredients: raw.ingredient_lines.unwrap_or_default(),
        instructions: url.clone(),
        meal_type: first_titled(raw.meal_type)
            .map(|m| MealType::from_label(&m))
            .unwrap_or_default(),
        cuisine: first_titled(raw.cuisine_type).unwrap_or_else(|| "Unknown".to_string()),
        servings,
        cook_time_minutes: minutes(raw.total_time),
        nutrition: totals.per_serving(servings),
        source_url: url,
        image_url: raw.image.unwrap_or_default(),
        ..Recipe::new(name, Source::Edamam)
    })
}
