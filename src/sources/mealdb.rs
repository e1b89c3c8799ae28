use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use super::http::get_json;
use super::{FetchPlan, Provider, QueryContext, Tally, Throttle};
use crate::error::FetchError;
use crate::recipe::{MealType, Recipe, Source};

const BASE_URL: &str = "https://www.themealdb.com/api/json/v1/1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
// Unlimited API; courtesy spacing only.
const COURTESY_DELAY: Duration = Duration::from_millis(100);
const MAX_MEALS_PER_CATEGORY: usize = 10;
const MAX_INGREDIENTS: usize = 20;

#[derive(Debug, Deserialize)]
struct CategoryList {
    #[serde(default)]
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(rename = "strCategory")]
    name: String,
}

/// `meals` is null for unknown categories and ids.
#[derive(Debug, Deserialize)]
struct MealList<T> {
    meals: Option<Vec<T>>,
}

#[derive(Debug, Deserialize)]
struct MealStub {
    #[serde(rename = "idMeal")]
    id: String,
    #[serde(rename = "strMeal")]
    name: String,
}

/// Lookup payloads carry numbered `strIngredientN`/`strMeasureN` keys, so
/// they stay untyped.
type MealDetail = Map<String, Value>;

/// Category-bucketed lookup API: category list, then meals per category,
/// then one detail lookup per meal.
pub struct MealDbAdapter {
    client: Client,
    base_url: String,
}

impl MealDbAdapter {
    pub fn new(client: Client) -> Self {
        MealDbAdapter {
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn categories(&self) -> Result<Vec<String>, FetchError> {
        let url = format!("{}/categories.php", self.base_url);
        let list: CategoryList = get_json(&self.client, &url, &[], REQUEST_TIMEOUT).await?;
        Ok(list.categories.into_iter().map(|c| c.name).collect())
    }

    async fn meals_in(&self, category: &str) -> Result<Vec<MealStub>, FetchError> {
        let url = format!("{}/filter.php", self.base_url);
        let list: MealList<MealStub> =
            get_json(&self.client, &url, &[("c", category)], REQUEST_TIMEOUT).await?;
        Ok(list.meals.unwrap_or_default())
    }

    async fn lookup(&self, id: &str) -> Result<MealDetail, FetchError> {
        let url = format!("{}/lookup.php", self.base_url);
        let list: MealList<MealDetail> =
            get_json(&self.client, &url, &[("i", id)], REQUEST_TIMEOUT).await?;
        list.meals
            .and_then(|meals| meals.into_iter().next())
            .ok_or_else(|| FetchError::Payload(format!("no meal with id {}", id)))
    }
}

#[async_trait]
impl Provider for MealDbAdapter {
    type Query = String;

    fn source(&self) -> Source {
        Source::MealDb
    }

    fn min_interval(&self) -> Duration {
        COURTESY_DELAY
    }

    async fn queries(
        &self,
        plan: &FetchPlan,
        throttle: &mut Throttle,
    ) -> Result<Vec<String>, FetchError> {
        if !plan.queries.is_empty() {
            return Ok(plan.queries.clone());
        }
        throttle.wait().await;
        self.categories().await
    }

    async fn run_query(
        &self,
        category: &String,
        ctx: &mut QueryContext<'_>,
    ) -> Result<Tally, FetchError> {
        ctx.wait().await;
        let stubs = self.meals_in(category).await?;

        let mut tally = Tally::default();
        for stub in stubs.into_iter().take(MAX_MEALS_PER_CATEGORY) {
            if ctx.is_full() {
                break;
            }
            if ctx.is_known(&stub.name) {
                tally.duplicates += 1;
                continue;
            }

            ctx.wait().await;
            let detail = match self.lookup(&stub.id).await {
                Ok(d) => d,
                Err(e) => {
                    warn!("Error fetching TheMealDB meal {} ({}): {}", stub.id, stub.name, e);
                    tally.failed += 1;
                    continue;
                }
            };
            match map_meal(&detail) {
                Some(recipe) => {
                    ctx.admit(recipe, &mut tally);
                }
                None => {
                    warn!("TheMealDB meal {} has no name, skipping", stub.id);
                    tally.failed += 1;
                }
            }
        }
        Ok(tally)
    }
}

fn text<'a>(detail: &'a MealDetail, key: &str) -> &'a str {
    detail
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("")
}

/// Map a lookup payload onto a `Recipe`. TheMealDB carries no times or
/// nutrition, so those keep their defaults.
fn map_meal(detail: &MealDetail) -> Option<Recipe> {
    let name = detail
        .get("strMeal")
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty())?;

    let ingredients = (1..=MAX_INGREDIENTS)
        .filter_map(|i| {
            let ingredient = text(detail, &format!("strIngredient{}", i));
            if ingredient.is_empty() {
                return None;
            }
            let measure = text(detail, &format!("strMeasure{}", i));
            Some(format!("{} {}", measure, ingredient).trim().to_string())
        })
        .collect();

    let category = Some(text(detail, "strCategory")).filter(|c| !c.is_empty());
    let area = text(detail, "strArea");

    Some(Recipe {
        ingredients,
        instructions: text(detail, "strInstructions").to_string(),
        meal_type: MealType::from_category(category, name),
        cuisine: if area.is_empty() { "Unknown" } else { area }.to_string(),
        source_url: text(detail, "strSource").to_string(),
        image_url: text(detail, "strMealThumb").to_string(),
        ..Recipe::new(name, Source::MealDb)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::DedupSet;
    use crate::sources::fake_api::{self, FakeApi, Route};
    use crate::sources::{QueryOutcome, SourceAdapter};

    fn fixture<T: serde::de::DeserializeOwned>(name: &str) -> T {
        let raw = std::fs::read_to_string(format!("tests/fixtures/{}.json", name)).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn lookup_payload() {
        let list: MealList<MealDetail> = fixture("mealdb_lookup");
        let detail = &list.meals.unwrap()[0];
        let r = map_meal(detail).unwrap();

        assert_eq!(r.name, "Teriyaki Chicken Casserole");
        assert_eq!(r.source, Source::MealDb);
        assert_eq!(r.cuisine, "Japanese");
        assert_eq!(r.meal_type, MealType::Dinner);
        assert_eq!(r.servings, 4);
        assert_eq!(r.total_time_minutes(), 0);
        assert_eq!(r.nutrition.calories, 0);
        assert_eq!(r.ingredients.len(), 9);
        assert_eq!(r.ingredients[0], "3/4 cup soy sauce");
        // Empty measure leaves just the ingredient.
        assert_eq!(r.ingredients[8], "Green Beans");
        assert!(r.image_url.ends_with(".jpg"));
        assert!(r.instructions.starts_with("Preheat oven"));
    }

    #[test]
    fn null_fields_default() {
        let detail: MealDetail = serde_json::from_str(
            r#"{"strMeal":"Pancakes","strCategory":"Dessert","strArea":null,
                "strIngredient1":"Flour","strMeasure1":null,
                "strIngredient2":null,"strMeasure2":null,"strSource":null}"#,
        )
        .unwrap();
        let r = map_meal(&detail).unwrap();
        assert_eq!(r.cuisine, "Unknown");
        assert_eq!(r.meal_type, MealType::Snack);
        assert_eq!(r.ingredients, vec!["Flour".to_string()]);
        assert_eq!(r.source_url, "");
    }

    #[test]
    fn nameless_meal_is_rejected() {
        let detail: MealDetail = serde_json::from_str(r#"{"strMeal":"  "}"#).unwrap();
        assert!(map_meal(&detail).is_none());
    }

    #[test]
    fn name_is_kept_as_sent() {
        let detail: MealDetail = serde_json::from_str(r#"{"strMeal":" Pancakes "}"#).unwrap();
        assert_eq!(map_meal(&detail).unwrap().name, " Pancakes ");
    }

    #[test]
    fn filter_payloads() {
        let list: MealList<MealStub> = fixture("mealdb_filter");
        let meals = list.meals.unwrap();
        assert_eq!(meals.len(), 3);
        assert_eq!(meals[0].id, "52772");

        let empty: MealList<MealStub> = serde_json::from_str(r#"{"meals":null}"#).unwrap();
        assert!(empty.meals.is_none());
    }

    #[test]
    fn category_payload() {
        let list: CategoryList = fixture("mealdb_categories");
        let names: Vec<_> = list.categories.into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["Beef", "Breakfast", "Chicken", "Dessert"]);
    }

    fn meal_json(id: &str, name: &str) -> String {
        format!(
            r#"{{"meals":[{{"idMeal":"{}","strMeal":"{}","strCategory":"Chicken","strArea":"Indian"}}]}}"#,
            id, name
        )
    }

    fn chicken_routes() -> Vec<Route> {
        let filter = std::fs::read_to_string("tests/fixtures/mealdb_filter.json").unwrap();
        vec![
            Route::json("/filter.php?c=Chicken", filter),
            Route::json("/lookup.php?i=52772", meal_json("52772", "Teriyaki Chicken Casserole")),
            Route::status("/lookup.php?i=52795", 500),
            Route::json("/lookup.php?i=52820", meal_json("52820", "Katsu Chicken curry")),
        ]
    }

    fn chicken_plan(target: usize) -> FetchPlan {
        FetchPlan::new(target).with_queries(vec!["Chicken".to_string()])
    }

    #[tokio::test]
    async fn known_meals_skip_lookup_and_failed_lookups_are_counted() {
        let api = FakeApi::start(chicken_routes()).await;
        let adapter = MealDbAdapter::new(fake_api::client()).with_base_url(&api.base_url);
        let mut seen = DedupSet::new();
        seen.is_duplicate("teriyaki-chicken casserole");

        let report = adapter.fetch(&chicken_plan(10), &mut seen).await;

        let names: Vec<_> = report.recipes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Katsu Chicken curry"]);
        assert_eq!(report.skipped(), 0);
        let totals = report.totals();
        assert_eq!((totals.new, totals.duplicates, totals.failed), (1, 1, 1));
        assert!(!api.was_requested("/lookup.php?i=52772"));
        assert!(api.was_requested("/lookup.php?i=52795"));
    }

    #[tokio::test]
    async fn stops_at_target_within_a_category() {
        let api = FakeApi::start(chicken_routes()).await;
        let adapter = MealDbAdapter::new(fake_api::client()).with_base_url(&api.base_url);
        let mut seen = DedupSet::new();

        let report = adapter.fetch(&chicken_plan(1), &mut seen).await;

        assert_eq!(report.recipes.len(), 1);
        assert_eq!(report.recipes[0].name, "Teriyaki Chicken Casserole");
        assert_eq!(report.recipes[0].cuisine, "Indian");
        assert_eq!(
            api.requests(),
            ["/filter.php?c=Chicken", "/lookup.php?i=52772"]
        );
    }

    #[tokio::test]
    async fn failed_category_is_skipped() {
        let api = FakeApi::start(vec![
            Route::status("/filter.php?c=Beef", 503),
            Route::json("/filter.php?c=Vegan", r#"{"meals":null}"#),
        ])
        .await;
        let adapter = MealDbAdapter::new(fake_api::client()).with_base_url(&api.base_url);
        let mut seen = DedupSet::new();
        let plan = FetchPlan::new(10).with_queries(vec!["Beef".to_string(), "Vegan".to_string()]);

        let report = adapter.fetch(&plan, &mut seen).await;

        assert!(report.recipes.is_empty());
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.outcomes.len(), 2);
        assert!(matches!(&report.outcomes[1], QueryOutcome::Collected { tally, .. } if tally.new == 0));
    }
}
