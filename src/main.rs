mod aggregator;
mod config;
mod dedup;
mod error;
mod export;
mod parser;
mod recipe;
mod sources;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use aggregator::{Aggregator, SourceJob};
use config::Config;
use parser::meal::MealRow;
use recipe::Source;
use sources::edamam::EdamamAdapter;
use sources::mealdb::MealDbAdapter;
use sources::spoonacular::SpoonacularAdapter;
use sources::FetchPlan;

const USER_AGENT: &str = concat!("recipe_aggregator/", env!("CARGO_PKG_VERSION"));

#[derive(Parser)]
#[command(name = "recipe_aggregator", about = "Build a recipe database from free recipe APIs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch from every configured source and write one deduplicated CSV
    Aggregate(AggregateArgs),
    /// Convert a Markdown recipe document into a meal import CSV
    ParseMd {
        /// Markdown file with one **Name** line per recipe
        #[arg(default_value = "RECIPES_DATABASE.md")]
        input: PathBuf,
        /// Output CSV path
        #[arg(short, long, default_value = "data/Meal_import.csv")]
        output: PathBuf,
    },
}

#[derive(Args)]
struct AggregateArgs {
    /// Output CSV path
    #[arg(short, long, default_value = "data/recipe_database.csv")]
    output: PathBuf,
    /// Target recipe count for TheMealDB
    #[arg(long, default_value = "100")]
    mealdb: usize,
    /// Target recipe count for Edamam
    #[arg(long, default_value = "100")]
    edamam: usize,
    /// Target recipe count for Spoonacular
    #[arg(long, default_value = "150")]
    spoonacular: usize,
    /// Run only these sources (repeatable); provider order is kept
    #[arg(long, value_enum)]
    only: Vec<Source>,
    /// TheMealDB categories to walk (default: all categories)
    #[arg(long = "mealdb-category")]
    mealdb_categories: Vec<String>,
    /// Edamam search terms (default: ten staple proteins and dishes)
    #[arg(long = "edamam-term")]
    edamam_terms: Vec<String>,
    /// Free-text filter for Spoonacular pages
    #[arg(long = "spoonacular-query")]
    spoonacular_query: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Aggregate(args) => aggregate(args).await,
        Commands::ParseMd { input, output } => {
            let markdown = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let rows = parser::parse_recipes_md(&markdown);
            println!("Found {} recipes in {}", rows.len(), input.display());
            export::write_csv(&output, &MealRow::COLUMNS, &rows)?;
            println!("Created CSV with {} recipes: {}", rows.len(), output.display());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn aggregate(args: AggregateArgs) -> anyhow::Result<()> {
    let config = Config::from_env();
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")?;

    let jobs: Vec<SourceJob> = Source::ALL
        .into_iter()
        .filter(|s| args.only.is_empty() || args.only.contains(s))
        .map(|source| match source {
            Source::MealDb => SourceJob {
                adapter: Box::new(MealDbAdapter::new(client.clone())),
                plan: FetchPlan::new(args.mealdb).with_queries(args.mealdb_categories.clone()),
            },
            Source::Edamam => SourceJob {
                adapter: Box::new(EdamamAdapter::new(client.clone(), config.edamam.clone())),
                plan: FetchPlan::new(args.edamam).with_queries(args.edamam_terms.clone()),
            },
            Source::Spoonacular => SourceJob {
                adapter: Box::new(SpoonacularAdapter::new(
                    client.clone(),
                    config.spoonacular_key.clone(),
                )),
                plan: FetchPlan::new(args.spoonacular)
                    .with_queries(args.spoonacular_query.clone()),
            },
        })
        .collect();

    info!("Running {} sources", jobs.len());
    let mut aggregator = Aggregator::new();
    let stats = aggregator.run(&jobs).await;
    for s in &stats {
        if s.disabled {
            println!("{}: disabled (credentials not configured)", s.source);
        } else {
            println!(
                "{}: {} recipes ({} duplicates, {} failed items, {} queries skipped)",
                s.source, s.collected, s.duplicates, s.failed, s.skipped
            );
        }
    }

    aggregator.export(&args.output)?;

    let summary = aggregator.summarize();
    if summary.total == 0 {
        warn!("No recipes collected!");
    } else {
        println!("\n{}", summary);
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
