use std::fmt;
use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::dedup::DedupSet;
use crate::export::write_csv;
use crate::recipe::{ExportRow, Recipe, Source};
use crate::sources::{FetchPlan, SourceAdapter};

/// One adapter and what to ask it for.
pub struct SourceJob {
    pub adapter: Box<dyn SourceAdapter>,
    pub plan: FetchPlan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectStats {
    pub source: Source,
    pub collected: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub skipped: usize,
    pub disabled: bool,
}

/// State for one aggregation run: records in discovery order plus the
/// dedup keys that admitted them. Starts empty, dropped with the run.
#[derive(Debug, Default)]
pub struct Aggregator {
    recipes: Vec<Recipe>,
    seen: DedupSet,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one adapter against this run's dedup keys and keep what it found.
    pub async fn collect(&mut self, adapter: &dyn SourceAdapter, plan: &FetchPlan) -> CollectStats {
        let source = adapter.source();
        debug!("Collecting from {} ({} names already seen)", source, self.seen.len());
        let report = adapter.fetch(plan, &mut self.seen).await;
        let totals = report.totals();
        let stats = CollectStats {
            source,
            collected: report.recipes.len(),
            duplicates: totals.duplicates,
            failed: totals.failed,
            skipped: report.skipped(),
            disabled: report.disabled.is_some(),
        };
        if !stats.disabled {
            info!(
                "{}: collected {} recipes ({} duplicates, {} failed items, {} queries skipped)",
                stats.source, stats.collected, stats.duplicates, stats.failed, stats.skipped
            );
        }
        self.recipes.extend(report.recipes);
        stats
    }

    /// Run jobs strictly in order, one at a time.
    pub async fn run(&mut self, jobs: &[SourceJob]) -> Vec<CollectStats> {
        let mut stats = Vec::with_capacity(jobs.len());
        for job in jobs {
            stats.push(self.collect(job.adapter.as_ref(), &job.plan).await);
        }
        stats
    }

    /// Compute derived fields and write every record to `path`. With no
    /// records nothing is written.
    pub fn export(&self, path: &Path) -> Result<Vec<ExportRow>> {
        if self.recipes.is_empty() {
            warn!("No recipes to save, skipping {}", path.display());
            return Ok(Vec::new());
        }

        let rows: Vec<ExportRow> = self.recipes.iter().map(ExportRow::from).collect();
        write_csv(path, &ExportRow::COLUMNS, &rows)?;
        info!("Saved {} recipes to {}", rows.len(), path.display());
        Ok(rows)
    }

    pub fn summarize(&self) -> Summary {
        let by_source = Source::ALL
            .iter()
            .map(|s| (*s, self.recipes.iter().filter(|r| r.source == *s).count()))
            .collect();

        let calories: Vec<u32> = self
            .recipes
            .iter()
            .map(|r| r.nutrition.calories)
            .filter(|c| *c > 0)
            .collect();
        let average_calories = if calories.is_empty() {
            None
        } else {
            Some(calories.iter().map(|c| f64::from(*c)).sum::<f64>() / calories.len() as f64)
        };

        let count = |pred: fn(&Recipe) -> bool| self.recipes.iter().filter(|r| pred(r)).count();

        Summary {
            total: self.recipes.len(),
            unique: self.seen.len(),
            by_source,
            with_nutrition: calories.len(),
            average_calories,
            heart_healthy: count(Recipe::is_heart_healthy),
            diabetic_friendly: count(Recipe::is_diabetic_friendly),
            weeknight_friendly: count(Recipe::is_weeknight_friendly),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub unique: usize,
    pub by_source: Vec<(Source, usize)>,
    pub with_nutrition: usize,
    pub average_calories: Option<f64>,
    pub heart_healthy: usize,
    pub diabetic_friendly: usize,
    pub weeknight_friendly: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{}", rule)?;
        writeln!(f, "RECIPE COLLECTION SUMMARY")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Total Recipes:  {}", self.total)?;
        writeln!(f, "Unique Recipes: {}", self.unique)?;
        writeln!(f, "\nBy Source:")?;
        for (source, n) in &self.by_source {
            writeln!(f, "  {:<12} {:>5}", source.to_string(), n)?;
        }
        writeln!(f)?;
        writeln!(f, "With Nutrition Data: {}", self.with_nutrition)?;
        if let Some(avg) = self.average_calories {
            writeln!(f, "Average Calories:    {:.0}", avg)?;
        }
        writeln!(f, "Heart-Healthy (<600mg sodium):   {}", self.heart_healthy)?;
        writeln!(f, "Diabetic-Friendly (<10g sugar):  {}", self.diabetic_friendly)?;
        writeln!(f, "Weeknight-Friendly (<=30 min):   {}", self.weeknight_friendly)?;
        write!(f, "{}", rule)
    }
}
