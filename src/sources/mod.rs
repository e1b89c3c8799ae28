pub mod edamam;
#[cfg(test)]
pub(crate) mod fake_api;
mod http;
pub mod mealdb;
pub mod spoonacular;
mod throttle;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::dedup::DedupSet;
use crate::error::FetchError;
use crate::recipe::{Recipe, Source};
pub use throttle::Throttle;

/// How many new records to collect, and the provider-specific query list
/// (categories, search terms, or a search filter). Empty means the
/// provider's default sequence.
#[derive(Debug, Clone, Default)]
pub struct FetchPlan {
    pub target: usize,
    pub queries: Vec<String>,
}

impl FetchPlan {
    pub fn new(target: usize) -> Self {
        FetchPlan {
            target,
            queries: Vec::new(),
        }
    }

    pub fn with_queries(mut self, queries: Vec<String>) -> Self {
        self.queries = queries;
        self
    }
}

/// Counts for one provider query.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub new: usize,
    pub duplicates: usize,
    /// Items whose detail request or mapping failed.
    pub failed: usize,
    /// No further queries can produce results (e.g. an empty page).
    pub exhausted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Collected { query: String, tally: Tally },
    Skipped { query: String, reason: String },
}

/// Everything one adapter produced during a run.
#[derive(Debug)]
pub struct FetchReport {
    pub source: Source,
    pub recipes: Vec<Recipe>,
    pub outcomes: Vec<QueryOutcome>,
    pub disabled: Option<String>,
}

impl FetchReport {
    pub fn new(source: Source) -> Self {
        FetchReport {
            source,
            recipes: Vec::new(),
            outcomes: Vec::new(),
            disabled: None,
        }
    }

    pub fn disabled(source: Source, reason: impl Into<String>) -> Self {
        FetchReport {
            disabled: Some(reason.into()),
            ..FetchReport::new(source)
        }
    }

    /// Per-item counts summed over every collected query.
    pub fn totals(&self) -> Tally {
        self.outcomes.iter().fold(Tally::default(), |acc, o| match o {
            QueryOutcome::Collected { tally, .. } => Tally {
                new: acc.new + tally.new,
                duplicates: acc.duplicates + tally.duplicates,
                failed: acc.failed + tally.failed,
                exhausted: acc.exhausted || tally.exhausted,
            },
            QueryOutcome::Skipped { .. } => acc,
        })
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, QueryOutcome::Skipped { .. }))
            .count()
    }

    fn record(&mut self, query: &impl fmt::Display, tally: Tally) {
        debug!(
            "{} query '{}': {} new, {} duplicates, {} failed",
            self.source, query, tally.new, tally.duplicates, tally.failed
        );
        self.outcomes.push(QueryOutcome::Collected {
            query: query.to_string(),
            tally,
        });
    }

    fn skip(&mut self, query: &impl fmt::Display, reason: &FetchError) {
        warn!("Error fetching {} query '{}': {}", self.source, query, reason);
        self.outcomes.push(QueryOutcome::Skipped {
            query: query.to_string(),
            reason: reason.to_string(),
        });
    }
}

/// A recipe provider: fetches up to `plan.target` records whose names are
/// not yet in `seen`, registering each admitted name.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;
    async fn fetch(&self, plan: &FetchPlan, seen: &mut DedupSet) -> FetchReport;
}

/// State handed to a provider while it runs one query.
pub struct QueryContext<'a> {
    target: usize,
    throttle: &'a mut Throttle,
    seen: &'a mut DedupSet,
    report: &'a mut FetchReport,
}

impl QueryContext<'_> {
    pub fn is_full(&self) -> bool {
        self.report.recipes.len() >= self.target
    }

    /// Already-known name; lets a provider skip a detail request.
    pub fn is_known(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    /// Wait out the provider's request interval.
    pub async fn wait(&mut self) {
        self.throttle.wait().await;
    }

    /// Append `recipe` unless its name is a duplicate.
    pub fn admit(&mut self, recipe: Recipe, tally: &mut Tally) -> bool {
        if self.seen.is_duplicate(&recipe.name) {
            tally.duplicates += 1;
            return false;
        }
        self.report.recipes.push(recipe);
        tally.new += 1;
        true
    }
}

/// Provider-specific half of an adapter: its query sequence and how to run
/// one query. The shared loop lives in the `SourceAdapter` impl below.
#[async_trait]
pub trait Provider: Send + Sync {
    type Query: fmt::Display + Send + Sync;

    fn source(&self) -> Source;

    /// Minimum spacing between consecutive requests.
    fn min_interval(&self) -> Duration;

    /// Why this provider cannot run, e.g. missing credentials.
    fn disabled_reason(&self) -> Option<String> {
        None
    }

    async fn queries(
        &self,
        plan: &FetchPlan,
        throttle: &mut Throttle,
    ) -> Result<Vec<Self::Query>, FetchError>;

    async fn run_query(
        &self,
        query: &Self::Query,
        ctx: &mut QueryContext<'_>,
    ) -> Result<Tally, FetchError>;
}

#[async_trait]
impl<P: Provider> SourceAdapter for P {
    fn source(&self) -> Source {
        Provider::source(self)
    }

    async fn fetch(&self, plan: &FetchPlan, seen: &mut DedupSet) -> FetchReport {
        let source = Provider::source(self);
        if let Some(reason) = self.disabled_reason() {
            warn!("{} disabled: {}", source, reason);
            return FetchReport::disabled(source, reason);
        }

        info!("Fetching from {} (target: {} recipes)", source, plan.target);
        let mut report = FetchReport::new(source);
        let mut throttle = Throttle::new(self.min_interval());

        let queries = match self.queries(plan, &mut throttle).await {
            Ok(q) => q,
            Err(e) => {
                report.skip(&"query list", &e);
                return report;
            }
        };

        let pb = progress_bar(queries.len(), source);
        for query in &queries {
            if report.recipes.len() >= plan.target {
                break;
            }
            let mut ctx = QueryContext {
                target: plan.target,
                throttle: &mut throttle,
                seen: &mut *seen,
                report: &mut report,
            };
            let result = self.run_query(query, &mut ctx).await;
            pb.inc(1);
            match result {
                Ok(tally) => {
                    report.record(query, tally);
                    if tally.exhausted {
                        break;
                    }
                }
                Err(e) => report.skip(query, &e),
            }
        }
        pb.finish_and_clear();

        report
    }
}

fn progress_bar(len: usize, source: Source) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{msg:>12} [{elapsed_precise}] {bar:40} {pos}/{len}")
        .map(|s| s.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message(source.to_string());
    pb
}

/// Whole minutes from an optional provider value; null, negative and
/// non-finite values become zero.
pub(crate) fn minutes(value: Option<f64>) -> u32 {
    value
        .filter(|m| m.is_finite() && *m > 0.0)
        .map(|m| m as u32)
        .unwrap_or(0)
}
