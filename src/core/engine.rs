use crate::adapters::registry::build_fetchers;
use crate::config::toml_config::RadarConfig;
use crate::core::dedup::dedupe;
use crate::core::expander::{QueryExpander, Taxonomy};
use crate::core::fallback::synthesize;
use crate::core::interleave::{bucket_by_source, interleave};
use crate::core::scheduler::{FetchScheduler, ScheduleStats};
use crate::core::scoring::ScoringEngine;
use crate::domain::model::{Listing, ResumeProfile};
use crate::domain::ports::SourceFetcher;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use crate::utils::validation::Validate;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Per-request pipeline stages, in order. `Fallback` is the escape edge taken when nothing survived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Expanding,
    Fetching,
    Deduping,
    Scoring,
    Interleaving,
    Fallback,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Expanding => "🔎 Expanding",
            Phase::Fetching => "🌐 Fetching",
            Phase::Deduping => "🧹 Deduping",
            Phase::Scoring => "🧮 Scoring",
            Phase::Interleaving => "🔀 Interleaving",
            Phase::Fallback => "🪂 Fallback",
            Phase::Done => "✅ Done",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    /// Overrides the profile location for this request.
    pub location: Option<String>,
    pub profile: ResumeProfile,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, profile: ResumeProfile) -> Self {
        Self {
            query: query.into(),
            location: None,
            profile,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunStats {
    pub location: String,
    pub queries: usize,
    pub fetched: usize,
    pub unique: usize,
    pub returned: usize,
    pub schedule: Option<ScheduleStats>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    pub listings: Vec<Listing>,
    /// True when every listing is a labeled sample placeholder.
    pub fallback_used: bool,
    pub stats: RunStats,
}

pub struct SearchEngine {
    config: RadarConfig,
    fetchers: Vec<Arc<dyn SourceFetcher>>,
    taxonomy: Taxonomy,
    expander: QueryExpander,
    scheduler: FetchScheduler,
    scoring: ScoringEngine,
    monitor: SystemMonitor,
}

impl SearchEngine {
    /// Validates the configuration up front; a bad config never reaches a request.
    pub fn new(config: RadarConfig, fetchers: Vec<Arc<dyn SourceFetcher>>) -> Result<Self> {
        Self::new_with_monitoring(config, fetchers, false)
    }

    pub fn new_with_monitoring(
        config: RadarConfig,
        fetchers: Vec<Arc<dyn SourceFetcher>>,
        monitor_enabled: bool,
    ) -> Result<Self> {
        config.validate()?;

        let taxonomy = match config.search.taxonomy_path.as_deref() {
            Some(path) => Taxonomy::from_path(path)?,
            None => Taxonomy::builtin(),
        };

        let monitor = SystemMonitor::new(monitor_enabled);
        if monitor.is_enabled() {
            tracing::info!("🔍 System monitoring enabled");
        }

        Ok(Self {
            expander: QueryExpander::new(config.search.taxonomy_roles),
            scheduler: FetchScheduler::new(config.search.max_workers, config.search.per_source_limit),
            scoring: ScoringEngine::new(config.scoring.clone()),
            config,
            fetchers,
            taxonomy,
            monitor,
        })
    }

    /// Engine wired with every source the configuration enables.
    pub fn from_config(config: RadarConfig, monitor_enabled: bool) -> Result<Self> {
        let fetchers = build_fetchers(&config)?;
        Self::new_with_monitoring(config, fetchers, monitor_enabled)
    }

    pub fn config(&self) -> &RadarConfig {
        &self.config
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.fetchers.iter().map(|f| f.name()).collect()
    }

    fn resolve_location(&self, request: &SearchRequest) -> String {
        request
            .location
            .as_deref()
            .or(request.profile.location())
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(self.config.search.default_location.as_str())
            .to_string()
    }

    fn enter(&self, phase: Phase, listings: usize) {
        tracing::debug!("{} ({} listings so far)", phase, listings);
        self.monitor.log_phase(&phase.to_string(), listings);
    }

    /// One aggregation run. Source failures and budget exhaustion only shrink the result.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchReport> {
        let started = Instant::now();
        let search = &self.config.search;
        let location = self.resolve_location(request);

        self.enter(Phase::Expanding, 0);
        let queries = self
            .expander
            .expand(&request.query, &request.profile, &self.taxonomy, search.max_queries);

        self.enter(Phase::Fetching, 0);
        let (fetched, schedule) = self
            .scheduler
            .run_with_stats(&queries, &location, &self.fetchers, search.time_budget(), search.result_cap)
            .await;
        let fetched_count = fetched.len();

        self.enter(Phase::Deduping, fetched_count);
        let mut listings = dedupe(fetched);
        let unique = listings.len();

        self.enter(Phase::Scoring, unique);
        self.scoring.score_all(&mut listings, &request.profile);

        self.enter(Phase::Interleaving, unique);
        let guard = &self.config.diversity;
        // 多留 guard 可能丟棄的名額，再截到輸出上限
        let merged = interleave(
            bucket_by_source(listings),
            search.output_cap.saturating_add(guard.max_suppressed),
        );
        let mut listings = guard.apply(merged);
        listings.truncate(search.output_cap);

        let mut fallback_used = false;
        if listings.is_empty() && self.config.fallback.enabled {
            self.enter(Phase::Fallback, 0);
            tracing::warn!("🪂 No live listings for '{}'; returning labeled samples", request.query);
            listings = synthesize(&queries, &location, self.config.fallback.count.min(search.output_cap));
            fallback_used = true;
        }

        self.enter(Phase::Done, listings.len());
        self.monitor.log_final_stats();

        let stats = RunStats {
            location,
            queries: queries.len(),
            fetched: fetched_count,
            unique,
            returned: listings.len(),
            schedule: Some(schedule),
            elapsed: started.elapsed(),
        };
        tracing::info!(
            "✅ Search finished: {} listings from {} fetched ({} unique) in {:?}",
            stats.returned,
            stats.fetched,
            stats.unique,
            stats.elapsed
        );

        Ok(SearchReport {
            listings,
            fallback_used,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scheduler::StopReason;
    use crate::domain::model::SAMPLE_TAG;
    use crate::domain::ports::FetchContext;
    use crate::utils::error::RadarError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns the same listings for the first query only and records the locations it saw.
    struct StaticFetcher {
        name: &'static str,
        listings: Vec<Listing>,
        seen_locations: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        fn new(name: &'static str, listings: Vec<Listing>) -> Arc<Self> {
            Arc::new(Self {
                name,
                listings,
                seen_locations: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SourceFetcher for StaticFetcher {
        fn name(&self) -> &str {
            self.name
        }

        fn query_limit(&self) -> Option<usize> {
            Some(1)
        }

        async fn fetch(&self, _ctx: &FetchContext, _query: &str, location: &str, _limit: usize) -> Result<Vec<Listing>> {
            self.seen_locations.lock().unwrap().push(location.to_string());
            Ok(self.listings.clone())
        }
    }

    struct BrokenFetcher;

    #[async_trait]
    impl SourceFetcher for BrokenFetcher {
        fn name(&self) -> &str {
            "broken"
        }

        async fn fetch(&self, _ctx: &FetchContext, _query: &str, _location: &str, _limit: usize) -> Result<Vec<Listing>> {
            Err(RadarError::source_failure("broken", "upstream returned 500"))
        }
    }

    fn profile() -> ResumeProfile {
        ResumeProfile::new(["python", "react"], ["backend"], Some("india"))
    }

    fn fast_config() -> RadarConfig {
        let mut config = RadarConfig::default();
        config.search.time_budget_secs = 5;
        config
    }

    #[tokio::test]
    async fn test_duplicate_across_sources_collapses_to_one_top_listing() {
        let a = StaticFetcher::new(
            "a",
            vec![Listing::new("a", "Backend Intern", "Acme")
                .with_description("python django")
                .with_apply_url("https://x/1")
                .with_location("India")],
        );
        let b = StaticFetcher::new(
            "b",
            vec![Listing::new("b", "Backend Intern", "Acme")
                .with_description("python django")
                .with_apply_url("HTTPS://X/1?utm=1")
                .with_location("India")],
        );

        let sources: Vec<Arc<dyn SourceFetcher>> = vec![a, b];
        let engine = SearchEngine::new(fast_config(), sources).unwrap();
        let report = engine.search(&SearchRequest::new("python", profile())).await.unwrap();

        assert!(!report.fallback_used);
        assert_eq!(report.stats.fetched, 2);
        assert_eq!(report.listings.len(), 1);
        assert_eq!(report.listings[0].score, 100.0);
        assert!(report.listings[0].has_tag("hot"));
        assert_eq!(report.stats.schedule.as_ref().unwrap().stop_reason, StopReason::AllTasksFinished);
    }

    #[tokio::test]
    async fn test_empty_pipeline_falls_back_to_samples() {
        let sources: Vec<Arc<dyn SourceFetcher>> = vec![Arc::new(BrokenFetcher)];
        let engine = SearchEngine::new(fast_config(), sources).unwrap();
        let report = engine.search(&SearchRequest::new("rust", ResumeProfile::default())).await.unwrap();

        assert!(report.fallback_used);
        assert!(!report.listings.is_empty());
        assert!(report.listings.len() <= 5);
        assert!(report.listings.iter().all(|l| l.is_sample() && l.has_tag(SAMPLE_TAG)));
        assert_eq!(report.listings[0].location, "India");
    }

    #[tokio::test]
    async fn test_fallback_can_be_disabled() {
        let mut config = fast_config();
        config.fallback.enabled = false;
        let engine = SearchEngine::new(config, Vec::new()).unwrap();
        let report = engine.search(&SearchRequest::new("rust", ResumeProfile::default())).await.unwrap();

        assert!(!report.fallback_used);
        assert!(report.listings.is_empty());
    }

    #[tokio::test]
    async fn test_location_precedence() {
        let fetcher = StaticFetcher::new("a", Vec::new());
        let mut config = fast_config();
        config.fallback.enabled = false;
        let sources: Vec<Arc<dyn SourceFetcher>> = vec![fetcher.clone()];
        let engine = SearchEngine::new(config, sources).unwrap();

        engine
            .search(&SearchRequest::new("data", profile()).with_location("Pune"))
            .await
            .unwrap();
        engine.search(&SearchRequest::new("data", profile())).await.unwrap();
        engine
            .search(&SearchRequest::new("data", ResumeProfile::default()))
            .await
            .unwrap();

        let seen = fetcher.seen_locations.lock().unwrap().clone();
        assert_eq!(seen, vec!["Pune", "india", "India"]);
    }

    #[tokio::test]
    async fn test_sources_are_interleaved_and_capped() {
        let many: Vec<Listing> = (0..6)
            .map(|i| {
                Listing::new("a", format!("Role{} Intern", i), "Acme")
                    .with_apply_url(format!("https://a/{}", i))
                    .with_description("python")
            })
            .collect();
        let few = vec![Listing::new("b", "Solo Intern", "Beta").with_apply_url("https://b/1")];

        let mut config = fast_config();
        config.search.output_cap = 4;
        let sources: Vec<Arc<dyn SourceFetcher>> =
            vec![StaticFetcher::new("a", many), StaticFetcher::new("b", few)];
        let engine = SearchEngine::new(config, sources).unwrap();
        let report = engine.search(&SearchRequest::new("python", profile())).await.unwrap();

        let sources: Vec<&str> = report.listings.iter().map(|l| l.source.as_str()).collect();
        assert_eq!(sources, vec!["a", "b", "a", "a"]);
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut config = RadarConfig::default();
        config.search.max_workers = 0;
        assert!(SearchEngine::new(config, Vec::new()).is_err());

        let mut config = RadarConfig::default();
        config.search.taxonomy_path = Some("/nonexistent/taxonomy.csv".to_string());
        assert!(matches!(
            SearchEngine::new(config, Vec::new()),
            Err(RadarError::IoError(_))
        ));
    }

    #[test]
    fn test_phase_labels() {
        assert_eq!(Phase::Fallback.to_string(), "🪂 Fallback");
        assert_eq!(Phase::Done.to_string(), "✅ Done");
    }
}
