use crate::domain::model::{CandidateQuery, Listing};
use crate::domain::ports::{FetchContext, SourceFetcher};
use crate::utils::error::RadarError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why the scheduler stopped waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    AllTasksFinished,
    ResultCapReached,
    BudgetExhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleStats {
    pub tasks: usize,
    pub workers: usize,
    pub completed: usize,
    pub failed: usize,
    pub abandoned: usize,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct FetchScheduler {
    max_workers: usize,
    per_source_limit: usize,
}

impl FetchScheduler {
    pub fn new(max_workers: usize, per_source_limit: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            per_source_limit,
        }
    }

    /// Best-effort fan-out of queries × sources. Returns whatever finished inside `budget`.
    pub async fn run(
        &self,
        queries: &[CandidateQuery],
        location: &str,
        sources: &[Arc<dyn SourceFetcher>],
        budget: Duration,
        result_cap: usize,
    ) -> Vec<Listing> {
        self.run_with_stats(queries, location, sources, budget, result_cap)
            .await
            .0
    }

    pub async fn run_with_stats(
        &self,
        queries: &[CandidateQuery],
        location: &str,
        sources: &[Arc<dyn SourceFetcher>],
        budget: Duration,
        result_cap: usize,
    ) -> (Vec<Listing>, ScheduleStats) {
        let started = Instant::now();
        let deadline = started + budget;
        let cancel = CancellationToken::new();

        let tasks = build_tasks(queries, sources);
        let workers = tasks.len().min(self.max_workers).max(1);
        let semaphore = Arc::new(Semaphore::new(workers));
        let location: Arc<str> = Arc::from(location);

        tracing::info!(
            "🚀 Dispatching {} fetch tasks on {} workers (budget {:?}, cap {})",
            tasks.len(),
            workers,
            budget,
            result_cap
        );

        let mut join_set: JoinSet<(String, Result<Vec<Listing>, RadarError>)> = JoinSet::new();
        let total_tasks = tasks.len();
        for (query, source) in tasks {
            let ctx = FetchContext::new(cancel.child_token(), deadline);
            let semaphore = Arc::clone(&semaphore);
            let location = Arc::clone(&location);
            let limit = self.per_source_limit;

            join_set.spawn(async move {
                let name = source.name().to_string();
                let result = ctx
                    .run(async {
                        // 等待 worker 名額時同樣受 deadline 約束
                        let _permit = semaphore.acquire().await.map_err(|_| RadarError::Cancelled)?;
                        source.fetch(&ctx, &query, &location, limit).await
                    })
                    .await;
                (name, result)
            });
        }

        let mut collected: Vec<Listing> = Vec::new();
        let mut completed = 0usize;
        let mut failed = 0usize;
        let stop_reason = loop {
            if result_cap > 0 && collected.len() >= result_cap {
                break StopReason::ResultCapReached;
            }

            tokio::select! {
                biased;
                _ = tokio::time::sleep_until(deadline) => break StopReason::BudgetExhausted,
                joined = join_set.join_next() => match joined {
                    None => break StopReason::AllTasksFinished,
                    Some(Ok((source, Ok(listings)))) => {
                        completed += 1;
                        tracing::debug!("✅ {} returned {} listings", source, listings.len());
                        collected.extend(listings);
                    }
                    Some(Ok((source, Err(e)))) => {
                        failed += 1;
                        match e {
                            RadarError::Cancelled | RadarError::DeadlineExceeded => {
                                tracing::debug!("⏱️ {} stopped: {}", source, e)
                            }
                            other => tracing::warn!("⚠️ {} failed: {}", source, other),
                        }
                    }
                    Some(Err(join_err)) => {
                        failed += 1;
                        if join_err.is_panic() {
                            tracing::warn!("💥 A fetch task panicked; treating it as empty");
                        } else {
                            tracing::debug!("Fetch task aborted: {}", join_err);
                        }
                    }
                },
            }
        };

        // 不等待落後的任務，直接取消並丟棄
        let abandoned = join_set.len();
        cancel.cancel();
        join_set.abort_all();
        join_set.detach_all();

        let stats = ScheduleStats {
            tasks: total_tasks,
            workers,
            completed,
            failed,
            abandoned,
            stop_reason,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            "📥 Collected {} listings ({} ok, {} failed, {} abandoned, stop: {:?}) in {:?}",
            collected.len(),
            completed,
            failed,
            abandoned,
            stop_reason,
            stats.elapsed
        );

        (collected, stats)
    }
}

/// Cross product of queries and sources, honoring each source's query limit.
fn build_tasks(
    queries: &[CandidateQuery],
    sources: &[Arc<dyn SourceFetcher>],
) -> Vec<(String, Arc<dyn SourceFetcher>)> {
    let mut tasks = Vec::new();
    for (idx, query) in queries.iter().enumerate() {
        for source in sources {
            if source.query_limit().is_some_and(|k| idx >= k) {
                continue;
            }
            tasks.push((query.as_str().to_string(), Arc::clone(source)));
        }
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource {
        name: &'static str,
        per_call: usize,
        delay: Duration,
        query_limit: Option<usize>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn new(name: &'static str, per_call: usize, delay: Duration) -> Self {
            Self {
                name,
                per_call,
                delay,
                query_limit: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SourceFetcher for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        fn query_limit(&self) -> Option<usize> {
            self.query_limit
        }

        async fn fetch(&self, _ctx: &FetchContext, query: &str, location: &str, _limit: usize) -> Result<Vec<Listing>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok((0..self.per_call)
                .map(|i| Listing::new(self.name, format!("{} {} Intern {}", self.name, query, i), "Acme").with_location(location))
                .collect())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl SourceFetcher for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self, _ctx: &FetchContext, _q: &str, _l: &str, _limit: usize) -> Result<Vec<Listing>> {
            Err(RadarError::source_failure("failing", "HTTP 503"))
        }
    }

    struct PanickingSource;

    #[async_trait]
    impl SourceFetcher for PanickingSource {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn fetch(&self, _ctx: &FetchContext, _q: &str, _l: &str, _limit: usize) -> Result<Vec<Listing>> {
            panic!("selector blew up")
        }
    }

    fn queries(n: usize) -> Vec<CandidateQuery> {
        (0..n).map(|i| CandidateQuery::new(format!("q{}", i))).collect()
    }

    #[tokio::test]
    async fn test_collects_all_tasks() {
        let scheduler = FetchScheduler::new(4, 10);
        let sources: Vec<Arc<dyn SourceFetcher>> = vec![
            Arc::new(StaticSource::new("a", 2, Duration::ZERO)),
            Arc::new(StaticSource::new("b", 1, Duration::ZERO)),
        ];
        let (listings, stats) = scheduler
            .run_with_stats(&queries(3), "India", &sources, Duration::from_secs(5), 100)
            .await;
        assert_eq!(listings.len(), 9);
        assert_eq!(stats.tasks, 6);
        assert_eq!(stats.completed, 6);
        assert_eq!(stats.stop_reason, StopReason::AllTasksFinished);
    }

    #[tokio::test]
    async fn test_budget_is_respected_with_slow_sources() {
        let scheduler = FetchScheduler::new(4, 10);
        let sources: Vec<Arc<dyn SourceFetcher>> = vec![
            Arc::new(StaticSource::new("fast", 1, Duration::ZERO)),
            Arc::new(StaticSource::new("slow", 1, Duration::from_secs(30))),
        ];
        let started = std::time::Instant::now();
        let (listings, stats) = scheduler
            .run_with_stats(&queries(2), "India", &sources, Duration::from_millis(200), 100)
            .await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(listings.len(), 2);
        assert!(listings.iter().all(|l| l.source == "fast"));
        assert_eq!(stats.stop_reason, StopReason::BudgetExhausted);
        assert_eq!(stats.abandoned, 2);
    }

    #[tokio::test]
    async fn test_failures_and_panics_contribute_nothing() {
        let scheduler = FetchScheduler::new(2, 10);
        let sources: Vec<Arc<dyn SourceFetcher>> = vec![
            Arc::new(FailingSource),
            Arc::new(PanickingSource),
            Arc::new(StaticSource::new("ok", 1, Duration::ZERO)),
        ];
        let (listings, stats) = scheduler
            .run_with_stats(&queries(2), "India", &sources, Duration::from_secs(5), 100)
            .await;
        assert_eq!(listings.len(), 2);
        assert_eq!(stats.failed, 4);
        assert_eq!(stats.completed, 2);
    }

    #[tokio::test]
    async fn test_result_cap_stops_early() {
        let scheduler = FetchScheduler::new(1, 10);
        let sources: Vec<Arc<dyn SourceFetcher>> = vec![Arc::new(StaticSource::new(
            "chatty",
            5,
            Duration::from_millis(50),
        ))];
        let (listings, stats) = scheduler
            .run_with_stats(&queries(10), "India", &sources, Duration::from_secs(10), 8)
            .await;
        assert_eq!(stats.stop_reason, StopReason::ResultCapReached);
        assert!(listings.len() >= 8 && listings.len() < 50);
        assert!(stats.elapsed < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_query_limit_restricts_heavy_source() {
        let heavy = Arc::new(StaticSource {
            query_limit: Some(2),
            ..StaticSource::new("heavy", 1, Duration::ZERO)
        });
        let sources: Vec<Arc<dyn SourceFetcher>> = vec![heavy.clone(), Arc::new(StaticSource::new("light", 1, Duration::ZERO))];
        let scheduler = FetchScheduler::new(6, 10);
        let listings = scheduler
            .run(&queries(5), "India", &sources, Duration::from_secs(5), 100)
            .await;
        assert_eq!(heavy.calls.load(Ordering::SeqCst), 2);
        assert_eq!(listings.len(), 7);
    }

    #[tokio::test]
    async fn test_no_sources_returns_empty() {
        let scheduler = FetchScheduler::new(4, 10);
        let listings = scheduler
            .run(&queries(3), "India", &[], Duration::from_secs(1), 10)
            .await;
        assert!(listings.is_empty());
    }
}
