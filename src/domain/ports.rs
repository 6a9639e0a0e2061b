use crate::domain::model::Listing;
use crate::utils::error::{RadarError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(&self, path: &str, data: &[u8]) -> impl Future<Output = Result<()>> + Send;
}

/// Cancellation signal plus wall-clock deadline handed to every fetch.
#[derive(Debug, Clone)]
pub struct FetchContext {
    cancel: CancellationToken,
    deadline: Instant,
}

impl FetchContext {
    pub fn new(cancel: CancellationToken, deadline: Instant) -> Self {
        Self { cancel, deadline }
    }

    pub fn with_budget(budget: Duration) -> Self {
        Self::new(CancellationToken::new(), Instant::now() + budget)
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || Instant::now() >= self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Child context: cancelled with the parent, never outlives its deadline.
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let deadline = match timeout {
            Some(t) => self.deadline.min(Instant::now() + t),
            None => self.deadline,
        };
        Self::new(self.cancel.child_token(), deadline)
    }

    /// Races `fut` against cancellation and the deadline; the loser is dropped.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RadarError::Cancelled),
            _ = tokio::time::sleep_until(self.deadline) => Err(RadarError::DeadlineExceeded),
            result = fut => result,
        }
    }
}

/// One origin of listings. Implementations must honor `ctx` and never panic on bad input.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Stable source name; also the scoring bucket key.
    fn name(&self) -> &str;

    /// Restricts an expensive source to the first K candidate queries.
    fn query_limit(&self) -> Option<usize> {
        None
    }

    async fn fetch(
        &self,
        ctx: &FetchContext,
        query: &str,
        location: &str,
        limit: usize,
    ) -> Result<Vec<Listing>>;
}

/// Per-company careers page adapter, selected by URL shape.
#[async_trait]
pub trait AtsAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn can_handle(&self, url: &str) -> bool;

    /// Returns an empty list for URLs this adapter does not recognize.
    async fn scrape(&self, ctx: &FetchContext, url: &str, limit: usize) -> Result<Vec<Listing>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_returns_deadline_exceeded() {
        let ctx = FetchContext::with_budget(Duration::from_millis(20));
        let result: Result<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(RadarError::DeadlineExceeded)));
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn test_run_observes_parent_cancellation() {
        let parent = FetchContext::with_budget(Duration::from_secs(5));
        let child = parent.child(None);
        parent.cancel();
        let result: Result<u8> = child.run(std::future::pending()).await;
        assert!(matches!(result, Err(RadarError::Cancelled)));
    }

    #[tokio::test]
    async fn test_child_timeout_never_extends_deadline() {
        let parent = FetchContext::with_budget(Duration::from_millis(50));
        let child = parent.child(Some(Duration::from_secs(60)));
        assert_eq!(child.deadline(), parent.deadline());
        let shorter = parent.child(Some(Duration::from_millis(1)));
        assert!(shorter.deadline() <= parent.deadline());
    }

    #[tokio::test]
    async fn test_run_passes_through_result() {
        let ctx = FetchContext::with_budget(Duration::from_secs(1));
        let value = ctx.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert!(ctx.remaining() > Duration::ZERO);
    }
}
