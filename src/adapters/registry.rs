use crate::adapters::ats::CompanyPagesFetcher;
use crate::adapters::browser::BrowserBoardFetcher;
use crate::adapters::gov_feed::{FeedOrigin, GovFeedFetcher};
use crate::adapters::http::HttpClient;
use crate::adapters::job_board::JobBoardFetcher;
use crate::adapters::storage::LocalStorage;
use crate::config::toml_config::{GovFeedConfig, HttpConfig, RadarConfig};
use crate::domain::ports::SourceFetcher;
use crate::utils::error::Result;
use std::sync::Arc;

fn gov_feed_origin(config: &GovFeedConfig) -> Result<Option<FeedOrigin<LocalStorage>>> {
    let path = config.path.as_deref().map(str::trim).filter(|p| !p.is_empty());
    let url = config.url.as_deref().map(str::trim).filter(|u| !u.is_empty());

    Ok(match (path, url) {
        (Some(path), _) => Some(FeedOrigin::Storage {
            storage: LocalStorage::new("."),
            path: path.to_string(),
        }),
        (None, Some(url)) => Some(FeedOrigin::Remote {
            http: HttpClient::new(&HttpConfig::default())?,
            url: url.to_string(),
        }),
        (None, None) => None,
    })
}

/// Enabled sources in a fixed order. A source that cannot be constructed fails the whole build.
pub fn build_fetchers(config: &RadarConfig) -> Result<Vec<Arc<dyn SourceFetcher>>> {
    let sources = &config.sources;
    let mut fetchers: Vec<Arc<dyn SourceFetcher>> = Vec::new();

    if sources.job_board.enabled {
        fetchers.push(Arc::new(JobBoardFetcher::new(&sources.job_board)?));
    }

    if sources.browser.enabled {
        fetchers.push(Arc::new(BrowserBoardFetcher::new(&sources.browser)?));
    }

    if sources.company_pages.enabled && !sources.company_pages.urls.is_empty() {
        fetchers.push(Arc::new(CompanyPagesFetcher::new(&sources.company_pages)?));
    }

    if sources.gov_feed.enabled {
        match gov_feed_origin(&sources.gov_feed)? {
            Some(origin) => fetchers.push(Arc::new(GovFeedFetcher::new(origin, &sources.gov_feed))),
            None => tracing::debug!("Government feed enabled but no path or url configured; skipping"),
        }
    }

    let names: Vec<&str> = fetchers.iter().map(|f| f.name()).collect();
    tracing::info!("🧩 Registered {} sources: {:?}", fetchers.len(), names);
    Ok(fetchers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(fetchers: &[Arc<dyn SourceFetcher>]) -> Vec<String> {
        fetchers.iter().map(|f| f.name().to_string()).collect()
    }

    #[test]
    fn test_default_config_registers_boards_only() {
        let fetchers = build_fetchers(&RadarConfig::default()).unwrap();
        assert_eq!(names(&fetchers), vec!["internshala", "linkedin"]);
    }

    #[test]
    fn test_all_sources_when_configured() {
        let mut config = RadarConfig::default();
        config.sources.company_pages.urls = vec!["https://jobs.lever.co/acme".to_string()];
        config.sources.gov_feed.path = Some("data/gov_feeds.json".to_string());

        let fetchers = build_fetchers(&config).unwrap();
        assert_eq!(
            names(&fetchers),
            vec!["internshala", "linkedin", "company_pages", "gov"]
        );
    }

    #[test]
    fn test_disabled_sources_are_skipped() {
        let mut config = RadarConfig::default();
        config.sources.job_board.enabled = false;
        config.sources.browser.enabled = false;
        config.sources.gov_feed.url = Some("https://feeds.example.org/gov.json".to_string());

        let fetchers = build_fetchers(&config).unwrap();
        assert_eq!(names(&fetchers), vec!["gov"]);
    }

    #[test]
    fn test_invalid_base_url_fails() {
        let mut config = RadarConfig::default();
        config.sources.job_board.base_url = "not a url".to_string();
        assert!(build_fetchers(&config).is_err());
    }
}
