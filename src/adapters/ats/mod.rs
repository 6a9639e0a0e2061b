//! Company careers pages hosted on applicant tracking systems.

pub mod generic;
pub mod greenhouse;
pub mod lever;
pub mod smartrecruiters;
pub mod workday;

use crate::adapters::cache::TtlCache;
use crate::adapters::http::HttpClient;
use crate::config::toml_config::CompanyPagesConfig;
use crate::domain::model::{sources, Listing};
use crate::domain::ports::{AtsAdapter, FetchContext, SourceFetcher};
use crate::utils::error::{RadarError, Result};
use crate::utils::text::{html_to_text, matches_query, query_terms, truncate};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

pub use generic::GenericCareersAdapter;
pub use greenhouse::GreenhouseAdapter;
pub use lever::LeverAdapter;
pub use smartrecruiters::SmartRecruitersAdapter;
pub use workday::WorkdayAdapter;

pub(crate) const DESCRIPTION_MAX_CHARS: usize = 800;

/// Common listing shape produced by every ATS adapter.
pub(crate) fn ats_listing(
    source: &str,
    title: &str,
    company: Option<&str>,
    location: &str,
    apply_url: &str,
    description: &str,
) -> Listing {
    Listing::new(source, title.trim(), company.unwrap_or_default())
        .with_location(location.trim())
        .with_apply_url(apply_url)
        .with_description(truncate(&html_to_text(description), DESCRIPTION_MAX_CHARS))
}

/// Adapters in match priority order; the generic page scraper, when enabled, goes last.
pub fn default_adapters(config: &CompanyPagesConfig) -> Result<Vec<Arc<dyn AtsAdapter>>> {
    let http = HttpClient::new(&config.http)?;
    let mut adapters: Vec<Arc<dyn AtsAdapter>> = vec![
        Arc::new(LeverAdapter::new(http.clone(), &config.lever_api)),
        Arc::new(GreenhouseAdapter::new(http.clone(), &config.greenhouse_api)),
        Arc::new(SmartRecruitersAdapter::new(http.clone(), &config.smartrecruiters_api)),
        Arc::new(WorkdayAdapter::new(http.clone())),
    ];
    if config.include_generic {
        adapters.push(Arc::new(GenericCareersAdapter::new(http)));
    }
    Ok(adapters)
}

/// Scans a fixed list of careers pages and narrows their internships to each query.
pub struct CompanyPagesFetcher {
    adapters: Vec<Arc<dyn AtsAdapter>>,
    urls: Vec<String>,
    max_per_page: usize,
    cache: TtlCache<Vec<Listing>>,
}

impl CompanyPagesFetcher {
    pub fn new(config: &CompanyPagesConfig) -> Result<Self> {
        Ok(Self::with_adapters(
            default_adapters(config)?,
            config.urls.clone(),
            config.max_per_page,
            Duration::from_secs(config.cache_ttl_secs),
        ))
    }

    pub fn with_adapters(
        adapters: Vec<Arc<dyn AtsAdapter>>,
        urls: Vec<String>,
        max_per_page: usize,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            adapters,
            urls,
            max_per_page,
            cache: TtlCache::new(cache_ttl),
        }
    }

    pub fn adapter_for(&self, url: &str) -> Option<&dyn AtsAdapter> {
        self.adapters
            .iter()
            .find(|a| a.can_handle(url))
            .map(|a| a.as_ref())
    }

    /// Scrapes one careers page; successful results are cached per URL.
    pub async fn scrape_url(&self, ctx: &FetchContext, url: &str, limit: usize) -> Result<Vec<Listing>> {
        if let Some(cached) = self.cache.get(url).await {
            return Ok(cached);
        }
        let Some(adapter) = self.adapter_for(url) else {
            tracing::debug!("No careers adapter for {}", url);
            return Ok(Vec::new());
        };

        let listings = adapter.scrape(ctx, url, limit).await?;
        tracing::debug!("🏢 {} found {} internships on {}", adapter.name(), listings.len(), url);
        self.cache.insert(url, listings.clone()).await;
        Ok(listings)
    }

    /// Never fails the batch: returns results plus the per-URL errors.
    pub async fn scrape_multiple(
        &self,
        ctx: &FetchContext,
        urls: &[String],
        limit_per_site: usize,
    ) -> (Vec<Listing>, Vec<(String, RadarError)>) {
        let results = join_all(urls.iter().map(|url| async move {
            (url.clone(), self.scrape_url(ctx, url, limit_per_site).await)
        }))
        .await;

        let mut listings = Vec::new();
        let mut errors = Vec::new();
        for (url, result) in results {
            match result {
                Ok(found) => listings.extend(found),
                Err(e) => errors.push((url, e)),
            }
        }
        (listings, errors)
    }
}

#[async_trait]
impl SourceFetcher for CompanyPagesFetcher {
    fn name(&self) -> &str {
        sources::COMPANY_PAGES
    }

    async fn fetch(&self, ctx: &FetchContext, query: &str, _location: &str, limit: usize) -> Result<Vec<Listing>> {
        if self.urls.is_empty() {
            return Ok(Vec::new());
        }

        let (listings, errors) = self.scrape_multiple(ctx, &self.urls, self.max_per_page).await;
        for (url, e) in &errors {
            tracing::debug!("Careers page {} failed: {}", url, e);
        }
        if listings.is_empty() {
            if let Some((url, e)) = errors.into_iter().next() {
                return Err(RadarError::source_failure(
                    sources::COMPANY_PAGES,
                    format!("{} ({})", e, url),
                ));
            }
        }

        let terms = query_terms(query);
        Ok(listings
            .into_iter()
            .filter(|l| matches_query(&terms, &l.search_text()))
            .take(limit)
            .collect())
    }
}
