use crate::adapters::cache::TtlCache;
use crate::adapters::http::HttpClient;
use crate::config::toml_config::GovFeedConfig;
use crate::domain::model::{sources, Listing};
use crate::domain::ports::{FetchContext, SourceFetcher, Storage};
use crate::utils::error::Result;
use crate::utils::text::{matches_query, query_terms};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const UNPAID_MARKERS: &[&str] = &["0", "unpaid", "none", "na", "n/a"];
const NATIONWIDE: &[&str] = &["india", "remote", "pan india", "all india", "anywhere"];

/// One entry of the government internship feed. Every field is optional upstream.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GovItem {
    pub title: Option<String>,
    pub org: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub state: Option<String>,
    pub stipend: Option<String>,
    pub apply_url: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub verified: bool,
    pub is_new: bool,
    pub posted: Option<String>,
}

/// Where the feed comes from.
pub enum FeedOrigin<S: Storage> {
    Storage { storage: S, path: String },
    Remote { http: HttpClient, url: String },
}

impl<S: Storage> FeedOrigin<S> {
    fn key(&self) -> &str {
        match self {
            FeedOrigin::Storage { path, .. } => path,
            FeedOrigin::Remote { url, .. } => url,
        }
    }
}

/// Decodes a feed body; anything but a JSON array is treated as empty, bad entries are skipped.
pub fn parse_feed(body: &[u8]) -> Vec<GovItem> {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        Ok(_) => Vec::new(),
        Err(e) => {
            tracing::warn!("Government feed is not valid JSON: {}", e);
            Vec::new()
        }
    }
}

/// Absolute dates become relative text so freshness tagging can read them.
pub fn posted_text(raw: &str, today: NaiveDate) -> String {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()));

    match date.map(|d| (today - d).num_days()) {
        Some(0) => "today".to_string(),
        Some(1) => "1 day ago".to_string(),
        Some(days) if days > 1 => format!("{} days ago", days),
        _ => raw.to_string(),
    }
}

fn stipend_of(item: &GovItem) -> Option<String> {
    item.stipend
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !UNPAID_MARKERS.contains(&s.to_lowercase().as_str()))
        .map(str::to_string)
}

fn in_location(item: &GovItem, location: &str) -> bool {
    let wanted = location.trim().to_lowercase();
    if wanted.is_empty() || NATIONWIDE.contains(&wanted.as_str()) {
        return true;
    }
    let places: Vec<String> = [item.state.as_deref(), item.location.as_deref()]
        .into_iter()
        .flatten()
        .map(str::to_lowercase)
        .collect();

    places.is_empty()
        || places
            .iter()
            .any(|p| p.contains(&wanted) || NATIONWIDE.iter().any(|n| p.contains(n)))
}

fn to_listing(item: &GovItem, default_location: &str, today: NaiveDate) -> Listing {
    let company = item
        .org
        .clone()
        .or_else(|| item.department.clone())
        .unwrap_or_else(|| "Government".to_string());
    let location = item
        .location
        .clone()
        .or_else(|| item.state.clone())
        .unwrap_or_else(|| default_location.to_string());

    let mut listing = Listing::new(
        sources::GOV_FEED,
        item.title.clone().unwrap_or_else(|| "Internship".to_string()),
        company,
    )
    .with_location(location)
    .with_description(item.description.clone().unwrap_or_default())
    .with_tags(["government"])
    .with_tags(item.tags.iter().map(|t| t.to_lowercase()));

    if let Some(url) = item.apply_url.as_deref().or(item.url.as_deref()) {
        listing = listing.with_apply_url(url);
    }
    if let Some(stipend) = stipend_of(item) {
        listing = listing.with_stipend(stipend);
    }
    if let Some(posted) = item.posted.as_deref() {
        listing = listing.with_posted(posted_text(posted, today));
    }
    if item.verified {
        listing.add_tag("verified");
    }
    listing.is_new = item.is_new;
    listing
}

/// Curated government internships from a JSON file or URL, cached in memory.
pub struct GovFeedFetcher<S: Storage> {
    origin: FeedOrigin<S>,
    only_verified: bool,
    state: Option<String>,
    cache: TtlCache<Arc<Vec<GovItem>>>,
}

impl<S: Storage> GovFeedFetcher<S> {
    pub fn new(origin: FeedOrigin<S>, config: &GovFeedConfig) -> Self {
        Self {
            origin,
            only_verified: config.only_verified,
            state: config.state.clone().filter(|s| !s.trim().is_empty()),
            cache: TtlCache::new(Duration::from_secs(config.cache_ttl_secs)),
        }
    }

    pub async fn load(&self, ctx: &FetchContext) -> Result<Arc<Vec<GovItem>>> {
        let key = self.origin.key();
        if let Some(items) = self.cache.get(key).await {
            return Ok(items);
        }

        let body = match &self.origin {
            FeedOrigin::Storage { storage, path } => ctx.run(storage.read_file(path)).await?,
            FeedOrigin::Remote { http, url } => http.get_text(ctx, url).await?.into_bytes(),
        };

        let items = Arc::new(parse_feed(&body));
        tracing::debug!("🏛️ Loaded {} government feed items from {}", items.len(), key);
        self.cache.insert(key, Arc::clone(&items)).await;
        Ok(items)
    }

    fn keep(&self, item: &GovItem) -> bool {
        if self.only_verified && !item.verified {
            return false;
        }
        match self.state.as_deref() {
            Some(state) => item
                .state
                .as_deref()
                .is_some_and(|s| s.trim().eq_ignore_ascii_case(state.trim())),
            None => true,
        }
    }
}

#[async_trait]
impl<S: Storage + 'static> SourceFetcher for GovFeedFetcher<S> {
    fn name(&self) -> &str {
        sources::GOV_FEED
    }

    async fn fetch(&self, ctx: &FetchContext, query: &str, location: &str, limit: usize) -> Result<Vec<Listing>> {
        let items = self.load(ctx).await?;
        let terms = query_terms(query);
        let today = Utc::now().date_naive();
        let default_location = self.state.as_deref().unwrap_or("India");

        let mut listings: Vec<Listing> = items
            .iter()
            .filter(|item| self.keep(item))
            .filter(|item| self.state.is_some() || in_location(item, location))
            .map(|item| to_listing(item, default_location, today))
            .filter(|l| matches_query(&terms, &format!("{} {}", l.search_text(), l.tags.join(" "))))
            .collect();

        // 已驗證的排前面，其餘維持原順序
        listings.sort_by_key(|l| !l.has_tag("verified"));
        listings.truncate(limit);
        Ok(listings)
    }
}
