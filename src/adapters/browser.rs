use crate::config::toml_config::BrowserConfig;
use crate::domain::model::{sources, Listing};
use crate::domain::ports::{FetchContext, SourceFetcher};
use crate::utils::error::{RadarError, Result};
use crate::utils::text::{element_text, select_all, select_first};
use async_trait::async_trait;
use scraper::Html;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Semaphore;
use url::Url;

const DEFAULT_CHROME_BIN: &str = "chromium";

/// Job board that only renders results with JavaScript; scraped through headless Chromium `--dump-dom`.
pub struct BrowserBoardFetcher {
    search_url: Url,
    chrome_bin: String,
    max_queries: usize,
    timeout: Duration,
    semaphore: Semaphore,
}

impl BrowserBoardFetcher {
    pub fn new(config: &BrowserConfig) -> Result<Self> {
        let chrome_bin = config
            .chrome_bin
            .clone()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CHROME_BIN.to_string());

        tracing::debug!(
            "Browser source using {} (max_concurrent={})",
            chrome_bin,
            config.max_concurrent
        );

        Ok(Self {
            search_url: Url::parse(&config.search_url)?,
            chrome_bin,
            max_queries: config.max_queries,
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            semaphore: Semaphore::new(config.max_concurrent.max(1)),
        })
    }

    pub fn search_url_for(&self, query: &str, location: &str) -> String {
        let query = query.trim();
        let keywords = if query.to_lowercase().contains("intern") {
            query.to_string()
        } else {
            format!("{} internship", query).trim().to_string()
        };

        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("keywords", &keywords)
            .append_pair("location", location.trim());
        url.into()
    }

    async fn dump_dom(&self, ctx: &FetchContext, url: &str) -> Result<String> {
        let _permit = ctx
            .run(async { self.semaphore.acquire().await.map_err(|_| RadarError::Cancelled) })
            .await?;

        let profile_dir = tempfile::tempdir()?;
        let child = Command::new(&self.chrome_bin)
            .args([
                "--headless",
                "--no-sandbox",
                "--disable-gpu",
                "--disable-dev-shm-usage",
                &format!("--user-data-dir={}", profile_dir.path().display()),
                "--dump-dom",
                url,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RadarError::source_failure(sources::BROWSER_BOARD, format!("cannot launch {}: {}", self.chrome_bin, e))
            })?;

        // 取消或逾時時 future 被丟棄，kill_on_drop 會結束子程序
        let output = ctx
            .child(Some(self.timeout))
            .run(async { child.wait_with_output().await.map_err(RadarError::from) })
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RadarError::source_failure(
                sources::BROWSER_BOARD,
                format!(
                    "browser exited with {}: {}",
                    output.status,
                    stderr.lines().next().unwrap_or_default()
                ),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Extracts result cards from a rendered search page.
pub fn parse_cards(html: &str, limit: usize) -> Vec<Listing> {
    let document = Html::parse_document(html);
    select_all(document.root_element(), "div.base-card")
        .into_iter()
        .filter_map(|card| {
            let title = select_first(card, "h3.base-search-card__title").map(|t| element_text(&t))?;
            if title.is_empty() {
                return None;
            }
            let company = select_first(card, "h4.base-search-card__subtitle")
                .map(|c| element_text(&c))
                .unwrap_or_default();

            let mut listing = Listing::new(sources::BROWSER_BOARD, title, company)
                .with_location(
                    select_first(card, "span.job-search-card__location")
                        .map(|l| element_text(&l))
                        .unwrap_or_default(),
                )
                .with_apply_url(
                    select_first(card, "a.base-card__full-link")
                        .and_then(|a| a.value().attr("href"))
                        .unwrap_or_default(),
                );
            if let Some(posted) = select_first(card, "time").map(|t| element_text(&t)).filter(|t| !t.is_empty()) {
                listing = listing.with_posted(posted);
            }
            Some(listing)
        })
        .take(limit)
        .collect()
}

#[async_trait]
impl SourceFetcher for BrowserBoardFetcher {
    fn name(&self) -> &str {
        sources::BROWSER_BOARD
    }

    fn query_limit(&self) -> Option<usize> {
        Some(self.max_queries)
    }

    async fn fetch(&self, ctx: &FetchContext, query: &str, location: &str, limit: usize) -> Result<Vec<Listing>> {
        let url = self.search_url_for(query, location);
        tracing::debug!("🌐 Rendering {}", url);

        let html = self.dump_dom(ctx, &url).await?;
        if html.trim().is_empty() {
            tracing::warn!("Empty DOM output for {}", url);
            return Ok(Vec::new());
        }
        Ok(parse_cards(&html, limit))
    }
}
