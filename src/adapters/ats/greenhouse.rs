use super::ats_listing;
use crate::adapters::http::HttpClient;
use crate::domain::model::{sources, Listing};
use crate::domain::ports::{AtsAdapter, FetchContext};
use crate::utils::error::Result;
use crate::utils::text::{element_text, looks_like_internship, select_all};
use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use std::sync::LazyLock;

static BOARD_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:job-)?boards\.greenhouse\.io/([^/?#]+)").expect("greenhouse pattern is valid")
});

const BOARD_HOST: &str = "https://boards.greenhouse.io";

#[derive(Debug, Default, Deserialize)]
struct GreenhouseBoard {
    #[serde(default)]
    jobs: Vec<GreenhouseJob>,
}

#[derive(Debug, Deserialize)]
struct GreenhouseJob {
    title: Option<String>,
    absolute_url: Option<String>,
    location: Option<GreenhouseLocation>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GreenhouseLocation {
    name: Option<String>,
}

pub fn company_slug(url: &str) -> Option<String> {
    BOARD_PATH.captures(url).map(|caps| caps[1].to_string())
}

pub struct GreenhouseAdapter {
    http: HttpClient,
    api_base: String,
}

impl GreenhouseAdapter {
    pub fn new(http: HttpClient, api_base: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self, company: &str) -> String {
        format!("{}/v1/boards/{}/jobs?content=true", self.api_base, company)
    }

    async fn from_api(&self, ctx: &FetchContext, company: &str, page_url: &str, limit: usize) -> Result<Vec<Listing>> {
        let board: GreenhouseBoard = self.http.get_json(ctx, &self.api_url(company)).await?;
        Ok(board
            .jobs
            .into_iter()
            .filter_map(|job| {
                let title = job.title.filter(|t| looks_like_internship(t))?;
                let location = job.location.and_then(|l| l.name).unwrap_or_default();
                Some(ats_listing(
                    sources::GREENHOUSE,
                    &title,
                    Some(company),
                    &location,
                    job.absolute_url.as_deref().unwrap_or(page_url),
                    job.content.as_deref().unwrap_or_default(),
                ))
            })
            .take(limit)
            .collect())
    }
}

/// Job links on a hosted board page; relative links resolve against the board host.
pub fn parse_board_html(html: &str, company: Option<&str>, limit: usize) -> Vec<Listing> {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let mut anchors = select_all(root, "section#jobs a[href*='/jobs/']");
    if anchors.is_empty() {
        anchors = select_all(root, "a[href*='greenhouse.io']");
    }

    anchors
        .into_iter()
        .take(limit.saturating_mul(2))
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let title = element_text(&a);
            if title.is_empty() || !looks_like_internship(&title) {
                return None;
            }
            let apply = if href.starts_with("http") {
                href.to_string()
            } else {
                format!("{}{}", BOARD_HOST, href)
            };
            Some(ats_listing(sources::GREENHOUSE, &title, company, "", &apply, ""))
        })
        .take(limit)
        .collect()
}

#[async_trait]
impl AtsAdapter for GreenhouseAdapter {
    fn name(&self) -> &str {
        sources::GREENHOUSE
    }

    fn can_handle(&self, url: &str) -> bool {
        url.contains("greenhouse.io")
    }

    async fn scrape(&self, ctx: &FetchContext, url: &str, limit: usize) -> Result<Vec<Listing>> {
        if !self.can_handle(url) {
            return Ok(Vec::new());
        }
        let company = company_slug(url);

        if let Some(company) = company.as_deref() {
            match self.from_api(ctx, company, url, limit).await {
                Ok(listings) if !listings.is_empty() => return Ok(listings),
                Ok(_) => {}
                Err(e) => tracing::debug!("Greenhouse API for {} failed: {}", company, e),
            }
        }

        let html = self.http.get_text(ctx, url).await?;
        Ok(parse_board_html(&html, company.as_deref(), limit))
    }
}
