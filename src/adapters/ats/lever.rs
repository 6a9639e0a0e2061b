use super::ats_listing;
use crate::adapters::http::HttpClient;
use crate::domain::model::{sources, Listing};
use crate::domain::ports::{AtsAdapter, FetchContext};
use crate::utils::error::Result;
use crate::utils::text::{element_text, looks_like_internship, select_all, select_first};
use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::LazyLock;

static BOARD_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:jobs\.)?lever\.co/([^/?#]+)").expect("lever path pattern is valid"));

static BOARD_SUBDOMAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://([a-z0-9\-]+)\.lever\.co").expect("lever host pattern is valid"));

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeverPosting {
    text: Option<String>,
    hosted_url: Option<String>,
    apply_url: Option<String>,
    categories: Option<LeverCategories>,
    description_plain: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LeverCategories {
    location: Option<String>,
}

pub fn company_slug(url: &str) -> Option<String> {
    BOARD_PATH
        .captures(url)
        .or_else(|| BOARD_SUBDOMAIN.captures(url))
        .map(|caps| caps[1].to_string())
}

/// Lever boards: public postings API first, board HTML when the API has nothing.
pub struct LeverAdapter {
    http: HttpClient,
    api_base: String,
}

impl LeverAdapter {
    pub fn new(http: HttpClient, api_base: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self, company: &str) -> String {
        format!("{}/v0/postings/{}?mode=json", self.api_base, company)
    }

    async fn from_api(&self, ctx: &FetchContext, company: &str, page_url: &str, limit: usize) -> Result<Vec<Listing>> {
        let postings: Vec<LeverPosting> = self.http.get_json(ctx, &self.api_url(company)).await?;
        Ok(postings
            .into_iter()
            .take(limit)
            .filter_map(|p| {
                let title = p.text.filter(|t| looks_like_internship(t))?;
                let apply = p.hosted_url.or(p.apply_url).unwrap_or_else(|| page_url.to_string());
                let description = p.description_plain.or(p.description).unwrap_or_default();
                let location = p.categories.and_then(|c| c.location).unwrap_or_default();
                Some(ats_listing(
                    sources::LEVER,
                    &title,
                    Some(company),
                    &location,
                    &apply,
                    &description,
                ))
            })
            .collect())
    }
}

/// Postings embedded in a Lever board page.
pub fn parse_board_html(html: &str, company: Option<&str>, limit: usize) -> Vec<Listing> {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let page_location = select_first(root, ".location, .locations, [data-qa='location']").map(|l| element_text(&l));

    let mut seen = HashSet::new();
    let mut listings = Vec::new();
    for posting in select_all(root, ".posting, .lever, a[href*='lever.co']")
        .into_iter()
        .take(limit.saturating_mul(2))
    {
        let anchor = if posting.value().name() == "a" {
            Some(posting)
        } else {
            select_first(posting, "a")
        };
        let Some(anchor) = anchor else { continue };
        let Some(href) = anchor.value().attr("href") else { continue };

        let title = element_text(&anchor);
        if title.is_empty() || !looks_like_internship(&title) || !seen.insert(href) {
            continue;
        }

        let location = select_first(posting, ".posting-categories, .sort-by-location, .location")
            .map(|l| element_text(&l))
            .or_else(|| page_location.clone())
            .unwrap_or_default();

        listings.push(ats_listing(sources::LEVER, &title, company, &location, href, ""));
        if listings.len() >= limit {
            break;
        }
    }
    listings
}

#[async_trait]
impl AtsAdapter for LeverAdapter {
    fn name(&self) -> &str {
        sources::LEVER
    }

    fn can_handle(&self, url: &str) -> bool {
        url.contains("lever.co")
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
                Err(e) => tracing::debug!("Lever API for {} failed: {}", company, e),
            }
        }

        let html = self.http.get_text(ctx, url).await?;
        Ok(parse_board_html(&html, company.as_deref(), limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::HttpConfig;
    use httpmock::prelude::*;
    use std::time::Duration;

    #[test]
    fn test_company_slug() {
        assert_eq!(company_slug("https://jobs.lever.co/acme/123"), Some("acme".to_string()));
        assert_eq!(company_slug("https://globex.lever.co"), Some("globex".to_string()));
        assert_eq!(company_slug("https://example.com/careers"), None);
    }

    #[test]
    fn test_parse_board_html() {
        let html = r#"
<div class="posting">
  <a href="https://jobs.lever.co/acme/1">Software Engineering Intern</a>
  <div class="posting-categories">Bengaluru</div>
</div>
<div class="posting"><a href="https://jobs.lever.co/acme/2">Staff Engineer</a></div>
<div class="posting"><span>No link</span></div>"#;
        let listings = parse_board_html(html, Some("acme"), 10);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].title, "Software Engineering Intern");
        assert_eq!(listings[0].location, "Bengaluru");
        assert_eq!(listings[0].company, "acme");
    }

    #[tokio::test]
    async fn test_scrape_uses_postings_api() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v0/postings/acme").query_param("mode", "json");
            then.status(200).json_body(serde_json::json!([
                {
                    "text": "Backend Intern",
                    "hostedUrl": "https://jobs.lever.co/acme/abc",
                    "categories": {"location": "Remote"},
                    "descriptionPlain": "Work on Python services"
                },
                {"text": "Senior Backend Engineer", "hostedUrl": "https://jobs.lever.co/acme/def"}
            ]));
        });

        let http = HttpClient::new(&HttpConfig::default()).unwrap();
        let adapter = LeverAdapter::new(http, &server.base_url());
        let ctx = FetchContext::with_budget(Duration::from_secs(5));
        let listings = adapter.scrape(&ctx, "https://jobs.lever.co/acme", 10).await.unwrap();

        mock.assert();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].source, "lever");
        assert_eq!(listings[0].apply_url.as_deref(), Some("https://jobs.lever.co/acme/abc"));
        assert_eq!(listings[0].location, "Remote");
        assert_eq!(listings[0].description, "Work on Python services");
    }

    #[tokio::test]
    async fn test_unrecognized_url_returns_empty() {
        let http = HttpClient::new(&HttpConfig::default()).unwrap();
        let adapter = LeverAdapter::new(http, "http://127.0.0.1:1");
        let ctx = FetchContext::with_budget(Duration::from_secs(1));
        assert!(adapter.scrape(&ctx, "https://example.com/jobs", 10).await.unwrap().is_empty());
    }
}
