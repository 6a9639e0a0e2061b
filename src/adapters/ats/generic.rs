use super::ats_listing;
use crate::adapters::http::HttpClient;
use crate::domain::model::{sources, Listing};
use crate::domain::ports::{AtsAdapter, FetchContext};
use crate::utils::error::Result;
use crate::utils::text::{element_text, looks_like_internship, select_all, select_first, truncate};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use url::Url;

static LOCATION_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:Location|Based in|City)[:\-\s]+([A-Za-z ,]+)").expect("location pattern is valid")
});

const HOST_PREFIXES: &[&str] = &["www", "careers", "jobs", "apply"];

const GENERIC_DESCRIPTION_MAX_CHARS: usize = 500;

/// Company name guessed from the first meaningful host label.
pub fn company_from_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .host_str()?
        .split('.')
        .find(|label| !HOST_PREFIXES.contains(label))
        .map(str::to_string)
}

/// Closest block around a link; the document body is too broad to mean anything.
fn container<'a>(anchor: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    anchor
        .parent()
        .and_then(ElementRef::wrap)
        .filter(|p| !matches!(p.value().name(), "body" | "html"))
}

fn nearby_location(anchor: &ElementRef<'_>) -> Option<String> {
    let parent = container(anchor)?;
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.id() != anchor.id())
        .chain(std::iter::once(parent))
        .find_map(|node| {
            LOCATION_HINT
                .captures(&element_text(&node))
                .map(|caps| caps[1].trim().trim_end_matches(',').to_string())
        })
}

fn nearby_description(anchor: &ElementRef<'_>) -> Option<String> {
    select_first(container(anchor)?, "p, li").map(|p| element_text(&p))
}

/// Internship-looking links on an arbitrary careers page.
pub fn parse_careers_page(html: &str, page_url: &str, limit: usize) -> Vec<Listing> {
    let base = Url::parse(page_url).ok();
    let company = company_from_host(page_url);
    let document = Html::parse_document(html);

    select_all(document.root_element(), "a[href]")
        .into_iter()
        .filter_map(|anchor| {
            let title = element_text(&anchor);
            if title.is_empty() || !looks_like_internship(&title) {
                return None;
            }
            let apply = anchor
                .value()
                .attr("href")
                .and_then(|href| base.as_ref().and_then(|b| b.join(href).ok()))
                .map(String::from)
                .unwrap_or_else(|| page_url.to_string());
            let description = nearby_description(&anchor).unwrap_or_default();
            Some(ats_listing(
                sources::GENERIC_CAREERS,
                &title,
                company.as_deref(),
                &nearby_location(&anchor).unwrap_or_default(),
                &apply,
                &truncate(&description, GENERIC_DESCRIPTION_MAX_CHARS),
            ))
        })
        .take(limit)
        .collect()
}

/// Last-resort adapter; accepts any URL.
pub struct GenericCareersAdapter {
    http: HttpClient,
}

impl GenericCareersAdapter {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AtsAdapter for GenericCareersAdapter {
    fn name(&self) -> &str {
        sources::GENERIC_CAREERS
    }

    fn can_handle(&self, _url: &str) -> bool {
        true
    }

    async fn scrape(&self, ctx: &FetchContext, url: &str, limit: usize) -> Result<Vec<Listing>> {
        let html = self.http.get_text(ctx, url).await?;
        Ok(parse_careers_page(&html, url, limit))
    }
}
