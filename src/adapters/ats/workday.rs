use super::ats_listing;
use crate::adapters::http::HttpClient;
use crate::domain::model::{sources, Listing};
use crate::domain::ports::{AtsAdapter, FetchContext};
use crate::utils::error::Result;
use crate::utils::text::{element_text, looks_like_internship, select_all};
use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;
use url::Url;

static TENANT_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9\-]+)\.wd\d+\.myworkdayjobs\.com").expect("workday host pattern is valid")
});

static JOB_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/job/|/jobs/|jobId=").expect("workday link pattern is valid"));

pub fn company_slug(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    TENANT_HOST.captures(&host).map(|caps| caps[1].to_string())
}

/// Job anchors in server-rendered Workday pages.
pub fn parse_job_links(html: &str, page_url: &str, company: Option<&str>, limit: usize) -> Vec<Listing> {
    let base = Url::parse(page_url).ok();
    let document = Html::parse_document(html);

    let mut listings = Vec::new();
    for anchor in select_all(document.root_element(), "a[href]") {
        let Some(href) = anchor.value().attr("href") else { continue };
        let title = element_text(&anchor);
        if title.is_empty() || !JOB_LINK.is_match(href) || !looks_like_internship(&title) {
            continue;
        }

        let apply = base
            .as_ref()
            .and_then(|b| b.join(href).ok())
            .map(String::from)
            .unwrap_or_else(|| href.to_string());
        listings.push(ats_listing(sources::WORKDAY, &title, company, "", &apply, ""));
        if listings.len() >= limit {
            break;
        }
    }
    listings
}

pub struct WorkdayAdapter {
    http: HttpClient,
}

impl WorkdayAdapter {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AtsAdapter for WorkdayAdapter {
    fn name(&self) -> &str {
        sources::WORKDAY
    }

    fn can_handle(&self, url: &str) -> bool {
        url.to_lowercase().contains("workday")
    }

    async fn scrape(&self, ctx: &FetchContext, url: &str, limit: usize) -> Result<Vec<Listing>> {
        if !self.can_handle(url) {
            return Ok(Vec::new());
        }
        let html = self.http.get_text(ctx, url).await?;
        Ok(parse_job_links(&html, url, company_slug(url).as_deref(), limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_slug_from_tenant_host() {
        assert_eq!(
            company_slug("https://acme.wd5.myworkdayjobs.com/en-US/External"),
            Some("acme".to_string())
        );
        assert_eq!(company_slug("https://careers.acme.com/workday"), None);
    }

    #[test]
    fn test_parse_job_links() {
        let html = r#"
<ul>
  <li><a href="/en-US/External/job/Pune/Software-Intern_R123">Software Intern</a></li>
  <li><a href="/en-US/External/job/Pune/Architect_R124">Solutions Architect</a></li>
  <li><a href="/en-US/External/about">Internship programme overview</a></li>
  <li><a href="https://acme.wd5.myworkdayjobs.com/External?jobId=9">Graduate Trainee</a></li>
</ul>"#;
        let listings = parse_job_links(
            html,
            "https://acme.wd5.myworkdayjobs.com/en-US/External",
            Some("acme"),
            10,
        );
        assert_eq!(listings.len(), 2);
        assert_eq!(
            listings[0].apply_url.as_deref(),
            Some("https://acme.wd5.myworkdayjobs.com/en-US/External/job/Pune/Software-Intern_R123")
        );
        assert_eq!(listings[1].title, "Graduate Trainee");
        assert!(listings.iter().all(|l| l.company == "acme" && l.source == "workday"));
    }
}
