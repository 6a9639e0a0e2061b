use super::ats_listing;
use crate::adapters::http::HttpClient;
use crate::domain::model::{sources, Listing};
use crate::domain::ports::{AtsAdapter, FetchContext};
use crate::utils::error::Result;
use crate::utils::text::looks_like_internship;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static CAREERS_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:careers|jobs)\.smartrecruiters\.com/([^/?#]+)").expect("smartrecruiters pattern is valid")
});

#[derive(Debug, Default, Deserialize)]
struct PostingPage {
    #[serde(default)]
    content: Vec<Posting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Posting {
    name: Option<String>,
    #[serde(rename = "ref")]
    reference: Option<String>,
    apply_url: Option<String>,
    location: Option<PostingLocation>,
    job_ad: Option<JobAd>,
}

#[derive(Debug, Deserialize)]
struct PostingLocation {
    city: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobAd {
    sections: Option<JobAdSections>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobAdSections {
    job_description: Option<JobAdSection>,
}

#[derive(Debug, Deserialize)]
struct JobAdSection {
    text: Option<String>,
}

impl Posting {
    fn description(&self) -> &str {
        self.job_ad
            .as_ref()
            .and_then(|ad| ad.sections.as_ref())
            .and_then(|s| s.job_description.as_ref())
            .and_then(|d| d.text.as_deref())
            .unwrap_or_default()
    }
}

pub fn company_slug(url: &str) -> Option<String> {
    CAREERS_PATH.captures(url).map(|caps| caps[1].to_string())
}

/// SmartRecruiters has no useful HTML board; only the postings API is read.
pub struct SmartRecruitersAdapter {
    http: HttpClient,
    api_base: String,
}

impl SmartRecruitersAdapter {
    pub fn new(http: HttpClient, api_base: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self, company: &str, limit: usize) -> String {
        format!(
            "{}/v1/companies/{}/postings?released=true&limit={}",
            self.api_base,
            company,
            limit.clamp(10, 100)
        )
    }
}

#[async_trait]
impl AtsAdapter for SmartRecruitersAdapter {
    fn name(&self) -> &str {
        sources::SMART_RECRUITERS
    }

    fn can_handle(&self, url: &str) -> bool {
        url.contains("smartrecruiters.com")
    }

    async fn scrape(&self, ctx: &FetchContext, url: &str, limit: usize) -> Result<Vec<Listing>> {
        let Some(company) = company_slug(url) else {
            return Ok(Vec::new());
        };

        let page: PostingPage = self.http.get_json(ctx, &self.api_url(&company, limit)).await?;
        Ok(page
            .content
            .iter()
            .filter_map(|p| {
                let title = p.name.as_deref().map(str::trim).filter(|t| looks_like_internship(t))?;
                let apply = p
                    .apply_url
                    .as_deref()
                    .or(p.reference.as_deref())
                    .unwrap_or(url);
                let city = p
                    .location
                    .as_ref()
                    .and_then(|l| l.city.as_deref())
                    .unwrap_or_default();
                Some(ats_listing(
                    sources::SMART_RECRUITERS,
                    title,
                    Some(&company),
                    city,
                    apply,
                    p.description(),
                ))
            })
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::HttpConfig;
    use httpmock::prelude::*;
    use std::time::Duration;

    #[test]
    fn test_api_url_clamps_limit() {
        let http = HttpClient::new(&HttpConfig::default()).unwrap();
        let adapter = SmartRecruitersAdapter::new(http, "https://api.smartrecruiters.com/");
        assert_eq!(
            adapter.api_url("Acme", 3),
            "https://api.smartrecruiters.com/v1/companies/Acme/postings?released=true&limit=10"
        );
        assert!(adapter.api_url("Acme", 500).ends_with("limit=100"));
    }

    #[tokio::test]
    async fn test_scrape_reads_postings() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/companies/Acme/postings")
                .query_param("released", "true");
            then.status(200).json_body(serde_json::json!({
                "content": [
                    {
                        "name": "QA Trainee",
                        "ref": "https://api.smartrecruiters.com/v1/companies/Acme/postings/1",
                        "location": {"city": "Chennai"},
                        "jobAd": {"sections": {"jobDescription": {"text": "<ul><li>Selenium</li></ul>"}}}
                    },
                    {"name": "Finance Director", "ref": "https://api.smartrecruiters.com/x/2"}
                ]
            }));
        });

        let http = HttpClient::new(&HttpConfig::default()).unwrap();
        let adapter = SmartRecruitersAdapter::new(http, &server.base_url());
        let ctx = FetchContext::with_budget(Duration::from_secs(5));
        let listings = adapter
            .scrape(&ctx, "https://careers.smartrecruiters.com/Acme", 10)
            .await
            .unwrap();

        mock.assert();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].title, "QA Trainee");
        assert_eq!(listings[0].location, "Chennai");
        assert_eq!(listings[0].description, "Selenium");
    }

    #[tokio::test]
    async fn test_unknown_company_url_is_empty() {
        let http = HttpClient::new(&HttpConfig::default()).unwrap();
        let adapter = SmartRecruitersAdapter::new(http, "http://127.0.0.1:1");
        let ctx = FetchContext::with_budget(Duration::from_secs(1));
        let listings = adapter.scrape(&ctx, "https://www.smartrecruiters.com/", 10).await.unwrap();
        assert!(listings.is_empty());
    }
}
