use httpmock::prelude::*;
use intern_radar::config::toml_config::HttpConfig;
use intern_radar::{RadarConfig, ResumeProfile, SearchEngine, SearchRequest};
use std::collections::HashSet;

const BOARD_PAGE: &str = r#"
<html><body>
  <div class="individual_internship">
    <h3><a href="/internship/detail/python-backend-1">Python Backend Developer Intern</a></h3>
    <div class="company_name"><a>Acme Labs</a></div>
    <div class="locations"><a>Bangalore</a></div>
    <span class="stipend">₹ 15,000 /month</span>
    <div class="internship_meta">Software development with python and django</div>
  </div>
  <div class="individual_internship">
    <h3><a href="/internship/detail/sales-2">Sales Intern</a></h3>
    <div class="company_name">Shop Co</div>
    <div class="internship_meta">Field sales and marketing</div>
  </div>
</body></html>"#;

const DETAIL_PAGE: &str = r#"
<html><body>
  <div class="internship_details"><div class="text-container">Build REST APIs in Python.</div></div>
  <div class="skills"><span>Python</span><span>Django</span></div>
  <div class="posted_by_container"><span>Posted today</span></div>
</body></html>"#;

const CAREERS_PAGE: &str = r#"
<html><body>
  <div class="opening">
    <a href="/careers/python-intern">Python Platform Intern</a>
    <span>Location: Remote</span>
    <p>Automate deployments with Python.</p>
  </div>
  <div class="opening"><a href="/careers/cfo">Chief Financial Officer</a></div>
</body></html>"#;

fn gov_feed() -> serde_json::Value {
    serde_json::json!([
        {"title": "Python Research Intern", "org": "NIC", "state": "Delhi",
         "apply_url": "https://nic.example/apply/7", "verified": true,
         "description": "Python tooling for e-governance"},
        {"title": "Legal Intern", "org": "Law Commission", "state": "Delhi"}
    ])
}

fn quiet_http() -> HttpConfig {
    HttpConfig {
        timeout_secs: 5,
        retry_attempts: 0,
        retry_delay_ms: 10,
    }
}

fn config_for(server: &MockServer) -> RadarConfig {
    let mut config = RadarConfig::default();
    config.search.time_budget_secs = 10;
    config.sources.browser.enabled = false;

    config.sources.job_board.base_url = server.base_url();
    config.sources.job_board.http = quiet_http();

    config.sources.company_pages.urls = vec![server.url("/careers")];
    config.sources.company_pages.http = quiet_http();

    config.sources.gov_feed.url = Some(server.url("/gov_feeds.json"));
    config
}

fn profile() -> ResumeProfile {
    ResumeProfile::new(["python", "django"], ["backend"], Some("india"))
}

#[tokio::test]
async fn test_end_to_end_search_across_sources() {
    let server = MockServer::start();
    let board = server.mock(|when, then| {
        when.method(GET).path_contains("/internships/keywords-");
        then.status(200).body(BOARD_PAGE);
    });
    server.mock(|when, then| {
        when.method(GET).path_contains("/internship/detail/");
        then.status(200).body(DETAIL_PAGE);
    });
    let careers = server.mock(|when, then| {
        when.method(GET).path("/careers");
        then.status(200).body(CAREERS_PAGE);
    });
    let feed = server.mock(|when, then| {
        when.method(GET).path("/gov_feeds.json");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(gov_feed());
    });

    let engine = SearchEngine::from_config(config_for(&server), false).unwrap();
    assert_eq!(engine.source_names(), vec!["internshala", "company_pages", "gov"]);

    let report = engine
        .search(&SearchRequest::new("python", profile()))
        .await
        .unwrap();

    assert!(!report.fallback_used);
    assert!(board.hits() >= 1);
    assert!(careers.hits() >= 1);
    assert!(feed.hits() >= 1);

    let sources: HashSet<&str> = report.listings.iter().map(|l| l.source.as_str()).collect();
    assert_eq!(sources, HashSet::from(["internshala", "generic", "gov"]));

    let keys: HashSet<String> = report.listings.iter().map(|l| l.identity_key()).collect();
    assert_eq!(keys.len(), report.listings.len());
    assert!(report.listings.iter().all(|l| (0.0..=100.0).contains(&l.score)));
    assert!(report.listings.iter().all(|l| !l.title.contains("Sales")));

    let board_listing = report
        .listings
        .iter()
        .find(|l| l.source == "internshala")
        .unwrap();
    assert_eq!(board_listing.company, "Acme Labs");
    assert!(board_listing.is_new);
    assert!(board_listing.has_tag("hot"));

    let gov = report.listings.iter().find(|l| l.source == "gov").unwrap();
    assert!(gov.has_tag("government") && gov.has_tag("verified"));
}

#[tokio::test]
async fn test_all_sources_failing_yields_labeled_samples() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.any_request();
        then.status(503);
    });

    let engine = SearchEngine::from_config(config_for(&server), false).unwrap();
    let report = engine
        .search(&SearchRequest::new("python", profile()).with_location("Chennai"))
        .await
        .unwrap();

    assert!(report.fallback_used);
    assert!(!report.listings.is_empty());
    assert!(report
        .listings
        .iter()
        .all(|l| l.is_sample() && l.location == "Chennai" && l.has_tag("sample")));
}

#[tokio::test]
async fn test_budget_bounds_a_slow_upstream() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.any_request();
        then.status(200)
            .delay(std::time::Duration::from_secs(5))
            .body(BOARD_PAGE);
    });

    let mut config = config_for(&server);
    config.search.time_budget_secs = 1;
    config.fallback.enabled = false;

    let engine = SearchEngine::from_config(config, false).unwrap();
    let started = std::time::Instant::now();
    let report = engine
        .search(&SearchRequest::new("python", profile()))
        .await
        .unwrap();

    assert!(started.elapsed() < std::time::Duration::from_secs(3));
    assert!(report.listings.is_empty());
    assert!(report.stats.schedule.unwrap().abandoned > 0);
}
