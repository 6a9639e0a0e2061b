use crate::adapters::http::HttpClient;
use crate::config::toml_config::JobBoardConfig;
use crate::domain::model::{sources, Listing};
use crate::domain::ports::{FetchContext, SourceFetcher};
use crate::utils::error::{RadarError, Result};
use crate::utils::text::{auto_tags, element_text, normalize, select_all, select_first, select_variants, truncate};
use async_trait::async_trait;
use scraper::Html;
use std::collections::HashSet;
use url::Url;

const CARD_VARIANTS: &[&str] = &[
    "div.individual_internship",
    "div.container-fluid.individual_internship",
    "div[class*='individual_internship']",
];

const TECH_CATEGORY: &str =
    "category-computer science,information technology,software development,web development";

const DESCRIPTION_MAX_CHARS: usize = 800;

const QUERY_TECH_INDICATORS: &[&str] = &["software", "developer", "programming", "tech", "engineer", "data", "web", "mobile"];

const DOMAIN_MAPPING: &[(&str, &str)] = &[
    ("python", "python developer"),
    ("java", "java developer"),
    ("javascript", "javascript developer"),
    ("react", "react developer"),
    ("data", "data science"),
    ("ai", "artificial intelligence developer"),
    ("ml", "machine learning engineer"),
    ("web", "web developer"),
    ("mobile", "mobile app developer"),
    ("android", "android developer"),
    ("ios", "ios developer"),
];

const HIGH_VALUE_TERMS: &[&str] = &[
    "software engineer", "developer", "programming", "coding", "engineer", "computer science",
    "information technology", "technology", "software development",
];
const TECH_SKILLS: &[&str] = &[
    "python", "java", "javascript", "react", "node", "angular", "vue", "html", "css", "sql",
    "mongodb", "aws", "docker", "git", "linux",
];
const TECH_DOMAINS: &[&str] = &[
    "web development", "mobile app", "data science", "machine learning", "artificial intelligence",
    "cybersecurity", "cloud", "devops",
];
const ENTRY_LEVEL_TERMS: &[&str] = &["intern", "trainee", "fresher", "graduate", "entry level", "junior"];
const NON_TECH_TERMS: &[&str] = &[
    "sales", "marketing", "content writing", "graphic design", "finance", "hr", "human resources",
    "business development", "accounting",
];
const POPULAR_SKILLS: &[&str] = &["python", "java", "javascript", "react"];

/// Rewrites a query so the board returns tech roles.
pub fn enhance_query_for_tech(query: &str) -> String {
    let lowered = query.trim().to_lowercase();
    if QUERY_TECH_INDICATORS.iter().any(|t| lowered.contains(t)) {
        return query.trim().to_string();
    }
    if lowered.is_empty() || ["internship", "intern", "job", "work"].contains(&lowered.as_str()) {
        return "software developer internship".to_string();
    }
    let words: HashSet<&str> = lowered.split_whitespace().collect();
    if let Some((_, enhanced)) = DOMAIN_MAPPING.iter().find(|(key, _)| words.contains(key)) {
        return enhanced.to_string();
    }
    format!("software {}", query.trim())
}

/// 0–100 estimate of how technical a posting is.
pub fn tech_relevance(title: &str, description: &str, skills: &[String]) -> f64 {
    let mut content = format!("{} {}", title, description).to_lowercase();
    if !skills.is_empty() {
        content.push(' ');
        content.push_str(&skills.join(" ").to_lowercase());
    }
    let words: HashSet<&str> = content
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    // 單字詞比對整個字，片語比對子字串
    let mentions = |term: &str| {
        if term.contains(' ') {
            content.contains(term)
        } else {
            words.contains(term)
        }
    };
    let weigh = |terms: &[&str], weight: f64| terms.iter().filter(|t| mentions(t)).count() as f64 * weight;

    let score = weigh(HIGH_VALUE_TERMS, 15.0)
        + weigh(TECH_SKILLS, 8.0)
        + weigh(TECH_DOMAINS, 10.0)
        + weigh(ENTRY_LEVEL_TERMS, 5.0)
        - weigh(NON_TECH_TERMS, 10.0);
    score.clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Card {
    title: String,
    company: String,
    link: Option<String>,
    location: String,
    stipend: String,
    summary: String,
    tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Detail {
    description: Option<String>,
    skills: Vec<String>,
    posted: Option<String>,
}

fn parse_cards(html: &str, base: &Url) -> Vec<Card> {
    let document = Html::parse_document(html);
    select_variants(document.root_element(), CARD_VARIANTS)
        .into_iter()
        .map(|card| {
            let title_tag = select_first(card, "h3 a, a.view_detail_button, a[href*='/internship/']");
            let link = title_tag
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| base.join(href).ok())
                .map(String::from);

            let summary = select_first(
                card,
                ".internship_meta, .other_detail_item_row, .details, .internship_desc",
            )
            .unwrap_or(card);

            Card {
                title: title_tag
                    .map(|a| element_text(&a))
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "Internship".to_string()),
                company: select_first(
                    card,
                    "div.company_name a, div.company_name, .company_and_premium span.company-name",
                )
                .map(|c| element_text(&c))
                .unwrap_or_else(|| "Company".to_string()),
                link,
                location: select_first(card, ".locations > a, .location_link, .location, .locations span")
                    .map(|l| element_text(&l))
                    .unwrap_or_else(|| "India".to_string()),
                stipend: select_first(card, ".stipend").map(|s| element_text(&s)).unwrap_or_default(),
                summary: element_text(&summary),
                tags: select_all(card, ".tag_container .round_tabs a, .tag_container span")
                    .iter()
                    .map(|t| element_text(t).to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect(),
            }
        })
        .collect()
}

fn parse_detail(html: &str) -> Detail {
    let document = Html::parse_document(html);
    let root = document.root_element();
    Detail {
        description: select_first(root, "div.internship_details div.text-container")
            .map(|d| element_text(&d))
            .filter(|d| !d.is_empty()),
        skills: select_all(root, "div.skills span")
            .iter()
            .map(element_text)
            .filter(|s| !s.is_empty())
            .collect(),
        posted: select_first(root, "div.posted_by_container span")
            .map(|p| element_text(&p))
            .filter(|p| !p.is_empty()),
    }
}

/// HTML internship board with keyword landing pages and per-posting detail pages.
pub struct JobBoardFetcher {
    http: HttpClient,
    base_url: Url,
    detail_pages: usize,
    tech_relevance_min: f64,
}

impl JobBoardFetcher {
    pub fn new(config: &JobBoardConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let referer = base_url.join("/internships")?;
        Ok(Self {
            http: HttpClient::with_referer(&config.http, Some(referer.as_str()))?,
            base_url,
            detail_pages: config.detail_pages,
            tech_relevance_min: config.tech_relevance_min,
        })
    }

    /// Lighter keyword pages first, category filters and pagination last.
    fn candidate_urls(&self, query: &str, location: &str) -> Vec<String> {
        let dashed = |text: &str| text.split_whitespace().collect::<Vec<_>>().join("-");
        let keyword = format!("keywords-{}", dashed(query));
        let place = Some(dashed(location))
            .filter(|l| !l.is_empty())
            .map(|l| format!("in-{}", l));

        let keyword_page = vec!["internships", keyword.as_str()];
        let location_page = place.as_deref().map(|l| [&keyword_page[..], &[l]].concat());

        let mut pages = vec![keyword_page.clone()];
        pages.extend(location_page.clone());
        pages.push([&keyword_page[..], &[TECH_CATEGORY]].concat());
        pages.extend(location_page.iter().map(|p| [&p[..], &[TECH_CATEGORY]].concat()));
        for page in ["page-1", "page-2"] {
            pages.push([&keyword_page[..], &[page]].concat());
        }
        for page in ["page-1", "page-2"] {
            pages.extend(location_page.iter().map(|p| [&p[..], &[page]].concat()));
        }

        pages.iter().filter_map(|segments| self.board_url(segments)).collect()
    }

    /// 每個片段各自編碼，查詢字詞中的 `/`、`#` 不會改變路徑
    fn board_url(&self, segments: &[&str]) -> Option<String> {
        let mut url = self.base_url.clone();
        url.path_segments_mut().ok()?.pop_if_empty().extend(segments);
        Some(url.into())
    }

    async fn fetch_detail(&self, ctx: &FetchContext, url: &str) -> Detail {
        match self.http.get_text(ctx, url).await {
            Ok(html) => parse_detail(&html),
            Err(e) => {
                tracing::debug!("Detail page {} skipped: {}", url, e);
                Detail::default()
            }
        }
    }
}

#[async_trait]
impl SourceFetcher for JobBoardFetcher {
    fn name(&self) -> &str {
        sources::JOB_BOARD
    }

    async fn fetch(&self, ctx: &FetchContext, query: &str, location: &str, limit: usize) -> Result<Vec<Listing>> {
        let enhanced = enhance_query_for_tech(query);
        let mut last_err: Option<RadarError> = None;
        let mut found: Option<(String, Vec<Card>)> = None;

        for url in self.candidate_urls(&enhanced, location) {
            if ctx.is_done() {
                break;
            }
            match self.http.get_text(ctx, &url).await {
                Ok(html) => {
                    let cards = parse_cards(&html, &self.base_url);
                    if !cards.is_empty() {
                        found = Some((url, cards));
                        break;
                    }
                }
                Err(e) => last_err = Some(e),
            }
        }

        let Some((used_url, cards)) = found else {
            return match last_err {
                Some(e) => Err(e),
                None => {
                    tracing::debug!("No cards for '{}' on {}", enhanced, sources::JOB_BOARD);
                    Ok(Vec::new())
                }
            };
        };

        let mut scored: Vec<(f64, Listing)> = Vec::new();
        for (idx, card) in cards.into_iter().take(limit.saturating_mul(3)).enumerate() {
            let detail = match card.link.as_deref() {
                Some(link) if idx < self.detail_pages => self.fetch_detail(ctx, link).await,
                _ => Detail::default(),
            };

            let description = detail.description.clone().unwrap_or_else(|| card.summary.clone());
            let relevance = tech_relevance(&card.title, &description, &detail.skills);
            if relevance < self.tech_relevance_min {
                continue;
            }

            let mut listing = Listing::new(sources::JOB_BOARD, normalize(&card.title), normalize(&card.company))
                .with_location(normalize(&card.location))
                .with_stipend(card.stipend)
                .with_apply_url(card.link.unwrap_or_else(|| used_url.clone()))
                .with_description(truncate(&normalize(&description), DESCRIPTION_MAX_CHARS))
                .with_tags(card.tags)
                .with_tags(auto_tags(&format!(
                    "{} {}",
                    card.summary,
                    detail.description.as_deref().unwrap_or_default()
                )));
            if relevance >= 70.0 {
                listing.add_tag("high-tech-match");
            }
            if detail
                .skills
                .iter()
                .any(|s| POPULAR_SKILLS.contains(&s.to_lowercase().as_str()))
            {
                listing.add_tag("popular-tech");
            }
            if let Some(posted) = detail.posted {
                listing = listing.with_posted(posted);
            }

            scored.push((relevance, listing));
            if scored.len() >= limit {
                break;
            }
        }

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored.into_iter().take(limit).map(|(_, l)| l).collect())
    }
}
