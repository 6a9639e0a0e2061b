use serde::{Deserialize, Serialize};

/// Source identifiers shared by fetchers, scoring buckets and the fallback path.
pub mod sources {
    pub const JOB_BOARD: &str = "internshala";
    pub const BROWSER_BOARD: &str = "linkedin";
    pub const LEVER: &str = "lever";
    pub const GREENHOUSE: &str = "greenhouse";
    pub const SMART_RECRUITERS: &str = "smartrecruiters";
    pub const WORKDAY: &str = "workday";
    pub const GENERIC_CAREERS: &str = "generic";
    pub const COMPANY_PAGES: &str = "company_pages";
    pub const GOV_FEED: &str = "gov";
    pub const SAMPLE: &str = "sample";
}

pub const HOT_TAG: &str = "hot";
pub const SAMPLE_TAG: &str = "sample";

/// Read-only snapshot of what the caller knows about the candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeProfile {
    skills: Vec<String>,
    roles: Vec<String>,
    location: Option<String>,
}

impl ResumeProfile {
    pub fn new<S, R>(skills: S, roles: R, location: Option<&str>) -> Self
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let location = location
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty());

        Self {
            skills: lowercase_unique(skills),
            roles: lowercase_unique(roles),
            location,
        }
    }

    pub fn skills(&self) -> &[String] {
        &self.skills
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty() && self.roles.is_empty() && self.location.is_none()
    }
}

// 保留輸入順序，排在前面的技能視為較重要
fn lowercase_unique<I>(items: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let value = item.as_ref().trim().to_lowercase();
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateQuery(String);

impl CandidateQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self(query.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CandidateQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub source: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub stipend: Option<String>,
    pub apply_url: Option<String>,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted: Option<String>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub score: f64,
}

impl Listing {
    pub fn new(source: &str, title: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            title: title.into(),
            company: company.into(),
            location: String::new(),
            stipend: None,
            apply_url: None,
            description: String::new(),
            tags: Vec::new(),
            posted: None,
            is_new: false,
            score: 0.0,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_apply_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.apply_url = if url.trim().is_empty() { None } else { Some(url) };
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_stipend(mut self, stipend: impl Into<String>) -> Self {
        let stipend = stipend.into();
        self.stipend = if stipend.trim().is_empty() { None } else { Some(stipend) };
        self
    }

    pub fn with_posted(mut self, posted: impl Into<String>) -> Self {
        self.posted = Some(posted.into());
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        for tag in tags {
            self.add_tag(tag);
        }
        self
    }

    /// Tags behave as an ordered set.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !tag.is_empty() && !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_sample(&self) -> bool {
        self.source == sources::SAMPLE
    }

    /// Dedup identity: apply URL without query/fragment, else title + company.
    pub fn identity_key(&self) -> String {
        match self.apply_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => {
                let end = url.find(['?', '#']).unwrap_or(url.len());
                url[..end].to_lowercase()
            }
            _ => format!(
                "{}|{}",
                self.title.trim().to_lowercase(),
                self.company.trim().to_lowercase()
            ),
        }
    }

    /// Text used for relevance matching.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.description).to_lowercase()
    }
}
