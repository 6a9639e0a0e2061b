use crate::domain::model::{CandidateQuery, ResumeProfile};
use crate::utils::error::{RadarError, Result};
use crate::utils::text::normalize;
use std::io::Read;
use std::path::Path;

pub const FALLBACK_QUERY: &str = "internship";

/// Roles/skill words that mark a taxonomy hint as tech relevant.
const TECH_INDICATORS: &[&str] = &[
    "software", "developer", "engineer", "programmer", "programming", "data", "web", "mobile",
    "android", "ios", "cloud", "devops", "security", "cyber", "network", "database", "frontend",
    "backend", "full stack", "machine learning", "artificial intelligence", "ai", "ml", "it",
    "qa", "testing", "ui/ux", "analyst", "embedded", "blockchain",
];

const DEFAULT_ROLE_HINTS: &[&str] = &[
    "software developer",
    "web developer",
    "data analyst",
    "machine learning",
    "frontend developer",
    "backend developer",
    "full stack developer",
    "mobile app developer",
    "cloud engineer",
    "cybersecurity",
];

const DEFAULT_SKILLS: &[&str] = &[
    "python", "java", "javascript", "typescript", "react", "node", "sql", "mongodb", "aws",
    "docker", "git", "linux", "html", "css", "c++", "machine learning", "django", "flask",
];

/// Curated skill and role vocabulary used to widen searches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Taxonomy {
    skills: Vec<String>,
    role_hints: Vec<String>,
}

impl Taxonomy {
    pub fn new<S, R>(skills: S, role_hints: R) -> Self
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let mut taxonomy = Self::default();
        for skill in skills {
            push_unique(&mut taxonomy.skills, skill.as_ref());
        }
        for role in role_hints {
            push_unique(&mut taxonomy.role_hints, role.as_ref());
        }
        taxonomy
    }

    pub fn builtin() -> Self {
        Self::new(DEFAULT_SKILLS.iter(), DEFAULT_ROLE_HINTS.iter())
    }

    /// 從 CSV 載入（`Required_Skills` 與 `Role_Hints` 欄位，儲存格內以逗號分隔）
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let skills_idx = headers.iter().position(|h| h.trim() == "Required_Skills");
        let roles_idx = headers.iter().position(|h| h.trim() == "Role_Hints");

        if skills_idx.is_none() && roles_idx.is_none() {
            return Err(RadarError::ParseError {
                message: "taxonomy CSV needs a Required_Skills or Role_Hints column".to_string(),
            });
        }

        let mut taxonomy = Self::default();
        for record in csv_reader.records() {
            let record = record?;
            if let Some(cell) = skills_idx.and_then(|i| record.get(i)) {
                for skill in cell.split(',') {
                    push_unique(&mut taxonomy.skills, skill);
                }
            }
            if let Some(cell) = roles_idx.and_then(|i| record.get(i)) {
                for role in cell.split(',') {
                    push_unique(&mut taxonomy.role_hints, role);
                }
            }
        }

        tracing::debug!(
            "📚 Loaded taxonomy: {} skills, {} role hints",
            taxonomy.skills.len(),
            taxonomy.role_hints.len()
        );
        Ok(taxonomy)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn skills(&self) -> &[String] {
        &self.skills
    }

    pub fn role_hints(&self) -> &[String] {
        &self.role_hints
    }

    pub fn tech_role_hints(&self) -> impl Iterator<Item = &String> {
        self.role_hints.iter().filter(|r| is_tech_relevant(r))
    }
}

fn push_unique(target: &mut Vec<String>, value: &str) {
    let value = normalize(value).to_lowercase();
    if !value.is_empty() && !target.contains(&value) {
        target.push(value);
    }
}

pub fn is_tech_relevant(term: &str) -> bool {
    let lowered = term.to_lowercase();
    TECH_INDICATORS.iter().any(|indicator| {
        if indicator.contains(' ') || indicator.contains('/') {
            lowered.contains(indicator)
        } else {
            // 單字需以詞首比對，避免 "ai" 命中 "retail"
            lowered
                .split(|c: char| !c.is_alphanumeric() && c != '+')
                .any(|token| token == *indicator || (indicator.len() >= 4 && token.starts_with(indicator)))
        }
    })
}

#[derive(Debug, Clone)]
pub struct QueryExpander {
    taxonomy_roles: usize,
}

impl Default for QueryExpander {
    fn default() -> Self {
        Self::new(5)
    }
}

impl QueryExpander {
    pub fn new(taxonomy_roles: usize) -> Self {
        Self { taxonomy_roles }
    }

    /// Builds the prioritized search set: user intent, resume, taxonomy, then the fallback term.
    /// The fallback term is kept only while there is room, so the set is never empty.
    pub fn expand(
        &self,
        user_query: &str,
        profile: &ResumeProfile,
        taxonomy: &Taxonomy,
        max_queries: usize,
    ) -> Vec<CandidateQuery> {
        let mut queries: Vec<CandidateQuery> = Vec::new();
        let mut add = |query: String| {
            let candidate = CandidateQuery::new(query);
            if !candidate.as_str().is_empty() && !queries.contains(&candidate) {
                queries.push(candidate);
            }
        };

        add(normalize(user_query));

        for role in profile.roles().iter().take(2) {
            add(format!("{} internship", role));
        }

        if !profile.skills().is_empty() {
            let top_skills: Vec<&str> = profile.skills().iter().take(3).map(String::as_str).collect();
            add(format!("{} internship", top_skills.join(" ")));
        }

        for role in taxonomy.tech_role_hints().take(self.taxonomy_roles) {
            add(format!("{} internship", role));
        }

        add(FALLBACK_QUERY.to_string());
        queries.truncate(max_queries.max(1));

        tracing::debug!("🔎 Expanded into {} candidate queries: {:?}", queries.len(), queries);
        queries
    }
}
