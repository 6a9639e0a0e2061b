use crate::core::interleave::RoleDiversityGuard;
use crate::core::scoring::ScoringWeights;
use crate::utils::error::{RadarError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    pub search: SearchConfig,
    pub scoring: ScoringWeights,
    pub diversity: RoleDiversityGuard,
    pub fallback: FallbackConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_location: String,
    pub max_queries: usize,
    pub taxonomy_roles: usize,
    pub taxonomy_path: Option<String>,
    pub max_workers: usize,
    pub per_source_limit: usize,
    pub time_budget_secs: u64,
    pub result_cap: usize,
    pub output_cap: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_location: "India".to_string(),
            max_queries: 6,
            taxonomy_roles: 5,
            taxonomy_path: None,
            max_workers: 6,
            per_source_limit: 12,
            time_budget_secs: 25,
            result_cap: 200,
            output_cap: 50,
        }
    }
}

impl SearchConfig {
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,
    pub count: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            count: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub job_board: JobBoardConfig,
    pub browser: BrowserConfig,
    pub company_pages: CompanyPagesConfig,
    pub gov_feed: GovFeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            retry_attempts: 3,
            retry_delay_ms: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobBoardConfig {
    pub enabled: bool,
    pub base_url: String,
    pub detail_pages: usize,
    pub tech_relevance_min: f64,
    pub http: HttpConfig,
}

impl Default for JobBoardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://internshala.com".to_string(),
            detail_pages: 3,
            tech_relevance_min: 8.0,
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub enabled: bool,
    pub search_url: String,
    pub chrome_bin: Option<String>,
    /// Only the first N candidate queries reach this source.
    pub max_queries: usize,
    pub max_concurrent: usize,
    pub timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_url: "https://www.linkedin.com/jobs/search/".to_string(),
            chrome_bin: None,
            max_queries: 2,
            max_concurrent: 2,
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyPagesConfig {
    pub enabled: bool,
    /// Careers pages to scan for every query.
    pub urls: Vec<String>,
    pub include_generic: bool,
    pub max_per_page: usize,
    pub cache_ttl_secs: u64,
    pub lever_api: String,
    pub greenhouse_api: String,
    pub smartrecruiters_api: String,
    pub http: HttpConfig,
}

impl Default for CompanyPagesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            urls: Vec::new(),
            include_generic: true,
            max_per_page: 20,
            cache_ttl_secs: 300,
            lever_api: "https://api.lever.co".to_string(),
            greenhouse_api: "https://boards-api.greenhouse.io".to_string(),
            smartrecruiters_api: "https://api.smartrecruiters.com".to_string(),
            http: HttpConfig {
                timeout_secs: 12,
                retry_attempts: 1,
                ..HttpConfig::default()
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GovFeedConfig {
    pub enabled: bool,
    /// Local JSON array; read through the storage port.
    pub path: Option<String>,
    /// Remote JSON array; used when no path is set.
    pub url: Option<String>,
    pub only_verified: bool,
    pub state: Option<String>,
    pub cache_ttl_secs: u64,
}

impl Default for GovFeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            url: None,
            only_verified: false,
            state: None,
            cache_ttl_secs: 300,
        }
    }
}

impl RadarConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RadarError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed = Self::substitute_env_vars(content);

        toml::from_str(&processed).map_err(|e| RadarError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CHROME_BIN})，未設定者原樣保留
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 套用環境變數覆寫
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    pub(crate) fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("RADAR_DISABLE_BROWSER") {
            if is_truthy(&value) {
                tracing::debug!("Browser source disabled by RADAR_DISABLE_BROWSER");
                self.sources.browser.enabled = false;
            }
        }

        if let Some(value) = lookup("CHROME_BIN").filter(|v| !v.trim().is_empty()) {
            self.sources.browser.chrome_bin = Some(value);
        }

        if let Some(value) = lookup("RADAR_TIME_BUDGET_SECS") {
            self.search.time_budget_secs =
                value.trim().parse().map_err(|_| RadarError::InvalidConfigValueError {
                    field: "RADAR_TIME_BUDGET_SECS".to_string(),
                    value: value.clone(),
                    reason: "Expected a whole number of seconds".to_string(),
                })?;
        }

        if let Some(value) = lookup("RADAR_TECH_RELEVANCE_MIN") {
            self.sources.job_board.tech_relevance_min =
                value.trim().parse().map_err(|_| RadarError::InvalidConfigValueError {
                    field: "RADAR_TECH_RELEVANCE_MIN".to_string(),
                    value: value.clone(),
                    reason: "Expected a number".to_string(),
                })?;
        }

        Ok(())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        let search = &self.search;
        validate_non_empty_string("search.default_location", &search.default_location)?;
        validate_positive_number("search.max_queries", search.max_queries, 1)?;
        validate_positive_number("search.max_workers", search.max_workers, 1)?;
        validate_positive_number("search.per_source_limit", search.per_source_limit, 1)?;
        validate_positive_number("search.time_budget_secs", search.time_budget_secs as usize, 1)?;
        validate_positive_number("search.result_cap", search.result_cap, 1)?;
        validate_positive_number("search.output_cap", search.output_cap, 1)?;

        validate_range("scoring.hot_threshold", self.scoring.hot_threshold, 0.0, 100.0)?;
        validate_range("scoring.base", self.scoring.base, 0.0, 100.0)?;

        if self.fallback.enabled {
            validate_positive_number("fallback.count", self.fallback.count, 1)?;
            if self.fallback.count > search.output_cap {
                return Err(RadarError::InvalidConfigValueError {
                    field: "fallback.count".to_string(),
                    value: self.fallback.count.to_string(),
                    reason: format!("Value must not exceed search.output_cap ({})", search.output_cap),
                });
            }
        }

        let sources = &self.sources;
        if sources.job_board.enabled {
            validate_url("sources.job_board.base_url", &sources.job_board.base_url)?;
            validate_range(
                "sources.job_board.tech_relevance_min",
                sources.job_board.tech_relevance_min,
                0.0,
                100.0,
            )?;
        }
        if sources.browser.enabled {
            validate_url("sources.browser.search_url", &sources.browser.search_url)?;
            validate_positive_number("sources.browser.max_concurrent", sources.browser.max_concurrent, 1)?;
        }
        if sources.company_pages.enabled {
            for url in &sources.company_pages.urls {
                validate_url("sources.company_pages.urls", url)?;
            }
            validate_url("sources.company_pages.lever_api", &sources.company_pages.lever_api)?;
            validate_url("sources.company_pages.greenhouse_api", &sources.company_pages.greenhouse_api)?;
            validate_url(
                "sources.company_pages.smartrecruiters_api",
                &sources.company_pages.smartrecruiters_api,
            )?;
        }
        if let Some(path) = sources.gov_feed.path.as_deref() {
            validate_path("sources.gov_feed.path", path)?;
        }
        if let Some(url) = sources.gov_feed.url.as_deref() {
            validate_url("sources.gov_feed.url", url)?;
        }
        if let Some(path) = search.taxonomy_path.as_deref() {
            validate_path("search.taxonomy_path", path)?;
        }

        Ok(())
    }
}

impl Validate for RadarConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
