use crate::config::toml_config::RadarConfig;
use crate::domain::model::ResumeProfile;
use crate::utils::error::{RadarError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_positive_number, Validate};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "intern-radar")]
#[command(about = "Search internship listings across job boards, careers pages and government feeds")]
pub struct CliArgs {
    /// What to look for, e.g. "python backend"
    pub query: String,

    #[arg(long, help = "Search location (defaults to the profile location, then the configured default)")]
    pub location: Option<String>,

    #[arg(long, value_delimiter = ',', help = "Resume skills, most important first")]
    pub skills: Vec<String>,

    #[arg(long, value_delimiter = ',', help = "Preferred roles")]
    pub roles: Vec<String>,

    #[arg(long)]
    pub profile_location: Option<String>,

    #[arg(long, help = "Path to a radar.toml configuration file")]
    pub config: Option<String>,

    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    #[arg(long, help = "Write results to this file instead of stdout")]
    pub output: Option<String>,

    #[arg(long, help = "Overall time budget in seconds")]
    pub budget_secs: Option<u64>,

    #[arg(long, help = "Return an empty result instead of sample listings")]
    pub no_fallback: bool,

    #[arg(long, help = "Skip the headless browser source")]
    pub no_browser: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory per phase")]
    pub monitor: bool,
}

impl CliArgs {
    pub fn profile(&self) -> ResumeProfile {
        ResumeProfile::new(&self.skills, &self.roles, self.profile_location.as_deref())
    }

    /// Flags win over the file and the environment.
    pub fn apply_to(&self, config: &mut RadarConfig) {
        if let Some(budget) = self.budget_secs {
            config.search.time_budget_secs = budget;
        }
        if self.no_fallback {
            config.fallback.enabled = false;
        }
        if self.no_browser {
            config.sources.browser.enabled = false;
        }
    }
}

impl Validate for CliArgs {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("query", &self.query)?;
        if let Some(budget) = self.budget_secs {
            validate_positive_number("budget-secs", budget as usize, 1)?;
        }
        if let Some(output) = self.output.as_deref() {
            if output.trim().is_empty() {
                return Err(RadarError::InvalidConfigValueError {
                    field: "output".to_string(),
                    value: output.to_string(),
                    reason: "Output path cannot be blank".to_string(),
                });
            }
        }
        Ok(())
    }
}
