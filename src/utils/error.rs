use thiserror::Error;

#[derive(Error, Debug)]
pub enum RadarError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Source '{source_name}' failed: {message}")]
    SourceError { source_name: String, message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Fetch cancelled")]
    Cancelled,

    #[error("Fetch deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    Budget,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RadarError {
    pub fn source_failure(source_name: &str, message: impl Into<String>) -> Self {
        Self::SourceError {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            RadarError::HttpError(_) | RadarError::SourceError { .. } => ErrorCategory::Network,
            RadarError::CsvError(_)
            | RadarError::SerializationError(_)
            | RadarError::UrlError(_)
            | RadarError::ParseError { .. } => ErrorCategory::Data,
            RadarError::ConfigError { .. }
            | RadarError::InvalidConfigValueError { .. }
            | RadarError::MissingConfigError { .. } => ErrorCategory::Configuration,
            RadarError::Cancelled | RadarError::DeadlineExceeded => ErrorCategory::Budget,
            RadarError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 預算耗盡是預期中的終止條件
            ErrorCategory::Budget => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 是否為單一來源可吸收的暫時性錯誤
    pub fn is_transient(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::Budget | ErrorCategory::Data
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity or disable the failing source",
            ErrorCategory::Data => "The upstream page layout may have changed; retry later",
            ErrorCategory::Configuration => "Fix the configuration value and restart",
            ErrorCategory::Budget => "Increase search.time_budget_secs for more complete results",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RadarError::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration field '{}' is invalid: {}", field, reason)
            }
            RadarError::MissingConfigError { field } => {
                format!("Configuration field '{}' is required", field)
            }
            RadarError::ConfigError { message } => format!("Configuration problem: {}", message),
            RadarError::IoError(e) => format!("Could not read or write a file: {}", e),
            other => format!("Search failed: {}", other),
        }
    }
}

pub type Result<T> = std::result::Result<T, RadarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_errors_are_low_severity() {
        assert_eq!(RadarError::DeadlineExceeded.severity(), ErrorSeverity::Low);
        assert_eq!(RadarError::Cancelled.category(), ErrorCategory::Budget);
        assert!(RadarError::Cancelled.is_transient());
    }

    #[test]
    fn test_config_errors_are_not_transient() {
        let err = RadarError::InvalidConfigValueError {
            field: "search.result_cap".to_string(),
            value: "0".to_string(),
            reason: "Value must be at least 1".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(!err.is_transient());
        assert!(err.user_friendly_message().contains("search.result_cap"));
    }

    #[test]
    fn test_source_failure_message() {
        let err = RadarError::source_failure("lever", "HTTP 503");
        assert_eq!(err.to_string(), "Source 'lever' failed: HTTP 503");
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }
}
