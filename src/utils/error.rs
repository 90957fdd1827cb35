use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

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

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Page structure not found: {message}")]
    StructuralError { message: String },

    #[error("Transient fetch failure for {url}: {message}")]
    TransientFetchError { url: String, message: String },

    #[error("Fetch rejected for {url}: {message}")]
    PermanentFetchError { url: String, message: String },

    #[error("Page not found: {url}")]
    PageNotFound { url: String },

    #[error("Season verification failed: expected {expected}, {message}")]
    VerificationFailure { expected: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    PageStructure,
    Verification,
    Storage,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn config(message: impl Into<String>) -> Self {
        EtlError::ConfigError {
            message: message.into(),
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        EtlError::StructuralError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::UrlError(_) => ErrorCategory::Configuration,
            EtlError::ApiError(_)
            | EtlError::TransientFetchError { .. }
            | EtlError::PermanentFetchError { .. }
            | EtlError::PageNotFound { .. } => ErrorCategory::Network,
            EtlError::StructuralError { .. } => ErrorCategory::PageStructure,
            EtlError::VerificationFailure { .. } => ErrorCategory::Verification,
            EtlError::IoError(_) | EtlError::CsvError(_) => ErrorCategory::Storage,
            EtlError::SerializationError(_) | EtlError::ProcessingError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    /// Severity drives the CLI exit code. Entity-scoped problems are never Critical.
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Verification | ErrorCategory::PageStructure => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, EtlError::TransientFetchError { .. })
            || matches!(self, EtlError::ApiError(e) if e.is_timeout() || e.is_connect())
    }

    /// Short reason recorded against a team in the failure reports.
    pub fn entity_reason(&self) -> String {
        match self {
            EtlError::TransientFetchError { message, .. } => format!("transient: {}", message),
            EtlError::PermanentFetchError { message, .. } => format!("permanent: {}", message),
            EtlError::PageNotFound { .. } => "not found".to_string(),
            EtlError::VerificationFailure { expected, message } => {
                format!("expected season {}, {}", expected, message)
            }
            EtlError::StructuralError { message } => format!("structure: {}", message),
            EtlError::ProcessingError { message } => message.clone(),
            other if other.category() == ErrorCategory::Configuration => {
                format!("configuration: {}", other)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the team table and run configuration (platform, url_format, season)"
            }
            ErrorCategory::Network => "Re-run the fetch-failed teams later or raise http.retry_attempts",
            ErrorCategory::PageStructure => {
                "The site layout changed or the team uses a different platform; review its platform setting"
            }
            ErrorCategory::Verification => {
                "The site did not show the requested season; check the season URL format for this team"
            }
            ErrorCategory::Storage => "Check that the output path exists and is writable",
            ErrorCategory::Processing => "Inspect the logs with --verbose for the failing record",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::MissingConfigError { field } => {
                format!("Configuration is missing the required field '{}'", field)
            }
            EtlError::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration field '{}' is invalid: {}", field, reason)
            }
            EtlError::ConfigValidationError { field, message } => {
                format!("Configuration could not be loaded ({}): {}", field, message)
            }
            EtlError::IoError(e) => format!("File operation failed: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_scoped_errors_are_not_critical() {
        assert!(EtlError::structural("no roster table").severity() < ErrorSeverity::Critical);
        let verify = EtlError::VerificationFailure {
            expected: "2024-25".to_string(),
            message: "no season token".to_string(),
        };
        assert_eq!(verify.category(), ErrorCategory::Verification);
        assert_eq!(verify.severity(), ErrorSeverity::Low);
    }

    #[test]
    fn test_config_errors_are_critical() {
        let err = EtlError::MissingConfigError {
            field: "run.season".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().contains("run.season"));
    }

    #[test]
    fn test_entity_reasons() {
        let not_found = EtlError::PageNotFound {
            url: "https://example.edu/roster".to_string(),
        };
        assert_eq!(not_found.entity_reason(), "not found");
        assert_eq!(not_found.category(), ErrorCategory::Network);

        let rejected = EtlError::PermanentFetchError {
            url: "https://example.edu/roster".to_string(),
            message: "HTTP 403 Forbidden".to_string(),
        };
        assert_eq!(rejected.entity_reason(), "permanent: HTTP 403 Forbidden");
        assert!(!rejected.is_transient());

        let stale = EtlError::VerificationFailure {
            expected: "2024-25".to_string(),
            message: "found 2023-24".to_string(),
        };
        assert_eq!(stale.entity_reason(), "expected season 2024-25, found 2023-24");

        assert!(EtlError::config("unknown platform 'presto'")
            .entity_reason()
            .starts_with("configuration:"));
        assert_eq!(EtlError::structural("no roster table").entity_reason(), "structure: no roster table");
    }

    #[test]
    fn test_transient_detection() {
        let err = EtlError::TransientFetchError {
            url: "https://example.edu".to_string(),
            message: "503".to_string(),
        };
        assert!(err.is_transient());
        assert!(!EtlError::config("bad").is_transient());
    }
}
