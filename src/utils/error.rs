use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("No effective publication cycle found for source '{source_id}'")]
    CycleNotFound { source_id: String },

    #[error("Airport {icao} not found in source '{source_id}'")]
    AirportNotFound { icao: String, source_id: String },

    #[error("Failed to fetch {url}: {reason}")]
    DocumentFetchFailed { url: String, reason: String },

    #[error("Malformed URL '{href}': {reason}")]
    MalformedUrl { href: String, reason: String },

    #[error("Invalid ICAO code '{value}'")]
    InvalidIcao { value: String },

    #[error("No chart source handles ICAO code {icao}")]
    UnknownSource { icao: String },

    #[error("Resolution cancelled: {reason}")]
    Cancelled { reason: String },

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("CSV output error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Resolution,
    Network,
    Input,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ChartError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::CycleNotFound { .. } | Self::AirportNotFound { .. } | Self::MalformedUrl { .. } => {
                ErrorCategory::Resolution
            }
            Self::DocumentFetchFailed { .. } | Self::HttpClientError(_) => ErrorCategory::Network,
            Self::InvalidIcao { .. } | Self::UnknownSource { .. } | Self::Cancelled { .. } => {
                ErrorCategory::Input
            }
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::CsvError(_) | Self::IoError(_) | Self::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::MalformedUrl { .. } | Self::Cancelled { .. } => ErrorSeverity::Low,
            // transport problems usually go away when the caller retries
            Self::DocumentFetchFailed { .. } | Self::HttpClientError(_) => ErrorSeverity::Medium,
            Self::CycleNotFound { .. }
            | Self::AirportNotFound { .. }
            | Self::InvalidIcao { .. }
            | Self::UnknownSource { .. } => ErrorSeverity::High,
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::CsvError(_)
            | Self::IoError(_)
            | Self::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::CycleNotFound { source_id } => {
                format!("Could not determine the current AIRAC cycle for {source_id}")
            }
            Self::AirportNotFound { icao, source_id } => {
                format!("{icao} is not published by {source_id}")
            }
            Self::DocumentFetchFailed { url, .. } => format!("Could not download {url}"),
            Self::InvalidIcao { value } => {
                format!("'{value}' is not a valid 4-character ICAO code")
            }
            Self::UnknownSource { icao } => format!("No chart source is configured for {icao}"),
            Self::Cancelled { .. } => "The lookup was cancelled".to_string(),
            Self::ConfigValidationError { field, .. }
            | Self::InvalidConfigValueError { field, .. }
            | Self::MissingConfigError { field } => {
                format!("The source configuration is invalid ({field})")
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Resolution => {
                "The publisher may have changed its site layout; review the source configuration"
            }
            ErrorCategory::Network => "Check connectivity and retry the lookup",
            ErrorCategory::Input => "Check the ICAO code or pass --source explicitly",
            ErrorCategory::Configuration => "Fix the reported field in the sources file",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, ChartError>;
