use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error(
        "No available courses for {major} transfer from {source_institution} to {target_institution}"
    )]
    NoAvailableCourses {
        major: String,
        source_institution: String,
        target_institution: String,
    },

    #[error("External schedule generator failed: {reason}")]
    ExternalGeneratorFailure { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Network,
    Data,
    Generator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PlannerError {
    pub fn generator(reason: impl Into<String>) -> Self {
        PlannerError::ExternalGeneratorFailure {
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PlannerError::ConfigError { .. }
            | PlannerError::InvalidConfigValueError { .. }
            | PlannerError::MissingConfigError { .. } => ErrorCategory::Configuration,
            PlannerError::IoError(_)
            | PlannerError::CsvError(_)
            | PlannerError::ValidationError { .. } => ErrorCategory::Input,
            PlannerError::HttpError(_) => ErrorCategory::Network,
            PlannerError::SerializationError(_) | PlannerError::NoAvailableCourses { .. } => {
                ErrorCategory::Data
            }
            PlannerError::ExternalGeneratorFailure { .. } => ErrorCategory::Generator,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 生成器失敗時一定會退回規則式排程
            PlannerError::ExternalGeneratorFailure { .. } => ErrorSeverity::Low,
            PlannerError::HttpError(_) => ErrorSeverity::Medium,
            PlannerError::NoAvailableCourses { .. }
            | PlannerError::ValidationError { .. }
            | PlannerError::CsvError(_)
            | PlannerError::SerializationError(_) => ErrorSeverity::High,
            PlannerError::ConfigError { .. }
            | PlannerError::InvalidConfigValueError { .. }
            | PlannerError::MissingConfigError { .. }
            | PlannerError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            PlannerError::NoAvailableCourses {
                major,
                source_institution,
                target_institution,
            } => format!(
                "Verify that an articulation agreement for {} exists between {} and {}, and that the major name matches the publisher's listing",
                major, source_institution, target_institution
            ),
            PlannerError::ExternalGeneratorFailure { .. } => {
                "The deterministic schedule was used instead; check the generator endpoint and API key".to_string()
            }
            PlannerError::HttpError(_) => {
                "Check network connectivity and retry the request".to_string()
            }
            PlannerError::CsvError(_) => {
                "Completed-course files need a header row: code,term,year,grade".to_string()
            }
            PlannerError::SerializationError(_) => {
                "Make sure the agreement snapshot is valid JSON".to_string()
            }
            PlannerError::IoError(_) => "Check that the file exists and is readable".to_string(),
            PlannerError::ConfigError { .. }
            | PlannerError::InvalidConfigValueError { .. }
            | PlannerError::MissingConfigError { .. } => {
                "Review the planner configuration file and command line flags".to_string()
            }
            PlannerError::ValidationError { .. } => "Correct the input and try again".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PlannerError::NoAvailableCourses {
                major,
                source_institution,
                target_institution,
            } => format!(
                "No remaining courses were found for {} ({} → {}). All listed courses may already be completed, or the agreement could not be read.",
                major, source_institution, target_institution
            ),
            PlannerError::ExternalGeneratorFailure { reason } => {
                format!("The AI schedule generator was unavailable: {}", reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;
