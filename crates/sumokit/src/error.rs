//! Error types for collector and source operations.
//!
//! Every failure is fatal to the run: nothing here is retried. Categories
//! exist so the CLI can print the right advice next to the error.

use std::fmt;

/// Result type alias for sumokit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors for operator feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport failure (connection, DNS, timeout).
    Network,
    /// The API answered with an error status.
    Api,
    /// The collector is not registered (or not visible within the query limit).
    CollectorMissing,
    /// A source lookup by name found nothing.
    NotFound,
    /// The desired definition is malformed.
    Validation,
    /// The API returned something we could not decode.
    Format,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Api => "Sumo Logic API error",
            Self::CollectorMissing => "Collector not registered",
            Self::NotFound => "Source not found",
            Self::Validation => "Invalid source definition",
            Self::Format => "Unexpected API response",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check connectivity to the API endpoint and the configured api_timeout",
            Self::Api => "Check the access id/key and that the account may manage collectors",
            Self::CollectorMissing => "Follow the steps above to register the collector",
            Self::NotFound => "Run `sumo-source status` to list the collector's sources",
            Self::Validation => "Fix the source definition in the config file",
            Self::Format => "Verify the endpoint points at the Sumo Logic v1 API",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the collector API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The collector could not be found in the collector list.
    #[error(
        "SumoLogic Collector missing from: `{endpoint}/collectors/`\n\
         Either a SumoLogic Collector named: `{name}` does not exist, or was not returned in collector list\n\
         within the limit of `{query_limit}` collectors.\n\
         \n\
         Log into the SumoLogic WebUI and verify the collector exists.\n\
         \n\
         If the collector does exist:\n\
         \n\
         \tPlease increase the value of:\n\
         \n\
         \t\t`collector_query_limit` in the [sumologic] section of the config file\n\
         \n\
         If the collector does not exist:\n\
         \n\
         \t1. Stop the SumoCollector process:\n\
         \t\t`sudo /opt/SumoCollector/collector stop`\n\
         \n\
         \t2. Remove the SumoCollector directory.\n\
         \t\t`sudo rm -r /opt/SumoCollector`\n\
         \n\
         \t3. Reinstall the collector so it registers again, then rerun:\n\
         \t\t`sumo-source apply`\n"
    )]
    CollectorNotFound {
        /// Collector name that was searched for.
        name: String,
        /// Number of collectors requested from the list endpoint.
        query_limit: u32,
        /// API base URL.
        endpoint: String,
    },

    /// No source with this name exists on the collector.
    #[error("source not found: {name}")]
    SourceNotFound {
        /// Source name.
        name: String,
    },

    /// The desired source definition is malformed.
    #[error("invalid source definition: {field}: {message}")]
    Validation {
        /// Attribute that failed validation.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::CollectorNotFound { .. } => ErrorCategory::CollectorMissing,
            Error::SourceNotFound { .. } => ErrorCategory::NotFound,
            Error::Validation { .. } => ErrorCategory::Validation,
            Error::Http { status: Some(_), .. } => ErrorCategory::Api,
            Error::Http { status: None, .. } => ErrorCategory::Network,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// HTTP status code, if the API answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {}", code),
                status: Some(code),
            },
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> Error {
        Error::CollectorNotFound {
            name: "web-01".into(),
            query_limit: 1000,
            endpoint: "https://api.sumologic.com/api/v1".into(),
        }
    }

    #[test]
    fn test_collector_not_found_message_is_actionable() {
        let msg = not_found().to_string();
        assert!(msg.starts_with(
            "SumoLogic Collector missing from: `https://api.sumologic.com/api/v1/collectors/`"
        ));
        assert!(msg.contains("named: `web-01`"));
        assert!(msg.contains("within the limit of `1000` collectors."));
        assert!(msg.contains("\t\t`collector_query_limit`"));
        assert!(msg.contains("sudo /opt/SumoCollector/collector stop"));
        assert!(msg.contains("sudo rm -r /opt/SumoCollector"));
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(not_found().category(), ErrorCategory::CollectorMissing);
        assert_eq!(
            Error::http("HTTP 500", Some(500)).category(),
            ErrorCategory::Api
        );
        assert_eq!(
            Error::http("connection refused", None).category(),
            ErrorCategory::Network
        );
        assert_eq!(
            Error::validation("path", "must not be empty").category(),
            ErrorCategory::Validation
        );
    }

    #[test]
    fn test_status_code() {
        assert_eq!(Error::http("HTTP 404", Some(404)).status(), Some(404));
        assert_eq!(Error::Other("x".into()).status(), None);
    }

    #[test]
    fn test_from_ureq_status() {
        let err: Error = ureq::Error::StatusCode(503).into();
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.to_string(), "HTTP request failed: HTTP 503");
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Network.to_string(), "Network connectivity issue");
        assert!(!ErrorCategory::CollectorMissing.advice().is_empty());
    }
}
