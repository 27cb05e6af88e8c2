//! Error types for IoT Central API operations.
//!
//! Errors are categorized so callers can decide whether a failure is worth
//! retrying and what kind of feedback to show. The reconciliation engine
//! reports every category identically; only the optional retry decorator
//! looks at [`ErrorCategory::is_retryable`].

use std::fmt;

/// Result type alias for IoT Central operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of API errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network-related errors, throttling and server faults (transient, retryable).
    Network,
    /// Entity does not exist.
    NotFound,
    /// Entity already exists or an ETag precondition failed.
    Conflict,
    /// Token rejected or caller lacks permission.
    Auth,
    /// The request body was rejected by the application.
    Validation,
    /// Unexpected response payload.
    Format,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::NotFound => "Entity not found",
            Self::Conflict => "Entity conflict",
            Self::Auth => "Not authorized",
            Self::Validation => "Request rejected",
            Self::Format => "Invalid response format",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your connection to the application and try again",
            Self::NotFound => "The entity may have been deleted outside of this tool",
            Self::Conflict => "An entity with this ID already exists or was changed concurrently",
            Self::Auth => "Refresh your Azure login and check your role in the application",
            Self::Validation => "Check the declared attribute values",
            Self::Format => "The application returned a payload this client does not understand",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to an IoT Central application.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed with a status code or at the transport level.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// The requested entity does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Entity kind, e.g. "device".
        kind: &'static str,
        /// Entity ID.
        id: String,
    },

    /// The entity already exists or was modified concurrently.
    #[error("conflict on {kind} {id}: {message}")]
    Conflict {
        /// Entity kind.
        kind: &'static str,
        /// Entity ID.
        id: String,
        /// Detail reported by the application.
        message: String,
    },

    /// No role matches the requested display name.
    #[error("no role named {0:?}")]
    RoleNotFound(String),

    /// A user record exists under the ID but is of a different user type.
    #[error("user {id} is a {actual} user, expected {expected}")]
    UserTypeMismatch {
        /// User ID.
        id: String,
        /// Expected user type discriminator.
        expected: &'static str,
        /// Actual user type discriminator.
        actual: String,
    },

    /// The application host could not be turned into a base URL.
    #[error("invalid application host: {0:?}")]
    InvalidHost(String),

    /// The bearer token is empty.
    #[error("missing bearer token")]
    MissingToken,

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Create a not-found error.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(kind: &'static str, id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            id: id.into(),
            message: message.into(),
        }
    }

    /// Attach entity context to a raw HTTP failure.
    ///
    /// 404 becomes [`Error::NotFound`] and 409/412 become [`Error::Conflict`];
    /// everything else is returned unchanged.
    #[must_use]
    pub fn for_entity(self, kind: &'static str, id: &str) -> Self {
        match self {
            Self::Http {
                status: Some(404), ..
            } => Self::not_found(kind, id),
            Self::Http {
                status: Some(code @ (409 | 412)),
                message,
            } => Self::conflict(kind, id, format!("{message} (HTTP {code})")),
            other => other,
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Http { status, .. } => match status {
                None | Some(429 | 500..=599) => ErrorCategory::Network,
                Some(404) => ErrorCategory::NotFound,
                Some(409 | 412) => ErrorCategory::Conflict,
                Some(401 | 403) => ErrorCategory::Auth,
                Some(400 | 422) => ErrorCategory::Validation,
                Some(_) => ErrorCategory::Other,
            },
            Error::NotFound { .. } | Error::RoleNotFound(_) => ErrorCategory::NotFound,
            Error::Conflict { .. } => ErrorCategory::Conflict,
            Error::UserTypeMismatch { .. } => ErrorCategory::Conflict,
            Error::InvalidHost(_) | Error::MissingToken => ErrorCategory::Validation,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether the remote reported that the entity does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {code}"),
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
