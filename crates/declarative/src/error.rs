//! Errors raised by the reconciliation engine

use crate::schema::Diagnostic;
use std::fmt;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by a remote collaborator.
pub type RemoteError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Lifecycle operation a remote failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
    List,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Import => "import",
            Self::List => "list",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine errors.
///
/// Configuration errors are raised before any remote call is made. Remote
/// failures are labelled with the resource type, operation and ID and carry
/// the collaborator's error as their source.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration for {address}: {}", join(.diagnostics))]
    Config {
        resource_type: String,
        address: String,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("failed to {operation} {resource_type} {id}")]
    Remote {
        resource_type: String,
        operation: Operation,
        id: String,
        #[source]
        source: RemoteError,
    },

    #[error("{resource_type} {id} no longer exists")]
    NotFound { resource_type: String, id: String },

    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("invalid state: {0}")]
    State(String),

    #[error("failed to encode attributes: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Error {
    pub fn config(
        resource_type: impl Into<String>,
        address: impl Into<String>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        Self::Config {
            resource_type: resource_type.into(),
            address: address.into(),
            diagnostics,
        }
    }

    pub fn remote(
        resource_type: impl Into<String>,
        operation: Operation,
        id: impl Into<String>,
        source: impl Into<RemoteError>,
    ) -> Self {
        Self::Remote {
            resource_type: resource_type.into(),
            operation,
            id: id.into(),
            source: source.into(),
        }
    }

    /// Whether this is a configuration error raised before any remote call.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

fn join(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Render an error and its whole source chain on one line.
pub fn chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("HTTP 503")]
    struct Unavailable;

    #[test]
    fn test_config_error_lists_diagnostics() {
        let err = Error::config(
            "iotcentral_user",
            "iotcentral_user.ops",
            vec![
                Diagnostic::new("email", "required attribute is missing"),
                Diagnostic::new("roles[0].role", "required attribute is missing"),
            ],
        );
        let message = err.to_string();
        assert!(message.starts_with("invalid configuration for iotcentral_user.ops"));
        assert!(message.contains("roles[0].role"));
        assert!(err.is_config());
    }

    #[test]
    fn test_remote_error_is_labelled() {
        let err = Error::remote("iotcentral_device", Operation::Update, "d1", Unavailable);
        assert_eq!(err.to_string(), "failed to update iotcentral_device d1");
        assert_eq!(chain(&err), "failed to update iotcentral_device d1: HTTP 503");
    }
}
