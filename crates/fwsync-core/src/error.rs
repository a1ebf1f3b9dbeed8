//! Error types for the firewall DNS sync system
//!
//! This module defines all error types used throughout the crate.
//!
//! Only [`Error`] values travel through `Result`s. Malformed option tokens in
//! a directive comment are reported as [`ParseWarning`]s next to the parsed
//! directive instead, because a bad option never invalidates the comment.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for firewall sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the firewall sync system
#[derive(Error, Debug)]
pub enum Error {
    /// A single control plane call failed
    #[error("Control plane error ({operation} on `{object}`): {message}")]
    ControlPlane {
        /// Operation that failed (e.g. "list_objects", "add_entry")
        operation: String,
        /// Object the operation targeted
        object: String,
        /// Error message
        message: String,
    },

    /// A single DNS lookup attempt failed
    #[error("DNS lookup of `{domain}` via {server} failed: {message}")]
    Dns {
        /// Domain that was looked up
        domain: String,
        /// Server that was asked ("system" for the host resolver)
        server: String,
        /// Error message
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network-related errors (sockets, subprocess pipes)
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a control plane error
    pub fn control_plane(
        operation: impl Into<String>,
        object: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ControlPlane {
            operation: operation.into(),
            object: object.into(),
            message: message.into(),
        }
    }

    /// Create a DNS lookup error
    pub fn dns(
        domain: impl Into<String>,
        server: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Dns {
            domain: domain.into(),
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// A malformed option token inside a resolve directive
///
/// The parser substitutes the default value and keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// `#queries=` value is not an integer >= 1
    #[error("ignoring invalid #queries value `{value}`, using {default}")]
    InvalidQueries {
        /// Raw token value
        value: String,
        /// Substituted default
        default: u32,
    },

    /// `#delay=` value is not a non-negative number of seconds
    #[error("ignoring invalid #delay value `{value}`, using {default:?}")]
    InvalidDelay {
        /// Raw token value
        value: String,
        /// Substituted default
        default: Duration,
    },

    /// `#dns-servers=` listed no server
    #[error("ignoring empty #dns-servers list")]
    EmptyDnsServers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_plane_error_names_operation_and_object() {
        let err = Error::control_plane("add_entry", "web-servers", "exit status 255");
        let msg = err.to_string();
        assert!(msg.contains("add_entry"));
        assert!(msg.contains("web-servers"));
        assert!(msg.contains("exit status 255"));
    }

    #[test]
    fn test_dns_error_names_server() {
        let err = Error::dns("example.com", "9.9.9.9:53", "timed out");
        assert_eq!(
            err.to_string(),
            "DNS lookup of `example.com` via 9.9.9.9:53 failed: timed out"
        );
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: Error = anyhow::anyhow!("boom").into();
        assert!(matches!(err, Error::Other(ref m) if m == "boom"));
    }

    #[test]
    fn test_parse_warning_display() {
        let warning = ParseWarning::InvalidQueries {
            value: "abc".to_string(),
            default: 1,
        };
        assert_eq!(
            warning.to_string(),
            "ignoring invalid #queries value `abc`, using 1"
        );
    }
}
