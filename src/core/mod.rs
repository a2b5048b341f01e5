pub mod config;
#[cfg(feature = "remote_config")]
pub mod middleware;
pub mod status;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors surfaced by the manager's internals and its HTTP adapters.
///
/// The public façade on [`crate::FirebaseManager`] never returns these; they are
/// logged with context and absorbed. Configuration loading and the HTTP adapters
/// return them directly.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The dependency check resolved to something other than `Available`.
    #[error("dependency check failed: {0}")]
    DependencyCheckFailed(String),
    /// The dependency check did not resolve before the configured timeout.
    #[error("dependency check timed out after {0:?}")]
    DependencyCheckTimedOut(std::time::Duration),
    /// Enabling analytics collection failed. Non-fatal.
    #[error("failed to enable analytics collection: {0}")]
    AnalyticsEnableFailed(String),
    /// Pushing the default remote values failed. Non-fatal.
    #[error("failed to set default remote values: {0}")]
    RemoteDefaultsSetFailed(String),
    /// The last remote fetch did not succeed.
    #[error("remote fetch was unsuccessful: {0}")]
    RemoteFetchUnsuccessful(String),
    /// Reading a remote value failed; the caller's default is used instead.
    #[error("failed to read remote value `{key}`: {reason}")]
    RemoteValueReadFailed { key: String, reason: String },
    /// A raw config value could not be coerced to the requested type.
    #[error("cannot read `{raw}` as {expected}")]
    InvalidValue { raw: String, expected: &'static str },
    /// An external operation did not resolve in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: std::time::Duration,
    },
    /// The configuration is incomplete or inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Wrapper for `std::io::Error`.
    #[error("an I/O error occurred: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for `serde_json::Error`.
    #[error("an error occurred while serializing/deserializing JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper for `reqwest_middleware::Error`.
    #[error("an error occurred while sending the request: {0}")]
    Request(#[from] reqwest_middleware::Error),
    /// Wrapper for `reqwest::Error`.
    #[error("an error occurred while sending the request: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Error returned by a Firebase or Google Analytics endpoint.
    #[error("the API returned an error: {code}: {message}")]
    Api { code: u16, message: String },
}

/// A primitive value passed in at the call boundary, used both for remote-config
/// defaults and for analytics event parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Primitive {
    Bool(bool),
    Int(i32),
    Long(i64),
    #[serde(skip_deserializing)]
    Float(f32),
    Double(f64),
    String(String),
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Bool(v) => write!(f, "{}", v),
            Primitive::Int(v) => write!(f, "{}", v),
            Primitive::Long(v) => write!(f, "{}", v),
            Primitive::Float(v) => write!(f, "{}", v),
            Primitive::Double(v) => write!(f, "{}", v),
            Primitive::String(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Primitive {
    fn from(value: bool) -> Self {
        Primitive::Bool(value)
    }
}

impl From<i32> for Primitive {
    fn from(value: i32) -> Self {
        Primitive::Int(value)
    }
}

impl From<i64> for Primitive {
    fn from(value: i64) -> Self {
        Primitive::Long(value)
    }
}

impl From<f32> for Primitive {
    fn from(value: f32) -> Self {
        Primitive::Float(value)
    }
}

impl From<f64> for Primitive {
    fn from(value: f64) -> Self {
        Primitive::Double(value)
    }
}

impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Primitive::String(value.to_string())
    }
}

impl From<String> for Primitive {
    fn from(value: String) -> Self {
        Primitive::String(value)
    }
}
