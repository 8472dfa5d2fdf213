use std::path::PathBuf;

use crate::config::ConfigError;

/// Whole-document loading errors
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Expected a list of endpoints or a mapping with an `endpoints` key")]
    UnexpectedShape,
}

/// A single endpoint definition that was rejected by the loader
///
/// Rejecting one definition never stops the rest of the batch from loading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadFailure {
    #[error("Endpoint {endpoint}: missing required field `{field}`")]
    MissingRequiredField { endpoint: String, field: String },

    #[error("Endpoint {endpoint}: malformed value: {reason}")]
    MalformedValue { endpoint: String, reason: String },

    #[error("Endpoint {endpoint}: duplicate endpoint name")]
    DuplicateName { endpoint: String },

    /// A definitions file that could not be decoded, none of its entries loaded
    #[error("File {file}: {reason}")]
    InvalidFile { file: String, reason: String },
}

impl LoadFailure {
    /// The rejected endpoint's label, or the file for `InvalidFile`
    pub fn endpoint(&self) -> &str {
        match self {
            Self::MissingRequiredField { endpoint, .. }
            | Self::MalformedValue { endpoint, .. }
            | Self::DuplicateName { endpoint } => endpoint,
            Self::InvalidFile { file, .. } => file,
        }
    }
}

/// Errors raised while executing an endpoint
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Variable `{0}` has no values")]
    EmptyVariable(String),

    #[error("HTTP request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("JWT login at {url} failed: {reason}")]
    Login { url: String, reason: String },
}

impl ExecError {
    /// Transport failures that may succeed on a later run
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request { reason, .. } | Self::Login { reason, .. } => {
                reason.contains("timed out")
                    || reason.contains("timeout")
                    || reason.contains("connect")
            }
            _ => false,
        }
    }
}

/// Application error type returned by the top-level entry points
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),
}

/// Result type alias for top-level entry points
pub type AppResult<T> = Result<T, AppError>;
