//! Typed error enum for the `apigw-service-proxy` library API.
//!
//! The CLI (`main.rs`) converts these to `anyhow::Error` at the binary
//! boundary and adds file-level context.

use apigw_service_proxy_core::ValidationError;

/// Errors produced by `apigw-service-proxy` library operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A service proxy descriptor broke the schema.
    ///
    /// Displays the first violation; [`ValidationError::errors`] lists all.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Project configuration outside the descriptor list has the wrong shape
    /// (e.g. `apiKeys` is not a list of strings).
    #[error("{message}")]
    Config {
        /// What is wrong, phrased for the user.
        message: String,
    },

    /// File I/O failure (reading config or template files).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML parsing failure.
    #[error(transparent)]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON parsing or serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the library's public API.
pub type Result<T> = std::result::Result<T, Error>;
