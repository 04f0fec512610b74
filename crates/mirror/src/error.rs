use std::path::{Path, PathBuf};

use reqwest::StatusCode;

use crate::retry::is_retryable_reqwest_error;

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("failed to build HTTP client: {source}")]
    ClientBuild { source: reqwest::Error },

    #[error("HTTP request failed for {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("request failed with HTTP {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("decryption error: {reason}")]
    Decryption { reason: String },

    #[error("failed to write {path:?}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid destination {path:?}: {reason}")]
    InvalidDestination { path: PathBuf, reason: String },

    #[error("invalid resource record `{file}`: {reason}")]
    InvalidResource { file: String, reason: String },
}

impl MirrorError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    pub fn http_status(status: StatusCode, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    pub fn decryption(reason: impl Into<String>) -> Self {
        Self::Decryption {
            reason: reason.into(),
        }
    }

    pub fn persist(path: &Path, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn invalid_destination(path: &Path, reason: impl Into<String>) -> Self {
        Self::InvalidDestination {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn invalid_resource(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResource {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Whether a fetch that failed with this error should be attempted again.
    ///
    /// Only transport failures, timeouts, server errors and `429` qualify.
    /// Decryption and persistence failures are terminal for their resource.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { source, .. } => is_retryable_reqwest_error(source),
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::InvalidUrl { .. }
            | Self::ClientBuild { .. }
            | Self::Decryption { .. }
            | Self::Persist { .. }
            | Self::InvalidDestination { .. }
            | Self::InvalidResource { .. } => false,
        }
    }
}
