//! Error types for SiteSage.
//!
//! Library crates use [`SitesageError`] via `thiserror`.
//! The CLI app wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all SiteSage operations.
#[derive(Debug, thiserror::Error)]
pub enum SitesageError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a sitemap or page.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// The sitemap was fetched but does not have the expected
    /// `urlset.url[].loc` shape.
    #[error("malformed sitemap: {message}")]
    MalformedSitemap { message: String },

    /// A page could not be segmented into titled sections.
    #[error("segmentation error: {message}")]
    Segmentation { message: String },

    /// A question was asked against a site that has never been published.
    #[error("no knowledge base registered for {site_url}")]
    UnknownSite { site_url: String },

    /// A question run reached a terminal state other than completed.
    #[error("run ended {status}: {detail}")]
    RunFailed { status: String, detail: String },

    /// Corpus upload to the knowledge-base service failed or never
    /// finished processing.
    #[error("upload error: {0}")]
    Upload(String),

    /// Knowledge-base / conversation service returned a non-success
    /// response outside of upload and run handling.
    #[error("service error: {0}")]
    Service(String),

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad URL, invalid id, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SitesageError>;

impl SitesageError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a malformed-sitemap error from any displayable message.
    pub fn malformed_sitemap(msg: impl Into<String>) -> Self {
        Self::MalformedSitemap {
            message: msg.into(),
        }
    }

    /// Create a segmentation error from any displayable message.
    pub fn segmentation(msg: impl Into<String>) -> Self {
        Self::Segmentation {
            message: msg.into(),
        }
    }

    /// Create an unknown-site error for a site URL.
    pub fn unknown_site(site_url: impl Into<String>) -> Self {
        Self::UnknownSite {
            site_url: site_url.into(),
        }
    }

    /// Create a run-failed error from a terminal status and its detail.
    pub fn run_failed(status: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::RunFailed {
            status: status.into(),
            detail: detail.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
