//! Shared types, error model, and configuration for SiteSage.
//!
//! This crate is the foundation depended on by all other SiteSage crates.
//! It provides:
//! - [`SitesageError`] — the unified error type
//! - Domain types ([`Section`], [`PageCapture`], [`SiteBinding`], [`CrawlRunRecord`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, CrawlSettings, KbServiceConfig, QaConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, registry_db_path,
    validate_api_key,
};
pub use error::{Result, SitesageError};
pub use types::{CrawlRunRecord, PageCapture, Section, SiteBinding};
