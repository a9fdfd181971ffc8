//! Sitemap-driven crawling and batch orchestration.
//!
//! This crate provides:
//! - [`sitemap`] — fetch and parse `{root}/sitemap.xml` into a URL list
//! - [`batch`] — fixed-size batching of the crawl list
//! - [`engine`] — the batch crawler that fetches and segments pages

pub mod batch;
pub mod engine;
pub mod sitemap;

pub use batch::{DEFAULT_BATCH_SIZE, UrlBatch, chunk};
pub use engine::{SiteCrawl, SiteCrawler};
pub use sitemap::fetch_site_urls;
