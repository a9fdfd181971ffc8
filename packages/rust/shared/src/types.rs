//! Core domain types for SiteSage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// One titled slice of a page: a heading and the text that follows it
/// up to the next heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Text of the heading that opens the section.
    pub title: String,
    /// Concatenated text between this heading and the next boundary.
    /// Empty when two headings are adjacent.
    pub content: String,
}

// ---------------------------------------------------------------------------
// PageCapture
// ---------------------------------------------------------------------------

/// The segmented content of one successfully fetched page.
///
/// Pages that fail to fetch or segment produce no capture at all; the
/// crawl records the failure separately and moves on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageCapture {
    /// The page URL as listed in the sitemap.
    pub url: String,
    /// Sections in document order. May be empty for heading-less pages.
    pub sections: Vec<Section>,
}

impl PageCapture {
    /// Number of sections captured for this page.
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}

// ---------------------------------------------------------------------------
// SiteBinding
// ---------------------------------------------------------------------------

/// A registry row binding a site URL to its knowledge base.
///
/// At most one binding exists per site URL; republishing a site updates
/// the row in place and keeps the knowledge-base id stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteBinding {
    /// Root URL of the site (registry key).
    pub site_url: String,
    /// Service-assigned knowledge-base identifier.
    pub kb_id: String,
    /// When the site was first published.
    pub created_at: DateTime<Utc>,
    /// When the site was last republished.
    pub updated_at: DateTime<Utc>,
    /// SHA-256 of the corpus most recently uploaded for this site.
    pub corpus_sha256: String,
    /// Pages in the most recent corpus.
    pub page_count: usize,
}

// ---------------------------------------------------------------------------
// CrawlRunRecord
// ---------------------------------------------------------------------------

/// Bookkeeping row for one crawl of a site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRunRecord {
    /// Unique run identifier (UUID v7).
    pub id: String,
    /// Site that was crawled.
    pub site_url: String,
    /// When the crawl started.
    pub started_at: DateTime<Utc>,
    /// When the crawl finished, if it has.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Crawl statistics (page/failure counts, duration) as JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<serde_json::Value>,
}
