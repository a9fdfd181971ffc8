//! Sitemap fetching and parsing.
//!
//! A site's page inventory comes exclusively from `{root}/sitemap.xml`.
//! Failure to fetch or parse the sitemap is fatal to the whole crawl;
//! there is no fallback discovery.

use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use sitesage_shared::{Result, SitesageError};

// ---------------------------------------------------------------------------
// Sitemap document shape
// ---------------------------------------------------------------------------

/// `<urlset>` root per the sitemap protocol. A document without `<url>`
/// entries does not deserialize; that counts as malformed.
#[derive(Debug, Deserialize)]
#[serde(rename = "urlset")]
struct Urlset {
    #[serde(rename = "url")]
    urls: Vec<UrlEntry>,
}

/// One `<url>` entry. Only `<loc>` matters; lastmod/changefreq/priority
/// are ignored.
#[derive(Debug, Deserialize)]
struct UrlEntry {
    loc: String,
}

// ---------------------------------------------------------------------------
// Fetch + parse
// ---------------------------------------------------------------------------

/// Fetch `{site_root}/sitemap.xml` and return its page URLs in sitemap order.
#[instrument(skip(client), fields(site_root = %site_root))]
pub async fn fetch_site_urls(client: &Client, site_root: &str) -> Result<Vec<String>> {
    let sitemap_url = sitemap_url(site_root);

    let response = client
        .get(&sitemap_url)
        .send()
        .await
        .map_err(|e| SitesageError::Fetch(format!("{sitemap_url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SitesageError::Fetch(format!("{sitemap_url}: HTTP {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| SitesageError::Fetch(format!("{sitemap_url}: body read failed: {e}")))?;

    let urls = parse_sitemap(&body)?;
    debug!(urls = urls.len(), "sitemap parsed");
    Ok(urls)
}

/// Build the sitemap URL for a site root, tolerating a trailing slash.
fn sitemap_url(site_root: &str) -> String {
    format!("{}/sitemap.xml", site_root.trim_end_matches('/'))
}

/// Parse sitemap XML into its `<loc>` values, preserving document order.
fn parse_sitemap(xml: &str) -> Result<Vec<String>> {
    let urlset: Urlset = from_str(xml).map_err(|e| SitesageError::malformed_sitemap(e.to_string()))?;

    Ok(urlset.urls.into_iter().map(|u| u.loc).collect())
}
