//! Batch-oriented site crawler.
//!
//! The crawl list comes from the sitemap and is processed in fixed-size
//! batches: every URL of a batch is fetched and segmented concurrently, and
//! the next batch starts only after all tasks of the previous one finished.
//! A page that fails to fetch or segment is recorded and dropped; only a
//! sitemap failure aborts the crawl.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

use sitesage_segmenter::segment;
use sitesage_shared::{CrawlConfig, PageCapture, Result, SitesageError};

use crate::batch::chunk;
use crate::sitemap::fetch_site_urls;

/// User-Agent string for crawl requests.
const USER_AGENT: &str = concat!("SiteSage/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// SiteCrawl
// ---------------------------------------------------------------------------

/// Summary of a completed site crawl.
#[derive(Debug, Clone)]
pub struct SiteCrawl {
    /// Root URL the crawl was started from.
    pub site_url: String,
    /// Successfully captured pages, in sitemap order.
    pub pages: Vec<PageCapture>,
    /// Failed URLs with their error messages.
    pub errors: Vec<(String, String)>,
    /// Number of URLs the sitemap listed.
    pub total_urls: usize,
    /// Total duration of the crawl.
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// SiteCrawler
// ---------------------------------------------------------------------------

/// Batch crawler that fetches and segments every page a sitemap lists.
pub struct SiteCrawler {
    config: CrawlConfig,
    client: Client,
}

impl SiteCrawler {
    /// Create a new crawler with the given configuration.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SitesageError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Crawl every page listed in `{site_url}/sitemap.xml`.
    #[instrument(skip_all, fields(site_url = %site_url))]
    pub async fn crawl(&self, site_url: &str) -> Result<SiteCrawl> {
        let start_time = std::time::Instant::now();

        // Sitemap problems are the only fatal failure in a crawl.
        let urls = fetch_site_urls(&self.client, site_url).await?;
        let batches = chunk(&urls, self.config.batch_size);

        info!(
            urls = urls.len(),
            batches = batches.len(),
            batch_size = self.config.batch_size,
            "starting crawl"
        );

        let mut pages: Vec<PageCapture> = Vec::new();
        let mut errors: Vec<(String, String)> = Vec::new();

        for batch in batches {
            debug!(index = batch.index, urls = batch.urls.len(), "starting batch");

            let mut handles = Vec::with_capacity(batch.urls.len());
            for url in batch.urls {
                match Url::parse(&url) {
                    Ok(parsed) if !self.config.allow_private_targets && is_ssrf_target(&parsed) => {
                        warn!(%url, "blocked: private or local address");
                        errors.push((url, "blocked: private or local address".into()));
                        continue;
                    }
                    Err(e) => {
                        warn!(%url, error = %e, "invalid sitemap URL");
                        errors.push((url, e.to_string()));
                        continue;
                    }
                    Ok(_) => {}
                }

                let client = self.client.clone();
                handles.push(tokio::spawn(async move {
                    let capture = capture_page(&client, &url).await;
                    (url, capture)
                }));
            }

            // Full-batch barrier. Handles are awaited in spawn order, so
            // captured pages keep sitemap order within the batch.
            for handle in handles {
                match handle.await {
                    Ok((_, Ok(page))) => pages.push(page),
                    Ok((url, Err(e))) => {
                        warn!(%url, error = %e, "page dropped");
                        errors.push((url, e.to_string()));
                    }
                    Err(e) => {
                        warn!(error = %e, "page task panicked");
                        errors.push(("task".into(), e.to_string()));
                    }
                }
            }
        }

        let crawl = SiteCrawl {
            site_url: site_url.to_string(),
            total_urls: urls.len(),
            pages,
            errors,
            duration: start_time.elapsed(),
        };

        info!(
            pages = crawl.pages.len(),
            failed = crawl.errors.len(),
            duration_ms = crawl.duration.as_millis(),
            "crawl completed"
        );

        Ok(crawl)
    }

    /// Fetch and segment a single page, outside of any crawl.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn capture_one(&self, url: &str) -> Result<PageCapture> {
        capture_page(&self.client, url).await
    }
}

// ---------------------------------------------------------------------------
// Page capture
// ---------------------------------------------------------------------------

/// Fetch one URL and segment its body.
async fn capture_page(client: &Client, url: &str) -> Result<PageCapture> {
    debug!(%url, "fetching page");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SitesageError::Fetch(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SitesageError::Fetch(format!("{url}: HTTP {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| SitesageError::Fetch(format!("{url}: body read failed: {e}")))?;

    if body.trim().is_empty() {
        return Err(SitesageError::segmentation(format!(
            "{url}: empty response body"
        )));
    }

    // Zero sections is a valid capture; heading-less pages still count.
    Ok(PageCapture {
        url: url.to_string(),
        sections: segment(&body),
    })
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a sitemap-listed URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    // Block non-HTTP schemes
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    // Block private/loopback IPs
    if let Some(host) = url.host_str() {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return is_private_ip(&ip);
        }
        // Block known local hostnames
        if host == "localhost" || host.ends_with(".local") || host.ends_with(".internal") {
            return true;
        }
    }

    false
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> CrawlConfig {
        CrawlConfig {
            batch_size: 25,
            request_timeout_secs: 5,
            allow_private_targets: true,
        }
    }

    fn sitemap_for(server_uri: &str, paths: &[&str]) -> String {
        let entries: String = paths
            .iter()
            .map(|p| format!("  <url><loc>{server_uri}{p}</loc></url>\n"))
            .collect();
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{entries}</urlset>"
        )
    }

    async fn mount_page(server: &MockServer, route: &str, html: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(html.to_string()))
            .mount(server)
            .await;
    }

    #[test]
    fn ssrf_blocks_private_targets() {
        for bad in [
            "file:///etc/passwd",
            "http://192.168.1.1/admin",
            "http://10.0.0.1/",
            "http://127.0.0.1:8080/",
            "http://localhost:3000/api",
        ] {
            assert!(is_ssrf_target(&Url::parse(bad).unwrap()), "{bad}");
        }

        let public = Url::parse("https://docs.example.com/page").unwrap();
        assert!(!is_ssrf_target(&public));
    }

    #[tokio::test]
    async fn private_sitemap_entries_are_blocked_by_default() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<?xml version=\"1.0\"?>\
                 <urlset><url><loc>http://10.0.0.1/admin</loc></url></urlset>",
            ))
            .mount(&server)
            .await;

        let config = CrawlConfig {
            batch_size: 25,
            request_timeout_secs: 5,
            allow_private_targets: false,
        };
        let crawler = SiteCrawler::new(config).unwrap();
        let crawl = crawler.crawl(&server.uri()).await.unwrap();

        assert!(crawl.pages.is_empty());
        assert_eq!(crawl.errors.len(), 1);
        assert!(crawl.errors[0].1.contains("blocked"));
    }

    #[tokio::test]
    async fn crawl_captures_pages_in_sitemap_order() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(sitemap_for(
                &server.uri(),
                &["/intro", "/guide", "/api"],
            )))
            .mount(&server)
            .await;

        mount_page(
            &server,
            "/intro",
            "<html><body><h1>Intro</h1><p>Welcome.</p></body></html>",
        )
        .await;
        mount_page(
            &server,
            "/guide",
            "<html><body><h1>Guide</h1><p>Steps.</p><h2>More</h2><p>Detail.</p></body></html>",
        )
        .await;
        mount_page(
            &server,
            "/api",
            "<html><body><h1>API</h1><p>Endpoints.</p></body></html>",
        )
        .await;

        let crawler = SiteCrawler::new(test_config()).unwrap();
        let crawl = crawler.crawl(&server.uri()).await.unwrap();

        assert_eq!(crawl.total_urls, 3);
        assert!(crawl.errors.is_empty());
        let urls: Vec<&str> = crawl.pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                format!("{}/intro", server.uri()),
                format!("{}/guide", server.uri()),
                format!("{}/api", server.uri()),
            ]
        );
        assert_eq!(crawl.pages[1].sections.len(), 2);
    }

    #[tokio::test]
    async fn failed_page_is_dropped_without_aborting() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(sitemap_for(
                &server.uri(),
                &["/ok-1", "/broken", "/ok-2"],
            )))
            .mount(&server)
            .await;

        mount_page(
            &server,
            "/ok-1",
            "<html><body><h1>One</h1><p>First.</p></body></html>",
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_page(
            &server,
            "/ok-2",
            "<html><body><h1>Two</h1><p>Second.</p></body></html>",
        )
        .await;

        let crawler = SiteCrawler::new(test_config()).unwrap();
        let crawl = crawler.crawl(&server.uri()).await.unwrap();

        assert_eq!(crawl.pages.len(), 2);
        assert_eq!(crawl.errors.len(), 1);
        assert_eq!(crawl.pages.len() + crawl.errors.len(), crawl.total_urls);
        assert!(crawl.errors[0].0.ends_with("/broken"));
        assert!(crawl.errors[0].1.contains("500"));
    }

    #[tokio::test]
    async fn missing_sitemap_aborts_the_crawl() {
        let server = MockServer::start().await;

        let crawler = SiteCrawler::new(test_config()).unwrap();
        let err = crawler.crawl(&server.uri()).await.unwrap_err();
        assert!(matches!(err, SitesageError::Fetch(_)));
    }

    #[tokio::test]
    async fn malformed_sitemap_aborts_the_crawl() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html>not a sitemap</html>"),
            )
            .mount(&server)
            .await;

        let crawler = SiteCrawler::new(test_config()).unwrap();
        let err = crawler.crawl(&server.uri()).await.unwrap_err();
        assert!(matches!(err, SitesageError::MalformedSitemap { .. }));
    }

    #[tokio::test]
    async fn empty_body_counts_as_segmentation_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(sitemap_for(&server.uri(), &["/empty"])),
            )
            .mount(&server)
            .await;
        mount_page(&server, "/empty", "").await;

        let crawler = SiteCrawler::new(test_config()).unwrap();
        let crawl = crawler.crawl(&server.uri()).await.unwrap();

        assert!(crawl.pages.is_empty());
        assert_eq!(crawl.errors.len(), 1);
        assert!(crawl.errors[0].1.contains("empty response body"));
    }

    #[tokio::test]
    async fn heading_less_page_is_still_captured() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(sitemap_for(&server.uri(), &["/plain"])),
            )
            .mount(&server)
            .await;
        mount_page(
            &server,
            "/plain",
            "<html><body><p>No headings here.</p></body></html>",
        )
        .await;

        let crawler = SiteCrawler::new(test_config()).unwrap();
        let crawl = crawler.crawl(&server.uri()).await.unwrap();

        assert_eq!(crawl.pages.len(), 1);
        assert!(crawl.pages[0].sections.is_empty());
        assert!(crawl.errors.is_empty());
    }

    #[tokio::test]
    async fn small_batches_cover_every_url() {
        let server = MockServer::start().await;

        let routes: Vec<String> = (0..5).map(|i| format!("/page-{i}")).collect();
        let route_refs: Vec<&str> = routes.iter().map(String::as_str).collect();

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(sitemap_for(&server.uri(), &route_refs)),
            )
            .mount(&server)
            .await;

        for (i, route) in routes.iter().enumerate() {
            mount_page(
                &server,
                route,
                &format!("<html><body><h1>Page {i}</h1><p>Body {i}.</p></body></html>"),
            )
            .await;
        }

        let config = CrawlConfig {
            batch_size: 2,
            request_timeout_secs: 5,
            allow_private_targets: true,
        };
        let crawler = SiteCrawler::new(config).unwrap();
        let crawl = crawler.crawl(&server.uri()).await.unwrap();

        assert_eq!(crawl.pages.len(), 5);
        assert!(crawl.errors.is_empty());
        assert_eq!(crawl.pages[4].sections[0].title, "Page 4");
    }
}
