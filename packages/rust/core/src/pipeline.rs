//! End-to-end `process` pipeline: sitemap crawl, corpus build, publish.
//!
//! One invocation turns a site URL into a bound knowledge base and a
//! finished crawl-run record. The whole pipeline runs under the site's
//! lock, so two `process` calls for the same URL cannot interleave.

use std::time::{Duration, Instant};

use tracing::{info, instrument};

use sitesage_crawler::SiteCrawler;
use sitesage_kb::KbClient;
use sitesage_shared::{CrawlConfig, PageCapture, Result, SitesageError};
use sitesage_storage::SiteRegistry;

use crate::corpus::build_corpus;
use crate::locks::SiteLocks;
use crate::publish;

// ---------------------------------------------------------------------------
// ProcessOutcome
// ---------------------------------------------------------------------------

/// Result of one `process_site` run.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// Knowledge base the corpus was published to.
    pub kb_id: String,
    /// Whether the knowledge base was created by this run (false on update).
    pub created: bool,
    /// Registry id of the crawl run.
    pub run_id: String,
    /// Pages captured.
    pub pages: usize,
    /// Sections across all captured pages.
    pub sections: usize,
    /// URLs that failed to capture.
    pub failed: usize,
    /// URLs the sitemap listed.
    pub total_urls: usize,
    /// SHA-256 of the uploaded corpus.
    pub corpus_sha256: String,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, outcome: &ProcessOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _outcome: &ProcessOutcome) {}
}

// ---------------------------------------------------------------------------
// process_site
// ---------------------------------------------------------------------------

/// Run the full `process` pipeline for one site.
///
/// 1. Crawl every page the sitemap lists
/// 2. Build the single-site corpus
/// 3. Publish it (create or update the bound knowledge base)
///
/// A crawl failure leaves the run record unfinished; only completed runs
/// carry statistics.
#[instrument(skip_all, fields(site_url = %site_url))]
pub async fn process_site(
    registry: &SiteRegistry,
    kb: &KbClient,
    locks: &SiteLocks,
    crawl_config: &CrawlConfig,
    site_url: &str,
    progress: &dyn ProgressReporter,
) -> Result<ProcessOutcome> {
    let start = Instant::now();

    // Held through publish so the registry read-then-write stays atomic
    // per site.
    let _site_guard = locks.acquire(site_url).await;

    let run_id = registry.insert_crawl_run(site_url).await?;

    progress.phase("Crawling site");
    let crawler = SiteCrawler::new(crawl_config.clone())?;
    let crawl = crawler.crawl(site_url).await?;

    if crawl.pages.is_empty() {
        return Err(SitesageError::validation(
            "no pages were captured from the site",
        ));
    }

    progress.phase("Building corpus");
    let corpus = build_corpus(&crawl.pages);

    progress.phase("Publishing knowledge base");
    let published = publish::publish(registry, kb, site_url, &corpus).await?;

    let stats = serde_json::json!({
        "total_urls": crawl.total_urls,
        "pages": crawl.pages.len(),
        "failed": crawl.errors.len(),
        "sections": corpus.section_count,
        "duration_ms": crawl.duration.as_millis() as u64,
    });
    registry.finish_crawl_run(&run_id, &stats.to_string()).await?;

    let outcome = ProcessOutcome {
        kb_id: published.kb_id().to_string(),
        created: published.is_created(),
        run_id,
        pages: crawl.pages.len(),
        sections: corpus.section_count,
        failed: crawl.errors.len(),
        total_urls: crawl.total_urls,
        corpus_sha256: corpus.sha256,
        elapsed: start.elapsed(),
    };

    progress.done(&outcome);

    info!(
        kb_id = %outcome.kb_id,
        created = outcome.created,
        pages = outcome.pages,
        failed = outcome.failed,
        total_urls = outcome.total_urls,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "process pipeline complete"
    );

    Ok(outcome)
}

// ---------------------------------------------------------------------------
// process_page
// ---------------------------------------------------------------------------

/// Capture and segment a single page, without touching the registry or
/// the knowledge-base service.
pub async fn process_page(crawl_config: &CrawlConfig, url: &str) -> Result<PageCapture> {
    let crawler = SiteCrawler::new(crawl_config.clone())?;
    crawler.capture_one(url).await
}
