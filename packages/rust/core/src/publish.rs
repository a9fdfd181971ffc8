//! Publish a corpus to the knowledge-base service and record the binding.

use sitesage_kb::KbClient;
use sitesage_shared::Result;
use sitesage_storage::SiteRegistry;
use tracing::{info, instrument};
use url::Url;

use crate::corpus::Corpus;

// ---------------------------------------------------------------------------
// PublishOutcome
// ---------------------------------------------------------------------------

/// Whether publishing created a new knowledge base or refreshed one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Created { kb_id: String },
    Updated { kb_id: String },
}

impl PublishOutcome {
    /// Knowledge-base id, regardless of how we got it.
    pub fn kb_id(&self) -> &str {
        match self {
            Self::Created { kb_id } | Self::Updated { kb_id } => kb_id,
        }
    }

    /// True when this publish created the knowledge base.
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

// ---------------------------------------------------------------------------
// Publish
// ---------------------------------------------------------------------------

/// Upload a corpus and create or refresh the site's knowledge base.
///
/// The upload happens first so a service failure leaves the registry
/// untouched. The create-vs-update split comes from the registry: a site
/// keeps its knowledge-base id for life, refreshes replace the document
/// set. Callers serialize publishes per site (see [`crate::locks`]); the
/// registry lookup here is not transactional on its own.
#[instrument(skip_all, fields(site_url = %site_url))]
pub async fn publish(
    registry: &SiteRegistry,
    kb: &KbClient,
    site_url: &str,
    corpus: &Corpus,
) -> Result<PublishOutcome> {
    let file = kb
        .upload_document(&corpus_filename(site_url), &corpus.text)
        .await?;
    let file_ids = vec![file.id];

    let outcome = match registry.kb_for_site(site_url).await? {
        Some(kb_id) => {
            kb.update_knowledge_base(&kb_id, &file_ids).await?;
            info!(%kb_id, "knowledge base refreshed");
            PublishOutcome::Updated { kb_id }
        }
        None => {
            let kb_id = kb
                .create_knowledge_base(
                    &kb_name(site_url),
                    &kb_description(site_url),
                    &kb_instructions(site_url),
                    &file_ids,
                )
                .await?;
            info!(%kb_id, "knowledge base created");
            PublishOutcome::Created { kb_id }
        }
    };

    registry
        .bind_site(site_url, outcome.kb_id(), &corpus.sha256, corpus.page_count)
        .await?;

    Ok(outcome)
}

/// Delete a knowledge base and clear any site bindings pointing at it.
/// Returns the site URLs that were unbound.
#[instrument(skip_all, fields(kb_id = %kb_id))]
pub async fn delete_kb(
    registry: &SiteRegistry,
    kb: &KbClient,
    kb_id: &str,
) -> Result<Vec<String>> {
    kb.delete_knowledge_base(kb_id).await?;

    let sites = registry.sites_for_kb(kb_id).await?;
    for site in &sites {
        registry.remove_site(site).await?;
    }

    info!(unbound = sites.len(), "knowledge base deleted");
    Ok(sites)
}

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Knowledge bases are named after the site's host.
fn kb_name(site_url: &str) -> String {
    Url::parse(site_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| site_url.to_string())
}

fn corpus_filename(site_url: &str) -> String {
    format!("{}-corpus.txt", kb_name(site_url))
}

fn kb_description(site_url: &str) -> String {
    format!("Site content captured from {site_url}")
}

fn kb_instructions(site_url: &str) -> String {
    format!(
        "Answer questions using only the site content captured from {site_url}. \
         When the content does not cover a question, say so instead of guessing."
    )
}
