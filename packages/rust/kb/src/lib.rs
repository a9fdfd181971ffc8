//! HTTP client for the knowledge-base / conversation service.
//!
//! The service is an opaque store-and-query API: corpus documents are
//! uploaded as files, grouped into knowledge bases, and queried through
//! threads whose runs produce assistant messages. This crate provides:
//! - [`KbClient`] — authenticated request plumbing
//! - [`files`] — document upload, blocking until the file is processed
//! - [`knowledge_bases`] — create / update / delete
//! - [`threads`] — thread and message management
//! - [`runs`] — starting runs and reading their status

pub mod files;
pub mod knowledge_bases;
pub mod runs;
pub mod threads;
pub mod types;

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};

use sitesage_shared::{KbServiceConfig, Result, SitesageError};

pub use types::{
    FileHandle, Message, MessageOrder, MessageRole, Run, RunError, RunStatus, Thread,
};

/// User-Agent string for service requests.
const USER_AGENT: &str = concat!("SiteSage/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout for service calls.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Cap on error-body text carried into error messages.
const ERROR_BODY_LIMIT: usize = 200;

// ---------------------------------------------------------------------------
// KbClient
// ---------------------------------------------------------------------------

/// Client for the knowledge-base / conversation service.
///
/// The base URL comes from `[kb_service]` config, which is also the seam
/// tests use to point the client at a mock server. The API key is read
/// from the env var the config names; requests go out unauthenticated
/// when it is unset.
#[derive(Debug, Clone)]
pub struct KbClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    upload_poll_interval: Duration,
    upload_timeout: Duration,
}

impl KbClient {
    /// Create a new client from service configuration.
    pub fn new(config: &KbServiceConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SitesageError::Service(format!("failed to build HTTP client: {e}")))?;

        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty());

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            upload_poll_interval: Duration::from_millis(config.upload_poll_interval_ms),
            upload_timeout: Duration::from_secs(config.upload_timeout_secs),
        })
    }

    /// Build a request against a service path, attaching auth when configured.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Map a non-success response to a service error with body context.
    async fn check(response: Response, context: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        Err(SitesageError::Service(format!(
            "{context}: HTTP {status}: {body}"
        )))
    }
}
