//! Runs evaluate a thread against a knowledge base.
//!
//! Starting a run only enqueues it; callers poll [`KbClient::get_run`]
//! until the status turns terminal.

use reqwest::Method;
use serde::Serialize;
use tracing::{debug, instrument};

use sitesage_shared::{Result, SitesageError};

use crate::types::Run;
use crate::KbClient;

#[derive(Debug, Serialize)]
struct StartRunRequest<'a> {
    knowledge_base_id: &'a str,
}

impl KbClient {
    /// Queue a run of `thread_id` against the given knowledge base.
    #[instrument(skip(self), fields(thread_id = %thread_id, kb_id = %kb_id))]
    pub async fn start_run(&self, thread_id: &str, kb_id: &str) -> Result<Run> {
        let request = StartRunRequest {
            knowledge_base_id: kb_id,
        };

        let response = self
            .request(Method::POST, &format!("/v1/threads/{thread_id}/runs"))
            .json(&request)
            .send()
            .await
            .map_err(|e| SitesageError::Service(format!("start run failed: {e}")))?;
        let response = Self::check(response, "start run").await?;

        let run: Run = response
            .json()
            .await
            .map_err(|e| SitesageError::Service(format!("invalid run response: {e}")))?;

        debug!(run_id = %run.id, status = run.status.as_str(), "run started");
        Ok(run)
    }

    /// Fetch the current state of a run.
    #[instrument(skip(self), fields(thread_id = %thread_id, run_id = %run_id))]
    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let response = self
            .request(Method::GET, &format!("/v1/threads/{thread_id}/runs/{run_id}"))
            .send()
            .await
            .map_err(|e| SitesageError::Service(format!("get run failed: {e}")))?;
        let response = Self::check(response, "get run").await?;

        response
            .json()
            .await
            .map_err(|e| SitesageError::Service(format!("invalid run response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_client;
    use crate::types::RunStatus;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn start_run_names_the_knowledge_base() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/threads/thread_1/runs"))
            .and(body_partial_json(json!({ "knowledge_base_id": "kb_7" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "run_1",
                "thread_id": "thread_1",
                "status": "queued"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let run = client.start_run("thread_1", "kb_7").await.unwrap();
        assert_eq!(run.id, "run_1");
        assert_eq!(run.status, RunStatus::Queued);
        assert!(!run.status.is_terminal());
    }

    #[tokio::test]
    async fn get_run_carries_last_error_for_failures() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/threads/thread_1/runs/run_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "run_1",
                "thread_id": "thread_1",
                "status": "failed",
                "last_error": { "code": "rate_limit", "message": "too many requests" }
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let run = client.get_run("thread_1", "run_1").await.unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.status.is_terminal());
        let error = run.last_error.unwrap();
        assert_eq!(error.message, "too many requests");
    }
}
