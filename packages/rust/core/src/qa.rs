//! Conversational question-answering over a published site.
//!
//! A question is one pass through the session lifecycle: resolve the
//! site's knowledge base, get a thread, append the user message, start a
//! run, poll it to a terminal status, then read the latest messages back.

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, info, instrument};

use sitesage_kb::{KbClient, Message, MessageOrder, MessageRole, Run, RunStatus};
use sitesage_shared::{QaConfig, Result, SitesageError};
use sitesage_storage::SiteRegistry;

/// Messages are fetched newest first, capped at this many.
const ANSWER_MESSAGE_LIMIT: usize = 10;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Where a QA session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoThread,
    ThreadReady,
    MessageAppended,
    RunQueued,
    RunRunning,
    RunCompleted,
    RunFailed,
}

/// Result of one question: the thread it ran on and the latest messages,
/// newest first.
#[derive(Debug)]
pub struct AskOutcome {
    pub thread_id: String,
    pub messages: Vec<Message>,
}

// ---------------------------------------------------------------------------
// QaSession
// ---------------------------------------------------------------------------

/// Drives a single question to a terminal state.
pub struct QaSession<'a> {
    kb: &'a KbClient,
    config: &'a QaConfig,
    state: SessionState,
}

impl<'a> QaSession<'a> {
    pub fn new(kb: &'a KbClient, config: &'a QaConfig) -> Self {
        Self {
            kb,
            config,
            state: SessionState::NoThread,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }

    /// Ask one question against a knowledge base. Resumes `thread_id`
    /// when given (validated against the service), otherwise opens a new
    /// thread.
    pub async fn ask(
        &mut self,
        kb_id: &str,
        question: &str,
        thread_id: Option<&str>,
    ) -> Result<AskOutcome> {
        let thread_id = match thread_id {
            Some(id) => self.kb.get_thread(id).await?.id,
            None => self.kb.create_thread().await?.id,
        };
        self.transition(SessionState::ThreadReady);

        self.kb
            .append_message(&thread_id, MessageRole::User, question)
            .await?;
        self.transition(SessionState::MessageAppended);

        let run = self.kb.start_run(&thread_id, kb_id).await?;
        self.transition(SessionState::RunQueued);

        let run = self.poll_run(&thread_id, &run.id).await?;

        if run.status != RunStatus::Completed {
            self.transition(SessionState::RunFailed);
            let detail = run
                .last_error
                .map(|e| e.message)
                .unwrap_or_else(|| "no detail reported".to_string());
            return Err(SitesageError::run_failed(run.status.as_str(), detail));
        }
        self.transition(SessionState::RunCompleted);

        let messages = self
            .kb
            .list_messages(&thread_id, ANSWER_MESSAGE_LIMIT, MessageOrder::Desc)
            .await?;

        Ok(AskOutcome {
            thread_id,
            messages,
        })
    }

    /// Poll until the run is terminal or the configured deadline passes.
    async fn poll_run(&mut self, thread_id: &str, run_id: &str) -> Result<Run> {
        let deadline = Instant::now() + Duration::from_secs(self.config.run_timeout_secs);
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            let run = self.kb.get_run(thread_id, run_id).await?;

            if run.status == RunStatus::Running && self.state == SessionState::RunQueued {
                self.transition(SessionState::RunRunning);
            }
            if run.status.is_terminal() {
                return Ok(run);
            }
            if Instant::now() >= deadline {
                self.transition(SessionState::RunFailed);
                return Err(SitesageError::run_failed(
                    run.status.as_str(),
                    format!(
                        "no terminal status after {}s",
                        self.config.run_timeout_secs
                    ),
                ));
            }

            sleep(interval).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Answer a question against the knowledge base bound to `site_url`.
///
/// An unpublished site fails with [`SitesageError::UnknownSite`] before
/// any thread or run is created.
#[instrument(skip_all, fields(site_url = %site_url))]
pub async fn ask(
    registry: &SiteRegistry,
    kb: &KbClient,
    config: &QaConfig,
    site_url: &str,
    question: &str,
    thread_id: Option<&str>,
) -> Result<AskOutcome> {
    let kb_id = registry
        .kb_for_site(site_url)
        .await?
        .ok_or_else(|| SitesageError::unknown_site(site_url))?;

    let mut session = QaSession::new(kb, config);
    let outcome = session.ask(&kb_id, question, thread_id).await?;

    info!(
        thread_id = %outcome.thread_id,
        messages = outcome.messages.len(),
        "question answered"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sitesage_shared::KbServiceConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_kb_client(base_url: &str) -> KbClient {
        let config = KbServiceConfig {
            base_url: base_url.to_string(),
            api_key_env: "SITESAGE_QA_TEST_KEY_UNSET".into(),
            upload_poll_interval_ms: 10,
            upload_timeout_secs: 2,
        };
        KbClient::new(&config).expect("client")
    }

    fn test_qa_config() -> QaConfig {
        QaConfig {
            poll_interval_ms: 10,
            run_timeout_secs: 5,
        }
    }

    async fn bound_registry(site_url: &str) -> SiteRegistry {
        let registry = SiteRegistry::open_in_memory().await.unwrap();
        registry.bind_site(site_url, "kb_1", "sha", 2).await.unwrap();
        registry
    }

    async fn mount_thread_setup(server: &MockServer, thread_id: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/threads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": thread_id,
                "created_at": "2025-06-01T12:00:00Z"
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/v1/threads/{thread_id}/messages")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "role": "user",
                "content": "What is the refund policy?",
                "created_at": "2025-06-01T12:00:01Z"
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/v1/threads/{thread_id}/runs")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "run_1",
                "thread_id": thread_id,
                "status": "queued"
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn unknown_site_makes_no_service_calls() {
        let server = MockServer::start().await;
        let registry = SiteRegistry::open_in_memory().await.unwrap();
        let kb = test_kb_client(&server.uri());

        let err = ask(
            &registry,
            &kb,
            &test_qa_config(),
            "https://never-published.example.com",
            "anyone home?",
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SitesageError::UnknownSite { .. }));
        let requests = server.received_requests().await.unwrap();
        assert!(requests.is_empty(), "no request should reach the service");
    }

    #[tokio::test]
    async fn answer_flow_returns_messages_newest_first() {
        let server = MockServer::start().await;
        mount_thread_setup(&server, "thread_1").await;

        // One poll observes the run still running, the next sees it done.
        Mock::given(method("GET"))
            .and(path("/v1/threads/thread_1/runs/run_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "run_1",
                "thread_id": "thread_1",
                "status": "running"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/threads/thread_1/runs/run_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "run_1",
                "thread_id": "thread_1",
                "status": "completed"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/threads/thread_1/messages"))
            .and(query_param("limit", "10"))
            .and(query_param("order", "desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {
                        "id": "msg_2",
                        "role": "assistant",
                        "content": "Thirty days, no questions asked.",
                        "created_at": "2025-06-01T12:00:05Z"
                    },
                    {
                        "id": "msg_1",
                        "role": "user",
                        "content": "What is the refund policy?",
                        "created_at": "2025-06-01T12:00:01Z"
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let registry = bound_registry("https://docs.example.com").await;
        let kb = test_kb_client(&server.uri());

        let outcome = ask(
            &registry,
            &kb,
            &test_qa_config(),
            "https://docs.example.com",
            "What is the refund policy?",
            None,
        )
        .await
        .unwrap();

        assert_eq!(outcome.thread_id, "thread_1");
        assert_eq!(outcome.messages.len(), 2);
        assert_eq!(outcome.messages[0].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn resume_validates_the_thread() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/threads/thread_9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "thread_9",
                "created_at": "2025-06-01T11:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/threads/thread_9/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_5",
                "role": "user",
                "content": "And shipping?",
                "created_at": "2025-06-01T12:10:00Z"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/threads/thread_9/runs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "run_2",
                "thread_id": "thread_9",
                "status": "queued"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/threads/thread_9/runs/run_2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "run_2",
                "thread_id": "thread_9",
                "status": "completed"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/threads/thread_9/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;

        let registry = bound_registry("https://docs.example.com").await;
        let kb = test_kb_client(&server.uri());

        let outcome = ask(
            &registry,
            &kb,
            &test_qa_config(),
            "https://docs.example.com",
            "And shipping?",
            Some("thread_9"),
        )
        .await
        .unwrap();

        assert_eq!(outcome.thread_id, "thread_9");
    }

    #[tokio::test]
    async fn failed_run_surfaces_last_error() {
        let server = MockServer::start().await;
        mount_thread_setup(&server, "thread_1").await;

        Mock::given(method("GET"))
            .and(path("/v1/threads/thread_1/runs/run_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "run_1",
                "thread_id": "thread_1",
                "status": "failed",
                "last_error": { "code": "rate_limit", "message": "rate limited" }
            })))
            .mount(&server)
            .await;

        let kb = test_kb_client(&server.uri());
        let config = test_qa_config();
        let mut session = QaSession::new(&kb, &config);

        let err = session.ask("kb_1", "question", None).await.unwrap_err();
        assert!(matches!(err, SitesageError::RunFailed { .. }));
        assert!(err.to_string().contains("rate limited"));
        assert_eq!(session.state(), SessionState::RunFailed);
    }

    #[tokio::test]
    async fn poll_gives_up_at_the_deadline() {
        let server = MockServer::start().await;
        mount_thread_setup(&server, "thread_1").await;

        Mock::given(method("GET"))
            .and(path("/v1/threads/thread_1/runs/run_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "run_1",
                "thread_id": "thread_1",
                "status": "queued"
            })))
            .mount(&server)
            .await;

        let kb = test_kb_client(&server.uri());
        let config = QaConfig {
            poll_interval_ms: 10,
            run_timeout_secs: 0,
        };
        let mut session = QaSession::new(&kb, &config);

        let err = session.ask("kb_1", "question", None).await.unwrap_err();
        assert!(matches!(err, SitesageError::RunFailed { .. }));
        assert!(err.to_string().contains("no terminal status"));
    }
}
