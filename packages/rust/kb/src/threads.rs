//! Conversation threads and their messages.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use sitesage_shared::{Result, SitesageError};

use crate::types::{Message, MessageOrder, MessageRole, Thread};
use crate::KbClient;

#[derive(Debug, Serialize)]
struct AppendMessageRequest<'a> {
    role: MessageRole,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<Message>,
}

impl KbClient {
    /// Open a fresh conversation thread.
    #[instrument(skip(self))]
    pub async fn create_thread(&self) -> Result<Thread> {
        let response = self
            .request(Method::POST, "/v1/threads")
            .send()
            .await
            .map_err(|e| SitesageError::Service(format!("create thread failed: {e}")))?;
        let response = Self::check(response, "create thread").await?;

        let thread: Thread = response
            .json()
            .await
            .map_err(|e| SitesageError::Service(format!("invalid thread response: {e}")))?;

        debug!(thread_id = %thread.id, "thread created");
        Ok(thread)
    }

    /// Fetch a thread by id, failing if the service no longer knows it.
    #[instrument(skip(self), fields(thread_id = %id))]
    pub async fn get_thread(&self, id: &str) -> Result<Thread> {
        let response = self
            .request(Method::GET, &format!("/v1/threads/{id}"))
            .send()
            .await
            .map_err(|e| SitesageError::Service(format!("get thread failed: {e}")))?;
        let response = Self::check(response, "get thread").await?;

        response
            .json()
            .await
            .map_err(|e| SitesageError::Service(format!("invalid thread response: {e}")))
    }

    /// Append a message to a thread.
    #[instrument(skip(self, content), fields(thread_id = %thread_id, role = ?role))]
    pub async fn append_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<Message> {
        let request = AppendMessageRequest { role, content };

        let response = self
            .request(Method::POST, &format!("/v1/threads/{thread_id}/messages"))
            .json(&request)
            .send()
            .await
            .map_err(|e| SitesageError::Service(format!("append message failed: {e}")))?;
        let response = Self::check(response, "append message").await?;

        response
            .json()
            .await
            .map_err(|e| SitesageError::Service(format!("invalid message response: {e}")))
    }

    /// List messages in a thread, newest first when `order` is descending.
    #[instrument(skip(self), fields(thread_id = %thread_id))]
    pub async fn list_messages(
        &self,
        thread_id: &str,
        limit: usize,
        order: MessageOrder,
    ) -> Result<Vec<Message>> {
        let response = self
            .request(Method::GET, &format!("/v1/threads/{thread_id}/messages"))
            .query(&[("limit", limit.to_string().as_str()), ("order", order.as_str())])
            .send()
            .await
            .map_err(|e| SitesageError::Service(format!("list messages failed: {e}")))?;
        let response = Self::check(response, "list messages").await?;

        let list: MessageList = response
            .json()
            .await
            .map_err(|e| SitesageError::Service(format!("invalid message list: {e}")))?;

        Ok(list.data)
    }
}
