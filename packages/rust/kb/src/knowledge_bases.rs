//! Knowledge-base management.
//!
//! Updating replaces the knowledge base's document set; the service does
//! not merge old and new files.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use sitesage_shared::{Result, SitesageError};

use crate::KbClient;

#[derive(Debug, Serialize)]
struct CreateKnowledgeBaseRequest<'a> {
    name: &'a str,
    description: &'a str,
    instructions: &'a str,
    file_ids: &'a [String],
}

#[derive(Debug, Serialize)]
struct UpdateKnowledgeBaseRequest<'a> {
    file_ids: &'a [String],
}

#[derive(Debug, Deserialize)]
struct KnowledgeBaseResponse {
    id: String,
}

impl KbClient {
    /// Create a knowledge base seeded with the given files. Returns its id.
    #[instrument(skip(self, description, instructions), fields(name = %name))]
    pub async fn create_knowledge_base(
        &self,
        name: &str,
        description: &str,
        instructions: &str,
        file_ids: &[String],
    ) -> Result<String> {
        let request = CreateKnowledgeBaseRequest {
            name,
            description,
            instructions,
            file_ids,
        };

        let response = self
            .request(Method::POST, "/v1/knowledge-bases")
            .json(&request)
            .send()
            .await
            .map_err(|e| SitesageError::Service(format!("create knowledge base failed: {e}")))?;
        let response = Self::check(response, "create knowledge base").await?;

        let kb: KnowledgeBaseResponse = response
            .json()
            .await
            .map_err(|e| SitesageError::Service(format!("invalid knowledge base response: {e}")))?;

        debug!(kb_id = %kb.id, "knowledge base created");
        Ok(kb.id)
    }

    /// Replace the document set of an existing knowledge base.
    #[instrument(skip(self), fields(kb_id = %id, files = file_ids.len()))]
    pub async fn update_knowledge_base(&self, id: &str, file_ids: &[String]) -> Result<()> {
        let request = UpdateKnowledgeBaseRequest { file_ids };

        let response = self
            .request(Method::POST, &format!("/v1/knowledge-bases/{id}"))
            .json(&request)
            .send()
            .await
            .map_err(|e| SitesageError::Service(format!("update knowledge base failed: {e}")))?;
        Self::check(response, "update knowledge base").await?;

        debug!(kb_id = %id, "knowledge base updated");
        Ok(())
    }

    /// Delete a knowledge base.
    #[instrument(skip(self), fields(kb_id = %id))]
    pub async fn delete_knowledge_base(&self, id: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, &format!("/v1/knowledge-bases/{id}"))
            .send()
            .await
            .map_err(|e| SitesageError::Service(format!("delete knowledge base failed: {e}")))?;
        Self::check(response, "delete knowledge base").await?;

        Ok(())
    }
}
