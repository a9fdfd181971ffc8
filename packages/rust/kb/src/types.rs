//! Wire types shared across service endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// A processed upload, ready to attach to a knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    /// Service-assigned file identifier.
    pub id: String,
}

// ---------------------------------------------------------------------------
// Threads / messages
// ---------------------------------------------------------------------------

/// A conversation thread.
#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    /// Service-assigned thread identifier.
    pub id: String,
    /// When the thread was created.
    pub created_at: DateTime<Utc>,
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One message in a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Service-assigned message identifier.
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Sort order for message listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrder {
    /// Oldest first.
    Asc,
    /// Newest first.
    Desc,
}

impl MessageOrder {
    /// Query-parameter value for this order.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

/// Lifecycle state of an answer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
    Expired,
}

impl RunStatus {
    /// Whether the service will never change this status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled | Self::Expired)
    }

    /// Wire name of the status, for error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

/// Failure detail attached to an unsuccessful run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    /// Machine-readable error code, when the service provides one.
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

/// One answer run over a thread.
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    /// Service-assigned run identifier.
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
    /// Present when the run reached a failure state.
    #[serde(default)]
    pub last_error: Option<RunError>,
}
