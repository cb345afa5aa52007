use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::{ErrorKind, GatewayError};

/// Reference to a generated asset
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// Asset served from the provider's own storage
    Url(String),
    /// Asset returned in the response itself
    Inline {
        bytes: Vec<u8>,
        content_type: Option<String>,
    },
}

impl Artifact {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Url(url) => url.trim().is_empty(),
            Self::Inline { bytes, .. } => bytes.is_empty(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Url(url) => Some(url),
            Self::Inline { .. } => None,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Url(_) => None,
            Self::Inline { bytes, .. } => Some(bytes),
        }
    }
}

// URL artifacts serialize as the URL, inline ones as base64 so results stay printable.
impl Serialize for Artifact {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(tag = "type", rename_all = "snake_case")]
        enum Repr<'a> {
            Url {
                url: &'a str,
            },
            Inline {
                base64: String,
                content_type: Option<&'a str>,
                size_bytes: usize,
            },
        }

        let repr = match self {
            Self::Url(url) => Repr::Url { url },
            Self::Inline {
                bytes,
                content_type,
            } => Repr::Inline {
                base64: STANDARD.encode(bytes),
                content_type: content_type.as_deref(),
                size_bytes: bytes.len(),
            },
        };
        repr.serialize(serializer)
    }
}

/// Canonical lifecycle of an asynchronous provider task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Processing,
    Succeeded,
    Failed,
}

impl TaskStatus {
    /// Position in the forward-only ordering; both terminal states share a rank
    fn rank(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Processing => 1,
            Self::Succeeded | Self::Failed => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 2
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// What one status check reported
#[derive(Debug, Clone, PartialEq)]
pub struct StatusObservation {
    pub status: TaskStatus,
    pub artifact: Option<Artifact>,
    pub message: Option<String>,
}

/// Handle on a provider-side task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollableTask {
    pub task_id: String,
    pub status: TaskStatus,
    pub last_polled: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PollableTask {
    pub fn queued(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Queued,
            last_polled: Utc::now(),
            artifact: None,
            message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a status observation.
    ///
    /// Terminal tasks never change, and an observation ranked below the current
    /// status is ignored. Returns whether the status moved.
    pub fn advance(&mut self, observation: StatusObservation) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.last_polled = Utc::now();

        if observation.status.rank() < self.status.rank() {
            return false;
        }

        let moved = observation.status != self.status;
        self.status = observation.status;
        match observation.status {
            TaskStatus::Succeeded => self.artifact = observation.artifact,
            TaskStatus::Failed => {
                self.message = Some(
                    observation
                        .message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| format!("Task {} failed", self.task_id)),
                );
            }
            TaskStatus::Queued | TaskStatus::Processing => {}
        }
        moved
    }
}

/// Outcome of a successful dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    /// Synchronous provider returned the finished artifact
    Completed(Artifact),
    /// Asynchronous provider accepted the work; poll for the result
    Pending(PollableTask),
}

/// Render-ready result: what a UI shows after a generation settles
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum GenerationResult {
    Completed { artifact: Artifact },
    Failed { kind: ErrorKind, message: String },
}

impl GenerationResult {
    pub fn from_error(error: &GatewayError) -> Self {
        Self::Failed {
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    /// Result of a settled task; `None` while the task is still running
    pub fn from_task(task: &PollableTask) -> Option<Self> {
        match task.status {
            TaskStatus::Succeeded => task.artifact.clone().map(|artifact| Self::Completed { artifact }),
            TaskStatus::Failed => Some(Self::Failed {
                kind: ErrorKind::ProviderError,
                message: task
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("Task {} failed", task.task_id)),
            }),
            TaskStatus::Queued | TaskStatus::Processing => None,
        }
    }
}
