//! Deletion protocol for a single image.
//!
//! 1. Optionally clear the golden tag (best-effort unless its task fails).
//! 2. Try each candidate delete path in preference order; first success wins.
//! 3. Poll the returned task handle, if any.
//!
//! Transport errors never escape: everything ends up in a [`DeletionOutcome`].

use crate::backend::SwimBackend;
use crate::poller::{PollerConfig, TaskPoller, TaskResult};
use crate::types::{ApiResponse, GoldenScope, ImageRecord};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Placeholder substituted with the image id in path templates.
pub const IMAGE_ID_PLACEHOLDER: &str = "{imageId}";

/// How a mutating call's status code reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// Acknowledged; may carry a task handle.
    Accepted,
    /// Done, nothing to poll.
    NoContent,
    /// Anything else.
    Rejected,
}

/// Status codes that count as success for a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessCodes {
    pub accepted: Vec<u16>,
    pub no_content: Vec<u16>,
}

impl Default for SuccessCodes {
    fn default() -> Self {
        Self {
            accepted: vec![200, 202],
            no_content: vec![204],
        }
    }
}

impl SuccessCodes {
    pub fn classify(&self, status: u16) -> ResponseClass {
        if self.accepted.contains(&status) {
            ResponseClass::Accepted
        } else if self.no_content.contains(&status) {
            ResponseClass::NoContent
        } else {
            ResponseClass::Rejected
        }
    }
}

/// One candidate delete endpoint: a path template plus what success looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePath {
    pub template: String,
    pub codes: SuccessCodes,
}

impl DeletePath {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            codes: SuccessCodes::default(),
        }
    }

    pub fn render(&self, image_id: &str) -> String {
        self.template.replace(IMAGE_ID_PLACEHOLDER, image_id)
    }
}

/// Delete endpoints in preference order: current path first, then the
/// one older controller builds expose.
pub fn default_delete_paths() -> Vec<DeletePath> {
    vec![
        DeletePath::new("/dna/intent/api/v1/image/importation/{imageId}"),
        DeletePath::new("/dna/intent/api/v1/image/{imageId}"),
    ]
}

/// A delete path that did not succeed. `status` is `None` when the call
/// never got a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathAttempt {
    pub path: String,
    pub status: Option<u16>,
}

/// The path that worked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSuccess {
    pub path: String,
    pub task_id: Option<String>,
}

/// Why an image was not deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    MissingId,
    RemoveGolden(String),
    DeleteRejected {
        attempts: Vec<PathAttempt>,
        last_body: String,
    },
    TaskFailed(String),
    TaskTimeout,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::MissingId => write!(f, "missing image id"),
            FailureReason::RemoveGolden(why) => write!(f, "remove_golden failed: {}", why),
            FailureReason::DeleteRejected {
                attempts,
                last_body,
            } => {
                let tried: Vec<String> = attempts
                    .iter()
                    .map(|a| match a.status {
                        Some(code) => format!("({}, {})", a.path, code),
                        None => format!("({}, no response)", a.path),
                    })
                    .collect();
                write!(
                    f,
                    "delete failed (paths tried [{}]): {}",
                    tried.join(", "),
                    last_body
                )
            }
            FailureReason::TaskFailed(why) => write!(f, "task failed: {}", why),
            FailureReason::TaskTimeout => write!(f, "task failed: task timeout"),
        }
    }
}

/// Result of running the protocol for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    Deleted {
        id: String,
        path: String,
        task_id: Option<String>,
    },
    Failed {
        id: Option<String>,
        reason: FailureReason,
    },
}

impl DeletionOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeletionOutcome::Deleted { .. })
    }
}

/// Runs the deletion steps for one image at a time.
pub struct DeletionProtocol<'a, B: SwimBackend> {
    backend: &'a B,
    poller: TaskPoller<'a, B>,
    paths: &'a [DeletePath],
    golden_scope: Option<&'a GoldenScope>,
}

impl<'a, B: SwimBackend> DeletionProtocol<'a, B> {
    pub fn new(
        backend: &'a B,
        paths: &'a [DeletePath],
        golden_scope: Option<&'a GoldenScope>,
        poller: PollerConfig,
    ) -> Self {
        Self {
            backend,
            poller: TaskPoller::new(backend, poller),
            paths,
            golden_scope,
        }
    }

    /// Delete one image, returning a structured outcome.
    pub async fn delete(&self, record: &ImageRecord) -> DeletionOutcome {
        let id = match record.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                return DeletionOutcome::Failed {
                    id: None,
                    reason: FailureReason::MissingId,
                }
            }
        };

        if record.is_golden {
            if let Some(scope) = self.golden_scope {
                if let Err(reason) = self.remove_golden(scope, &id).await {
                    return DeletionOutcome::Failed {
                        id: Some(id),
                        reason,
                    };
                }
            }
        }

        info!(image_id = %id, name = %record.name, version = %record.version, "deleting image");
        let success = match self.attempt_paths(&id).await {
            Ok(success) => success,
            Err(reason) => {
                return DeletionOutcome::Failed {
                    id: Some(id),
                    reason,
                }
            }
        };

        if let Some(task_id) = &success.task_id {
            match self.poller.wait(task_id).await {
                TaskResult::Success { .. } => {}
                TaskResult::Failure { reason, .. } => {
                    return DeletionOutcome::Failed {
                        id: Some(id),
                        reason: FailureReason::TaskFailed(reason),
                    }
                }
                TaskResult::Timeout { .. } => {
                    return DeletionOutcome::Failed {
                        id: Some(id),
                        reason: FailureReason::TaskTimeout,
                    }
                }
            }
        }

        info!(image_id = %id, path = %success.path, "deleted");
        DeletionOutcome::Deleted {
            id,
            path: success.path,
            task_id: success.task_id,
        }
    }

    /// Clear the golden tag. Only a failed or timed-out removal task is an
    /// error; an outright rejection is logged and deletion goes ahead.
    async fn remove_golden(&self, scope: &GoldenScope, id: &str) -> Result<(), FailureReason> {
        info!(image_id = %id, site = %scope.site_id, role = %scope.device_role, "removing golden tag");
        let response = match self.backend.remove_golden_tag(scope, id).await {
            Ok(response) => response,
            Err(e) => {
                warn!(image_id = %id, error = %e, "remove_golden failed, continuing");
                return Ok(());
            }
        };

        let codes = SuccessCodes::default();
        match codes.classify(response.status) {
            ResponseClass::Accepted => {
                let Some(task_id) = response.task_id.as_deref() else {
                    return Ok(());
                };
                match self.poller.wait(task_id).await {
                    TaskResult::Success { .. } => Ok(()),
                    other => Err(FailureReason::RemoveGolden(
                        other.error().unwrap_or_default(),
                    )),
                }
            }
            ResponseClass::NoContent => Ok(()),
            ResponseClass::Rejected => {
                warn!(
                    image_id = %id,
                    status = response.status,
                    body = %response.body,
                    "remove_golden failed, continuing"
                );
                Ok(())
            }
        }
    }

    /// Try each delete path in order, stopping at the first success.
    pub async fn attempt_paths(&self, id: &str) -> Result<PathSuccess, FailureReason> {
        let mut attempts = Vec::with_capacity(self.paths.len());
        let mut last_body = String::new();

        for candidate in self.paths {
            let path = candidate.render(id);
            let ApiResponse {
                status,
                task_id,
                body,
            } = match self.backend.delete_by_path(&path).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(image_id = %id, path = %path, error = %e, "delete call failed");
                    last_body = e.to_string();
                    attempts.push(PathAttempt { path, status: None });
                    continue;
                }
            };

            match candidate.codes.classify(status) {
                ResponseClass::Accepted => return Ok(PathSuccess { path, task_id }),
                ResponseClass::NoContent => {
                    return Ok(PathSuccess {
                        path,
                        task_id: None,
                    })
                }
                ResponseClass::Rejected => {
                    warn!(image_id = %id, path = %path, status, "delete path rejected");
                    last_body = body;
                    attempts.push(PathAttempt {
                        path,
                        status: Some(status),
                    });
                }
            }
        }

        Err(FailureReason::DeleteRejected {
            attempts,
            last_body,
        })
    }
}
