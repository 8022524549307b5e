//! Task poller.
//!
//! Drives one server-side async task from `Pending` to a terminal state.
//! Terminal states are absorbing. Polls are strictly sequential and the wait
//! between them suspends the caller; nothing else proceeds meanwhile.

use crate::backend::SwimBackend;
use crate::types::TaskStatus;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Progress keywords that mean the task finished. Matched as
/// case-insensitive substrings of the free-text progress field.
pub const COMPLETION_KEYWORDS: &[&str] = &["completed", "success", "done", "deletion"];

/// Poller configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Give up once this much time has elapsed without a terminal state.
    pub timeout: Duration,
    /// Wait between polls while pending.
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            interval: Duration::from_millis(2500),
        }
    }
}

/// Lifecycle of one task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    Pending,
    Succeeded,
    Failed { reason: String },
    TimedOut,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Pending)
    }
}

/// Final answer for a polled task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    Success { data: Value },
    Failure { reason: String, raw: Option<Value> },
    Timeout { raw: Value },
}

impl TaskResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success { .. })
    }

    /// Operator-facing reason, `None` on success.
    pub fn error(&self) -> Option<String> {
        match self {
            TaskResult::Success { .. } => None,
            TaskResult::Failure { reason, .. } => Some(reason.clone()),
            TaskResult::Timeout { .. } => Some("task timeout".to_string()),
        }
    }
}

/// Does this progress text say the task is finished?
pub fn progress_is_complete(progress: &str) -> bool {
    let lowered = progress.to_lowercase();
    COMPLETION_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Classify one observation. Errors win over any progress text.
pub fn classify(status: &TaskStatus) -> TaskState {
    if status.is_error || status.failure_reason.is_some() {
        let reason = status
            .failure_reason
            .clone()
            .unwrap_or_else(|| "task reported error".to_string());
        return TaskState::Failed { reason };
    }
    match &status.progress {
        Some(progress) if progress_is_complete(progress) => TaskState::Succeeded,
        _ => TaskState::Pending,
    }
}

/// Polls a task handle through the backend until it settles.
pub struct TaskPoller<'a, B: SwimBackend> {
    backend: &'a B,
    config: PollerConfig,
}

impl<'a, B: SwimBackend> TaskPoller<'a, B> {
    pub fn new(backend: &'a B, config: PollerConfig) -> Self {
        Self { backend, config }
    }

    /// Poll until success, failure, or timeout.
    ///
    /// A poll that fails at the transport level is terminal, not pending.
    pub async fn wait(&self, task_id: &str) -> TaskResult {
        let started = Instant::now();
        let mut polls: u32 = 0;
        loop {
            polls += 1;
            let status = match self.backend.get_task_status(task_id).await {
                Ok(status) => status,
                Err(e) => {
                    return TaskResult::Failure {
                        reason: e.to_string(),
                        raw: None,
                    }
                }
            };

            let mut state = classify(&status);
            if state == TaskState::Pending && started.elapsed() > self.config.timeout {
                state = TaskState::TimedOut;
            }
            debug!(task_id, polls, state = ?state, progress = ?status.progress, "task poll");
            match state {
                TaskState::Succeeded => return TaskResult::Success { data: status.raw },
                TaskState::Failed { reason } => {
                    return TaskResult::Failure {
                        reason,
                        raw: Some(status.raw),
                    }
                }
                TaskState::TimedOut => return TaskResult::Timeout { raw: status.raw },
                TaskState::Pending => tokio::time::sleep(self.config.interval).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status(progress: Option<&str>, is_error: bool, failure: Option<&str>) -> TaskStatus {
        TaskStatus {
            progress: progress.map(str::to_string),
            is_error,
            failure_reason: failure.map(str::to_string),
            raw: json!({}),
        }
    }

    #[test]
    fn test_default_config() {
        let config = PollerConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.interval, Duration::from_millis(2500));
    }

    #[test]
    fn test_completion_keywords() {
        assert!(progress_is_complete("Image Deletion Completed"));
        assert!(progress_is_complete("SUCCESS"));
        assert!(progress_is_complete("done"));
        assert!(progress_is_complete("deletion of image started"));
        assert!(!progress_is_complete("In progress"));
        assert!(!progress_is_complete(""));
    }

    #[test]
    fn test_failure_reason_beats_progress() {
        let s = status(Some("completed"), false, Some("image in use"));
        assert_eq!(
            classify(&s),
            TaskState::Failed {
                reason: "image in use".into()
            }
        );
        let s = status(Some("success"), true, None);
        assert_eq!(
            classify(&s),
            TaskState::Failed {
                reason: "task reported error".into()
            }
        );
    }

    #[test]
    fn test_structured_failure_reason_fails() {
        let s = TaskStatus::from_json(json!({
            "response": {"progress": "In progress", "failureReason": {"code": "NCSW1"}}
        }));
        assert!(matches!(classify(&s), TaskState::Failed { reason } if reason.contains("NCSW1")));
    }

    #[test]
    fn test_empty_response_wrapper_reads_outer_body() {
        let s = TaskStatus::from_json(json!({"response": {}, "progress": "done"}));
        assert_eq!(classify(&s), TaskState::Succeeded);
    }

    #[test]
    fn test_pending_without_keyword() {
        assert_eq!(classify(&status(Some("queued"), false, None)), TaskState::Pending);
        assert_eq!(classify(&status(None, false, None)), TaskState::Pending);
        assert!(!TaskState::Pending.is_terminal());
        assert!(TaskState::TimedOut.is_terminal());
    }

    #[test]
    fn test_task_result_error_text() {
        assert_eq!(TaskResult::Success { data: json!({}) }.error(), None);
        assert_eq!(
            TaskResult::Timeout { raw: json!({}) }.error().as_deref(),
            Some("task timeout")
        );
    }
}
