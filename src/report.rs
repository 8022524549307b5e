//! Structured run report.
//!
//! The workflow always produces this, whatever the caller ends up
//! rendering (JSON for automation or plain lines for a terminal).

use crate::deletion::{DeletionOutcome, FailureReason};
use crate::types::ImageRecord;
use serde::{Serialize, Serializer};

/// An image that was deleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeletedImage {
    #[serde(flatten)]
    pub row: ImageRecord,
    /// Delete path that succeeded.
    pub path: String,
    #[serde(rename = "taskId", skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// An image that could not be deleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedImage {
    pub row: ImageRecord,
    #[serde(rename = "error", serialize_with = "display_reason")]
    pub reason: FailureReason,
}

fn display_reason<S: Serializer>(reason: &FailureReason, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(reason)
}

/// Deleted and failed items of one run. Candidates past the limit
/// appear in neither list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PurgeReport {
    pub deleted: Vec<DeletedImage>,
    pub failed: Vec<FailedImage>,
}

impl PurgeReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// File one outcome under the record it belongs to.
    pub fn record(&mut self, row: &ImageRecord, outcome: DeletionOutcome) {
        match outcome {
            DeletionOutcome::Deleted { path, task_id, .. } => self.deleted.push(DeletedImage {
                row: row.clone(),
                path,
                task_id,
            }),
            DeletionOutcome::Failed { reason, .. } => self.failed.push(FailedImage {
                row: row.clone(),
                reason,
            }),
        }
    }

    pub fn attempted(&self) -> usize {
        self.deleted.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
