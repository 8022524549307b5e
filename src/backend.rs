//! The One Trait: SwimBackend
//!
//! This is the single abstraction point for everything that talks to the
//! controller. The workflow engine is pure logic. It doesn't know about
//! HTTP, tokens, or TLS; the implementation owns the transport context.

use crate::error::SwimError;
use crate::types::{ApiResponse, GoldenScope, InventoryQuery, RawRecord, TaskStatus};
use std::future::Future;

/// The trait a controller client implements to drive the purge workflow.
///
/// Abstracts:
/// - Image inventory listing
/// - Delete calls against a concrete endpoint path
/// - Golden-tag removal
/// - Async task status queries
pub trait SwimBackend: Send + Sync {
    /// List raw inventory entries. A non-success status is an error;
    /// the workflow treats it as fatal.
    fn list_inventory(
        &self,
        query: &InventoryQuery,
    ) -> impl Future<Output = Result<Vec<RawRecord>, SwimError>> + Send;

    /// Issue a DELETE against `path` (relative to the controller base URL).
    /// Any HTTP status comes back as `Ok`; only transport failures are `Err`.
    fn delete_by_path(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<ApiResponse, SwimError>> + Send;

    /// Clear the golden tag for an image within a scope.
    fn remove_golden_tag(
        &self,
        scope: &GoldenScope,
        image_id: &str,
    ) -> impl Future<Output = Result<ApiResponse, SwimError>> + Send;

    /// Query an async task. A non-success status is an error.
    fn get_task_status(
        &self,
        task_id: &str,
    ) -> impl Future<Output = Result<TaskStatus, SwimError>> + Send;
}
