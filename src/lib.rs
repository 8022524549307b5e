//! SWIM Purge Library
//!
//! Filter-and-delete workflow engine for firmware images held in a
//! Catalyst Center image repository.
//!
//! # Design
//!
//! The engine holds the logic (normalize, filter, delete with path fallback,
//! poll async tasks) without coupling to any transport. You implement the
//! [`SwimBackend`] trait, or use the bundled [`CatalystClient`], and the
//! workflow sequences the run one image at a time.
//!
//! # Usage
//!
//! ```ignore
//! use swim_purge::{FilterSpec, InventoryQuery, PurgeWorkflow, RunOutcome, WorkflowConfig};
//!
//! let filter = FilterSpec::new().family("cat9k").golden(false).older_than_days(90);
//! let config = WorkflowConfig { assume_yes: true, ..Default::default() };
//! let workflow = PurgeWorkflow::new(&backend, config);
//!
//! match workflow.run(&InventoryQuery::default(), &filter, &mut operator).await? {
//!     RunOutcome::Completed(report) => println!("deleted {}", report.deleted.len()),
//!     RunOutcome::DryRun { matches } => println!("{} would go", matches.len()),
//!     _ => {}
//! }
//! ```

pub mod backend;
pub mod deletion;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod poller;
pub mod report;
pub mod types;
pub mod workflow;

#[cfg(feature = "default-client")]
pub mod client;

pub use backend::SwimBackend;
pub use deletion::{
    default_delete_paths, DeletePath, DeletionOutcome, DeletionProtocol, FailureReason,
    PathAttempt, PathSuccess, ResponseClass, SuccessCodes,
};
pub use error::SwimError;
pub use filter::{FilterOptions, FilterSpec, Predicate};
pub use normalize::{normalize, normalize_all};
pub use poller::{PollerConfig, TaskPoller, TaskResult, TaskState};
pub use report::{DeletedImage, FailedImage, PurgeReport};
pub use types::*;
pub use workflow::{Operator, PurgeWorkflow, RunOutcome, WorkflowConfig};

#[cfg(feature = "default-client")]
pub use client::{CatalystClient, Credentials, TransportContext};
