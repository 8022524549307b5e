//! Purge Workflow Engine
//!
//! Sequences one run: fetch inventory once, normalize, filter, present,
//! confirm, then delete candidates one at a time. It's dumb: it calls the
//! backend and files outcomes. No HTTP, no rendering.

use crate::backend::SwimBackend;
use crate::deletion::{default_delete_paths, DeletePath, DeletionProtocol};
use crate::error::SwimError;
use crate::filter::FilterSpec;
use crate::normalize::normalize_all;
use crate::poller::PollerConfig;
use crate::report::PurgeReport;
use crate::types::{GoldenScope, ImageRecord, InventoryQuery};
use tracing::{debug, info};

/// Workflow configuration.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Present candidates and stop without deleting anything.
    pub dry_run: bool,
    /// Skip interactive confirmation.
    pub assume_yes: bool,
    /// Delete at most this many candidates. 0 means no limit.
    pub limit: usize,
    /// Scope for clearing golden tags before deletion.
    pub golden_scope: Option<GoldenScope>,
    /// Task polling timing.
    pub poller: PollerConfig,
    /// Delete endpoints in preference order.
    pub delete_paths: Vec<DeletePath>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            assume_yes: false,
            limit: 0,
            golden_scope: None,
            poller: PollerConfig::default(),
            delete_paths: default_delete_paths(),
        }
    }
}

/// The human (or script) on the other side of a run.
pub trait Operator {
    /// Show the candidate list before anything is mutated.
    fn present(&mut self, candidates: &[ImageRecord]);
    /// Ask to go ahead. `false` aborts with no mutation.
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Dry run: candidates presented, nothing touched.
    DryRun { matches: Vec<ImageRecord> },
    /// The filter selected nothing.
    NothingToDelete,
    /// The operator declined.
    Aborted { matches: Vec<ImageRecord> },
    /// Deletions ran.
    Completed(PurgeReport),
}

/// The purge workflow engine.
///
/// Parameterized by the backend; you provide the implementation.
pub struct PurgeWorkflow<'a, B: SwimBackend> {
    backend: &'a B,
    config: WorkflowConfig,
}

impl<'a, B: SwimBackend> PurgeWorkflow<'a, B> {
    pub fn new(backend: &'a B, config: WorkflowConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Fetch the inventory and keep what the filter matches.
    ///
    /// `query` only trims the server response; `filter` decides.
    pub async fn select(
        &self,
        query: &InventoryQuery,
        filter: &FilterSpec,
    ) -> Result<Vec<ImageRecord>, SwimError> {
        let raw = self.backend.list_inventory(query).await?;
        let records = normalize_all(&raw);
        debug!(
            fetched = records.len(),
            predicates = ?filter.predicates().iter().map(|p| p.name()).collect::<Vec<_>>(),
            "applying filter"
        );
        let selected = filter.select(records);
        info!(matches = selected.len(), "inventory filtered");
        Ok(selected)
    }

    /// How many of `matches` candidates a run acts on.
    pub fn batch_size(&self, matches: usize) -> usize {
        match self.config.limit {
            0 => matches,
            limit => limit.min(matches),
        }
    }

    /// Delete candidates in order, up to the limit. Per-item failures are
    /// filed in the report and never stop the batch.
    pub async fn execute(&self, candidates: &[ImageRecord]) -> PurgeReport {
        let protocol = DeletionProtocol::new(
            self.backend,
            &self.config.delete_paths,
            self.config.golden_scope.as_ref(),
            self.config.poller.clone(),
        );

        let mut report = PurgeReport::new();
        for record in candidates.iter().take(self.batch_size(candidates.len())) {
            let outcome = protocol.delete(record).await;
            report.record(record, outcome);
        }
        info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "purge finished"
        );
        report
    }

    /// Run the whole pass. Only fatal errors come back as `Err`.
    pub async fn run<O: Operator>(
        &self,
        query: &InventoryQuery,
        filter: &FilterSpec,
        operator: &mut O,
    ) -> Result<RunOutcome, SwimError> {
        let matches = self.select(query, filter).await?;
        operator.present(&matches);

        if self.config.dry_run {
            return Ok(RunOutcome::DryRun { matches });
        }
        if matches.is_empty() {
            return Ok(RunOutcome::NothingToDelete);
        }

        let prompt = format!(
            "Proceed to delete up to {} image(s)?",
            self.batch_size(matches.len())
        );
        if !self.config.assume_yes && !operator.confirm(&prompt) {
            info!("aborted by operator");
            return Ok(RunOutcome::Aborted { matches });
        }

        Ok(RunOutcome::Completed(self.execute(&matches).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkflowConfig::default();
        assert!(!config.dry_run);
        assert!(!config.assume_yes);
        assert_eq!(config.limit, 0);
        assert!(config.golden_scope.is_none());
        assert_eq!(config.delete_paths.len(), 2);
    }
}
