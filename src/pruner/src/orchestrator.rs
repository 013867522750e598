//! Per-class cleanup runs: list, group, select, then report or delete.
//!
//! ## Safety Guarantees
//!
//! - The newest backup of every volume is always kept
//! - Dry-run mode never issues a delete
//! - A failed delete is counted and never stops the remaining ones
//! - Boot and block volume backups are separate retention domains

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::grouper::group_by_volume;
use crate::model::{BackupRecord, ResourceClass};
use crate::pool::{DeletionOutcome, DeletionWorkerPool, PoolError, shutdown_requested};
use crate::retention::select;
use crate::service::{BackupService, ServiceError};

/// Exit status for a clean run.
pub const EXIT_OK: u8 = 0;
/// Exit status when any delete failed or the run could not start.
pub const EXIT_FAILURE: u8 = 1;
/// Exit status after an interrupt (128 + SIGINT).
pub const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("--boot-only and --block-only are mutually exclusive")]
    ConflictingClassFilters,

    #[error("Worker count must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    #[error("Compartment id must not be empty")]
    EmptyCompartment,
}

impl From<PoolError> for PlanError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::InvalidConcurrency(n) => PlanError::InvalidConcurrency(n),
        }
    }
}

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("Failed to list {class} backups")]
    Listing {
        class: ResourceClass,
        #[source]
        source: ServiceError,
    },
}

/// Which backup classes a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassSelection {
    Both,
    BootOnly,
    BlockOnly,
}

impl ClassSelection {
    pub fn from_flags(boot_only: bool, block_only: bool) -> Result<Self, PlanError> {
        match (boot_only, block_only) {
            (true, true) => Err(PlanError::ConflictingClassFilters),
            (true, false) => Ok(Self::BootOnly),
            (false, true) => Ok(Self::BlockOnly),
            (false, false) => Ok(Self::Both),
        }
    }

    /// Classes in processing order.
    pub fn classes(&self) -> &'static [ResourceClass] {
        match self {
            Self::Both => &[ResourceClass::BootVolume, ResourceClass::BlockVolume],
            Self::BootOnly => &[ResourceClass::BootVolume],
            Self::BlockOnly => &[ResourceClass::BlockVolume],
        }
    }
}

#[derive(Debug, Clone)]
pub struct CleanupPlan {
    pub compartment_id: String,
    /// Backups to keep per volume; values below 1 behave as 1
    pub keep: i64,
    pub classes: ClassSelection,
    pub dry_run: bool,
    pub concurrency: usize,
    /// Pause a worker takes after each successful delete
    pub inter_item_delay: Duration,
}

impl CleanupPlan {
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.compartment_id.trim().is_empty() {
            return Err(PlanError::EmptyCompartment);
        }
        if self.concurrency == 0 {
            return Err(PlanError::InvalidConcurrency(self.concurrency));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPhase {
    Listing,
    Grouping,
    Selecting,
    Reporting,
    Deleting,
    Done,
}

impl fmt::Display for CleanupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CleanupPhase::Listing => "listing",
            CleanupPhase::Grouping => "grouping",
            CleanupPhase::Selecting => "selecting",
            CleanupPhase::Reporting => "reporting",
            CleanupPhase::Deleting => "deleting",
            CleanupPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Counts for one backup class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassReport {
    pub class: ResourceClass,
    pub listed: usize,
    pub eligible: usize,
    pub candidates: usize,
    /// In dry-run mode, the number of backups that would be deleted
    pub deleted: usize,
    pub errors: usize,
    pub outcomes: Vec<DeletionOutcome>,
    pub interrupted: bool,
}

impl ClassReport {
    fn new(class: ResourceClass) -> Self {
        Self {
            class,
            listed: 0,
            eligible: 0,
            candidates: 0,
            deleted: 0,
            errors: 0,
            outcomes: Vec::new(),
            interrupted: false,
        }
    }

    /// Candidates that were never attempted because of an interrupt.
    pub fn skipped(&self) -> usize {
        self.candidates.saturating_sub(self.deleted + self.errors)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub dry_run: bool,
    pub classes: Vec<ClassReport>,
    pub interrupted: bool,
}

impl CleanupReport {
    pub fn total_deleted(&self) -> usize {
        self.classes.iter().map(|c| c.deleted).sum()
    }

    pub fn total_errors(&self) -> usize {
        self.classes.iter().map(|c| c.errors).sum()
    }

    pub fn class(&self, class: ResourceClass) -> Option<&ClassReport> {
        self.classes.iter().find(|c| c.class == class)
    }

    pub fn exit_code(&self) -> u8 {
        if self.interrupted {
            EXIT_INTERRUPTED
        } else if self.total_errors() > 0 {
            EXIT_FAILURE
        } else {
            EXIT_OK
        }
    }
}

pub struct CleanupOrchestrator {
    service: Arc<dyn BackupService>,
    plan: CleanupPlan,
}

impl CleanupOrchestrator {
    /// Validates the plan up front so a bad plan never reaches the provider.
    pub fn new(service: Arc<dyn BackupService>, plan: CleanupPlan) -> Result<Self, PlanError> {
        plan.validate()?;
        Ok(Self { service, plan })
    }

    pub fn plan(&self) -> &CleanupPlan {
        &self.plan
    }

    pub async fn execute(&self) -> Result<CleanupReport, CleanupError> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        self.execute_until(shutdown_rx).await
    }

    /// Run every selected class in turn. Once `shutdown` turns `true` no new
    /// class is started and no new delete is issued.
    pub async fn execute_until(
        &self,
        shutdown: watch::Receiver<bool>,
    ) -> Result<CleanupReport, CleanupError> {
        info!(
            compartment_id = %self.plan.compartment_id,
            keep = self.plan.keep,
            dry_run = self.plan.dry_run,
            workers = self.plan.concurrency,
            "Starting backup cleanup"
        );

        let pool = DeletionWorkerPool::new(
            Arc::clone(&self.service),
            self.plan.concurrency,
            self.plan.inter_item_delay,
        )
        .map_err(PlanError::from)?;

        let mut report = CleanupReport {
            dry_run: self.plan.dry_run,
            classes: Vec::new(),
            interrupted: false,
        };

        for &class in self.plan.classes.classes() {
            if *shutdown.borrow() {
                report.interrupted = true;
                break;
            }

            let class_report = self.run_class(&pool, class, shutdown.clone()).await?;
            let interrupted = class_report.interrupted;
            report.classes.push(class_report);
            if interrupted {
                report.interrupted = true;
                break;
            }
        }

        if report.interrupted {
            warn!("Interrupted; pending deletions were not attempted");
        }
        info!("Deleted: {}", report.total_deleted());
        info!("Errors : {}", report.total_errors());

        Ok(report)
    }

    async fn run_class(
        &self,
        pool: &DeletionWorkerPool,
        class: ResourceClass,
        shutdown: watch::Receiver<bool>,
    ) -> Result<ClassReport, CleanupError> {
        let mut run = ClassRun::new(class);
        info!("Checking {class} backups...");

        let mut listing_shutdown = shutdown.clone();
        let listed = tokio::select! {
            result = self.service.list_backups(&self.plan.compartment_id, class) => Some(result),
            _ = shutdown_requested(&mut listing_shutdown) => None,
        };
        let records = match listed {
            Some(result) => result.map_err(|source| CleanupError::Listing { class, source })?,
            None => return Ok(run.interrupt("Listing interrupted")),
        };
        // Nothing is reported or deleted once an interrupt has arrived.
        if *shutdown.borrow() {
            return Ok(run.interrupt("Listing interrupted"));
        }
        run.report.listed = records.len();

        let eligible: Vec<BackupRecord> = records
            .into_iter()
            .filter(BackupRecord::is_available)
            .collect();
        run.report.eligible = eligible.len();
        debug!(
            class = %class,
            listed = run.report.listed,
            eligible = run.report.eligible,
            "Filtered to available backups"
        );

        run.advance(CleanupPhase::Grouping);
        let groups = group_by_volume(eligible);

        run.advance(CleanupPhase::Selecting);
        let mut candidates = Vec::new();
        for (volume_id, group) in &groups {
            let split = select(group, self.plan.keep);
            debug!(
                class = %class,
                volume_id = %volume_id,
                kept = split.keep.len(),
                to_delete = split.delete.len(),
                "Applied retention"
            );
            candidates.extend(split.delete);
        }
        run.report.candidates = candidates.len();

        if candidates.is_empty() {
            info!("Nothing to delete.");
            run.advance(CleanupPhase::Done);
            return Ok(run.report);
        }
        info!("{} backups marked for deletion", candidates.len());

        if self.plan.dry_run {
            run.advance(CleanupPhase::Reporting);
            for candidate in &candidates {
                info!("[DRY RUN] {} ({})", candidate.display_name(), candidate.id());
            }
            run.report.deleted = candidates.len();
        } else {
            run.advance(CleanupPhase::Deleting);
            let outcomes = pool.run_until(candidates, class, shutdown.clone()).await;
            run.report.deleted = outcomes.iter().filter(|o| o.is_success()).count();
            run.report.errors = outcomes.len() - run.report.deleted;
            run.report.outcomes = outcomes;
            run.report.interrupted = *shutdown.borrow();
        }

        if run.report.interrupted {
            warn!(
                class = %class,
                skipped = run.report.skipped(),
                "Deletion interrupted"
            );
        }
        run.advance(CleanupPhase::Done);
        Ok(run.report)
    }
}

/// Phase tracking for one class.
struct ClassRun {
    phase: CleanupPhase,
    report: ClassReport,
}

impl ClassRun {
    fn new(class: ResourceClass) -> Self {
        debug!(class = %class, phase = %CleanupPhase::Listing, "Cleanup phase");
        Self {
            phase: CleanupPhase::Listing,
            report: ClassReport::new(class),
        }
    }

    fn advance(&mut self, next: CleanupPhase) {
        debug!(
            class = %self.report.class,
            from = %self.phase,
            to = %next,
            "Cleanup phase"
        );
        self.phase = next;
    }

    /// Stop the class early after an interrupt.
    fn interrupt(mut self, message: &str) -> ClassReport {
        warn!(class = %self.report.class, phase = %self.phase, "{message}");
        self.report.interrupted = true;
        self.advance(CleanupPhase::Done);
        self.report
    }
}
