//! Keep-newest-N retention for OCI boot and block volume backups.
//!
//! Backups are grouped by the volume they were taken from, the newest `keep`
//! of every group survive, and the rest are deleted by a bounded pool of
//! workers. See [`CleanupOrchestrator`] for the entry point.

pub mod grouper;
pub mod model;
pub mod orchestrator;
pub mod pool;
pub mod retention;
pub mod service;

pub use grouper::group_by_volume;
pub use model::{BackupRecord, DETACHED_VOLUME_ID, LifecycleState, ResourceClass};
pub use orchestrator::{
    ClassReport, ClassSelection, CleanupError, CleanupOrchestrator, CleanupPhase, CleanupPlan,
    CleanupReport, PlanError,
};
pub use pool::{DeletionOutcome, DeletionStatus, DeletionWorkerPool, PoolError};
pub use retention::{RetentionSplit, select};
pub use service::{BackupService, ServiceError};
