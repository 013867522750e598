//! Bounded concurrent deletion.
//!
//! A fixed set of tokio tasks pulls targets from a shared queue and reports
//! one [`DeletionOutcome`] per attempted target through a channel. Workers
//! share no counters; the caller aggregates the outcomes.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, error, info};

use crate::model::{BackupRecord, ResourceClass};
use crate::service::BackupService;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("Worker count must be at least 1, got {0}")]
    InvalidConcurrency(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionStatus {
    Deleted,
    Failed(String),
}

/// Result of one attempted delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionOutcome {
    pub backup_id: String,
    pub display_name: String,
    pub status: DeletionStatus,
}

impl DeletionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, DeletionStatus::Deleted)
    }
}

pub struct DeletionWorkerPool {
    service: Arc<dyn BackupService>,
    concurrency: usize,
    inter_item_delay: Duration,
}

impl DeletionWorkerPool {
    /// `inter_item_delay` is slept by a worker after each successful delete.
    pub fn new(
        service: Arc<dyn BackupService>,
        concurrency: usize,
        inter_item_delay: Duration,
    ) -> Result<Self, PoolError> {
        if concurrency == 0 {
            return Err(PoolError::InvalidConcurrency(concurrency));
        }
        Ok(Self {
            service,
            concurrency,
            inter_item_delay,
        })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Delete every target and return one outcome per target.
    pub async fn run(
        &self,
        targets: Vec<BackupRecord>,
        class: ResourceClass,
    ) -> Vec<DeletionOutcome> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        self.run_until(targets, class, shutdown_rx).await
    }

    /// Like [`run`](Self::run), but once `shutdown` turns `true` no further
    /// targets are picked up. Deletes already in flight still finish and are
    /// reported; untouched targets produce no outcome.
    pub async fn run_until(
        &self,
        targets: Vec<BackupRecord>,
        class: ResourceClass,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<DeletionOutcome> {
        if targets.is_empty() {
            return Vec::new();
        }

        let total = targets.len();
        let (work_tx, work_rx) = mpsc::unbounded_channel::<BackupRecord>();
        for target in targets {
            // The receiver is alive until the workers below are done.
            let _ = work_tx.send(target);
        }
        drop(work_tx);

        let work_rx = Arc::new(Mutex::new(work_rx));
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<DeletionOutcome>();

        let workers = self.concurrency.min(total);
        debug!(class = %class, workers, targets = total, "Starting deletion workers");

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let worker = Worker {
                id: worker_id,
                class,
                service: Arc::clone(&self.service),
                work_rx: Arc::clone(&work_rx),
                outcome_tx: outcome_tx.clone(),
                shutdown: shutdown.clone(),
                inter_item_delay: self.inter_item_delay,
            };
            handles.push(tokio::spawn(worker.run()));
        }
        drop(outcome_tx);

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = outcome_rx.recv().await {
            outcomes.push(outcome);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!(class = %class, error = %e, "Deletion worker panicked");
            }
        }

        outcomes
    }
}

struct Worker {
    id: usize,
    class: ResourceClass,
    service: Arc<dyn BackupService>,
    work_rx: Arc<Mutex<mpsc::UnboundedReceiver<BackupRecord>>>,
    outcome_tx: mpsc::UnboundedSender<DeletionOutcome>,
    shutdown: watch::Receiver<bool>,
    inter_item_delay: Duration,
}

impl Worker {
    async fn run(mut self) {
        loop {
            if *self.shutdown.borrow() {
                debug!(worker = self.id, "Shutdown requested, worker stopping");
                break;
            }

            let next = {
                let mut rx = self.work_rx.lock().await;
                rx.recv().await
            };
            let Some(record) = next else {
                break;
            };
            // Shutdown may have fired while waiting for the queue lock.
            if *self.shutdown.borrow() {
                break;
            }

            // The call runs in its own task so a panicking delete still
            // yields an outcome for its target.
            let service = Arc::clone(&self.service);
            let backup_id = record.id().to_string();
            let class = self.class;
            let result =
                tokio::spawn(async move { service.delete_backup(&backup_id, class).await }).await;

            let status = match result {
                Ok(Ok(())) => {
                    info!(class = %self.class, worker = self.id, "Deleted {}", record.id());
                    DeletionStatus::Deleted
                }
                Ok(Err(e)) => DeletionStatus::Failed(e.to_string()),
                Err(e) => DeletionStatus::Failed(format!("delete task failed: {e}")),
            };
            if let DeletionStatus::Failed(reason) = &status {
                error!(
                    class = %self.class,
                    worker = self.id,
                    "Failed {} -> {reason}",
                    record.id()
                );
            }

            let succeeded = status == DeletionStatus::Deleted;
            let outcome = DeletionOutcome {
                backup_id: record.id().to_string(),
                display_name: record.display_name().to_string(),
                status,
            };
            if self.outcome_tx.send(outcome).is_err() {
                break;
            }

            if succeeded && !self.inter_item_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.inter_item_delay) => {}
                    _ = shutdown_requested(&mut self.shutdown) => {}
                }
            }
        }
    }
}

/// Resolves once the flag is `true`. Never resolves if the sender is gone.
pub(crate) async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
