//! The provider operations the pruner needs, behind a trait so runs can be
//! driven against the real API or a test double.

use async_trait::async_trait;
use blockstorage_sdk::{BlockstorageClient, SdkError};
use thiserror::Error;

use crate::model::{BackupRecord, ResourceClass};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Sdk(#[from] SdkError),

    #[error("{0}")]
    Other(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackupService: Send + Sync {
    /// Every backup of `class` in the compartment, all pages, any lifecycle state.
    async fn list_backups(
        &self,
        compartment_id: &str,
        class: ResourceClass,
    ) -> Result<Vec<BackupRecord>, ServiceError>;

    /// Issue one delete request. Retries of transient failures happen below this call.
    async fn delete_backup(&self, backup_id: &str, class: ResourceClass)
    -> Result<(), ServiceError>;
}

#[async_trait]
impl BackupService for BlockstorageClient {
    async fn list_backups(
        &self,
        compartment_id: &str,
        class: ResourceClass,
    ) -> Result<Vec<BackupRecord>, ServiceError> {
        let records = match class {
            ResourceClass::BootVolume => self
                .list_boot_volume_backups(compartment_id)
                .await?
                .into_iter()
                .map(BackupRecord::from)
                .collect(),
            ResourceClass::BlockVolume => self
                .list_volume_backups(compartment_id)
                .await?
                .into_iter()
                .map(BackupRecord::from)
                .collect(),
        };
        Ok(records)
    }

    async fn delete_backup(
        &self,
        backup_id: &str,
        class: ResourceClass,
    ) -> Result<(), ServiceError> {
        match class {
            ResourceClass::BootVolume => self.delete_boot_volume_backup(backup_id).await?,
            ResourceClass::BlockVolume => self.delete_volume_backup(backup_id).await?,
        }
        Ok(())
    }
}
