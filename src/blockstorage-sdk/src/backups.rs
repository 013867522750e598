use crate::SdkError;
use crate::client::BlockstorageClient;
use crate::types::{BootVolumeBackup, VolumeBackup};

impl BlockstorageClient {
    // ── Boot volume backups ─────────────────────────────────────────────

    /// List every boot volume backup in a compartment, across all pages.
    pub async fn list_boot_volume_backups(
        &self,
        compartment_id: &str,
    ) -> Result<Vec<BootVolumeBackup>, SdkError> {
        self.list_all("ListBootVolumeBackups", "/bootVolumeBackups", compartment_id)
            .await
    }

    /// Delete a boot volume backup by OCID.
    pub async fn delete_boot_volume_backup(&self, backup_id: &str) -> Result<(), SdkError> {
        self.delete(
            "DeleteBootVolumeBackup",
            &format!("/bootVolumeBackups/{backup_id}"),
        )
        .await
    }

    // ── Block volume backups ────────────────────────────────────────────

    /// List every block volume backup in a compartment, across all pages.
    pub async fn list_volume_backups(
        &self,
        compartment_id: &str,
    ) -> Result<Vec<VolumeBackup>, SdkError> {
        self.list_all("ListVolumeBackups", "/volumeBackups", compartment_id)
            .await
    }

    /// Delete a block volume backup by OCID.
    pub async fn delete_volume_backup(&self, backup_id: &str) -> Result<(), SdkError> {
        self.delete("DeleteVolumeBackup", &format!("/volumeBackups/{backup_id}"))
            .await
    }
}
