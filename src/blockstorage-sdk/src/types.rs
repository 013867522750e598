//! Wire types returned by the backup list endpoints.
//!
//! Only the fields the pruner reads are modelled; unknown fields are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A backup of a boot volume (`GET /bootVolumeBackups`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootVolumeBackup {
    pub id: String,
    /// Absent once the source boot volume has been terminated
    #[serde(default)]
    pub boot_volume_id: Option<String>,
    #[serde(default)]
    pub compartment_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub lifecycle_state: String,
    pub time_created: DateTime<Utc>,
    #[serde(default, rename = "sizeInGBs")]
    pub size_in_gbs: Option<i64>,
    /// `FULL` or `INCREMENTAL`
    #[serde(default, rename = "type")]
    pub backup_type: Option<String>,
}

/// A backup of a block volume (`GET /volumeBackups`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeBackup {
    pub id: String,
    /// Absent once the source volume has been terminated
    #[serde(default)]
    pub volume_id: Option<String>,
    #[serde(default)]
    pub compartment_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub lifecycle_state: String,
    pub time_created: DateTime<Utc>,
    #[serde(default, rename = "sizeInGBs")]
    pub size_in_gbs: Option<i64>,
    #[serde(default, rename = "type")]
    pub backup_type: Option<String>,
}

/// Error body returned by every OCI service.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
