//! Normalized view of a remote backup.
//!
//! Records are built once at the SDK boundary; everything downstream works on
//! [`BackupRecord`] and never sees the wire types or their optional fields.

use std::fmt;

use blockstorage_sdk::{BootVolumeBackup, VolumeBackup};
use chrono::{DateTime, Utc};

/// Grouping key for backups whose source volume no longer exists.
pub const DETACHED_VOLUME_ID: &str = "<detached>";

/// The two kinds of backup the tool manages. Each is its own retention domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    BootVolume,
    BlockVolume,
}

impl ResourceClass {
    pub fn label(&self) -> &'static str {
        match self {
            ResourceClass::BootVolume => "boot volume",
            ResourceClass::BlockVolume => "block volume",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Creating,
    Available,
    Terminating,
    Terminated,
    Faulty,
    RequestReceived,
    Unknown(String),
}

impl LifecycleState {
    pub fn parse(value: &str) -> Self {
        match value {
            "CREATING" => Self::Creating,
            "AVAILABLE" => Self::Available,
            "TERMINATING" => Self::Terminating,
            "TERMINATED" => Self::Terminated,
            "FAULTY" => Self::Faulty,
            "REQUEST_RECEIVED" => Self::RequestReceived,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// A backup snapshot as seen by retention selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    id: String,
    owner_volume_id: String,
    created_at: DateTime<Utc>,
    lifecycle_state: LifecycleState,
    display_name: String,
}

impl BackupRecord {
    /// Build a record; an empty or missing owner becomes [`DETACHED_VOLUME_ID`].
    pub fn new(
        id: impl Into<String>,
        owner_volume_id: Option<String>,
        created_at: DateTime<Utc>,
        lifecycle_state: LifecycleState,
        display_name: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_volume_id: owner_volume_id
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DETACHED_VOLUME_ID.to_string()),
            created_at,
            lifecycle_state,
            display_name: display_name.unwrap_or_default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner_volume_id(&self) -> &str {
        &self.owner_volume_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn lifecycle_state(&self) -> &LifecycleState {
        &self.lifecycle_state
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_available(&self) -> bool {
        self.lifecycle_state.is_available()
    }
}

impl From<BootVolumeBackup> for BackupRecord {
    fn from(b: BootVolumeBackup) -> Self {
        Self::new(
            b.id,
            b.boot_volume_id,
            b.time_created,
            LifecycleState::parse(&b.lifecycle_state),
            b.display_name,
        )
    }
}

impl From<VolumeBackup> for BackupRecord {
    fn from(b: VolumeBackup) -> Self {
        Self::new(
            b.id,
            b.volume_id,
            b.time_created,
            LifecycleState::parse(&b.lifecycle_state),
            b.display_name,
        )
    }
}
