//! Full cleanup runs against an in-memory backup inventory.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pruner::{
    BackupRecord, BackupService, ClassSelection, CleanupOrchestrator, CleanupPlan, LifecycleState,
    ResourceClass, ServiceError,
};

#[derive(Default)]
struct InMemoryService {
    backups: Mutex<HashMap<ResourceClass, Vec<BackupRecord>>>,
    failing: HashSet<String>,
    list_calls: Mutex<Vec<ResourceClass>>,
}

impl InMemoryService {
    fn with(mut self, class: ResourceClass, records: Vec<BackupRecord>) -> Self {
        self.backups.get_mut().unwrap().insert(class, records);
        self
    }

    fn remaining(&self, class: ResourceClass) -> Vec<String> {
        let mut ids: Vec<_> = self.backups.lock().unwrap()[&class]
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl BackupService for InMemoryService {
    async fn list_backups(
        &self,
        _compartment_id: &str,
        class: ResourceClass,
    ) -> Result<Vec<BackupRecord>, ServiceError> {
        self.list_calls.lock().unwrap().push(class);
        Ok(self
            .backups
            .lock()
            .unwrap()
            .get(&class)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_backup(
        &self,
        backup_id: &str,
        class: ResourceClass,
    ) -> Result<(), ServiceError> {
        tokio::time::sleep(Duration::from_millis(2)).await;
        if self.failing.contains(backup_id) {
            return Err(ServiceError::Other(format!("cannot delete {backup_id}")));
        }
        let mut backups = self.backups.lock().unwrap();
        let records = backups.entry(class).or_default();
        let before = records.len();
        records.retain(|r| r.id() != backup_id);
        if records.len() == before {
            return Err(ServiceError::Other(format!("{backup_id} not found")));
        }
        Ok(())
    }
}

fn backup(id: &str, volume: Option<&str>, day: u32) -> BackupRecord {
    BackupRecord::new(
        id,
        volume.map(str::to_string),
        Utc.with_ymd_and_hms(2024, 2, day, 4, 0, 0).unwrap(),
        LifecycleState::Available,
        Some(format!("{id} nightly")),
    )
}

fn plan(classes: ClassSelection, keep: i64, dry_run: bool) -> CleanupPlan {
    CleanupPlan {
        compartment_id: "ocid1.compartment.oc1..e2e".to_string(),
        keep,
        classes,
        dry_run,
        concurrency: 3,
        inter_item_delay: Duration::from_millis(1),
    }
}

fn inventory() -> InMemoryService {
    InMemoryService::default()
        .with(
            ResourceClass::BootVolume,
            vec![
                backup("shared-1", Some("boot-a"), 1),
                backup("boot-a-2", Some("boot-a"), 2),
                backup("boot-a-3", Some("boot-a"), 3),
                backup("boot-b-1", Some("boot-b"), 1),
            ],
        )
        .with(
            ResourceClass::BlockVolume,
            vec![
                backup("shared-1", Some("block-a"), 1),
                backup("block-a-2", Some("block-a"), 2),
                backup("orphan-1", None, 1),
                backup("orphan-2", None, 5),
                backup("orphan-3", None, 9),
            ],
        )
}

#[tokio::test]
async fn test_keep_newest_per_volume_in_both_classes() {
    let service = Arc::new(inventory());
    let orchestrator =
        CleanupOrchestrator::new(service.clone(), plan(ClassSelection::Both, 1, false)).unwrap();

    let report = orchestrator.execute().await.unwrap();

    assert_eq!(report.total_deleted(), 5);
    assert_eq!(report.total_errors(), 0);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(
        service.remaining(ResourceClass::BootVolume),
        ["boot-a-3", "boot-b-1"]
    );
    assert_eq!(
        service.remaining(ResourceClass::BlockVolume),
        ["block-a-2", "orphan-3"]
    );
    assert_eq!(
        *service.list_calls.lock().unwrap(),
        [ResourceClass::BootVolume, ResourceClass::BlockVolume]
    );
}

#[tokio::test]
async fn test_second_run_has_nothing_to_do() {
    let service = Arc::new(inventory());
    let orchestrator =
        CleanupOrchestrator::new(service.clone(), plan(ClassSelection::Both, 2, false)).unwrap();

    let first = orchestrator.execute().await.unwrap();
    let second = orchestrator.execute().await.unwrap();

    assert_eq!(first.total_deleted(), 2);
    assert_eq!(second.total_deleted(), 0);
    assert!(second.classes.iter().all(|c| c.candidates == 0));
}

#[tokio::test]
async fn test_dry_run_leaves_inventory_untouched() {
    let service = Arc::new(inventory());
    let orchestrator =
        CleanupOrchestrator::new(service.clone(), plan(ClassSelection::BlockOnly, 0, true))
            .unwrap();

    let report = orchestrator.execute().await.unwrap();

    assert_eq!(report.total_deleted(), 3);
    assert_eq!(service.remaining(ResourceClass::BlockVolume).len(), 5);
    assert_eq!(service.remaining(ResourceClass::BootVolume).len(), 4);
    assert_eq!(*service.list_calls.lock().unwrap(), [ResourceClass::BlockVolume]);
}

#[tokio::test]
async fn test_partial_failure_is_reported_and_rest_proceeds() {
    let mut service = inventory();
    service.failing.insert("boot-a-2".to_string());
    let service = Arc::new(service);
    let orchestrator =
        CleanupOrchestrator::new(service.clone(), plan(ClassSelection::BootOnly, 1, false))
            .unwrap();

    let report = orchestrator.execute().await.unwrap();

    let boot = report.class(ResourceClass::BootVolume).unwrap();
    assert_eq!(boot.candidates, 2);
    assert_eq!(boot.deleted, 1);
    assert_eq!(boot.errors, 1);
    assert_eq!(report.exit_code(), 1);
    assert_eq!(
        service.remaining(ResourceClass::BootVolume),
        ["boot-a-2", "boot-a-3", "boot-b-1"]
    );
}
