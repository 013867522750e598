use std::collections::BTreeMap;

use crate::model::BackupRecord;

/// Partition records by owning volume.
///
/// Every input record lands in exactly one group and groups keep the input
/// order; ranking happens later in [`crate::retention::select`].
pub fn group_by_volume(
    records: impl IntoIterator<Item = BackupRecord>,
) -> BTreeMap<String, Vec<BackupRecord>> {
    let mut groups: BTreeMap<String, Vec<BackupRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.owner_volume_id().to_string())
            .or_default()
            .push(record);
    }
    groups
}
