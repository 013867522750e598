//! Keep-newest-N selection for a single volume's backups.

use crate::model::BackupRecord;

/// Result of applying the retention policy to one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionSplit {
    /// Newest backups, oldest first
    pub keep: Vec<BackupRecord>,
    /// Everything older than the kept window, oldest first
    pub delete: Vec<BackupRecord>,
}

/// Split `group` into the newest `keep` backups and the rest.
///
/// At least one backup is always kept, even for `keep <= 0`. Ties on
/// creation time are broken by id so the split is deterministic.
pub fn select(group: &[BackupRecord], keep: i64) -> RetentionSplit {
    let keep_count = usize::try_from(keep.max(1)).unwrap_or(usize::MAX);

    let mut sorted = group.to_vec();
    sorted.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });

    if sorted.len() <= keep_count {
        return RetentionSplit {
            keep: sorted,
            delete: Vec::new(),
        };
    }

    let kept = sorted.split_off(sorted.len() - keep_count);
    RetentionSplit {
        keep: kept,
        delete: sorted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LifecycleState;
    use chrono::{TimeZone, Utc};

    fn record(id: &str, day: u32) -> BackupRecord {
        BackupRecord::new(
            id,
            Some("vol".to_string()),
            Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            LifecycleState::Available,
            Some(format!("backup-{id}")),
        )
    }

    fn ids(records: &[BackupRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id()).collect()
    }

    #[test]
    fn test_keep_two_of_four() {
        let group = vec![record("t3", 3), record("t1", 1), record("t4", 4), record("t2", 2)];

        let split = select(&group, 2);

        assert_eq!(ids(&split.keep), ["t3", "t4"]);
        assert_eq!(ids(&split.delete), ["t1", "t2"]);
    }

    #[test]
    fn test_group_smaller_than_keep() {
        let split = select(&[record("only", 1)], 5);

        assert_eq!(ids(&split.keep), ["only"]);
        assert!(split.delete.is_empty());
    }

    #[test]
    fn test_non_positive_keep_still_keeps_newest() {
        let group = vec![record("a", 1), record("b", 2), record("c", 3)];

        for keep in [0, -1, -100, i64::MIN] {
            let split = select(&group, keep);
            assert_eq!(ids(&split.keep), ["c"], "keep = {keep}");
            assert_eq!(ids(&split.delete), ["a", "b"]);
        }
    }

    #[test]
    fn test_huge_keep_deletes_nothing() {
        let group = vec![record("a", 1), record("b", 2)];
        assert!(select(&group, i64::MAX).delete.is_empty());
    }

    #[test]
    fn test_empty_group() {
        assert_eq!(select(&[], 3), RetentionSplit::default());
    }

    #[test]
    fn test_partition_is_complete_disjoint_and_monotonic() {
        let group: Vec<_> = (1..=9).rev().map(|d| record(&format!("r{d}"), d)).collect();

        for keep in -2..12 {
            let split = select(&group, keep);

            assert_eq!(split.keep.len() + split.delete.len(), group.len());
            assert!(!split.keep.is_empty());
            for d in &split.delete {
                assert!(!split.keep.contains(d));
                for k in &split.keep {
                    assert!(d.created_at() <= k.created_at());
                }
            }
        }
    }

    #[test]
    fn test_equal_timestamps_break_ties_by_id() {
        let group = vec![record("b", 1), record("c", 1), record("a", 1)];

        let split = select(&group, 1);

        assert_eq!(ids(&split.keep), ["c"]);
        assert_eq!(ids(&split.delete), ["a", "b"]);
    }

    #[test]
    fn test_selection_is_idempotent() {
        let group = vec![record("x", 5), record("y", 2), record("z", 9), record("w", 1)];

        let first = select(&group, 2);
        let second = select(&first.keep, 2);

        assert_eq!(second.keep, first.keep);
        assert!(second.delete.is_empty());
        assert_eq!(select(&group, 2), first);
    }
}
