//! Work-Status Automaton (C8, spec.md 4.9): derives a work's aggregate
//! status from the statuses of its chunks. Grounded in
//! `PlanningService._update_work_status`.

use std::collections::HashSet;

use calendar::types::{ChunkStatus, WorkStatus};

/// `current` is returned unchanged when `chunk_statuses` is empty (a work
/// with no chunks yet has nothing to derive from) or when none of the rules
/// below apply.
pub fn derive_work_status(current: WorkStatus, chunk_statuses: &[ChunkStatus]) -> WorkStatus {
    if chunk_statuses.is_empty() {
        return current;
    }

    let set: HashSet<ChunkStatus> = chunk_statuses.iter().copied().collect();

    if set.contains(&ChunkStatus::InProgress) {
        return WorkStatus::InProgress;
    }

    if set.iter().all(|s| *s == ChunkStatus::Completed) {
        return WorkStatus::Completed;
    }

    if set.contains(&ChunkStatus::Planned) || set.contains(&ChunkStatus::Assigned) {
        return if set.contains(&ChunkStatus::Created) {
            WorkStatus::Scheduling
        } else {
            WorkStatus::Assigned
        };
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_in_progress_chunk_wins() {
        let s = derive_work_status(
            WorkStatus::Assigned,
            &[ChunkStatus::Completed, ChunkStatus::InProgress],
        );
        assert_eq!(s, WorkStatus::InProgress);
    }

    #[test]
    fn all_completed_marks_work_completed() {
        let s = derive_work_status(
            WorkStatus::InProgress,
            &[ChunkStatus::Completed, ChunkStatus::Completed],
        );
        assert_eq!(s, WorkStatus::Completed);
    }

    #[test]
    fn mixed_created_and_assigned_is_scheduling() {
        let s = derive_work_status(
            WorkStatus::Created,
            &[ChunkStatus::Created, ChunkStatus::Assigned],
        );
        assert_eq!(s, WorkStatus::Scheduling);
    }

    #[test]
    fn all_assigned_no_created_left_is_assigned() {
        let s = derive_work_status(
            WorkStatus::Scheduling,
            &[ChunkStatus::Assigned, ChunkStatus::Planned],
        );
        assert_eq!(s, WorkStatus::Assigned);
    }

    #[test]
    fn all_created_leaves_status_untouched() {
        let s = derive_work_status(WorkStatus::Created, &[ChunkStatus::Created]);
        assert_eq!(s, WorkStatus::Created);
    }
}
