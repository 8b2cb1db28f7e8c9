use chrono::{DateTime, Duration, Utc};

use crate::db::models::activity::ActivityLogEntry;
use crate::utils::activity_log::{
    ACTION_CLIENT_DELETED, ACTION_CLIENT_EDITED, ACTION_STATUS_CHANGED,
};
use crate::utils::lifecycle::FieldChange;

/// How a recorded action gets reversed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoPlan {
    /// Write each recorded old value back onto the current record.
    RevertFields(Vec<FieldChange>),
    /// Clear the soft-delete marker (equivalent to a restore).
    RestoreDeleted,
}

fn recorded_changes(entry: &ActivityLogEntry) -> Vec<FieldChange> {
    entry
        .extra
        .as_ref()
        .and_then(|extra| extra.get("changes"))
        .and_then(|value| serde_json::from_value(value.clone()).ok())
        .unwrap_or_default()
}

fn previous_status(entry: &ActivityLogEntry) -> Option<String> {
    entry
        .extra
        .as_ref()
        .and_then(|extra| extra.get("previous_status"))
        .and_then(|value| value.as_str())
        .map(|s| s.to_string())
}

/// Best-effort reversal eligibility: the entry must be younger than the
/// configured window AND one of the three reversible action shapes. There is
/// no extended grace period and no override; an "undo operation" entry never
/// qualifies, so an undo cannot itself be undone through this mechanism.
/// Both timestamps are timezone-aware, so the age is exact regardless of the
/// database session timezone.
pub fn is_undoable(entry: &ActivityLogEntry, now: DateTime<Utc>, window_hours: i64) -> bool {
    if now - entry.created_at > Duration::hours(window_hours) {
        return false;
    }

    match entry.action_type.as_str() {
        ACTION_CLIENT_EDITED => !recorded_changes(entry).is_empty(),
        ACTION_CLIENT_DELETED => entry.affected_id.is_some(),
        ACTION_STATUS_CHANGED => previous_status(entry).is_some(),
        _ => false,
    }
}

/// Reconstructs the reversal plan from the entry's recorded payload.
/// Returns `None` for entries that carry no reversible information; callers
/// check [`is_undoable`] first for the time-window half of the policy.
pub fn plan(entry: &ActivityLogEntry) -> Option<UndoPlan> {
    match entry.action_type.as_str() {
        ACTION_CLIENT_EDITED => {
            let changes = recorded_changes(entry);
            if changes.is_empty() {
                None
            } else {
                Some(UndoPlan::RevertFields(changes))
            }
        }
        ACTION_STATUS_CHANGED => {
            // Older entries may only carry the previous status, not a full
            // change list; reversing the status alone is still well-defined.
            let changes = recorded_changes(entry);
            if !changes.is_empty() {
                return Some(UndoPlan::RevertFields(changes));
            }
            previous_status(entry).map(|old| {
                UndoPlan::RevertFields(vec![FieldChange {
                    field: "status".to_string(),
                    old,
                    new: String::new(),
                }])
            })
        }
        ACTION_CLIENT_DELETED => entry.affected_id.as_ref().map(|_| UndoPlan::RestoreDeleted),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::activity_log::{ACTION_CLIENT_ADDED, ACTION_UNDO};
    use chrono::NaiveDate;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
    }

    fn entry(action_type: &str, age: Duration, extra: Option<serde_json::Value>) -> ActivityLogEntry {
        ActivityLogEntry {
            id: 42,
            action_type: action_type.to_string(),
            actor_id: "12".to_string(),
            actor_name: "employee1".to_string(),
            details: "edited client (Ahmed)".to_string(),
            affected_id: Some("7".to_string()),
            affected_type: Some("client".to_string()),
            extra,
            created_at: now() - age,
        }
    }

    fn edit_extra() -> serde_json::Value {
        json!({
            "previous_status": "pending",
            "changes": [
                { "field": "status", "old": "pending", "new": "approved" }
            ]
        })
    }

    #[test]
    fn recent_edit_with_changes_is_undoable() {
        let entry = entry(ACTION_CLIENT_EDITED, Duration::hours(23), Some(edit_extra()));
        assert!(is_undoable(&entry, now(), 24));
    }

    #[test]
    fn entry_just_past_the_window_is_not_undoable() {
        let entry = entry(
            ACTION_CLIENT_EDITED,
            Duration::hours(24) + Duration::seconds(1),
            Some(edit_extra()),
        );
        assert!(!is_undoable(&entry, now(), 24));
    }

    #[test]
    fn edit_without_a_recorded_change_list_is_not_undoable() {
        let entry = entry(ACTION_CLIENT_EDITED, Duration::hours(1), None);
        assert!(!is_undoable(&entry, now(), 24));

        let empty = entry_with_changes(json!({ "changes": [] }));
        assert!(!is_undoable(&empty, now(), 24));
    }

    fn entry_with_changes(extra: serde_json::Value) -> ActivityLogEntry {
        entry(ACTION_CLIENT_EDITED, Duration::hours(1), Some(extra))
    }

    #[test]
    fn deletion_with_an_affected_id_is_undoable() {
        let entry = entry(ACTION_CLIENT_DELETED, Duration::hours(2), None);
        assert!(is_undoable(&entry, now(), 24));
        assert_eq!(plan(&entry), Some(UndoPlan::RestoreDeleted));
    }

    #[test]
    fn deletion_without_an_affected_id_is_not_undoable() {
        let mut entry = entry(ACTION_CLIENT_DELETED, Duration::hours(2), None);
        entry.affected_id = None;
        assert!(!is_undoable(&entry, now(), 24));
    }

    #[test]
    fn status_change_needs_a_recorded_previous_status() {
        let with = entry(
            ACTION_STATUS_CHANGED,
            Duration::hours(2),
            Some(json!({ "previous_status": "pending" })),
        );
        assert!(is_undoable(&with, now(), 24));

        let without = entry(ACTION_STATUS_CHANGED, Duration::hours(2), Some(json!({})));
        assert!(!is_undoable(&without, now(), 24));
    }

    #[test]
    fn other_actions_are_permanently_non_undoable() {
        for action in [ACTION_CLIENT_ADDED, ACTION_UNDO, "client restored"] {
            let entry = entry(action, Duration::hours(1), Some(edit_extra()));
            assert!(!is_undoable(&entry, now(), 24), "{action} must not be undoable");
        }
    }

    #[test]
    fn edit_plan_replays_the_recorded_change_list() {
        let entry = entry(ACTION_CLIENT_EDITED, Duration::hours(1), Some(edit_extra()));
        match plan(&entry) {
            Some(UndoPlan::RevertFields(changes)) => {
                assert_eq!(changes.len(), 1);
                assert_eq!(changes[0].field, "status");
                assert_eq!(changes[0].old, "pending");
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn status_change_plan_falls_back_to_the_previous_status() {
        let entry = entry(
            ACTION_STATUS_CHANGED,
            Duration::hours(1),
            Some(json!({ "previous_status": "pending" })),
        );
        match plan(&entry) {
            Some(UndoPlan::RevertFields(changes)) => {
                assert_eq!(changes[0].field, "status");
                assert_eq!(changes[0].old, "pending");
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn entry_age_ignores_the_writer_timezone_offset() {
        // Recorded 23 hours before `now` on the UTC timeline, expressed
        // with a non-UTC offset the way a client in another zone would.
        let stamped = DateTime::parse_from_rfc3339("2026-03-09T11:00:00-02:00")
            .unwrap()
            .with_timezone(&Utc);
        let mut entry = entry(ACTION_CLIENT_EDITED, Duration::zero(), Some(edit_extra()));
        entry.created_at = stamped;
        assert!(is_undoable(&entry, now(), 24));
        assert!(!is_undoable(&entry, now() + Duration::hours(2), 24));
    }

    #[test]
    fn window_length_is_configurable() {
        let entry = entry(ACTION_CLIENT_EDITED, Duration::hours(30), Some(edit_extra()));
        assert!(!is_undoable(&entry, now(), 24));
        assert!(is_undoable(&entry, now(), 48));
    }
}
