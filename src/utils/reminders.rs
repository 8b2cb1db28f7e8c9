use chrono::NaiveDate;

/// Whole days between today and a tracked date: positive means the date is
/// still ahead, zero means due today, negative means overdue by that many
/// days. Date-only granularity, so this is an exact signed difference.
pub fn days_remaining(target: NaiveDate, today: NaiveDate) -> i64 {
    (target - today).num_days()
}

/// A client qualifies for an "expiring soon" notice when the date is in the
/// future but no further out than the configured lookahead.
pub fn is_expiring_soon(days: i64, lookahead: i64) -> bool {
    days > 0 && days <= lookahead
}

/// Installment completion reminders additionally cover overdue dates up to
/// the configured lookback, to support post-due follow-up.
pub fn needs_completion_reminder(days: i64, lookahead: i64, lookback: i64) -> bool {
    days <= lookahead && days >= -lookback
}

pub fn describe_days_remaining(days: i64) -> String {
    if days > 0 {
        let unit = if days == 1 { "day" } else { "days" };
        format!("{days} {unit} remaining")
    } else if days == 0 {
        "due today".to_string()
    } else {
        format!("expired {} days ago", -days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(offset: i64) -> (NaiveDate, NaiveDate) {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        (today + chrono::Duration::days(offset), today)
    }

    #[test]
    fn future_date_counts_forward() {
        let (target, today) = day(5);
        assert_eq!(days_remaining(target, today), 5);
    }

    #[test]
    fn today_is_zero() {
        let (target, today) = day(0);
        assert_eq!(days_remaining(target, today), 0);
    }

    #[test]
    fn past_date_counts_backward() {
        let (target, today) = day(-3);
        assert_eq!(days_remaining(target, today), -3);
    }

    #[test]
    fn expiring_window_is_exclusive_of_today_and_inclusive_of_lookahead() {
        assert!(!is_expiring_soon(0, 10));
        assert!(is_expiring_soon(1, 10));
        assert!(is_expiring_soon(10, 10));
        assert!(!is_expiring_soon(11, 10));
        assert!(!is_expiring_soon(-1, 10));
    }

    #[test]
    fn completion_window_covers_the_lookback() {
        assert!(needs_completion_reminder(10, 10, 60));
        assert!(!needs_completion_reminder(11, 10, 60));
        assert!(needs_completion_reminder(0, 10, 60));
        assert!(needs_completion_reminder(-60, 10, 60));
        assert!(!needs_completion_reminder(-61, 10, 60));
    }

    #[test]
    fn day_counts_are_rendered_for_display() {
        assert_eq!(describe_days_remaining(5), "5 days remaining");
        assert_eq!(describe_days_remaining(1), "1 day remaining");
        assert_eq!(describe_days_remaining(0), "due today");
        assert_eq!(describe_days_remaining(-3), "expired 3 days ago");
    }
}
