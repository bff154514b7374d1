//! Renewal scheduling rules: derive a concrete due date from a free-text
//! renewal cadence, and decide when a reminder may be dispatched.
//!
//! Cadence strings are authored per city by hand ("Annual", "6 months",
//! "Daily/Event", "N/A", ...) and are not a closed set, so matching is
//! heuristic and a missing due date is a normal outcome, not an error.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

/// Days before a due date during which a reminder may be sent (inclusive).
pub const SEND_WINDOW_DAYS: i64 = 30;

static MONTH_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*months?").unwrap());

/// Derives the next due date from a renewal cadence, counted from `from`.
///
/// Matching is case-insensitive, first rule wins. Only month counts carry a
/// numeric multiplier; "2 years" matches the "year" substring and yields 365
/// days, dropping the multiplier. Cadences with no fixed interval ("N/A",
/// "Daily/Event") yield `None`.
pub fn derive_due_date(cadence: &str, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let cadence = cadence.to_lowercase();

    if cadence.contains("annual") || cadence.contains("year") {
        return Some(from + Duration::days(365));
    }
    if cadence.contains("6 months") {
        return Some(from + Duration::days(180));
    }
    if cadence.contains("3 months") {
        return Some(from + Duration::days(90));
    }
    // "<n> month(s)" would also hit the bare "month" test below, so the
    // numeric form has to be tried first.
    if let Some(caps) = MONTH_COUNT.captures(&cadence) {
        if let Ok(n) = caps[1].parse::<i64>() {
            return Some(from + Duration::days(n * 30));
        }
    }
    if cadence.contains("month") {
        return Some(from + Duration::days(30));
    }
    if cadence.contains("week") {
        return Some(from + Duration::days(7));
    }

    None
}

/// Whole-day difference between `due` and `now`; negative once overdue.
pub fn days_until(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    due.signed_duration_since(now).num_days()
}

/// True when `now` is inside the send window: due in 0..=30 whole days.
/// Overdue reminders are outside the window and are never sent.
pub fn in_send_window(due: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    (0..=SEND_WINDOW_DAYS).contains(&days_until(due, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn days(n: i64) -> DateTime<Utc> {
        t0() + Duration::days(n)
    }

    #[test]
    fn annual_and_year_cadences_get_365_days() {
        assert_eq!(derive_due_date("Annual", t0()), Some(days(365)));
        assert_eq!(derive_due_date("annual renewal", t0()), Some(days(365)));
        assert_eq!(derive_due_date("Every year", t0()), Some(days(365)));
        assert_eq!(derive_due_date("5 years", t0()), Some(days(365)));
    }

    #[test]
    fn fixed_month_cadences() {
        assert_eq!(derive_due_date("6 months", t0()), Some(days(180)));
        assert_eq!(derive_due_date("3 months", t0()), Some(days(90)));
        assert_eq!(derive_due_date("Monthly", t0()), Some(days(30)));
        assert_eq!(derive_due_date("Every month", t0()), Some(days(30)));
    }

    #[test]
    fn weekly_cadence() {
        assert_eq!(derive_due_date("Weekly", t0()), Some(days(7)));
        assert_eq!(derive_due_date("week", t0()), Some(days(7)));
    }

    #[test]
    fn month_count_is_extracted() {
        assert_eq!(derive_due_date("4 months", t0()), Some(days(120)));
        assert_eq!(derive_due_date("2 Months", t0()), Some(days(60)));
        assert_eq!(derive_due_date("12 months", t0()), Some(days(360)));
    }

    #[test]
    fn no_fixed_cadence_yields_no_due_date() {
        assert_eq!(derive_due_date("N/A", t0()), None);
        assert_eq!(derive_due_date("Daily/Event", t0()), None);
        assert_eq!(derive_due_date("Daily", t0()), None);
        assert_eq!(derive_due_date("Biennial", t0()), None);
        assert_eq!(derive_due_date("", t0()), None);
    }

    // "2 years" hits the "year" substring before any multiplier is read, so
    // it gets 365 days. Intentional legacy behavior; do not change without a
    // product decision.
    #[test]
    fn year_count_multiplier_is_dropped() {
        assert_eq!(derive_due_date("2 years", t0()), Some(days(365)));
        assert_eq!(derive_due_date("3 years", t0()), Some(days(365)));
    }

    #[test]
    fn days_until_is_signed_whole_days() {
        assert_eq!(days_until(days(25), t0()), 25);
        assert_eq!(days_until(t0(), t0()), 0);
        assert_eq!(days_until(days(-3), t0()), -3);
    }

    #[test]
    fn send_window_is_zero_to_thirty_days_inclusive() {
        assert!(in_send_window(days(0), t0()));
        assert!(in_send_window(days(25), t0()));
        assert!(in_send_window(days(30), t0()));
        assert!(!in_send_window(days(31), t0()));
        assert!(!in_send_window(days(-1), t0()));
    }
}
