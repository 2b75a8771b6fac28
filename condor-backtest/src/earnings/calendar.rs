//! Earnings date handling.

use chrono::NaiveDate;
use tracing::warn;

/// Days after expiration within which an expiration counts as pre-earnings.
pub const PRE_EARNINGS_WINDOW_DAYS: i64 = 7;

/// Parse an ISO `YYYY-MM-DD` earnings date.
///
/// Malformed values yield `None` with a warning; callers treat that as
/// "no earnings date".
pub fn parse_earnings_date(raw: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(raw, error = %e, "Ignoring malformed earnings date");
            None
        }
    }
}

/// Whether `expiration` falls shortly before an earnings announcement
/// (earnings 0..=7 days after expiration).
pub fn is_pre_earnings(expiration: NaiveDate, earnings: Option<NaiveDate>) -> bool {
    earnings.is_some_and(|date| {
        let days = (date - expiration).num_days();
        (0..=PRE_EARNINGS_WINDOW_DAYS).contains(&days)
    })
}

/// Whether an earnings date falls within `[entry, expiration]`.
pub fn earnings_in_window(entry: NaiveDate, expiration: NaiveDate, earnings: Option<NaiveDate>) -> bool {
    earnings.is_some_and(|date| entry <= date && date <= expiration)
}
