//! Time and date parsing utilities.

use crate::error::{Result, TrackerError};
use chrono::{DateTime, NaiveDate, SecondsFormat, TimeDelta, Utc};
use regex::Regex;
use std::sync::LazyLock;

static FILTER_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));

/// Parse a filter date (`YYYY-MM-DD`, two-digit month and day) to midnight UTC.
///
/// Returns `None` for anything else, including impossible calendar dates.
#[must_use]
pub fn parse_filter_date(s: &str) -> Option<DateTime<Utc>> {
    if !FILTER_DATE.is_match(s) {
        return None;
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// Fixed-width storage form. Lexicographic order matches chronological order.
#[must_use]
pub fn format_storage(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp given on the command line.
///
/// Supports:
/// - RFC3339: `2025-01-15T12:00:00Z`
/// - Simple date: `2025-01-15` (midnight UTC)
/// - Relative duration from `now`: `+1h`, `-2d`, `-1w`, `+30m`
///
/// # Errors
///
/// Returns a validation error naming `field_name` if no form matches.
pub fn parse_cli_timestamp(s: &str, field_name: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Some(dt) = parse_filter_date(s) {
        return Ok(dt);
    }

    if let Some(rest) = s.strip_prefix(['+', '-'].as_ref()) {
        let is_negative = s.starts_with('-');
        if let Some(unit_char) = rest.chars().last() {
            let amount_str = &rest[..rest.len() - unit_char.len_utf8()];
            if let Ok(amount) = amount_str.parse::<i64>() {
                let amount = if is_negative { -amount } else { amount };
                let duration = match unit_char {
                    'm' => TimeDelta::try_minutes(amount),
                    'h' => TimeDelta::try_hours(amount),
                    'd' => TimeDelta::try_days(amount),
                    'w' => TimeDelta::try_weeks(amount),
                    _ => {
                        return Err(TrackerError::validation(
                            field_name,
                            "invalid unit (use m, h, d, w)",
                        ));
                    }
                };
                return duration
                    .and_then(|duration| now.checked_add_signed(duration))
                    .ok_or_else(|| TrackerError::validation(field_name, "relative time out of range"));
            }
        }
    }

    Err(TrackerError::validation(
        field_name,
        "invalid time format (try: 2025-01-15, 2025-01-15T12:00:00Z, -7d)",
    ))
}

/// Subtract calendar months, clamping the day to the target month's length.
#[must_use]
pub fn months_before(ts: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    ts.checked_sub_months(chrono::Months::new(months))
        .unwrap_or(ts)
}
