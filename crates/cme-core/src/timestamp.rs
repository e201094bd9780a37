//! "Last updated" labels on the settlements page.
//!
//! The page prints exchange-local wall-clock time, e.g.
//! `"Last Updated: 03 May 2024 10:32:00 PM CT"`. Stored values are UTC.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::America::Chicago;

const LABEL_FORMAT: &str = "%d %b %Y %I:%M:%S %p";
const ZONE_SUFFIX: &str = "CT";

/// Standard-time offset of the exchange zone, used for wall-clock times
/// skipped by the spring-forward transition.
const CENTRAL_STANDARD_OFFSET_HOURS: i64 = 6;

/// Parse a last-updated label into a UTC instant.
///
/// Leading text before the first digit is ignored. Ambiguous wall-clock
/// times (fall-back hour) resolve to the later instant.
pub fn parse_last_updated(label: &str) -> CoreResult<DateTime<Utc>> {
    let invalid = || CoreError::InvalidTimestampFormat(label.to_string());

    let start = label.find(|c: char| c.is_ascii_digit()).ok_or_else(invalid)?;
    let body = label[start..]
        .trim()
        .strip_suffix(ZONE_SUFFIX)
        .ok_or_else(invalid)?
        .trim_end();

    let naive = NaiveDateTime::parse_from_str(body, LABEL_FORMAT).map_err(|_| invalid())?;
    Ok(chicago_to_utc(naive))
}

/// Interpret a Chicago wall-clock time as UTC.
pub fn chicago_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    match Chicago.from_local_datetime(&naive) {
        LocalResult::Single(local) => local.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, later) => {
            let (a, b) = (earlier.with_timezone(&Utc), later.with_timezone(&Utc));
            a.max(b)
        }
        LocalResult::None => {
            let shifted = naive + Duration::hours(CENTRAL_STANDARD_OFFSET_HOURS);
            Utc.from_utc_datetime(&shifted)
        }
    }
}

/// Drop sub-millisecond precision; stored timestamps are epoch milliseconds.
pub fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts.timestamp_millis())
        .single()
        .unwrap_or(ts)
}

/// Rebuild a stored epoch-millisecond value.
pub fn from_millis(millis: i64) -> CoreResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| CoreError::InvalidTimestampFormat(millis.to_string()))
}
