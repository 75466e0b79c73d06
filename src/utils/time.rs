use time::OffsetDateTime;
use time::macros::format_description;

/// Milliseconds since the Unix epoch, as stored in message timestamps.
pub fn now_millis() -> i64 {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    i64::try_from(millis).unwrap_or(i64::MAX)
}

/// Format an epoch-millisecond timestamp as `HH:MM:SS` UTC.
///
/// Returns `None` if the timestamp is outside the representable range.
pub fn format_millis(millis: i64) -> Option<String> {
    let datetime =
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()?;
    datetime
        .format(format_description!("[hour]:[minute]:[second]"))
        .ok()
}
