use chrono::{DateTime, Utc};

/// Human-readable age of an RFC 3339 timestamp relative to `now`.
///
/// Timestamps in the future read as "just now". Unparseable input is
/// returned unchanged.
pub fn relative_time(published_at: &str, now: DateTime<Utc>) -> String {
    let Ok(published) = DateTime::parse_from_rfc3339(published_at) else {
        return published_at.to_string();
    };

    let seconds = now
        .signed_duration_since(published.with_timezone(&Utc))
        .num_seconds();
    if seconds < 0 {
        return "just now".to_string();
    }

    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    let (count, unit) = if seconds < 60 {
        (seconds, "second")
    } else if minutes < 60 {
        (minutes, "minute")
    } else if hours < 24 {
        (hours, "hour")
    } else if days < 7 {
        (days, "day")
    } else if days < 28 {
        (days / 7, "week")
    } else if days < 365 {
        ((days / 30).max(1), "month")
    } else {
        (days / 365, "year")
    };

    let plural = if count == 1 { "" } else { "s" };
    format!("{count} {unit}{plural} ago")
}
