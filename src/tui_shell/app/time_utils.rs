use time::format_description::well_known::Rfc3339;

use super::*;

pub(in crate::tui_shell) fn fmt_since(then: OffsetDateTime, now: OffsetDateTime) -> String {
    let secs = (now - then).whole_seconds();

    // Future timestamps are rare; show as absolute.
    if secs < 0 {
        return fmt_day(then);
    }

    let mins = secs / 60;
    let hours = mins / 60;
    let days = hours / 24;

    if secs < 60 {
        "just now".to_string()
    } else if mins < 60 {
        format!("{}m ago", mins)
    } else if hours < 48 {
        format!("{}h ago", hours)
    } else if days < 14 {
        format!("{}d ago", days)
    } else {
        fmt_day(then)
    }
}

fn fmt_day(t: OffsetDateTime) -> String {
    format!("{:04}-{:02}-{:02}", t.year(), u8::from(t.month()), t.day())
}

/// Date part of an RFC 3339 timestamp, or the raw text when it does not parse.
pub(in crate::tui_shell) fn fmt_ts_day(ts: &str) -> String {
    match OffsetDateTime::parse(ts, &Rfc3339) {
        Ok(t) => fmt_day(t),
        Err(_) if ts.is_empty() => "-".to_string(),
        Err(_) => ts.to_string(),
    }
}
