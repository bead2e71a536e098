use chrono::{DateTime, Utc};

use crate::feature::QuakeProperties;

const UNKNOWN_TIME: &str = "unknown time";
const UNKNOWN_EVENT: &str = "unknown event";

/// Render an epoch-millisecond timestamp as `"March 5 - 8:07 UTC"`.
///
/// Fields always come from UTC. The day and hour are not padded; the minute is.
pub fn format_timestamp(epoch_millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(epoch_millis) {
        Some(instant) => instant.format("%B %-d - %-H:%M UTC").to_string(),
        None => UNKNOWN_TIME.to_string(),
    }
}

/// Popup body for one earthquake: title, a rule, then the event time.
pub fn build_popup_html(properties: &QuakeProperties) -> String {
    let title = properties
        .title
        .as_deref()
        .map(escape_html)
        .unwrap_or_else(|| UNKNOWN_EVENT.to_string());
    let time = properties
        .time
        .map(format_timestamp)
        .unwrap_or_else(|| UNKNOWN_TIME.to_string());
    format!("Event: {title}<hr>Time: {time}")
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
