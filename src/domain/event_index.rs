use crate::domain::models::Event;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Group events by their calendar-date key, preserving the relative order
/// of same-date events. Events whose date is absent or fails the strict
/// key check are skipped; they stay in the caller's list, just unindexed.
pub fn index_by_date(events: &[Event]) -> HashMap<String, Vec<Event>> {
    let mut index: HashMap<String, Vec<Event>> = HashMap::new();
    for event in events {
        let Some(date) = event.date.as_deref() else {
            continue;
        };
        if parse_date_key(date).is_none() {
            continue;
        }
        index.entry(date.to_string()).or_default().push(event.clone());
    }
    index
}

/// Strict `YYYY-MM-DD` check: zero-padded fields and a real calendar date.
/// The shape requirement pins the raw string to the canonical key format,
/// since `%m`/`%d` alone would also accept unpadded values.
pub fn parse_date_key(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits = bytes[..4]
        .iter()
        .chain(&bytes[5..7])
        .chain(&bytes[8..10])
        .all(u8::is_ascii_digit);
    if !digits {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
