//! Extraction of open dates and slot times from service pages

use chrono::NaiveDate;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;

use crate::utils::error::ScanError;
use crate::utils::normalize_whitespace;

static DATE_EVENTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"var dateEvents\s+=\s+(?P<events>.*?);").expect("Invalid regex pattern")
});

static SLOT_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"lock\(.*?>([\d:]+)</a>").expect("Invalid regex pattern"));

static SLOT_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}:\d{2}$").expect("Invalid regex pattern"));

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("Invalid selector"));

/// Latest open date from the `dateEvents` script variable of an entity page
///
/// # Errors
///
/// - `ScanError::DateEventsNotFound` if the page has no `dateEvents`
/// - `ScanError::InvalidDateEvents` if the value is not a JSON array
/// - `ScanError::NoOpenDates` if the array is empty or has no `date`
/// - `ScanError::InvalidDate` if the last date is not `YYYY-MM-DD`
pub fn extract_latest_date(html: &str) -> Result<NaiveDate, ScanError> {
    let captures = DATE_EVENTS_RE
        .captures(html)
        .ok_or(ScanError::DateEventsNotFound)?;

    let events: Vec<Value> = serde_json::from_str(&captures["events"])
        .map_err(|e| ScanError::InvalidDateEvents(e.to_string()))?;

    let date = events
        .last()
        .and_then(|event| event.get("date"))
        .and_then(Value::as_str)
        .ok_or(ScanError::NoOpenDates)?;

    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| ScanError::InvalidDate(date.to_string()))
}

/// Slot times (`HH:MM`) offered by a slot listing fragment, in page order
///
/// Slots are anchors calling `lock(...)`. When the markup cannot be walked as
/// anchors the raw pattern is matched instead.
pub fn extract_slots(html: &str) -> Vec<String> {
    let slots = slots_from_anchors(html);
    if !slots.is_empty() {
        return slots;
    }

    let mut slots: Vec<String> = Vec::new();
    for captures in SLOT_LINK_RE.captures_iter(html) {
        push_unique(&mut slots, &captures[1]);
    }
    slots
}

fn slots_from_anchors(html: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(html);
    let mut slots = Vec::new();

    for anchor in fragment.select(&ANCHOR_SELECTOR) {
        let element = anchor.value();
        let calls_lock = ["onclick", "href"]
            .iter()
            .filter_map(|attr| element.attr(attr))
            .any(|value| value.contains("lock("));
        if !calls_lock {
            continue;
        }

        let text = normalize_whitespace(&anchor.text().collect::<String>());
        if SLOT_TIME_RE.is_match(&text) {
            push_unique(&mut slots, &text);
        }
    }

    slots
}

fn push_unique(slots: &mut Vec<String>, slot: &str) {
    if !slots.iter().any(|s| s == slot) {
        slots.push(slot.to_string());
    }
}
