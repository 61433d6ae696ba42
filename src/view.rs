use std::cmp::Ordering;

use crate::model::{AttendanceRecord, SortKey, ViewState};

struct Entry<'a> {
    record: &'a AttendanceRecord,
    folded: String,
}

/// Filters and orders `records` for display. Pure; cheap enough to run on
/// every keystroke.
///
/// Name search and name ordering are both case-insensitive. Names that only
/// differ by case fall back to a byte-wise comparison so the order is total.
pub fn project<'a>(records: &'a [AttendanceRecord], view: &ViewState) -> Vec<&'a AttendanceRecord> {
    let query = view.search_query.trim().to_lowercase();
    let mut entries: Vec<Entry<'a>> = records
        .iter()
        .filter(|r| passes_threshold(r, view.min_threshold))
        .map(|record| Entry {
            record,
            folded: record.name.to_lowercase(),
        })
        .filter(|e| query.is_empty() || e.folded.contains(&query))
        .collect();

    entries.sort_by(|a, b| compare(view.sort_key, a, b));
    entries.into_iter().map(|e| e.record).collect()
}

pub fn matches_filter(record: &AttendanceRecord, view: &ViewState) -> bool {
    let query = view.search_query.trim().to_lowercase();
    passes_threshold(record, view.min_threshold)
        && (query.is_empty() || record.name.to_lowercase().contains(&query))
}

fn passes_threshold(record: &AttendanceRecord, min: Option<u8>) -> bool {
    min.is_none_or(|min| record.pct() >= min)
}

fn compare(key: SortKey, a: &Entry<'_>, b: &Entry<'_>) -> Ordering {
    match key {
        SortKey::Percentage => by_percentage(a, b),
        SortKey::Name => by_name(a, b),
        SortKey::Attended => b
            .record
            .attended
            .cmp(&a.record.attended)
            .then_with(|| b.record.pct().cmp(&a.record.pct()))
            .then_with(|| by_name(a, b)),
        SortKey::LastSeen => match (&a.record.last_seen_night, &b.record.last_seen_night) {
            (Some(x), Some(y)) => y.cmp(x).then_with(|| by_percentage(a, b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => by_percentage(a, b),
        },
    }
}

fn by_percentage(a: &Entry<'_>, b: &Entry<'_>) -> Ordering {
    b.record
        .pct()
        .cmp(&a.record.pct())
        .then_with(|| b.record.attended.cmp(&a.record.attended))
        .then_with(|| by_name(a, b))
}

fn by_name(a: &Entry<'_>, b: &Entry<'_>) -> Ordering {
    a.folded
        .cmp(&b.folded)
        .then_with(|| a.record.name.cmp(&b.record.name))
}
