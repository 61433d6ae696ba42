use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde_json::{Map, Value};

use crate::attendance_fetch::{FetchError, RawPayload};
use crate::model::{AttendanceDataset, AttendanceRecord, Night};

// Field aliases seen across backend versions. New producer shapes are added
// here rather than as separate parse paths.
const NAME_KEYS: &[&str] = &["name"];
const ATTENDED_KEYS: &[&str] = &["attended"];
const POSSIBLE_KEYS: &[&str] = &["possible"];
const PCT_KEYS: &[&str] = &["percentage", "pct"];
const LAST_SEEN_KEYS: &[&str] = &["lastSeen", "last_seen", "lastSeenNight"];
const PRESENT_KEYS: &[&str] = &["present", "presentNights", "dates"];
const PER_PLAYER_KEYS: &[&str] = &["perPlayerDates", "per_player_dates"];

/// Converts a backend payload into the canonical dataset.
///
/// Only a missing or non-list `rows` is an error. Every other absent or
/// malformed field falls back to its default: counts to 0, night lists to
/// empty, `lastSeen` to none, and the percentage to the derived value.
pub fn normalize(raw: &RawPayload) -> Result<AttendanceDataset, FetchError> {
    let rows = raw
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Schema("payload has no `rows` list".to_string()))?;

    let nights: BTreeSet<Night> = night_list(raw.get("nights")).collect();
    let per_player = pick_object(raw, PER_PLAYER_KEYS);

    let mut seen: HashSet<&str> = HashSet::with_capacity(rows.len());
    let mut records = Vec::with_capacity(rows.len());
    let mut presence_index = BTreeMap::new();
    let mut skipped = 0usize;

    for row in rows {
        let Some(name) = pick_str(row, NAME_KEYS) else {
            skipped += 1;
            continue;
        };
        if !seen.insert(name) {
            skipped += 1;
            continue;
        }

        let attended = pick_count(row, ATTENDED_KEYS);
        let possible = pick_count(row, POSSIBLE_KEYS);
        let percentage = pick_number(row, PCT_KEYS)
            .map(pct_from_number)
            .unwrap_or_else(|| derive_pct(attended, possible));
        let last_seen_night = pick_str(row, LAST_SEEN_KEYS).map(Night::new);

        let mut present: BTreeSet<Night> = PRESENT_KEYS
            .iter()
            .flat_map(|key| night_list(row.get(*key)))
            .collect();
        if let Some(map) = per_player {
            present.extend(night_list(map.get(name)));
        }
        if !present.is_empty() {
            presence_index.insert(name.to_string(), present);
        }

        records.push(AttendanceRecord {
            name: name.to_string(),
            attended,
            possible,
            percentage,
            last_seen_night,
        });
    }

    if skipped > 0 {
        tracing::debug!(skipped, "dropped unnamed or duplicate attendance rows");
    }

    Ok(AttendanceDataset {
        nights,
        records,
        presence_index,
    })
}

/// `round(attended / possible * 100)` with halves rounded up, 0 when nothing
/// was possible, never above 100.
pub fn derive_pct(attended: u32, possible: u32) -> u8 {
    if possible == 0 {
        return 0;
    }
    let attended = u64::from(attended);
    let possible = u64::from(possible);
    let pct = (200 * attended + possible) / (2 * possible);
    pct.min(100) as u8
}

fn pct_from_number(value: f64) -> u8 {
    round_half_up(value).clamp(0.0, 100.0) as u8
}

fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn night_list(value: Option<&Value>) -> impl Iterator<Item = Night> + '_ {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Night::new)
}

fn pick_object<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Map<String, Value>> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_object))
}

fn pick_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    for key in keys {
        if let Some(s) = value.get(*key).and_then(Value::as_str) {
            let s = s.trim();
            if !s.is_empty() {
                return Some(s);
            }
        }
    }
    None
}

fn pick_number(value: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        let Some(v) = value.get(*key) else {
            continue;
        };
        let num = match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
            _ => None,
        };
        if let Some(num) = num.filter(|n| n.is_finite()) {
            return Some(num);
        }
    }
    None
}

fn pick_count(value: &Value, keys: &[&str]) -> u32 {
    pick_number(value, keys)
        .map(|n| round_half_up(n).clamp(0.0, f64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn derive_pct_rounds_half_up() {
        assert_eq!(derive_pct(1, 8), 13);
        assert_eq!(derive_pct(1, 40), 3);
        assert_eq!(derive_pct(1, 3), 33);
        assert_eq!(derive_pct(2, 3), 67);
        assert_eq!(derive_pct(5, 0), 0);
        assert_eq!(derive_pct(9, 4), 100);
    }

    #[test]
    fn explicit_percentage_is_rounded_and_clamped() {
        assert_eq!(pct_from_number(87.5), 88);
        assert_eq!(pct_from_number(-4.0), 0);
        assert_eq!(pct_from_number(250.0), 100);
    }

    #[test]
    fn counts_accept_strings_and_clamp_negatives() {
        let row = json!({ "attended": "4", "possible": -2 });
        assert_eq!(pick_count(&row, ATTENDED_KEYS), 4);
        assert_eq!(pick_count(&row, POSSIBLE_KEYS), 0);
        assert_eq!(pick_count(&row, &["missing"]), 0);
    }

    #[test]
    fn pct_string_with_percent_sign_parses() {
        let row = json!({ "pct": "75%" });
        assert_eq!(pick_number(&row, PCT_KEYS), Some(75.0));
    }
}
