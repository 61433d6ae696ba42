use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A tracked raid date (`YYYY-MM-DD`).
///
/// Ordering is plain string ordering, which for ISO calendar dates is also
/// chronological ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Night(String);

impl Night {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, "%Y-%m-%d").ok()
    }
}

impl fmt::Display for Night {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Night {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub name: String,
    pub attended: u32,
    pub possible: u32,
    pub percentage: u8,
    #[serde(default)]
    pub last_seen_night: Option<Night>,
}

impl AttendanceRecord {
    /// Percentage as displayed. Clamped on read so a corrupt snapshot can
    /// never render outside `0..=100`.
    pub fn pct(&self) -> u8 {
        self.percentage.min(100)
    }

    pub fn band(&self) -> PctBand {
        PctBand::from_pct(self.pct())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PctBand {
    High,
    Medium,
    Low,
}

impl PctBand {
    pub fn from_pct(pct: u8) -> Self {
        if pct >= 75 {
            PctBand::High
        } else if pct >= 50 {
            PctBand::Medium
        } else {
            PctBand::Low
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDataset {
    pub nights: BTreeSet<Night>,
    pub records: Vec<AttendanceRecord>,
    #[serde(default)]
    pub presence_index: BTreeMap<String, BTreeSet<Night>>,
}

impl AttendanceDataset {
    pub fn record(&self, name: &str) -> Option<&AttendanceRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn presence(&self, name: &str) -> Option<&BTreeSet<Night>> {
        self.presence_index.get(name)
    }

    /// First and last tracked night, ascending.
    pub fn date_range(&self) -> Option<(&Night, &Night)> {
        let first = self.nights.first()?;
        let last = self.nights.last()?;
        Some((first, last))
    }

    /// Whole weeks spanned by the tracked nights, counting partial weeks.
    pub fn weeks_covered(&self) -> Option<i64> {
        let (first, last) = self.date_range()?;
        let days = (last.as_date()? - first.as_date()?).num_days();
        Some(days / 7 + 1)
    }

    /// Re-applies the percentage clamp to every record. Used on data that
    /// did not come through the normalizer (e.g. a stored snapshot).
    pub fn sanitize(&mut self) {
        for record in &mut self.records {
            record.percentage = record.pct();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub dataset: AttendanceDataset,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Percentage,
    Name,
    Attended,
    LastSeen,
}

impl SortKey {
    pub fn cycle(self) -> Self {
        match self {
            SortKey::Percentage => SortKey::Name,
            SortKey::Name => SortKey::Attended,
            SortKey::Attended => SortKey::LastSeen,
            SortKey::LastSeen => SortKey::Percentage,
        }
    }
}

pub fn sort_label(key: SortKey) -> &'static str {
    match key {
        SortKey::Percentage => "Top %",
        SortKey::Name => "Name A-Z",
        SortKey::Attended => "Attended (desc)",
        SortKey::LastSeen => "Last Seen (newest)",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub search_query: String,
    pub sort_key: SortKey,
    pub min_threshold: Option<u8>,
}
