use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::attendance_fetch::FetchError;
use crate::model::{AttendanceDataset, AttendanceRecord, Snapshot, ViewState};
use crate::tooltip::TooltipState;
use crate::view;

pub const DEFAULT_MIN_PCT: u8 = 75;
const MAX_LOGS: usize = 200;

pub const MSG_FROM_CACHE: &str = "Loaded from cache";
pub const MSG_LOADING: &str = "Loading…";
pub const MSG_REFRESHED: &str = "Attendance refreshed successfully!";
pub const MSG_CLEARED: &str = "Cache cleared.";

/// Board lifecycle. `Success` and `Error` are resting states: like `Idle`
/// they accept the next user action; only `Loading` has a request in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Only before the first fetch and after the cache is cleared.
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub phase: LoadPhase,
    pub dataset: AttendanceDataset,
    pub captured_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub view: ViewState,
    /// Threshold used when the minimum-percentage filter is switched on.
    pub min_pct: u8,
    pub selected: usize,
    pub search_active: bool,
    pub tooltip: TooltipState,
    pub help_overlay: bool,
    pub logs: VecDeque<String>,
    /// Id of the most recently issued refresh.
    pub latest_request: u64,
    /// Refresh whose result is still wanted, if any.
    pub inflight: Option<u64>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    FetchFinished {
        request_id: u64,
        result: Result<Snapshot, FetchError>,
    },
    Log(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderCommand {
    Refresh { request_id: u64 },
}

/// What applying a delta changed, for the caller to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaOutcome {
    None,
    /// A fresh dataset is on screen and should be persisted.
    Refreshed(Snapshot),
    Failed(FetchError),
    /// Result belonged to a superseded or abandoned request.
    Stale { request_id: u64 },
}

impl AppState {
    pub fn new() -> Self {
        Self {
            phase: LoadPhase::Idle,
            dataset: AttendanceDataset::default(),
            captured_at: None,
            status: None,
            view: ViewState::default(),
            min_pct: DEFAULT_MIN_PCT,
            selected: 0,
            search_active: false,
            tooltip: TooltipState::new(),
            help_overlay: false,
            logs: VecDeque::with_capacity(MAX_LOGS),
            latest_request: 0,
            inflight: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }

    pub fn visible_rows(&self) -> Vec<&AttendanceRecord> {
        view::project(&self.dataset.records, &self.view)
    }

    pub fn selected_record(&self) -> Option<&AttendanceRecord> {
        self.visible_rows().get(self.selected).copied()
    }

    /// Shows a stored snapshot without touching the network.
    pub fn show_snapshot(&mut self, snapshot: Snapshot) {
        self.dataset = snapshot.dataset;
        self.captured_at = Some(snapshot.captured_at);
        self.phase = LoadPhase::Success;
        self.tooltip.leave();
        self.clamp_selection();
    }

    /// Issues a new request id; any earlier in-flight request is abandoned.
    pub fn begin_refresh(&mut self) -> u64 {
        if let Some(prev) = self.inflight {
            self.push_log(format!("[INFO] Refresh #{prev} superseded"));
        }
        self.latest_request += 1;
        self.inflight = Some(self.latest_request);
        self.phase = LoadPhase::Loading;
        self.latest_request
    }

    /// Drops every row and abandons any in-flight request.
    pub fn clear_dataset(&mut self) {
        self.inflight = None;
        self.dataset = AttendanceDataset::default();
        self.captured_at = None;
        self.phase = LoadPhase::Idle;
        self.status = Some(MSG_CLEARED.to_string());
        self.tooltip.leave();
        self.selected = 0;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.view.search_query = query.into();
        self.tooltip.leave();
        self.clamp_selection();
    }

    pub fn push_query_char(&mut self, c: char) {
        let mut query = std::mem::take(&mut self.view.search_query);
        query.push(c);
        self.set_query(query);
    }

    pub fn pop_query_char(&mut self) {
        let mut query = std::mem::take(&mut self.view.search_query);
        query.pop();
        self.set_query(query);
    }

    pub fn cycle_sort(&mut self) {
        let selected = self.selected_record().map(|r| r.name.clone());
        self.view.sort_key = self.view.sort_key.cycle();
        self.tooltip.leave();
        self.reselect(selected);
    }

    pub fn toggle_threshold(&mut self) {
        self.view.min_threshold = match self.view.min_threshold {
            Some(_) => None,
            None => Some(self.min_pct),
        };
        self.tooltip.leave();
        self.clamp_selection();
    }

    pub fn select_next(&mut self) {
        let total = self.visible_rows().len();
        if total == 0 {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected + 1) % total;
    }

    pub fn select_prev(&mut self) {
        let total = self.visible_rows().len();
        if total == 0 {
            self.selected = 0;
            return;
        }
        if self.selected == 0 {
            self.selected = total - 1;
        } else {
            self.selected -= 1;
        }
    }

    pub fn clamp_selection(&mut self) {
        let total = self.visible_rows().len();
        if total == 0 {
            self.selected = 0;
        } else if self.selected >= total {
            self.selected = total - 1;
        }
    }

    fn reselect(&mut self, name: Option<String>) {
        let pos = name.and_then(|name| self.visible_rows().iter().position(|r| r.name == name));
        match pos {
            Some(pos) => self.selected = pos,
            None => self.clamp_selection(),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}

/// Applies a provider delta. Results are accepted only for the request that
/// is still in flight, so an older response can never replace a newer one
/// regardless of completion order.
pub fn apply_delta(state: &mut AppState, delta: Delta) -> DeltaOutcome {
    match delta {
        Delta::Log(line) => {
            state.push_log(line);
            DeltaOutcome::None
        }
        Delta::FetchFinished { request_id, result } => {
            if state.inflight != Some(request_id) {
                state.push_log(format!("[INFO] Ignored stale response #{request_id}"));
                tracing::debug!(request_id, latest = state.latest_request, "stale attendance response");
                return DeltaOutcome::Stale { request_id };
            }
            state.inflight = None;
            match result {
                Ok(snapshot) => {
                    let selected = state.selected_record().map(|r| r.name.clone());
                    state.dataset = snapshot.dataset.clone();
                    state.captured_at = Some(snapshot.captured_at);
                    state.phase = LoadPhase::Success;
                    state.status = Some(MSG_REFRESHED.to_string());
                    state.tooltip.leave();
                    state.reselect(selected);
                    state.push_log(format!(
                        "[INFO] Loaded {} players over {} nights",
                        state.dataset.records.len(),
                        state.dataset.nights.len()
                    ));
                    DeltaOutcome::Refreshed(snapshot)
                }
                Err(err) => {
                    // Previously displayed rows stay on screen.
                    state.phase = LoadPhase::Error;
                    state.status = Some(error_message(&err));
                    state.push_log(format!("[WARN] Attendance fetch failed: {err}"));
                    DeltaOutcome::Failed(err)
                }
            }
        }
    }
}

pub fn error_message(err: &FetchError) -> String {
    format!("Error loading attendance data. {err}")
}

pub fn phase_label(phase: LoadPhase) -> &'static str {
    match phase {
        LoadPhase::Idle => "IDLE",
        LoadPhase::Loading => "LOADING",
        LoadPhase::Success => "OK",
        LoadPhase::Error => "ERROR",
    }
}
