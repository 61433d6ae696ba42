use std::sync::mpsc::{Receiver, Sender};

use crate::model::AttendanceDataset;
use crate::persist::SnapshotStore;
use crate::state::{
    apply_delta, AppState, Delta, DeltaOutcome, LoadPhase, ProviderCommand, MSG_FROM_CACHE,
    MSG_LOADING,
};

/// Narrow hook for third-party tooltip widgets that need to rescan after the
/// displayed data changes. Core code never reaches them any other way.
pub trait ExternalTooltips {
    fn refresh_external_tooltips(&self, dataset: &AttendanceDataset);
}

/// Owns the board state and drives refresh, clear, search, sort, and hover.
pub struct Controller {
    pub state: AppState,
    store: SnapshotStore,
    cmd_tx: Option<Sender<ProviderCommand>>,
    tooltips: Option<Box<dyn ExternalTooltips>>,
}

impl Controller {
    pub fn new(store: SnapshotStore, cmd_tx: Option<Sender<ProviderCommand>>) -> Self {
        Self {
            state: AppState::new(),
            store,
            cmd_tx,
            tooltips: None,
        }
    }

    pub fn with_external_tooltips(mut self, hook: Box<dyn ExternalTooltips>) -> Self {
        self.tooltips = Some(hook);
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// First paint: a stored snapshot is shown immediately with no network
    /// call; otherwise one automatic refresh is issued.
    pub fn mount(&mut self) {
        match self.store.load() {
            Some(snapshot) => {
                self.state.show_snapshot(snapshot);
                self.state.status = Some(MSG_FROM_CACHE.to_string());
                self.state.push_log("[INFO] Loaded attendance from cache");
                self.notify_data_changed();
            }
            None => {
                self.refresh();
                if self.state.is_loading() {
                    self.state.status = Some(MSG_LOADING.to_string());
                }
            }
        }
    }

    /// Supersedes any in-flight request and asks the provider for fresh data.
    pub fn refresh(&mut self) {
        let request_id = self.state.begin_refresh();
        self.state.status = None;

        let Some(tx) = &self.cmd_tx else {
            self.fail_to_send(request_id, "refresh unavailable");
            return;
        };
        if tx.send(ProviderCommand::Refresh { request_id }).is_err() {
            self.fail_to_send(request_id, "provider stopped");
            return;
        }
        self.state
            .push_log(format!("[INFO] Refresh #{request_id} requested"));
    }

    pub fn clear_cache(&mut self) {
        self.store.clear();
        self.state.clear_dataset();
        self.state.push_log("[INFO] Cache cleared");
        self.notify_data_changed();
    }

    pub fn apply(&mut self, delta: Delta) -> DeltaOutcome {
        let outcome = apply_delta(&mut self.state, delta);
        if let DeltaOutcome::Refreshed(snapshot) = &outcome {
            self.store.save(snapshot);
            self.notify_data_changed();
        }
        outcome
    }

    /// Applies every delta already waiting, without blocking.
    pub fn drain(&mut self, rx: &Receiver<Delta>) {
        while let Ok(delta) = rx.try_recv() {
            self.apply(delta);
        }
    }

    /// Pointer is over visible row `row` at `(x, y)`.
    pub fn hover_row(&mut self, row: usize, x: u16, y: u16) {
        let Some(name) = self.state.visible_rows().get(row).map(|r| r.name.clone()) else {
            self.state.tooltip.leave();
            return;
        };
        self.state.tooltip.enter(&name, &self.state.dataset, x, y);
    }

    pub fn hover_move(&mut self, x: u16, y: u16) {
        self.state.tooltip.move_to(x, y);
    }

    pub fn hover_leave(&mut self) {
        self.state.tooltip.leave();
    }

    /// Keyboard stand-in for hovering: shows or hides the tooltip for the
    /// selected row, anchored at `(x, y)`.
    pub fn toggle_selected_tooltip(&mut self, x: u16, y: u16) {
        if self.state.tooltip.is_visible() {
            self.state.tooltip.leave();
        } else {
            let selected = self.state.selected;
            self.hover_row(selected, x, y);
        }
    }

    fn fail_to_send(&mut self, request_id: u64, reason: &str) {
        self.state.inflight = None;
        self.state.phase = LoadPhase::Error;
        self.state.status = Some(format!("Error loading attendance data. {reason}"));
        self.state
            .push_log(format!("[WARN] Refresh #{request_id} not sent: {reason}"));
    }

    fn notify_data_changed(&self) {
        if let Some(hook) = &self.tooltips {
            hook.refresh_external_tooltips(&self.state.dataset);
        }
    }
}
