use crate::model::{AttendanceDataset, Night};

/// Offset between the pointer and the tooltip's top-left corner.
pub const POINTER_OFFSET: (u16, u16) = (2, 1);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceDetail {
    pub name: String,
    pub present: Vec<Night>,
    pub missing: Vec<Night>,
}

/// Splits the tracked nights into attended and missed for one player.
///
/// Both lists are ascending and together are exactly `dataset.nights`.
/// Presence entries for nights outside the tracked window are ignored.
pub fn detail(name: &str, dataset: &AttendanceDataset) -> PresenceDetail {
    let presence = dataset.presence(name);
    let (present, missing): (Vec<Night>, Vec<Night>) = dataset
        .nights
        .iter()
        .cloned()
        .partition(|night| presence.is_some_and(|p| p.contains(night)));
    PresenceDetail {
        name: name.to_string(),
        present,
        missing,
    }
}

/// Hover state for the per-player tooltip.
#[derive(Debug, Clone, Default)]
pub struct TooltipState {
    visible: bool,
    pointer: (u16, u16),
    detail: Option<PresenceDetail>,
}

impl TooltipState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer entered the region of `name`'s row. Detail is derived here
    /// and nowhere else; re-entering the row that is already shown keeps it.
    pub fn enter(&mut self, name: &str, dataset: &AttendanceDataset, x: u16, y: u16) {
        let same_target = self.visible && self.target() == Some(name);
        if !same_target {
            self.detail = Some(detail(name, dataset));
        }
        self.visible = true;
        self.pointer = (x, y);
    }

    /// Tracks the pointer while visible without touching the detail.
    pub fn move_to(&mut self, x: u16, y: u16) {
        if self.visible {
            self.pointer = (x, y);
        }
    }

    pub fn leave(&mut self) {
        self.visible = false;
        self.detail = None;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn pointer(&self) -> (u16, u16) {
        self.pointer
    }

    /// Where the tooltip's corner goes, relative to the pointer.
    pub fn anchor(&self) -> (u16, u16) {
        (
            self.pointer.0.saturating_add(POINTER_OFFSET.0),
            self.pointer.1.saturating_add(POINTER_OFFSET.1),
        )
    }

    pub fn target(&self) -> Option<&str> {
        self.detail.as_ref().map(|d| d.name.as_str())
    }

    pub fn detail(&self) -> Option<&PresenceDetail> {
        if self.visible {
            self.detail.as_ref()
        } else {
            None
        }
    }
}
