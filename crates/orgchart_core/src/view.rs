//! View state kept beside the tree: collapsed nodes, selection, scroll
//! offsets and double-click detection.

use std::{
    collections::{HashMap, HashSet},
    time::{Duration, Instant},
};

use shared::domain::EmployeeId;

pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(300);

/// Scroll offsets of the rendered grid, in pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollOffsets {
    pub columns: HashMap<usize, f32>,
    pub horizontal: f32,
}

impl ScrollOffsets {
    pub fn column(&self, column_index: usize) -> f32 {
        self.columns.get(&column_index).copied().unwrap_or(0.0)
    }

    pub fn set_column(&mut self, column_index: usize, offset: f32) {
        self.columns.insert(column_index, offset.max(0.0));
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub collapsed: HashSet<EmployeeId>,
    pub selected: Option<EmployeeId>,
    pub scroll: ScrollOffsets,
}

impl ViewState {
    pub fn is_collapsed(&self, id: EmployeeId) -> bool {
        self.collapsed.contains(&id)
    }

    /// Returns whether the node is collapsed afterwards.
    pub fn toggle_collapse(&mut self, id: EmployeeId) -> bool {
        if self.collapsed.remove(&id) {
            false
        } else {
            self.collapsed.insert(id);
            true
        }
    }

    pub fn expand(&mut self, id: EmployeeId) {
        self.collapsed.remove(&id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    Single,
    /// Second click on the same node inside the window: re-root there.
    Double,
}

#[derive(Debug, Clone)]
pub struct ClickTracker {
    window: Duration,
    last: Option<(EmployeeId, Instant)>,
}

impl Default for ClickTracker {
    fn default() -> Self {
        Self::new(DOUBLE_CLICK_WINDOW)
    }
}

impl ClickTracker {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn register(&mut self, id: EmployeeId, at: Instant) -> ClickKind {
        match self.last {
            Some((last_id, last_at))
                if last_id == id && at.saturating_duration_since(last_at) < self.window =>
            {
                self.last = None;
                ClickKind::Double
            }
            _ => {
                self.last = Some((id, at));
                ClickKind::Single
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_collapse_round_trips() {
        let mut view = ViewState::default();
        assert!(view.toggle_collapse(EmployeeId(3)));
        assert!(view.is_collapsed(EmployeeId(3)));
        assert!(!view.toggle_collapse(EmployeeId(3)));
        assert!(!view.is_collapsed(EmployeeId(3)));
    }

    #[test]
    fn second_click_inside_window_is_double() {
        let start = Instant::now();
        let mut clicks = ClickTracker::default();
        assert_eq!(clicks.register(EmployeeId(1), start), ClickKind::Single);
        assert_eq!(
            clicks.register(EmployeeId(1), start + Duration::from_millis(120)),
            ClickKind::Double
        );
        // A third click starts over.
        assert_eq!(
            clicks.register(EmployeeId(1), start + Duration::from_millis(200)),
            ClickKind::Single
        );
    }

    #[test]
    fn slow_or_different_clicks_stay_single() {
        let start = Instant::now();
        let mut clicks = ClickTracker::default();
        clicks.register(EmployeeId(1), start);
        assert_eq!(
            clicks.register(EmployeeId(2), start + Duration::from_millis(50)),
            ClickKind::Single
        );
        assert_eq!(
            clicks.register(EmployeeId(2), start + Duration::from_millis(500)),
            ClickKind::Single
        );
    }

    #[test]
    fn negative_scroll_is_clamped() {
        let mut scroll = ScrollOffsets::default();
        scroll.set_column(2, -40.0);
        assert_eq!(scroll.column(2), 0.0);
        assert_eq!(scroll.column(7), 0.0);
    }
}
