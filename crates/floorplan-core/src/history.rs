//! Snapshot-based undo/redo with debounced selection coalescing.
//!
//! The manager never touches the document itself. The owner reports the current
//! state through [`HistoryManager::observe`] after every edit and drives the
//! selection debounce with [`HistoryManager::poll`]. Undo and redo hand back the
//! entry to restore; the owner replaces its state with it and, because
//! `last_entry` already equals the restored state, the next observation records
//! nothing.

use crate::model::Selection;
use crate::plan::FloorPlan;
use std::collections::VecDeque;

#[cfg(not(target_arch = "wasm32"))]
pub use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
pub use web_time::{Duration, Instant};

/// Maximum number of undo steps kept.
pub const MAX_HISTORY_SIZE: usize = 50;

/// Quiet period before a selection change is committed, in milliseconds.
pub const SELECTION_DEBOUNCE_MS: u64 = 300;

/// Quiet period before a selection change is committed.
pub const SELECTION_DEBOUNCE: Duration = Duration::from_millis(SELECTION_DEBOUNCE_MS);

/// Immutable copy of the document and selection at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub plan: FloorPlan,
    pub selection: Selection,
}

impl HistoryEntry {
    /// Deep copy of the document and selection.
    pub fn capture(plan: &FloorPlan, selection: &Selection) -> Self {
        Self {
            plan: plan.clone(),
            selection: selection.clone(),
        }
    }
}

/// Single-slot deferred task. Scheduling replaces any pending deadline.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    /// Create an idle debouncer with the given delay.
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    /// Replace any pending task with one due `delay` after `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Drop the pending task, if any.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Check if a task is waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// When the pending task is due.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true exactly once, the first time it is called at or after the deadline.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Undo/redo log owned by one editing session.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    past: VecDeque<HistoryEntry>,
    future: Vec<HistoryEntry>,
    last_entry: Option<HistoryEntry>,
    limit: usize,
    selection_timer: Debouncer,
    gesture_active: bool,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(MAX_HISTORY_SIZE, SELECTION_DEBOUNCE)
    }
}

impl HistoryManager {
    /// Create an empty history keeping at most `limit` undo steps.
    pub fn new(limit: usize, debounce: Duration) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            last_entry: None,
            limit: limit.max(1),
            selection_timer: Debouncer::new(debounce),
            gesture_active: false,
        }
    }

    /// Report the current state after an edit or a selection change.
    ///
    /// A document change is recorded immediately and cancels any pending
    /// selection commit. A selection-only change (re)starts the debounce.
    /// Nothing is recorded while a gesture is active. Returns true when an entry
    /// was recorded.
    pub fn observe(&mut self, plan: &FloorPlan, selection: &Selection, now: Instant) -> bool {
        if self.gesture_active {
            return false;
        }
        let Some(last) = &self.last_entry else {
            self.last_entry = Some(HistoryEntry::capture(plan, selection));
            return false;
        };
        if last.plan != *plan {
            self.selection_timer.cancel();
            self.record(plan, selection);
            true
        } else if last.selection != *selection {
            self.selection_timer.schedule(now);
            false
        } else {
            self.selection_timer.cancel();
            false
        }
    }

    /// Commit a settled selection once the debounce window has elapsed.
    pub fn poll(&mut self, plan: &FloorPlan, selection: &Selection, now: Instant) -> bool {
        if self.gesture_active || !self.selection_timer.fire(now) {
            return false;
        }
        let changed = self
            .last_entry
            .as_ref()
            .is_none_or(|last| last.plan != *plan || last.selection != *selection);
        if changed {
            log::trace!("Committing settled selection of {} items", selection.len());
            self.record(plan, selection);
        }
        changed
    }

    /// Deadline of the pending selection commit, for owners that schedule a timer.
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.selection_timer.deadline()
    }

    /// Push the previous state onto `past`, clear `future` and remember the new state.
    pub fn record(&mut self, plan: &FloorPlan, selection: &Selection) {
        if let Some(previous) = self.last_entry.take() {
            self.past.push_back(previous);
            while self.past.len() > self.limit {
                self.past.pop_front();
            }
        }
        self.future.clear();
        self.last_entry = Some(HistoryEntry::capture(plan, selection));
    }

    /// Step back. Returns the entry the owner must restore, or `None` when there
    /// is nothing to undo.
    pub fn undo(&mut self, plan: &FloorPlan, selection: &Selection) -> Option<HistoryEntry> {
        let entry = self.past.pop_back()?;
        self.selection_timer.cancel();
        self.future.push(HistoryEntry::capture(plan, selection));
        self.last_entry = Some(entry.clone());
        Some(entry)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, plan: &FloorPlan, selection: &Selection) -> Option<HistoryEntry> {
        let entry = self.future.pop()?;
        self.selection_timer.cancel();
        self.past.push_back(HistoryEntry::capture(plan, selection));
        while self.past.len() > self.limit {
            self.past.pop_front();
        }
        self.last_entry = Some(entry.clone());
        Some(entry)
    }

    /// Suppress recording until [`end_gesture`](Self::end_gesture).
    pub fn begin_gesture(&mut self) {
        self.gesture_active = true;
        self.selection_timer.cancel();
    }

    /// Re-enable recording. The owner observes the settled state afterwards.
    pub fn end_gesture(&mut self) {
        self.gesture_active = false;
    }

    /// Check if recording is suspended for a gesture.
    pub fn is_gesture_active(&self) -> bool {
        self.gesture_active
    }

    /// Forget everything, including the pending selection commit.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.last_entry = None;
        self.selection_timer.cancel();
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of undo steps.
    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    /// Number of redo steps.
    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    /// The most recently recorded or restored state.
    pub fn last_entry(&self) -> Option<&HistoryEntry> {
        self.last_entry.as_ref()
    }

    /// Maximum number of undo steps kept.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bounds, Room, RoomType};
    use uuid::Uuid;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn add_room(plan: &mut FloorPlan) {
        plan.add_room(Room::new("Room", RoomType::Bedroom, Bounds::new(0.0, 0.0, 300.0, 300.0)));
    }

    #[test]
    fn test_undo_redo_inverse() {
        let t0 = Instant::now();
        let mut history = HistoryManager::default();
        let mut plan = FloorPlan::new();
        let selection = Selection::new();
        history.observe(&plan, &selection, t0);
        let s0 = plan.clone();

        add_room(&mut plan);
        assert!(history.observe(&plan, &selection, t0));
        let s1 = plan.clone();

        let entry = history.undo(&plan, &selection).unwrap();
        assert_eq!(entry.plan, s0);
        plan = entry.plan;
        assert!(!history.observe(&plan, &selection, t0));

        let entry = history.redo(&plan, &selection).unwrap();
        assert_eq!(entry.plan, s1);
        plan = entry.plan;
        assert!(!history.observe(&plan, &selection, t0));
        assert_eq!(history.past_len(), 1);
        assert_eq!(history.future_len(), 0);
    }

    #[test]
    fn test_new_edit_clears_future() {
        let t0 = Instant::now();
        let mut history = HistoryManager::default();
        let mut plan = FloorPlan::new();
        let selection = Selection::new();
        history.observe(&plan, &selection, t0);
        add_room(&mut plan);
        history.observe(&plan, &selection, t0);
        plan = history.undo(&plan, &selection).unwrap().plan;
        assert!(history.can_redo());

        plan.name = "Renamed".into();
        history.observe(&plan, &selection, t0);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_selection_changes_coalesce() {
        let t0 = Instant::now();
        let mut history = HistoryManager::default();
        let plan = FloorPlan::new();
        let mut selection = Selection::new();
        history.observe(&plan, &selection, t0);

        let mut last = Uuid::nil();
        for i in 0..5 {
            last = Uuid::new_v4();
            selection.select(last);
            history.observe(&plan, &selection, t0 + ms(50 * i));
            assert!(!history.poll(&plan, &selection, t0 + ms(50 * i + 10)));
        }
        assert_eq!(history.past_len(), 0);

        assert!(history.poll(&plan, &selection, t0 + ms(200 + 300)));
        assert_eq!(history.past_len(), 1);
        assert_eq!(history.last_entry().unwrap().selection.ids(), &[last]);
        assert!(!history.poll(&plan, &selection, t0 + ms(2000)));
    }

    #[test]
    fn test_edit_cancels_pending_selection() {
        let t0 = Instant::now();
        let mut history = HistoryManager::default();
        let mut plan = FloorPlan::new();
        let mut selection = Selection::new();
        history.observe(&plan, &selection, t0);

        selection.select(Uuid::new_v4());
        history.observe(&plan, &selection, t0);
        add_room(&mut plan);
        history.observe(&plan, &selection, t0 + ms(10));
        assert!(history.pending_deadline().is_none());
        assert!(!history.poll(&plan, &selection, t0 + ms(1000)));
        assert_eq!(history.past_len(), 1);
    }

    #[test]
    fn test_clear_cancels_pending_selection() {
        let t0 = Instant::now();
        let mut history = HistoryManager::default();
        let plan = FloorPlan::new();
        let mut selection = Selection::new();
        history.observe(&plan, &selection, t0);

        selection.select(Uuid::new_v4());
        history.observe(&plan, &selection, t0);
        assert!(history.pending_deadline().is_some());

        history.clear();
        assert!(history.pending_deadline().is_none());
        assert!(!history.poll(&plan, &selection, t0 + ms(1000)));
        assert_eq!(history.past_len(), 0);
        assert!(history.last_entry().is_none());
    }

    #[test]
    fn test_history_is_bounded() {
        let t0 = Instant::now();
        let mut history = HistoryManager::default();
        let mut plan = FloorPlan::new();
        let selection = Selection::new();
        history.observe(&plan, &selection, t0);
        for i in 0..(MAX_HISTORY_SIZE + 10) {
            plan.name = format!("Plan {i}");
            history.observe(&plan, &selection, t0);
        }
        assert_eq!(history.past_len(), MAX_HISTORY_SIZE);

        // The oldest entries were dropped first.
        let mut oldest = None;
        while let Some(entry) = history.undo(&plan, &selection) {
            plan = entry.plan.clone();
            oldest = Some(entry);
        }
        assert_eq!(oldest.unwrap().plan.name, "Plan 9");
    }

    #[test]
    fn test_gesture_suppresses_recording() {
        let t0 = Instant::now();
        let mut history = HistoryManager::default();
        let mut plan = FloorPlan::new();
        let selection = Selection::new();
        history.observe(&plan, &selection, t0);

        history.begin_gesture();
        for i in 0..10 {
            plan.name = format!("frame {i}");
            assert!(!history.observe(&plan, &selection, t0));
        }
        history.end_gesture();
        assert!(history.observe(&plan, &selection, t0));
        assert_eq!(history.past_len(), 1);
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut history = HistoryManager::default();
        let plan = FloorPlan::new();
        let selection = Selection::new();
        assert!(history.undo(&plan, &selection).is_none());
        assert!(history.redo(&plan, &selection).is_none());
        history.clear();
        assert!(history.last_entry().is_none());
    }

    #[test]
    fn test_debouncer_single_slot() {
        let t0 = Instant::now();
        let mut timer = Debouncer::new(ms(300));
        timer.schedule(t0);
        timer.schedule(t0 + ms(200));
        assert!(!timer.fire(t0 + ms(400)));
        assert!(timer.fire(t0 + ms(500)));
        assert!(!timer.is_pending());
        timer.schedule(t0);
        timer.cancel();
        assert!(!timer.fire(t0 + ms(1000)));
    }
}
