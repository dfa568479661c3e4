//! Autosave gate: a pure debounce over document changes.
//!
//! DESIGN
//! ======
//! The gate never does I/O and never reads a clock — callers pass `now` in
//! milliseconds — so scheduling is testable without a runtime. Any change
//! re-arms a fixed-delay timer; the save fires once the delay elapses and no
//! save is currently in flight. A failed save is abandoned (no automatic
//! retry): the timer only re-arms on the next change.

#[cfg(test)]
#[path = "autosave_test.rs"]
mod autosave_test;

use crate::consts::AUTOSAVE_DEBOUNCE_MS;

/// Debounced save scheduler for one document.
pub struct AutosaveGate {
    delay_ms: i64,
    due_at: Option<i64>,
    in_flight: bool,
    last_saved_at: Option<i64>,
}

impl AutosaveGate {
    /// Create a gate with a custom debounce delay.
    #[must_use]
    pub fn new(delay_ms: i64) -> Self {
        Self { delay_ms, due_at: None, in_flight: false, last_saved_at: None }
    }

    /// A document change happened; (re)arm the timer.
    pub fn note_change(&mut self, now_ms: i64) {
        self.due_at = Some(now_ms + self.delay_ms);
    }

    /// Whether a save should start now. False while a save is in flight.
    #[must_use]
    pub fn save_due(&self, now_ms: i64) -> bool {
        !self.in_flight && self.due_at.is_some_and(|due| now_ms >= due)
    }

    /// Mark a save as started. Returns false (and changes nothing) when one
    /// is already in flight. Disarms the timer; changes arriving during the
    /// save re-arm it.
    pub fn begin_save(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.in_flight = true;
        self.due_at = None;
        true
    }

    /// Mark the in-flight save as finished. Success records the last-saved
    /// timestamp; failure abandons the attempt without re-arming.
    pub fn finish_save(&mut self, success: bool, now_ms: i64) {
        self.in_flight = false;
        if success {
            self.last_saved_at = Some(now_ms);
        }
    }

    /// Whether a save is currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Whether a change is waiting on the timer.
    #[must_use]
    pub fn armed(&self) -> bool {
        self.due_at.is_some()
    }

    /// When the last successful save finished, if any.
    #[must_use]
    pub fn last_saved_at(&self) -> Option<i64> {
        self.last_saved_at
    }
}

impl Default for AutosaveGate {
    fn default() -> Self {
        Self::new(AUTOSAVE_DEBOUNCE_MS)
    }
}
