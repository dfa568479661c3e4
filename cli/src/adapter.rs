//! Project adapter: the client-side editing session over one document.
//!
//! DESIGN
//! ======
//! Owns the live [`Document`], the undo/redo [`History`], and the
//! [`AutosaveGate`]. Commands mutate the document, then call
//! [`ProjectAdapter::commit`] to record a history snapshot and arm the
//! autosave timer. The actual HTTP save lives in `api`; this type only
//! decides *when* to save and what the payload is, so it stays testable
//! without a network.

#[cfg(test)]
#[path = "adapter_test.rs"]
mod adapter_test;

use canvas::autosave::AutosaveGate;
use canvas::document::{Document, LoadReport};
use canvas::element::Element;
use canvas::history::History;
use canvas::tree::CanvasNode;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("unknown canvas-update type: {0}")]
    InvalidUpdateType(String),
    #[error("canvas-update payload does not match its type")]
    InvalidPayload,
}

/// One editing session over a project document.
pub struct ProjectAdapter {
    pub project_id: Uuid,
    pub doc: Document,
    history: History,
    autosave: AutosaveGate,
}

impl ProjectAdapter {
    /// Wrap an already-loaded document.
    #[must_use]
    pub fn new(project_id: Uuid, doc: Document) -> Self {
        let history = History::new(doc.to_snapshot());
        Self { project_id, doc, history, autosave: AutosaveGate::default() }
    }

    /// Build a session from a fetched document value, tolerating partially
    /// corrupt data.
    #[must_use]
    pub fn from_load(project_id: Uuid, value: &serde_json::Value) -> (Self, LoadReport) {
        let (doc, report) = Document::from_value(value);
        (Self::new(project_id, doc), report)
    }

    // --- Commit / undo / redo ---

    /// Record the current state as a committed mutation: push a history
    /// snapshot and arm the autosave timer.
    pub fn commit(&mut self, now_ms: i64) {
        self.history.push(self.doc.to_snapshot());
        self.autosave.note_change(now_ms);
    }

    /// Step back one snapshot. Returns false when there is nothing to undo.
    pub fn undo(&mut self, now_ms: i64) -> bool {
        let Some(snapshot) = self.history.undo().cloned() else {
            return false;
        };
        self.doc.restore(&snapshot);
        self.autosave.note_change(now_ms);
        true
    }

    /// Step forward one snapshot. Returns false when there is nothing to redo.
    pub fn redo(&mut self, now_ms: i64) -> bool {
        let Some(snapshot) = self.history.redo().cloned() else {
            return false;
        };
        self.doc.restore(&snapshot);
        self.autosave.note_change(now_ms);
        true
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // --- Saving ---

    /// Whether the autosave debounce has elapsed with no save in flight.
    #[must_use]
    pub fn save_due(&self, now_ms: i64) -> bool {
        self.autosave.save_due(now_ms)
    }

    /// Start a save: returns the serialized document, or `None` when one is
    /// already in flight.
    pub fn begin_save(&mut self) -> Option<serde_json::Value> {
        if !self.autosave.begin_save() {
            return None;
        }
        Some(self.doc.to_value())
    }

    /// Settle the in-flight save. A success records the last-saved timestamp
    /// and pushes a history snapshot; a failure is abandoned until the next
    /// change re-arms the timer.
    pub fn finish_save(&mut self, success: bool, now_ms: i64) {
        self.autosave.finish_save(success, now_ms);
        if success {
            self.history.push(self.doc.to_snapshot());
        }
    }

    /// When the last successful save finished, if ever.
    #[must_use]
    pub fn last_saved_at(&self) -> Option<i64> {
        self.autosave.last_saved_at()
    }

    // --- Remote updates ---

    /// Apply an inbound `canvas-updated` wholesale (last write wins). The
    /// remote replacement is not a local edit: history and autosave are left
    /// alone.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUpdateType`/`InvalidPayload` for frames that do not
    /// name a known section or carry mismatched data.
    pub fn apply_remote(&mut self, update_type: &str, data: &serde_json::Value) -> Result<(), AdapterError> {
        match update_type {
            "elements" => {
                let elements: Vec<Element> =
                    serde_json::from_value(data.clone()).map_err(|_| AdapterError::InvalidPayload)?;
                self.doc.replace_elements(elements);
                Ok(())
            }
            "canvasStack" => {
                let nodes: Vec<CanvasNode> =
                    serde_json::from_value(data.clone()).map_err(|_| AdapterError::InvalidPayload)?;
                self.doc.replace_canvas_stack(nodes);
                Ok(())
            }
            other => Err(AdapterError::InvalidUpdateType(other.to_owned())),
        }
    }
}
