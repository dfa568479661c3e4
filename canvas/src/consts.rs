//! Shared defaults for the canvas document core.

// ── Canvas tree ─────────────────────────────────────────────────

/// Name given to the root canvas of every new document.
pub const ROOT_CANVAS_NAME: &str = "Main Canvas";

// ── History ─────────────────────────────────────────────────────

/// Maximum retained history snapshots; the oldest entry is dropped first.
pub const HISTORY_LIMIT: usize = 128;

// ── Drawing ─────────────────────────────────────────────────────

/// Stroke color used when the caller does not pick one.
pub const DEFAULT_STROKE_COLOR: &str = "#1F1A17";

/// Stroke width in world units used when the caller does not pick one.
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;

// ── Autosave ────────────────────────────────────────────────────

/// Fixed debounce delay between a document change and the autosave attempt.
pub const AUTOSAVE_DEBOUNCE_MS: i64 = 1500;
