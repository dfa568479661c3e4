//! Element model: the tagged union of everything placeable on a canvas.
//!
//! This module defines the element types that describe canvas content
//! (`Element`, `ElementKind`), the freehand stroke geometry shared with the
//! drawing-capture layer (`Point`, `Stroke`), a sparse transform update for
//! drag/resize/rotate handlers (`ElementPatch`), and the keyed runtime store
//! that owns all live elements (`ElementStore`).
//!
//! Data flows into this layer from the network (JSON deserialization) and
//! from user-action handlers (mutations). Draw order is not stored here: the
//! owning canvas node keeps an ordered id list, and the store is a flat keyed
//! map.

#[cfg(test)]
#[path = "element_test.rs"]
mod element_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an element.
pub type ElementId = Uuid;

/// Unique identifier for a canvas node.
pub type CanvasId = Uuid;

/// A point in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A freehand stroke: ordered sample points plus pen style.
///
/// Inside a committed drawing group the points are group-local, so the owning
/// element's transform applies to the whole stroke set as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<Point>,
    pub color: String,
    pub width: f64,
}

impl Stroke {
    /// Begin a stroke with a single sample point.
    #[must_use]
    pub fn new(start: Point, color: impl Into<String>, width: f64) -> Self {
        Self { points: vec![start], color: color.into(), width }
    }

    /// Append a sample point.
    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    /// A degenerate click-without-drag stroke (single sample).
    #[must_use]
    pub fn is_dot(&self) -> bool {
        self.points.len() == 1
    }
}

/// A named sub-region of a container element, relative to the container's
/// own bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRegion {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Kind-specific payload of an element.
///
/// Serialized with an adjacent `kind` tag so the persisted document reads as
/// `{"kind": "sticky-note", "text": ..., ...}` alongside the common fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ElementKind {
    /// Plain text with font metrics.
    Text { text: String, font_size: f64, font_family: String, color: String },
    /// A bitmap referenced by source URL, with its natural dimensions.
    Image { src: String, natural_width: f64, natural_height: f64 },
    /// A user-uploaded file, keeping the original file name.
    Upload { src: String, file_name: String, natural_width: f64, natural_height: f64 },
    /// Entry point to a nested sub-canvas. `child_canvas_id` is the stable
    /// generated id of the associated canvas node, assigned on first entry.
    Board {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        child_canvas_id: Option<CanvasId>,
    },
    /// Structured layout of named sub-regions.
    Container { regions: Vec<ContainerRegion> },
    /// AI-generated bitmap, keeping the prompt that produced it.
    GeneratedImage { src: String, prompt: String, natural_width: f64, natural_height: f64 },
    /// A prompt element holding its text.
    Prompt { text: String },
    /// Sticky note: text plus note color.
    StickyNote { text: String, color: String },
    /// A committed drawing group; member strokes are group-local.
    Drawing { strokes: Vec<Stroke> },
}

impl ElementKind {
    /// The wire/tag name of this kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Upload { .. } => "upload",
            Self::Board { .. } => "board",
            Self::Container { .. } => "container",
            Self::GeneratedImage { .. } => "generated-image",
            Self::Prompt { .. } => "prompt",
            Self::StickyNote { .. } => "sticky-note",
            Self::Drawing { .. } => "drawing",
        }
    }
}

/// An element as stored in the document and on the wire.
///
/// `canvas_id` names the owning canvas node; ownership is exclusive and
/// transfers only through an explicit move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Unique identifier for this element.
    pub id: ElementId,
    /// The canvas node this element belongs to.
    pub canvas_id: CanvasId,
    /// Left edge of the bounding box in world coordinates.
    pub x: f64,
    /// Top edge of the bounding box in world coordinates.
    pub y: f64,
    /// Width of the bounding box in world coordinates.
    pub width: f64,
    /// Height of the bounding box in world coordinates.
    pub height: f64,
    /// Clockwise rotation in degrees around the bounding-box center.
    pub rotation: f64,
    /// Kind tag plus kind-specific payload.
    #[serde(flatten)]
    pub kind: ElementKind,
}

impl Element {
    /// Create a new element with a fresh id and no rotation.
    #[must_use]
    pub fn new(canvas_id: CanvasId, x: f64, y: f64, width: f64, height: f64, kind: ElementKind) -> Self {
        Self { id: Uuid::new_v4(), canvas_id, x, y, width, height, rotation: 0.0, kind }
    }

    /// Whether this element opens a nested sub-canvas.
    #[must_use]
    pub fn is_board(&self) -> bool {
        matches!(self.kind, ElementKind::Board { .. })
    }
}

/// Sparse transform update for an element. Only present fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementPatch {
    /// New x position, if being updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// New y position, if being updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// New width, if being updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// New height, if being updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// New rotation in degrees, if being updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

/// In-memory store of elements, keyed by id.
pub struct ElementStore {
    elements: HashMap<ElementId, Element>,
}

impl ElementStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { elements: HashMap::new() }
    }

    /// Insert or replace an element. If an element with the same `id` already
    /// exists it is overwritten.
    pub fn insert(&mut self, element: Element) {
        self.elements.insert(element.id, element);
    }

    /// Remove an element by id, returning it if it was present.
    pub fn remove(&mut self, id: &ElementId) -> Option<Element> {
        self.elements.remove(id)
    }

    /// Return a reference to an element by id.
    #[must_use]
    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Return a mutable reference to an element by id.
    pub fn get_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    /// Apply a sparse transform update. Returns false if the element doesn't exist.
    pub fn apply_patch(&mut self, id: &ElementId, patch: &ElementPatch) -> bool {
        let Some(element) = self.elements.get_mut(id) else {
            return false;
        };
        if let Some(x) = patch.x {
            element.x = x;
        }
        if let Some(y) = patch.y {
            element.y = y;
        }
        if let Some(w) = patch.width {
            element.width = w;
        }
        if let Some(h) = patch.height {
            element.height = h;
        }
        if let Some(r) = patch.rotation {
            element.rotation = r;
        }
        true
    }

    /// Replace all elements with a full snapshot.
    pub fn load_snapshot(&mut self, elements: Vec<Element>) {
        self.elements.clear();
        for element in elements {
            self.elements.insert(element.id, element);
        }
    }

    /// Iterate over all elements in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Number of elements currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the store contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Default for ElementStore {
    fn default() -> Self {
        Self::new()
    }
}
