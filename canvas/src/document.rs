//! Document: the element store and canvas tree as one mutable unit.
//!
//! DESIGN
//! ======
//! Every operation that touches both halves of the state lives here, so the
//! invariants hold at one layer: each element's `canvas_id` resolves to a
//! live canvas node, each element id appears in its owner's ordered list, and
//! board deletion cascades through the tree. The persisted shape is exactly
//! `{elements, canvasStack}`; [`Document::from_value`] tolerates partially
//! corrupt input by dropping malformed entries instead of failing the load.
//!
//! Realtime sync replaces a whole section at a time (last-write-wins):
//! [`Document::replace_elements`] and [`Document::replace_canvas_stack`] are
//! those two wholesale writes.

#[cfg(test)]
#[path = "document_test.rs"]
mod document_test;

use serde::{Deserialize, Serialize};

use crate::draw::DrawingCommit;
use crate::element::{CanvasId, Element, ElementId, ElementKind, ElementPatch, ElementStore};
use crate::tree::{CanvasNode, CanvasTree, TreeError};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("element not found: {0}")]
    ElementNotFound(ElementId),
    #[error("not a board element: {0}")]
    NotABoard(ElementId),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Immutable full-state pair captured for history and persistence.
///
/// Elements are listed in draw order, canvas by canvas, so serializing the
/// same document twice yields identical text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub elements: Vec<Element>,
    pub canvas_stack: Vec<CanvasNode>,
}

/// What a defensive load had to discard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Entries in `elements` that were not well-formed element objects.
    pub dropped_elements: usize,
    /// Entries in `canvasStack` that were not well-formed canvas nodes.
    pub dropped_canvases: usize,
    /// Well-formed elements whose `canvasId` resolved to no surviving canvas.
    pub orphaned_elements: usize,
}

impl LoadReport {
    /// True when nothing was discarded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.dropped_elements == 0 && self.dropped_canvases == 0 && self.orphaned_elements == 0
    }
}

/// The live document: all elements plus the canvas tree.
pub struct Document {
    elements: ElementStore,
    tree: CanvasTree,
}

impl Document {
    /// Create an empty document with a root canvas.
    #[must_use]
    pub fn new() -> Self {
        Self { elements: ElementStore::new(), tree: CanvasTree::new() }
    }

    // --- Queries ---

    /// The canvas tree (read-only; mutate through document operations).
    #[must_use]
    pub fn tree(&self) -> &CanvasTree {
        &self.tree
    }

    /// Id of the canvas the user is currently inside.
    #[must_use]
    pub fn current_canvas_id(&self) -> CanvasId {
        self.tree.current_id()
    }

    /// Look up an element by id.
    #[must_use]
    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Elements owned by a canvas, in draw order. Unknown canvases and stale
    /// ids yield nothing rather than an error.
    #[must_use]
    pub fn elements_on(&self, canvas_id: CanvasId) -> Vec<&Element> {
        let Some(node) = self.tree.node(canvas_id) else {
            return Vec::new();
        };
        node.elements
            .iter()
            .filter_map(|id| self.elements.get(id))
            .collect()
    }

    /// Total number of elements across all canvases.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    // --- Element lifecycle ---

    /// Create an element on a canvas and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`] if the canvas does not exist.
    pub fn add_element(
        &mut self,
        canvas_id: CanvasId,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        kind: ElementKind,
    ) -> Result<ElementId, DocumentError> {
        let element = Element::new(canvas_id, x, y, width, height, kind);
        let id = element.id;
        self.tree.attach_element(canvas_id, id)?;
        self.elements.insert(element);
        Ok(id)
    }

    /// Create an element on the current canvas.
    ///
    /// # Errors
    ///
    /// Propagates [`Document::add_element`] failures.
    pub fn add_to_current(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        kind: ElementKind,
    ) -> Result<ElementId, DocumentError> {
        self.add_element(self.tree.current_id(), x, y, width, height, kind)
    }

    /// Turn a committed drawing group into a `drawing` element on a canvas.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`] if the canvas does not exist.
    pub fn add_drawing(&mut self, canvas_id: CanvasId, commit: DrawingCommit) -> Result<ElementId, DocumentError> {
        self.add_element(
            canvas_id,
            commit.x,
            commit.y,
            commit.width,
            commit.height,
            ElementKind::Drawing { strokes: commit.strokes },
        )
    }

    /// Apply a sparse transform update (drag/resize/rotate).
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::ElementNotFound`] for unknown ids.
    pub fn apply_patch(&mut self, id: ElementId, patch: &ElementPatch) -> Result<(), DocumentError> {
        if !self.elements.apply_patch(&id, patch) {
            return Err(DocumentError::ElementNotFound(id));
        }
        Ok(())
    }

    /// Transfer an element to another canvas. Ownership is exclusive: the id
    /// leaves the old canvas's list and appends to the target's.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::ElementNotFound`] for unknown elements and
    /// [`TreeError::NotFound`] for unknown target canvases.
    pub fn move_to_canvas(&mut self, element_id: ElementId, target: CanvasId) -> Result<(), DocumentError> {
        if !self.tree.contains(target) {
            return Err(TreeError::NotFound(target).into());
        }
        let Some(element) = self.elements.get_mut(&element_id) else {
            return Err(DocumentError::ElementNotFound(element_id));
        };
        let source = element.canvas_id;
        if source == target {
            return Ok(());
        }
        element.canvas_id = target;
        self.tree.detach_element(source, element_id);
        self.tree.attach_element(target, element_id)?;
        Ok(())
    }

    /// Delete an element. Deleting a board cascades: its canvas node, every
    /// descendant canvas, and all elements they own are discarded. Returns
    /// the total number of elements removed.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::ElementNotFound`] for unknown ids.
    pub fn remove_element(&mut self, element_id: ElementId) -> Result<usize, DocumentError> {
        let Some(element) = self.elements.remove(&element_id) else {
            return Err(DocumentError::ElementNotFound(element_id));
        };
        self.tree.detach_element(element.canvas_id, element_id);

        let mut removed = 1;
        if let ElementKind::Board { child_canvas_id: Some(child), .. } = element.kind {
            removed += self.remove_canvas_cascade(child);
        }
        Ok(removed)
    }

    /// Remove a canvas subtree and every element it owns, returning the
    /// number of elements discarded.
    fn remove_canvas_cascade(&mut self, canvas_id: CanvasId) -> usize {
        let removed_canvases = self.tree.remove_subtree(canvas_id);
        if removed_canvases.is_empty() {
            return 0;
        }

        let doomed: Vec<ElementId> = self
            .elements
            .iter()
            .filter(|el| removed_canvases.contains(&el.canvas_id))
            .map(|el| el.id)
            .collect();
        for id in &doomed {
            self.elements.remove(id);
        }
        doomed.len()
    }

    // --- Board navigation ---

    /// Enter the sub-canvas behind a board element, creating the canvas node
    /// lazily on first entry and recording its id on the element.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotABoard`] for non-board elements and
    /// [`TreeError::EmptyName`] when a blank-named board is first entered.
    pub fn enter_board(&mut self, element_id: ElementId) -> Result<CanvasId, DocumentError> {
        let Some(element) = self.elements.get(&element_id) else {
            return Err(DocumentError::ElementNotFound(element_id));
        };
        let ElementKind::Board { name, child_canvas_id } = &element.kind else {
            return Err(DocumentError::NotABoard(element_id));
        };

        let canvas_id = match child_canvas_id {
            Some(id) if self.tree.contains(*id) => *id,
            _ => {
                // Lazily create the child canvas under the board's owner and
                // stamp its id on the element so name collisions cannot
                // confuse later lookups.
                let name = name.clone();
                let parent = element.canvas_id;
                let id = self.tree.add_node(&name, parent)?;
                if let Some(el) = self.elements.get_mut(&element_id)
                    && let ElementKind::Board { child_canvas_id, .. } = &mut el.kind
                {
                    *child_canvas_id = Some(id);
                }
                id
            }
        };

        self.tree.enter(canvas_id)?;
        Ok(canvas_id)
    }

    /// Move the current-canvas pointer one level up.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::AtRoot`] at the root.
    pub fn exit_to_parent(&mut self) -> Result<CanvasId, DocumentError> {
        Ok(self.tree.exit_to_parent()?)
    }

    /// Root-to-current breadcrumb as `(id, name)` pairs.
    #[must_use]
    pub fn breadcrumb(&self) -> Vec<(CanvasId, String)> {
        self.tree
            .breadcrumb_path()
            .into_iter()
            .map(|node| (node.id, node.name.clone()))
            .collect()
    }

    // --- Snapshots and wholesale replacement ---

    /// Capture the full state as an immutable snapshot.
    #[must_use]
    pub fn to_snapshot(&self) -> Snapshot {
        let mut elements = Vec::with_capacity(self.elements.len());
        for node in self.tree.nodes() {
            for id in &node.elements {
                if let Some(element) = self.elements.get(id) {
                    elements.push(element.clone());
                }
            }
        }
        Snapshot { elements, canvas_stack: self.tree.nodes().to_vec() }
    }

    /// Replace the full state with a snapshot, wholesale. The current-canvas
    /// pointer is kept when its canvas survives, otherwise it resets to the
    /// root.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        let previous = self.tree.current_id();
        self.elements.load_snapshot(snapshot.elements.clone());
        self.tree = CanvasTree::from_nodes(snapshot.canvas_stack.clone());
        if self.tree.contains(previous) {
            let _ = self.tree.enter(previous);
        }
    }

    /// Serialize to the persisted `{elements, canvasStack}` document.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self.to_snapshot())
            .unwrap_or_else(|_| serde_json::json!({ "elements": [], "canvasStack": [] }))
    }

    /// Deserialize a persisted document, defensively.
    ///
    /// Malformed entries are dropped and counted instead of failing the whole
    /// load; a missing root canvas is recreated; elements whose canvas is
    /// gone are discarded. The pointer starts at the root.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> (Self, LoadReport) {
        let mut report = LoadReport::default();

        let mut nodes = Vec::new();
        if let Some(raw_nodes) = value.get("canvasStack").and_then(serde_json::Value::as_array) {
            for raw in raw_nodes {
                match serde_json::from_value::<CanvasNode>(raw.clone()) {
                    Ok(node) => nodes.push(node),
                    Err(_) => report.dropped_canvases += 1,
                }
            }
        }
        let mut tree = CanvasTree::from_nodes(nodes);

        let mut elements = ElementStore::new();
        if let Some(raw_elements) = value.get("elements").and_then(serde_json::Value::as_array) {
            for raw in raw_elements {
                let Ok(element) = serde_json::from_value::<Element>(raw.clone()) else {
                    report.dropped_elements += 1;
                    continue;
                };
                if !tree.contains(element.canvas_id) {
                    report.orphaned_elements += 1;
                    continue;
                }
                // Idempotent: persisted node lists already carry the id.
                let _ = tree.attach_element(element.canvas_id, element.id);
                elements.insert(element);
            }
        }

        (Self { elements, tree }, report)
    }

    /// Last-write-wins replacement of the element set (`canvas-update` with
    /// `type: "elements"`). Node order is kept for surviving ids; new ids
    /// append in arrival order; elements naming an unknown canvas are dropped
    /// and counted.
    pub fn replace_elements(&mut self, incoming: Vec<Element>) -> usize {
        let mut dropped = 0;
        let mut accepted = Vec::with_capacity(incoming.len());
        for element in incoming {
            if self.tree.contains(element.canvas_id) {
                accepted.push(element);
            } else {
                dropped += 1;
            }
        }
        self.elements.load_snapshot(accepted.clone());

        // Reconcile ordered lists: keep prior order where the element still
        // lives on that canvas, then append arrivals.
        let node_ids: Vec<CanvasId> = self.tree.nodes().iter().map(|n| n.id).collect();
        let elements = &self.elements;
        for canvas_id in node_ids {
            if let Some(node) = self.tree.node_mut(canvas_id) {
                node.elements
                    .retain(|id| elements.get(id).is_some_and(|el| el.canvas_id == canvas_id));
            }
        }
        for element in &accepted {
            let _ = self.tree.attach_element(element.canvas_id, element.id);
        }
        dropped
    }

    /// Last-write-wins replacement of the canvas stack (`canvas-update` with
    /// `type: "canvasStack"`). Elements whose canvas vanished are dropped and
    /// counted; the pointer survives when its canvas does.
    pub fn replace_canvas_stack(&mut self, nodes: Vec<CanvasNode>) -> usize {
        let previous = self.tree.current_id();
        self.tree = CanvasTree::from_nodes(nodes);
        if self.tree.contains(previous) {
            let _ = self.tree.enter(previous);
        }

        let doomed: Vec<ElementId> = self
            .elements
            .iter()
            .filter(|el| !self.tree.contains(el.canvas_id))
            .map(|el| el.id)
            .collect();
        for id in &doomed {
            self.elements.remove(id);
        }

        // The incoming stack may predate elements we already hold; make sure
        // every survivor is listed on its canvas.
        let survivors: Vec<(CanvasId, ElementId)> =
            self.elements.iter().map(|el| (el.canvas_id, el.id)).collect();
        for (canvas_id, element_id) in survivors {
            let _ = self.tree.attach_element(canvas_id, element_id);
        }
        doomed.len()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
