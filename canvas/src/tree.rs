//! Canvas tree: the forest of nested sub-canvases behind board elements.
//!
//! DESIGN
//! ======
//! Nodes live in a flat, order-preserving list — the persisted `canvasStack`
//! is exactly this list — and link upward through `parent_id`. The root node
//! has no parent and always exists. A "current canvas" pointer tracks which
//! sub-canvas the user is inside; entering a board pushes deeper, exiting
//! walks one parent up.
//!
//! ERROR HANDLING
//! ==============
//! Persisted trees can be partially corrupt (dangling `parent_id`, even an
//! injected cycle). Navigation never trusts links blindly: breadcrumb
//! reconstruction is bounded by node count and stops at the first broken
//! link instead of crashing.

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::ROOT_CANVAS_NAME;
use crate::element::{CanvasId, ElementId};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("already at the root canvas")]
    AtRoot,
    #[error("canvas not found: {0}")]
    NotFound(CanvasId),
    #[error("canvas name must not be empty")]
    EmptyName,
}

/// One sub-canvas: identity, display name, upward link, and the ordered list
/// of element ids it owns (draw order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasNode {
    pub id: CanvasId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CanvasId>,
    pub elements: Vec<ElementId>,
}

impl CanvasNode {
    #[must_use]
    fn new(name: &str, parent_id: Option<CanvasId>) -> Self {
        Self { id: Uuid::new_v4(), name: name.to_owned(), parent_id, elements: Vec::new() }
    }
}

/// The live canvas tree plus the current-canvas pointer.
pub struct CanvasTree {
    nodes: Vec<CanvasNode>,
    current: CanvasId,
}

impl CanvasTree {
    /// Create a tree holding only a root canvas, with the pointer on it.
    #[must_use]
    pub fn new() -> Self {
        let root = CanvasNode::new(ROOT_CANVAS_NAME, None);
        let current = root.id;
        Self { nodes: vec![root], current }
    }

    /// Rebuild a tree from persisted nodes.
    ///
    /// A missing root is recreated and the pointer always lands on the root.
    /// Nodes with dangling parents are kept; navigation treats them
    /// defensively rather than rejecting the document.
    #[must_use]
    pub fn from_nodes(mut nodes: Vec<CanvasNode>) -> Self {
        if !nodes.iter().any(|n| n.parent_id.is_none()) {
            nodes.insert(0, CanvasNode::new(ROOT_CANVAS_NAME, None));
        }
        let current = nodes
            .iter()
            .find(|n| n.parent_id.is_none())
            .map(|n| n.id)
            .unwrap_or_else(Uuid::new_v4);
        Self { nodes, current }
    }

    // --- Queries ---

    /// Id of the root canvas (the first parentless node).
    #[must_use]
    pub fn root_id(&self) -> CanvasId {
        self.nodes
            .iter()
            .find(|n| n.parent_id.is_none())
            .map_or(self.current, |n| n.id)
    }

    /// Id of the canvas the pointer is on.
    #[must_use]
    pub fn current_id(&self) -> CanvasId {
        self.current
    }

    /// The node the pointer is on. Falls back to the root if the pointer was
    /// invalidated by corrupt data.
    ///
    /// # Panics
    ///
    /// Cannot panic in practice: construction always leaves a root node in
    /// the tree and the root is never removable.
    #[must_use]
    pub fn current(&self) -> &CanvasNode {
        self.node(self.current)
            .or_else(|| self.node(self.root_id()))
            .expect("tree always holds a root node")
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: CanvasId) -> Option<&CanvasNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Look up a node by id, mutably.
    pub fn node_mut(&mut self, id: CanvasId) -> Option<&mut CanvasNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Whether a node with this id exists.
    #[must_use]
    pub fn contains(&self, id: CanvasId) -> bool {
        self.node(id).is_some()
    }

    /// All nodes in persisted order.
    #[must_use]
    pub fn nodes(&self) -> &[CanvasNode] {
        &self.nodes
    }

    /// Number of canvases in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree holds no nodes. Never true in practice:
    /// construction guarantees a root and the root is not removable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // --- Navigation ---

    /// Create a child canvas under `parent_id` and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::EmptyName`] for blank names and
    /// [`TreeError::NotFound`] if the parent does not exist.
    pub fn add_node(&mut self, name: &str, parent_id: CanvasId) -> Result<CanvasId, TreeError> {
        if name.trim().is_empty() {
            return Err(TreeError::EmptyName);
        }
        if !self.contains(parent_id) {
            return Err(TreeError::NotFound(parent_id));
        }
        let node = CanvasNode::new(name, Some(parent_id));
        let id = node.id;
        self.nodes.push(node);
        Ok(id)
    }

    /// Move the pointer to an existing canvas.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`] if the canvas does not exist.
    pub fn enter(&mut self, id: CanvasId) -> Result<(), TreeError> {
        if !self.contains(id) {
            return Err(TreeError::NotFound(id));
        }
        self.current = id;
        Ok(())
    }

    /// Move the pointer to the parent of the current canvas.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::AtRoot`] when the pointer is already on a
    /// parentless node, and [`TreeError::NotFound`] when the parent link
    /// dangles (the pointer stays put).
    pub fn exit_to_parent(&mut self) -> Result<CanvasId, TreeError> {
        let Some(parent_id) = self.current().parent_id else {
            return Err(TreeError::AtRoot);
        };
        if !self.contains(parent_id) {
            return Err(TreeError::NotFound(parent_id));
        }
        self.current = parent_id;
        Ok(parent_id)
    }

    /// The root-to-current chain of canvases.
    ///
    /// Bounded by node count: a dangling `parent_id` or an injected cycle
    /// truncates the walk instead of looping or panicking, so the returned
    /// path always starts at the highest reachable ancestor.
    #[must_use]
    pub fn breadcrumb_path(&self) -> Vec<&CanvasNode> {
        let mut path = Vec::new();
        let mut cursor = Some(self.current);
        let mut hops = self.nodes.len();

        while let Some(id) = cursor {
            if hops == 0 {
                break; // cycle guard
            }
            hops -= 1;

            let Some(node) = self.node(id) else {
                break; // dangling link
            };
            path.push(node);
            cursor = node.parent_id;
        }

        path.reverse();
        path
    }

    // --- Element ownership ---

    /// Append an element id to a canvas's ordered list.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`] if the canvas does not exist.
    pub fn attach_element(&mut self, canvas_id: CanvasId, element_id: ElementId) -> Result<(), TreeError> {
        let node = self.node_mut(canvas_id).ok_or(TreeError::NotFound(canvas_id))?;
        if !node.elements.contains(&element_id) {
            node.elements.push(element_id);
        }
        Ok(())
    }

    /// Remove an element id from a canvas's ordered list.
    pub fn detach_element(&mut self, canvas_id: CanvasId, element_id: ElementId) {
        if let Some(node) = self.node_mut(canvas_id) {
            node.elements.retain(|id| *id != element_id);
        }
    }

    // --- Removal ---

    /// Remove a canvas and every descendant canvas. Returns the removed ids
    /// (empty when asked to remove the root or a nonexistent node).
    ///
    /// Orphaned descendants are discarded, never reparented. If the pointer
    /// was inside the removed subtree it resets to the subtree's parent, or
    /// the root when that parent is gone too.
    pub fn remove_subtree(&mut self, id: CanvasId) -> Vec<CanvasId> {
        if id == self.root_id() {
            return Vec::new();
        }
        let Some(target) = self.node(id) else {
            return Vec::new();
        };
        let fallback_parent = target.parent_id;

        let mut removed: Vec<CanvasId> = vec![id];
        // Fixpoint sweep: nodes are unordered, so a child can precede its
        // parent in the list.
        loop {
            let before = removed.len();
            for node in &self.nodes {
                if node.parent_id.is_some_and(|p| removed.contains(&p)) && !removed.contains(&node.id) {
                    removed.push(node.id);
                }
            }
            if removed.len() == before {
                break;
            }
        }

        self.nodes.retain(|n| !removed.contains(&n.id));

        if removed.contains(&self.current) {
            self.current = fallback_parent
                .filter(|p| self.contains(*p))
                .unwrap_or_else(|| self.root_id());
        }

        removed
    }
}

impl Default for CanvasTree {
    fn default() -> Self {
        Self::new()
    }
}
