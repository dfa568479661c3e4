//! Document core for the Easel design canvas.
//!
//! This crate owns everything about a canvas document that does not touch the
//! network or a database: the element model, the tree of nested sub-canvases,
//! linear undo/redo history, freehand drawing capture, and the autosave
//! debounce gate. The server hydrates and mutates a [`document::Document`]
//! per live project; the CLI client drives the same types from the other side
//! of the wire. All state here is synchronous and single-owner — callers
//! decide when a mutation is "committed" and push history snapshots
//! themselves.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`element`] | Element union, strokes, and the keyed element store |
//! | [`tree`] | Canvas-tree nodes, navigation, and cascading removal |
//! | [`document`] | Elements + tree as one unit; (de)serialization |
//! | [`history`] | Linear snapshot stack with undo/redo |
//! | [`draw`] | Pointer-gesture capture and drawing-group commit |
//! | [`autosave`] | Pure debounce gate for save scheduling |
//! | [`consts`] | Shared defaults (root name, debounce delay, etc.) |

pub mod autosave;
pub mod consts;
pub mod document;
pub mod draw;
pub mod element;
pub mod history;
pub mod tree;
