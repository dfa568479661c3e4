use uuid::Uuid;

use super::*;
use crate::element::{Element, ElementKind};
use crate::tree::CanvasNode;

fn snapshot_with_note(text: &str) -> Snapshot {
    let node = CanvasNode {
        id: Uuid::new_v4(),
        name: "Main Canvas".into(),
        parent_id: None,
        elements: Vec::new(),
    };
    let element = Element::new(
        node.id,
        0.0,
        0.0,
        160.0,
        100.0,
        ElementKind::StickyNote { text: text.into(), color: "#FFEB3B".into() },
    );
    Snapshot { elements: vec![element], canvas_stack: vec![node] }
}

fn note_text(snapshot: &Snapshot) -> &str {
    match &snapshot.elements[0].kind {
        ElementKind::StickyNote { text, .. } => text,
        other => panic!("expected sticky note, got {}", other.name()),
    }
}

// =============================================================
// Seeding and bounds
// =============================================================

#[test]
fn new_history_has_one_entry_and_no_steps() {
    let history = History::new(snapshot_with_note("seed"));
    assert_eq!(history.depth(), 1);
    assert_eq!(history.index(), 0);
    assert!(!history.can_undo());
    assert!(!history.can_redo());
}

#[test]
fn undo_at_bottom_is_noop() {
    let mut history = History::new(snapshot_with_note("seed"));
    assert!(history.undo().is_none());
    assert_eq!(history.index(), 0);
}

#[test]
fn redo_at_top_is_noop() {
    let mut history = History::new(snapshot_with_note("seed"));
    history.push(snapshot_with_note("one"));
    assert!(history.redo().is_none());
    assert_eq!(history.index(), 1);
}

// =============================================================
// Undo restores prior snapshots exactly
// =============================================================

#[test]
fn undo_walks_back_through_committed_snapshots() {
    let seed = snapshot_with_note("seed");
    let one = snapshot_with_note("one");
    let two = snapshot_with_note("two");

    let mut history = History::new(seed.clone());
    history.push(one.clone());
    history.push(two);

    assert_eq!(history.undo().unwrap(), &one);
    assert_eq!(history.undo().unwrap(), &seed);
    assert!(history.undo().is_none());
}

#[test]
fn any_bounded_undo_sequence_lands_on_a_committed_snapshot() {
    let committed: Vec<Snapshot> = (0..5).map(|i| snapshot_with_note(&format!("edit {i}"))).collect();
    let mut history = History::new(committed[0].clone());
    for snapshot in &committed[1..] {
        history.push(snapshot.clone());
    }

    for steps in 1..=4 {
        let mut h = History::new(committed[0].clone());
        for snapshot in &committed[1..] {
            h.push(snapshot.clone());
        }
        let mut last = None;
        for _ in 0..steps {
            last = h.undo().cloned();
        }
        let restored = last.expect("undo within bounds");
        assert!(committed.contains(&restored), "undo produced a state never committed");
        assert_eq!(&restored, &committed[4 - steps]);
    }
}

#[test]
fn redo_replays_forward() {
    let one = snapshot_with_note("one");
    let two = snapshot_with_note("two");
    let mut history = History::new(snapshot_with_note("seed"));
    history.push(one);
    history.push(two.clone());

    history.undo();
    history.undo();
    history.redo();
    assert_eq!(history.redo().unwrap(), &two);
    assert!(!history.can_redo());
}

// =============================================================
// Fresh edits truncate forward history
// =============================================================

#[test]
fn push_after_undo_discards_redo() {
    let mut history = History::new(snapshot_with_note("seed"));
    history.push(snapshot_with_note("one"));
    history.push(snapshot_with_note("two"));

    history.undo();
    history.undo();
    assert!(history.can_redo());

    history.push(snapshot_with_note("branch"));
    assert!(!history.can_redo());
    assert!(history.redo().is_none());
    assert_eq!(history.depth(), 2);
    assert_eq!(note_text(history.current()), "branch");
}

#[test]
fn current_tracks_index() {
    let mut history = History::new(snapshot_with_note("seed"));
    history.push(snapshot_with_note("one"));
    assert_eq!(note_text(history.current()), "one");
    history.undo();
    assert_eq!(note_text(history.current()), "seed");
}

// =============================================================
// Depth cap
// =============================================================

#[test]
fn depth_is_capped_at_history_limit() {
    let mut history = History::new(snapshot_with_note("seed"));
    for i in 0..(crate::consts::HISTORY_LIMIT * 2) {
        history.push(snapshot_with_note(&format!("edit {i}")));
    }
    assert_eq!(history.depth(), crate::consts::HISTORY_LIMIT);
    assert_eq!(history.index(), crate::consts::HISTORY_LIMIT - 1);
    // The newest snapshot survives; the oldest fell off.
    assert_eq!(
        note_text(history.current()),
        &format!("edit {}", crate::consts::HISTORY_LIMIT * 2 - 1)
    );
}
