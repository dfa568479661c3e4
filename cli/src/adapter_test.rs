use canvas::element::ElementKind;
use serde_json::json;

use super::*;

fn note_kind(text: &str) -> ElementKind {
    ElementKind::StickyNote { text: text.into(), color: "#FFEB3B".into() }
}

fn adapter() -> ProjectAdapter {
    ProjectAdapter::new(Uuid::new_v4(), Document::new())
}

// =============================================================
// Commit / undo / redo wiring
// =============================================================

#[test]
fn commit_enables_undo_and_arms_autosave() {
    let mut adapter = adapter();
    adapter.doc.add_to_current(0.0, 0.0, 10.0, 10.0, note_kind("a")).unwrap();
    adapter.commit(1000);

    assert!(adapter.can_undo());
    assert!(!adapter.save_due(1000));
    assert!(adapter.save_due(1000 + canvas::consts::AUTOSAVE_DEBOUNCE_MS));
}

#[test]
fn undo_restores_previous_state() {
    let mut adapter = adapter();
    adapter.doc.add_to_current(0.0, 0.0, 10.0, 10.0, note_kind("a")).unwrap();
    adapter.commit(0);

    assert!(adapter.undo(10));
    assert_eq!(adapter.doc.element_count(), 0);
    assert!(adapter.can_redo());

    assert!(adapter.redo(20));
    assert_eq!(adapter.doc.element_count(), 1);
}

#[test]
fn undo_at_bottom_reports_false() {
    let mut adapter = adapter();
    assert!(!adapter.undo(0));
    assert!(!adapter.redo(0));
}

#[test]
fn fresh_commit_truncates_redo() {
    let mut adapter = adapter();
    adapter.doc.add_to_current(0.0, 0.0, 10.0, 10.0, note_kind("a")).unwrap();
    adapter.commit(0);
    adapter.undo(10);

    adapter.doc.add_to_current(5.0, 5.0, 10.0, 10.0, note_kind("b")).unwrap();
    adapter.commit(20);

    assert!(!adapter.can_redo());
}

// =============================================================
// Save lifecycle
// =============================================================

#[test]
fn begin_save_yields_document_once() {
    let mut adapter = adapter();
    adapter.doc.add_to_current(0.0, 0.0, 10.0, 10.0, note_kind("a")).unwrap();
    adapter.commit(0);

    let payload = adapter.begin_save().expect("first begin yields payload");
    assert!(payload.get("elements").is_some_and(serde_json::Value::is_array));
    assert!(adapter.begin_save().is_none(), "second begin while in flight");

    adapter.finish_save(true, 2000);
    assert_eq!(adapter.last_saved_at(), Some(2000));
}

#[test]
fn successful_save_pushes_history_snapshot() {
    let mut adapter = adapter();
    adapter.begin_save();
    adapter.finish_save(true, 100);
    assert!(adapter.can_undo(), "save success records a snapshot");
}

#[test]
fn failed_save_is_abandoned_until_next_change() {
    let mut adapter = adapter();
    adapter.doc.add_to_current(0.0, 0.0, 10.0, 10.0, note_kind("a")).unwrap();
    adapter.commit(0);

    adapter.begin_save();
    adapter.finish_save(false, 100);
    assert_eq!(adapter.last_saved_at(), None);
    assert!(!adapter.save_due(1_000_000));

    adapter.doc.add_to_current(1.0, 1.0, 10.0, 10.0, note_kind("b")).unwrap();
    adapter.commit(1_000_000);
    assert!(adapter.save_due(1_000_000 + canvas::consts::AUTOSAVE_DEBOUNCE_MS));
}

// =============================================================
// Remote updates
// =============================================================

#[test]
fn remote_elements_replace_wholesale_without_touching_history() {
    let mut adapter = adapter();
    let root = adapter.doc.tree().root_id();
    let remote = json!([{
        "id": Uuid::new_v4(), "canvasId": root,
        "x": 0.0, "y": 0.0, "width": 160.0, "height": 100.0, "rotation": 0.0,
        "kind": "sticky-note", "text": "remote", "color": "#FFEB3B"
    }]);

    adapter.apply_remote("elements", &remote).unwrap();
    assert_eq!(adapter.doc.element_count(), 1);
    assert!(!adapter.can_undo(), "remote clobber is not a local edit");
    assert!(!adapter.save_due(i64::MAX), "remote clobber does not arm autosave");
}

#[test]
fn remote_update_rejects_unknown_type_and_bad_payload() {
    let mut adapter = adapter();
    assert!(matches!(
        adapter.apply_remote("cursors", &json!([])),
        Err(AdapterError::InvalidUpdateType(_))
    ));
    assert!(matches!(
        adapter.apply_remote("elements", &json!({"not": "a list"})),
        Err(AdapterError::InvalidPayload)
    ));
}

#[test]
fn load_tolerates_corrupt_documents() {
    let (adapter, report) = ProjectAdapter::from_load(
        Uuid::new_v4(),
        &json!({ "elements": [42], "canvasStack": "garbage" }),
    );
    assert_eq!(report.dropped_elements, 1);
    assert_eq!(adapter.doc.element_count(), 0);
    assert_eq!(adapter.doc.tree().len(), 1, "fresh root recreated");
}
