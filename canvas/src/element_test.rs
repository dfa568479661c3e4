#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;

fn sticky(canvas_id: CanvasId) -> Element {
    Element::new(
        canvas_id,
        100.0,
        200.0,
        160.0,
        100.0,
        ElementKind::StickyNote { text: "note".into(), color: "#FFEB3B".into() },
    )
}

// =============================================================
// ElementKind serde
// =============================================================

#[test]
fn kind_tag_names() {
    let cases: [(ElementKind, &str); 4] = [
        (ElementKind::Text { text: String::new(), font_size: 16.0, font_family: "Inter".into(), color: "#000".into() }, "text"),
        (ElementKind::GeneratedImage { src: "u".into(), prompt: "p".into(), natural_width: 1.0, natural_height: 1.0 }, "generated-image"),
        (ElementKind::StickyNote { text: String::new(), color: "#FFF".into() }, "sticky-note"),
        (ElementKind::Prompt { text: String::new() }, "prompt"),
    ];
    for (kind, expected) in cases {
        assert_eq!(kind.name(), expected);
    }
}

#[test]
fn kind_serializes_kebab_case_tag() {
    let element = Element::new(
        Uuid::new_v4(),
        0.0,
        0.0,
        10.0,
        10.0,
        ElementKind::GeneratedImage { src: "https://cdn/x.png".into(), prompt: "a cat".into(), natural_width: 512.0, natural_height: 512.0 },
    );
    let value = serde_json::to_value(&element).unwrap();
    assert_eq!(value["kind"], "generated-image");
    assert_eq!(value["naturalWidth"], 512.0);
}

#[test]
fn kind_deserialize_unknown_tag_rejects() {
    let result = serde_json::from_value::<ElementKind>(json!({"kind": "hexagon"}));
    assert!(result.is_err());
}

#[test]
fn element_serde_round_trip() {
    let canvas_id = Uuid::new_v4();
    let mut element = sticky(canvas_id);
    element.rotation = 45.0;

    let text = serde_json::to_string(&element).unwrap();
    let back: Element = serde_json::from_str(&text).unwrap();
    assert_eq!(back, element);
}

#[test]
fn element_common_fields_are_camel_case() {
    let element = sticky(Uuid::new_v4());
    let text = serde_json::to_string(&element).unwrap();
    assert!(text.contains("\"canvasId\""));
    assert!(!text.contains("\"canvas_id\""));
}

#[test]
fn board_child_canvas_id_omitted_until_assigned() {
    let element = Element::new(
        Uuid::new_v4(),
        0.0,
        0.0,
        200.0,
        150.0,
        ElementKind::Board { name: "Floor 1".into(), child_canvas_id: None },
    );
    let value = serde_json::to_value(&element).unwrap();
    assert!(value.get("childCanvasId").is_none());

    let child = Uuid::new_v4();
    let assigned = Element {
        kind: ElementKind::Board { name: "Floor 1".into(), child_canvas_id: Some(child) },
        ..element
    };
    let value = serde_json::to_value(&assigned).unwrap();
    assert_eq!(value["childCanvasId"], json!(child));
}

#[test]
fn is_board_only_for_boards() {
    let board = Element::new(
        Uuid::new_v4(),
        0.0,
        0.0,
        1.0,
        1.0,
        ElementKind::Board { name: "b".into(), child_canvas_id: None },
    );
    assert!(board.is_board());
    assert!(!sticky(Uuid::new_v4()).is_board());
}

// =============================================================
// Stroke
// =============================================================

#[test]
fn stroke_starts_with_one_point() {
    let stroke = Stroke::new(Point::new(1.0, 2.0), "#000", 2.0);
    assert_eq!(stroke.points.len(), 1);
    assert!(stroke.is_dot());
}

#[test]
fn stroke_push_clears_dot() {
    let mut stroke = Stroke::new(Point::new(0.0, 0.0), "#000", 2.0);
    stroke.push(Point::new(5.0, 5.0));
    assert!(!stroke.is_dot());
    assert_eq!(stroke.points.len(), 2);
}

#[test]
fn drawing_round_trips_strokes() {
    let mut stroke = Stroke::new(Point::new(0.0, 0.0), "#1F1A17", 2.0);
    stroke.push(Point::new(10.0, 4.0));
    let element = Element::new(Uuid::new_v4(), 0.0, 0.0, 10.0, 4.0, ElementKind::Drawing { strokes: vec![stroke] });

    let text = serde_json::to_string(&element).unwrap();
    let back: Element = serde_json::from_str(&text).unwrap();
    assert_eq!(back, element);
}

// =============================================================
// ElementStore: insert / get / remove
// =============================================================

#[test]
fn store_new_is_empty() {
    let store = ElementStore::new();
    assert!(store.is_empty());
    assert_eq!(store.len(), 0);
}

#[test]
fn store_insert_and_get() {
    let mut store = ElementStore::new();
    let element = sticky(Uuid::new_v4());
    let id = element.id;
    store.insert(element);
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(&id).unwrap().id, id);
}

#[test]
fn store_insert_overwrites_same_id() {
    let mut store = ElementStore::new();
    let element = sticky(Uuid::new_v4());
    let id = element.id;
    let mut replacement = element.clone();
    replacement.x = 999.0;
    store.insert(element);
    store.insert(replacement);
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(&id).unwrap().x, 999.0);
}

#[test]
fn store_remove_returns_element() {
    let mut store = ElementStore::new();
    let element = sticky(Uuid::new_v4());
    let id = element.id;
    store.insert(element);
    let removed = store.remove(&id);
    assert_eq!(removed.unwrap().id, id);
    assert!(store.is_empty());
}

#[test]
fn store_remove_nonexistent_returns_none() {
    let mut store = ElementStore::new();
    assert!(store.remove(&Uuid::new_v4()).is_none());
}

// =============================================================
// ElementStore: apply_patch
// =============================================================

#[test]
fn apply_patch_moves_element() {
    let mut store = ElementStore::new();
    let element = sticky(Uuid::new_v4());
    let id = element.id;
    store.insert(element);

    let patch = ElementPatch { x: Some(50.0), y: Some(60.0), ..Default::default() };
    assert!(store.apply_patch(&id, &patch));
    let moved = store.get(&id).unwrap();
    assert_eq!(moved.x, 50.0);
    assert_eq!(moved.y, 60.0);
    assert_eq!(moved.width, 160.0); // unchanged
}

#[test]
fn apply_patch_resizes_and_rotates() {
    let mut store = ElementStore::new();
    let element = sticky(Uuid::new_v4());
    let id = element.id;
    store.insert(element);

    let patch = ElementPatch { width: Some(320.0), height: Some(200.0), rotation: Some(90.0), ..Default::default() };
    assert!(store.apply_patch(&id, &patch));
    let resized = store.get(&id).unwrap();
    assert_eq!(resized.width, 320.0);
    assert_eq!(resized.height, 200.0);
    assert_eq!(resized.rotation, 90.0);
}

#[test]
fn apply_patch_missing_id_returns_false() {
    let mut store = ElementStore::new();
    assert!(!store.apply_patch(&Uuid::new_v4(), &ElementPatch::default()));
}

#[test]
fn patch_skips_absent_fields_on_the_wire() {
    let patch = ElementPatch { x: Some(1.0), ..Default::default() };
    let text = serde_json::to_string(&patch).unwrap();
    assert!(text.contains("\"x\""));
    assert!(!text.contains("\"rotation\""));
}

// =============================================================
// ElementStore: load_snapshot
// =============================================================

#[test]
fn load_snapshot_replaces_existing() {
    let mut store = ElementStore::new();
    let old = sticky(Uuid::new_v4());
    let old_id = old.id;
    store.insert(old);

    let fresh = sticky(Uuid::new_v4());
    let fresh_id = fresh.id;
    store.load_snapshot(vec![fresh]);

    assert_eq!(store.len(), 1);
    assert!(store.get(&old_id).is_none());
    assert!(store.get(&fresh_id).is_some());
}
