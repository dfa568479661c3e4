use uuid::Uuid;

use super::*;

fn tree_with_children() -> (CanvasTree, CanvasId, CanvasId) {
    let mut tree = CanvasTree::new();
    let root = tree.root_id();
    let floor = tree.add_node("Floor 1", root).unwrap();
    let closet = tree.add_node("Closet", floor).unwrap();
    (tree, floor, closet)
}

// =============================================================
// Construction
// =============================================================

#[test]
fn new_tree_has_root_only() {
    let tree = CanvasTree::new();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.current_id(), tree.root_id());
    assert_eq!(tree.current().name, crate::consts::ROOT_CANVAS_NAME);
    assert!(tree.current().parent_id.is_none());
}

#[test]
fn from_nodes_keeps_order_and_points_at_root() {
    let (tree, floor, _) = tree_with_children();
    let nodes = tree.nodes().to_vec();

    let rebuilt = CanvasTree::from_nodes(nodes.clone());
    assert_eq!(rebuilt.nodes(), &nodes[..]);
    assert_eq!(rebuilt.current_id(), rebuilt.root_id());
    assert!(rebuilt.contains(floor));
}

#[test]
fn from_nodes_recreates_missing_root() {
    let orphan = CanvasNode {
        id: Uuid::new_v4(),
        name: "adrift".into(),
        parent_id: Some(Uuid::new_v4()),
        elements: Vec::new(),
    };
    let tree = CanvasTree::from_nodes(vec![orphan.clone()]);
    assert_eq!(tree.len(), 2);
    assert!(tree.node(tree.root_id()).unwrap().parent_id.is_none());
    assert!(tree.contains(orphan.id));
}

// =============================================================
// add_node / enter / exit
// =============================================================

#[test]
fn add_node_rejects_blank_name() {
    let mut tree = CanvasTree::new();
    let root = tree.root_id();
    assert_eq!(tree.add_node("", root), Err(TreeError::EmptyName));
    assert_eq!(tree.add_node("   ", root), Err(TreeError::EmptyName));
    assert_eq!(tree.len(), 1);
}

#[test]
fn add_node_rejects_missing_parent() {
    let mut tree = CanvasTree::new();
    assert!(matches!(tree.add_node("x", Uuid::new_v4()), Err(TreeError::NotFound(_))));
}

#[test]
fn enter_and_exit_round_trip() {
    let (mut tree, floor, _) = tree_with_children();
    tree.enter(floor).unwrap();
    assert_eq!(tree.current_id(), floor);

    let parent = tree.exit_to_parent().unwrap();
    assert_eq!(parent, tree.root_id());
    assert_eq!(tree.current_id(), tree.root_id());
}

#[test]
fn exit_at_root_is_guarded() {
    let mut tree = CanvasTree::new();
    assert_eq!(tree.exit_to_parent(), Err(TreeError::AtRoot));
    assert_eq!(tree.current_id(), tree.root_id());
}

#[test]
fn enter_unknown_canvas_fails() {
    let mut tree = CanvasTree::new();
    assert!(matches!(tree.enter(Uuid::new_v4()), Err(TreeError::NotFound(_))));
}

#[test]
fn two_boards_same_name_get_distinct_canvases() {
    let mut tree = CanvasTree::new();
    let root = tree.root_id();
    let a = tree.add_node("Floor 1", root).unwrap();
    let b = tree.add_node("Floor 1", root).unwrap();
    assert_ne!(a, b);
    assert_eq!(tree.len(), 3);
}

// =============================================================
// breadcrumb_path
// =============================================================

#[test]
fn breadcrumb_is_root_to_current() {
    let (mut tree, floor, closet) = tree_with_children();
    tree.enter(closet).unwrap();

    let path = tree.breadcrumb_path();
    let ids: Vec<CanvasId> = path.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![tree.root_id(), floor, closet]);
}

#[test]
fn breadcrumb_length_equals_depth() {
    let mut tree = CanvasTree::new();
    let mut parent = tree.root_id();
    for depth in 1..=6 {
        parent = tree.add_node(&format!("level {depth}"), parent).unwrap();
    }
    tree.enter(parent).unwrap();
    assert_eq!(tree.breadcrumb_path().len(), 7);
}

#[test]
fn breadcrumb_stops_at_dangling_parent() {
    let missing = Uuid::new_v4();
    let stranded = CanvasNode {
        id: Uuid::new_v4(),
        name: "stranded".into(),
        parent_id: Some(missing),
        elements: Vec::new(),
    };
    let stranded_id = stranded.id;
    let mut nodes = CanvasTree::new().nodes().to_vec();
    nodes.push(stranded);

    let mut tree = CanvasTree::from_nodes(nodes);
    tree.enter(stranded_id).unwrap();

    let path = tree.breadcrumb_path();
    assert_eq!(path.len(), 1);
    assert_eq!(path[0].id, stranded_id);
}

#[test]
fn breadcrumb_terminates_on_cycle() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let nodes = vec![
        CanvasNode { id: a, name: "a".into(), parent_id: Some(b), elements: Vec::new() },
        CanvasNode { id: b, name: "b".into(), parent_id: Some(a), elements: Vec::new() },
    ];
    let mut tree = CanvasTree::from_nodes(nodes);
    tree.enter(a).unwrap();

    // Must return, and never hold more entries than there are nodes.
    let path = tree.breadcrumb_path();
    assert!(path.len() <= tree.len());
}

// =============================================================
// Element ownership lists
// =============================================================

#[test]
fn attach_detach_preserves_order() {
    let mut tree = CanvasTree::new();
    let root = tree.root_id();
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    tree.attach_element(root, a).unwrap();
    tree.attach_element(root, b).unwrap();
    tree.attach_element(root, c).unwrap();
    assert_eq!(tree.node(root).unwrap().elements, vec![a, b, c]);

    tree.detach_element(root, b);
    assert_eq!(tree.node(root).unwrap().elements, vec![a, c]);
}

#[test]
fn attach_is_idempotent() {
    let mut tree = CanvasTree::new();
    let root = tree.root_id();
    let id = Uuid::new_v4();
    tree.attach_element(root, id).unwrap();
    tree.attach_element(root, id).unwrap();
    assert_eq!(tree.node(root).unwrap().elements.len(), 1);
}

#[test]
fn attach_to_unknown_canvas_fails() {
    let mut tree = CanvasTree::new();
    assert!(matches!(
        tree.attach_element(Uuid::new_v4(), Uuid::new_v4()),
        Err(TreeError::NotFound(_))
    ));
}

// =============================================================
// remove_subtree
// =============================================================

#[test]
fn remove_subtree_takes_descendants() {
    let (mut tree, floor, closet) = tree_with_children();
    let removed = tree.remove_subtree(floor);
    assert_eq!(removed.len(), 2);
    assert!(removed.contains(&floor));
    assert!(removed.contains(&closet));
    assert_eq!(tree.len(), 1);
}

#[test]
fn remove_subtree_leaves_no_dangling_parent() {
    let (mut tree, floor, _) = tree_with_children();
    tree.remove_subtree(floor);
    for node in tree.nodes() {
        if let Some(parent) = node.parent_id {
            assert!(tree.contains(parent), "dangling parent after removal");
        }
    }
}

#[test]
fn remove_subtree_resets_pointer_to_surviving_ancestor() {
    let (mut tree, floor, closet) = tree_with_children();
    tree.enter(closet).unwrap();
    tree.remove_subtree(floor);
    assert_eq!(tree.current_id(), tree.root_id());
}

#[test]
fn remove_subtree_root_is_refused() {
    let mut tree = CanvasTree::new();
    let removed = tree.remove_subtree(tree.root_id());
    assert!(removed.is_empty());
    assert_eq!(tree.len(), 1);
}

#[test]
fn remove_subtree_handles_child_listed_before_parent() {
    // Build a tree where the grandchild sits before its parent in the list.
    let root = CanvasNode { id: Uuid::new_v4(), name: "root".into(), parent_id: None, elements: Vec::new() };
    let mid = CanvasNode {
        id: Uuid::new_v4(),
        name: "mid".into(),
        parent_id: Some(root.id),
        elements: Vec::new(),
    };
    let leaf = CanvasNode {
        id: Uuid::new_v4(),
        name: "leaf".into(),
        parent_id: Some(mid.id),
        elements: Vec::new(),
    };
    let mid_id = mid.id;
    let tree_nodes = vec![root, leaf, mid];
    let mut tree = CanvasTree::from_nodes(tree_nodes);

    let removed = tree.remove_subtree(mid_id);
    assert_eq!(removed.len(), 2);
    assert_eq!(tree.len(), 1);
}
