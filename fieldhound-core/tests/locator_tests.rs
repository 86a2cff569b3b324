// Tests for field location over shared and self-referencing trees

use fieldhound_core::{FieldTree, SharedNode, locate, locate_all};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Wraps a node and counts how often each container is enumerated.
#[derive(Clone)]
struct Counted {
    node: SharedNode,
    visits: Arc<Mutex<HashMap<usize, usize>>>,
}

impl Counted {
    fn new(node: SharedNode) -> Self {
        Self {
            node,
            visits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn wrap(&self, node: SharedNode) -> Self {
        Self {
            node,
            visits: self.visits.clone(),
        }
    }

    fn max_visits(&self) -> usize {
        self.visits.lock().unwrap().values().copied().max().unwrap_or(0)
    }
}

impl PartialEq for Counted {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl FieldTree for Counted {
    fn identity(&self) -> Option<usize> {
        self.node.identity()
    }

    fn is_absent(&self) -> bool {
        self.node.is_absent()
    }

    fn is_keyed(&self) -> bool {
        self.node.is_keyed()
    }

    fn child(&self, key: &str) -> Option<Self> {
        self.node.child(key).map(|n| self.wrap(n))
    }

    fn element(&self, index: usize) -> Option<Self> {
        self.node.element(index).map(|n| self.wrap(n))
    }

    fn children(&self) -> Vec<(String, Self)> {
        if let Some(id) = self.node.identity() {
            *self.visits.lock().unwrap().entry(id).or_insert(0) += 1;
        }
        self.node
            .children()
            .into_iter()
            .map(|(k, n)| (k, self.wrap(n)))
            .collect()
    }
}

fn self_referencing_root() -> SharedNode {
    let root = SharedNode::object();
    let user = SharedNode::object();
    user.insert("name", SharedNode::leaf("ada"));
    user.insert("parent", root.clone());
    root.insert("user", user.clone());
    root.insert("self", root.clone());
    root
}

// ============================================================================
// Cycle Tests
// ============================================================================

#[test]
fn test_locate_terminates_on_cycle_when_field_absent() {
    let root = self_referencing_root();
    let tree = Counted::new(root.clone());

    assert!(locate(&tree, "missing").is_none());
    assert!(tree.max_visits() <= 1);

    root.clear();
}

#[test]
fn test_locate_all_terminates_on_cycle_when_field_absent() {
    let root = self_referencing_root();
    let tree = Counted::new(root.clone());

    assert!(locate_all(&tree, "missing").is_empty());
    assert!(tree.max_visits() <= 1);

    root.clear();
}

#[test]
fn test_locate_finds_field_inside_cycle() {
    let root = self_referencing_root();

    let found = locate(&root, "name").unwrap();
    assert_eq!(found.value.as_leaf(), Some(&json!("ada")));
    assert_eq!(found.path.to_string(), "user.name");

    root.clear();
}

#[test]
fn test_locate_all_reports_each_occurrence_once() {
    let root = self_referencing_root();
    let tree = Counted::new(root.clone());

    let all = locate_all(&tree, "name");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].path.to_string(), "user.name");
    assert!(tree.max_visits() <= 1);

    root.clear();
}

#[test]
fn test_shared_subtree_is_searched_once() {
    let shared = SharedNode::object();
    shared.insert("token", SharedNode::leaf("t-1"));

    let root = SharedNode::object();
    root.insert("a", shared.clone());
    root.insert("b", shared.clone());

    let all = locate_all(&root, "token");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].path.to_string(), "a.token");
}

#[test]
fn test_array_cycle() {
    let list = SharedNode::array();
    let entry = SharedNode::object();
    entry.insert("id", SharedNode::leaf(3));
    entry.insert("owner", list.clone());
    list.push(entry);

    let found = locate(&list, "id").unwrap();
    assert_eq!(found.path.to_string(), "0.id");
    assert!(locate(&list, "nothing").is_none());

    list.clear();
}

// ============================================================================
// Conversion Tests
// ============================================================================

#[test]
fn test_converted_value_locates_like_json() {
    let value = json!({"data": {"items": [{"id": 1}, {"id": 2}]}});
    let node = SharedNode::from_value(&value);

    let from_node: Vec<String> = locate_all(&node, "id")
        .iter()
        .map(|r| r.path.to_string())
        .collect();
    let from_json: Vec<String> = locate_all(&&value, "id")
        .iter()
        .map(|r| r.path.to_string())
        .collect();

    assert_eq!(from_node, from_json);
    assert_eq!(from_node, vec!["data.items.0.id", "data.items.1.id"]);
}

#[test]
fn test_cycle_renders_as_null() {
    let root = self_referencing_root();

    let rendered = root.to_value();
    assert_eq!(rendered["self"], json!(null));
    assert_eq!(rendered["user"]["name"], json!("ada"));
    assert_eq!(rendered["user"]["parent"], json!(null));

    root.clear();
}
