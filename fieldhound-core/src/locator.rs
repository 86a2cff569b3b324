// Depth-first field search over nested trees

use crate::path::FieldPath;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// A node in a tree the locator can walk.
///
/// Containers report an identity so the walk can remember which nodes it has
/// already entered. Two structurally equal containers must still report
/// different identities, otherwise cycle detection would skip legitimate
/// siblings.
pub trait FieldTree: Clone + PartialEq {
    /// Identity of a container node, `None` for leaves.
    fn identity(&self) -> Option<usize>;

    /// Null or missing input.
    fn is_absent(&self) -> bool;

    /// True for nodes addressed by string keys (objects, maps).
    fn is_keyed(&self) -> bool;

    /// Direct child of a keyed container.
    fn child(&self, key: &str) -> Option<Self>;

    /// Element of an ordered container.
    fn element(&self, index: usize) -> Option<Self>;

    /// Children in natural enumeration order. Sequence indices are rendered as strings.
    fn children(&self) -> Vec<(String, Self)>;

    fn is_container(&self) -> bool {
        self.identity().is_some()
    }

    /// Follow `path` from this node. The empty path resolves to nothing.
    fn resolve(&self, path: &FieldPath) -> Option<Self> {
        if path.is_root() {
            return None;
        }

        let mut current = self.clone();
        for segment in path.segments() {
            current = if current.is_keyed() {
                current.child(segment)?
            } else {
                current.element(segment.parse().ok()?)?
            };
        }
        Some(current)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult<T> {
    pub value: T,
    pub path: FieldPath,
}

impl SearchResult<&Value> {
    pub fn to_owned_value(&self) -> SearchResult<Value> {
        SearchResult {
            value: self.value.clone(),
            path: self.path.clone(),
        }
    }
}

/// Find the first occurrence of `field` in `tree`.
///
/// At the root the field name is first tried as a path expression, so
/// `data.user.id` resolves directly. After that a node's own key always wins
/// over anything nested deeper; children are searched in enumeration order.
pub fn locate<T: FieldTree>(tree: &T, field: &str) -> Option<SearchResult<T>> {
    if tree.is_absent() || field.is_empty() {
        return None;
    }

    let expr = FieldPath::parse(field);
    if let Some(value) = tree.resolve(&expr) {
        return Some(SearchResult { value, path: expr });
    }

    let mut visited = HashSet::new();
    locate_in(tree, field, &FieldPath::root(), &mut visited)
}

fn locate_in<T: FieldTree>(
    node: &T,
    field: &str,
    path: &FieldPath,
    visited: &mut HashSet<usize>,
) -> Option<SearchResult<T>> {
    if let Some(id) = node.identity()
        && !visited.insert(id)
    {
        return None;
    }

    if node.is_keyed()
        && let Some(value) = node.child(field)
    {
        return Some(SearchResult {
            value,
            path: path.child(field),
        });
    }

    for (key, child) in node.children() {
        if !child.is_container() {
            continue;
        }
        if let Some(found) = locate_in(&child, field, &path.child(&key), visited) {
            return Some(found);
        }
    }

    None
}

/// Find every occurrence of `field` in `tree`, in traversal order.
pub fn locate_all<T: FieldTree>(tree: &T, field: &str) -> Vec<SearchResult<T>> {
    let mut results = Vec::new();
    if tree.is_absent() || field.is_empty() {
        return results;
    }

    let mut visited = HashSet::new();
    collect(tree, field, &FieldPath::root(), &mut visited, &mut results);
    results
}

fn collect<T: FieldTree>(
    node: &T,
    field: &str,
    path: &FieldPath,
    visited: &mut HashSet<usize>,
    results: &mut Vec<SearchResult<T>>,
) {
    if let Some(id) = node.identity()
        && !visited.insert(id)
    {
        return;
    }

    if node.is_keyed()
        && let Some(value) = node.child(field)
    {
        results.push(SearchResult {
            value,
            path: path.child(field),
        });
    }

    // Root-level path expression, recorded once
    if path.is_root() {
        let expr = FieldPath::parse(field);
        if let Some(value) = node.resolve(&expr) {
            let rendered = expr.to_string();
            let duplicate = results
                .iter()
                .any(|r| r.value == value && r.path.to_string() == rendered);
            if !duplicate {
                results.push(SearchResult { value, path: expr });
            }
        }
    }

    for (key, child) in node.children() {
        if child.is_container() {
            collect(&child, field, &path.child(&key), visited, results);
        }
    }
}

impl<'a> FieldTree for &'a Value {
    fn identity(&self) -> Option<usize> {
        match self {
            Value::Object(_) | Value::Array(_) => Some(*self as *const Value as usize),
            _ => None,
        }
    }

    fn is_absent(&self) -> bool {
        self.is_null()
    }

    fn is_keyed(&self) -> bool {
        self.is_object()
    }

    fn child(&self, key: &str) -> Option<Self> {
        self.as_object()?.get(key)
    }

    fn element(&self, index: usize) -> Option<Self> {
        self.as_array()?.get(index)
    }

    fn children(&self) -> Vec<(String, Self)> {
        match self {
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_locate_single_occurrence() {
        let tree = json!({"data": {"user": {"id": 7}}});
        let found = locate(&&tree, "id").unwrap();

        assert_eq!(found.value, &json!(7));
        assert_eq!(found.path.to_string(), "data.user.id");

        let all = locate_all(&&tree, "id");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], found);
    }

    #[test]
    fn test_locate_dotted_path_at_root() {
        let tree = json!({"data": {"user": {"id": 7}}, "id": 1});
        let found = locate(&&tree, "data.user.id").unwrap();

        assert_eq!(found.value, &json!(7));
        assert_eq!(found.path.to_string(), "data.user.id");
    }

    #[test]
    fn test_direct_child_beats_nested_match() {
        let tree = json!({"record": {"inner": {"name": "deep"}, "name": "shallow"}});
        let found = locate(&&tree, "name").unwrap();

        assert_eq!(found.value, &json!("shallow"));
        assert_eq!(found.path.to_string(), "record.name");
    }

    #[test]
    fn test_descends_into_arrays() {
        let tree = json!({"rows": [{"x": 1}, {"code": "A1"}]});
        let found = locate(&&tree, "code").unwrap();

        assert_eq!(found.value, &json!("A1"));
        assert_eq!(found.path.to_string(), "rows.1.code");
    }

    #[test]
    fn test_null_and_empty_inputs() {
        let null = Value::Null;
        let tree = json!({"a": 1});

        assert!(locate(&&null, "a").is_none());
        assert!(locate(&&tree, "").is_none());
        assert!(locate_all(&&null, "a").is_empty());
        assert!(locate_all(&&tree, "").is_empty());
        assert!(locate(&&json!({}), "a").is_none());
    }

    #[test]
    fn test_locate_all_preserves_sibling_order() {
        let tree = json!({"a": {"name": 1}, "b": {"name": 2}});
        let all = locate_all(&&tree, "name");

        let pairs: Vec<(Value, String)> = all
            .iter()
            .map(|r| (r.value.clone(), r.path.to_string()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (json!(1), "a.name".to_string()),
                (json!(2), "b.name".to_string())
            ]
        );
    }

    #[test]
    fn test_locate_all_records_level_before_descending() {
        let tree = json!({"child": {"id": 2}, "id": 1});
        let all = locate_all(&&tree, "id");

        assert_eq!(all.len(), 2);
        assert_eq!(all[0].path.to_string(), "id");
        assert_eq!(all[1].path.to_string(), "child.id");
    }

    #[test]
    fn test_locate_all_root_probe_not_duplicated() {
        let tree = json!({"userId": "u1"});
        let all = locate_all(&&tree, "userId");
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_locate_all_includes_dotted_probe() {
        let tree = json!({"owner": {"id": 3}});
        let all = locate_all(&&tree, "owner.id");

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value, &json!(3));
        assert_eq!(all[0].path.to_string(), "owner.id");
    }

    #[test]
    fn test_equal_siblings_are_not_mistaken_for_cycles() {
        let tree = json!({"a": {"v": {"k": 1}}, "b": {"v": {"k": 1}}});
        assert_eq!(locate_all(&&tree, "k").len(), 2);
    }
}
