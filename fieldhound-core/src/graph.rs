// Shared node graph for trees that may reference themselves

use crate::locator::FieldTree;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Entries = Vec<(String, SharedNode)>;

/// A tree whose containers are reference counted, so the same container can
/// be reachable from several parents, including its own descendants.
///
/// Reference cycles keep their nodes alive; call [`SharedNode::clear`] on a
/// container in the cycle to release it.
#[derive(Clone)]
pub enum SharedNode {
    Leaf(Value),
    Object(Arc<RwLock<Entries>>),
    Array(Arc<RwLock<Vec<SharedNode>>>),
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl SharedNode {
    pub fn leaf(value: impl Into<Value>) -> Self {
        SharedNode::Leaf(value.into())
    }

    pub fn object() -> Self {
        SharedNode::Object(Arc::new(RwLock::new(Vec::new())))
    }

    pub fn array() -> Self {
        SharedNode::Array(Arc::new(RwLock::new(Vec::new())))
    }

    /// Set `key` on an object node, replacing any previous child in place.
    /// Returns false when called on a non-object.
    pub fn insert(&self, key: &str, node: SharedNode) -> bool {
        let SharedNode::Object(entries) = self else {
            return false;
        };
        let mut entries = write(entries);
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = node,
            None => entries.push((key.to_string(), node)),
        }
        true
    }

    /// Append to an array node. Returns false when called on a non-array.
    pub fn push(&self, node: SharedNode) -> bool {
        let SharedNode::Array(items) = self else {
            return false;
        };
        write(items).push(node);
        true
    }

    /// Drop all children of a container.
    pub fn clear(&self) {
        match self {
            SharedNode::Object(entries) => write(entries).clear(),
            SharedNode::Array(items) => write(items).clear(),
            SharedNode::Leaf(_) => {}
        }
    }

    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            SharedNode::Leaf(value) => Some(value),
            _ => None,
        }
    }

    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                let node = SharedNode::object();
                for (key, child) in map {
                    node.insert(key, SharedNode::from_value(child));
                }
                node
            }
            Value::Array(items) => {
                let node = SharedNode::array();
                for child in items {
                    node.push(SharedNode::from_value(child));
                }
                node
            }
            other => SharedNode::Leaf(other.clone()),
        }
    }

    /// Render as plain JSON. A container reached again while it is still being
    /// rendered becomes `null`.
    pub fn to_value(&self) -> Value {
        let mut in_progress = HashSet::new();
        self.render(&mut in_progress)
    }

    fn render(&self, in_progress: &mut HashSet<usize>) -> Value {
        let Some(id) = self.identity() else {
            return self.as_leaf().cloned().unwrap_or(Value::Null);
        };
        if !in_progress.insert(id) {
            return Value::Null;
        }

        let rendered = match self {
            SharedNode::Object(entries) => {
                let mut map = Map::new();
                for (key, child) in self.children_of(entries) {
                    map.insert(key, child.render(in_progress));
                }
                Value::Object(map)
            }
            SharedNode::Array(items) => {
                let children: Vec<SharedNode> = read(items).clone();
                Value::Array(children.iter().map(|c| c.render(in_progress)).collect())
            }
            SharedNode::Leaf(value) => value.clone(),
        };

        in_progress.remove(&id);
        rendered
    }

    fn children_of(&self, entries: &RwLock<Entries>) -> Entries {
        read(entries).clone()
    }
}

impl PartialEq for SharedNode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SharedNode::Leaf(a), SharedNode::Leaf(b)) => a == b,
            (SharedNode::Object(a), SharedNode::Object(b)) => Arc::ptr_eq(a, b),
            (SharedNode::Array(a), SharedNode::Array(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for SharedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharedNode::Leaf(value) => write!(f, "Leaf({})", value),
            SharedNode::Object(entries) => {
                write!(f, "Object(#{:x}, {} keys)", Arc::as_ptr(entries) as usize, read(entries).len())
            }
            SharedNode::Array(items) => {
                write!(f, "Array(#{:x}, {} items)", Arc::as_ptr(items) as usize, read(items).len())
            }
        }
    }
}

impl FieldTree for SharedNode {
    fn identity(&self) -> Option<usize> {
        match self {
            SharedNode::Object(entries) => Some(Arc::as_ptr(entries) as usize),
            SharedNode::Array(items) => Some(Arc::as_ptr(items) as usize),
            SharedNode::Leaf(_) => None,
        }
    }

    fn is_absent(&self) -> bool {
        matches!(self, SharedNode::Leaf(Value::Null))
    }

    fn is_keyed(&self) -> bool {
        matches!(self, SharedNode::Object(_))
    }

    fn child(&self, key: &str) -> Option<Self> {
        let SharedNode::Object(entries) = self else {
            return None;
        };
        read(entries)
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, node)| node.clone())
    }

    fn element(&self, index: usize) -> Option<Self> {
        let SharedNode::Array(items) = self else {
            return None;
        };
        read(items).get(index).cloned()
    }

    fn children(&self) -> Vec<(String, Self)> {
        match self {
            SharedNode::Object(entries) => self.children_of(entries),
            SharedNode::Array(items) => read(items)
                .iter()
                .enumerate()
                .map(|(i, node)| (i.to_string(), node.clone()))
                .collect(),
            SharedNode::Leaf(_) => Vec::new(),
        }
    }
}
