//! Pre-order tree walker over [`serde_json::Value`] documents.
//!
//! [`walk`] and [`try_walk`] visit every node exactly once, container before
//! children, object entries in insertion order and array entries by index.
//! The handler receives a [`Visit`] describing the node (value, parent, key,
//! path, depth) and may replace the node, remove it, remove its parent, or
//! skip its subtree.
//!
//! Removals are not applied immediately. Each container keeps a list of
//! pending deletions that is resolved once all of its children have been
//! visited, highest array index first, so that deleting from an array never
//! shifts the indices of siblings still waiting to be visited. Replacements
//! take effect immediately and the walker descends into the new value.
//!
//! # Example
//!
//! ```
//! use oaformat::walk::walk;
//! use serde_json::json;
//!
//! let mut doc = json!({"a": {"drop": true}, "b": [1, 2, 3]});
//! walk(&mut doc, |visit| {
//!     if visit.value().get("drop").is_some() || visit.value() == &json!(2) {
//!         visit.remove();
//!     }
//! });
//! assert_eq!(doc, json!({"b": [1, 3]}));
//! ```

use serde_json::Value;
use std::convert::Infallible;
use std::fmt;

/// One step in a path from the document root: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Index(usize),
    Name(String),
}

impl Key {
    pub fn name(name: impl Into<String>) -> Self {
        Key::Name(name.into())
    }

    /// The object key, if this is one.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Name(name) => Some(name),
            Key::Index(_) => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(index) => Some(*index),
            Key::Name(_) => None,
        }
    }

    /// True if this is the object key `name`.
    pub fn is(&self, name: &str) -> bool {
        self.as_name() == Some(name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "{}", index),
            Key::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Descend,
    Skip,
    Remove,
    RemoveParent,
}

static NULL: Value = Value::Null;

/// The node currently being visited.
///
/// The node stays in place while the handler runs, so [`Visit::parent`] shows
/// the container with this node's current value in it.
pub struct Visit<'a> {
    /// The document root when visiting it, otherwise the container that
    /// holds this node under the last key of `path`.
    holder: &'a mut Value,
    path: &'a [Key],
    action: Action,
}

impl<'a> Visit<'a> {
    pub fn value(&self) -> &Value {
        match self.path.last() {
            Some(key) => child(self.holder, key).unwrap_or(&NULL),
            None => &*self.holder,
        }
    }

    pub fn value_mut(&mut self) -> &mut Value {
        match self.path.last() {
            Some(key) => slot_mut(&mut *self.holder, key),
            None => &mut *self.holder,
        }
    }

    /// The containing object or array; `None` for the root.
    pub fn parent(&self) -> Option<&Value> {
        if self.path.is_empty() {
            None
        } else {
            Some(&*self.holder)
        }
    }

    /// Key of this node under its parent; `None` for the root.
    pub fn key(&self) -> Option<&'a Key> {
        self.path.last()
    }

    /// Object key of this node, if its parent is an object.
    pub fn key_name(&self) -> Option<&'a str> {
        self.key().and_then(Key::as_name)
    }

    /// Key of the parent under the grandparent.
    pub fn parent_key(&self) -> Option<&'a Key> {
        self.path.len().checked_sub(2).map(|i| &self.path[i])
    }

    /// Keys from the root down to and including this node.
    pub fn path(&self) -> &'a [Key] {
        self.path
    }

    /// Number of keys between the root and this node; the root is at depth 0.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Replace this node. The walker descends into the new value.
    pub fn replace(&mut self, value: Value) {
        *self.value_mut() = value;
        self.action = Action::Descend;
    }

    /// Delete this node from its parent once the parent's children have all
    /// been visited. The subtree is not visited.
    pub fn remove(&mut self) {
        self.action = Action::Remove;
    }

    /// Delete the parent's entry from the grandparent. Siblings that have not
    /// been visited yet are skipped.
    pub fn remove_parent(&mut self) {
        self.action = Action::RemoveParent;
    }

    /// Do not descend into this node's children.
    pub fn skip(&mut self) {
        self.action = Action::Skip;
    }
}

/// Walk `root` with an infallible handler.
pub fn walk<F>(root: &mut Value, mut handler: F)
where
    F: FnMut(&mut Visit<'_>),
{
    let result = try_walk(root, |visit| {
        handler(visit);
        Ok::<(), Infallible>(())
    });
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

/// Walk `root`, stopping at the first handler error.
///
/// An error aborts the walk; pending deletions of containers that were still
/// open are discarded and the error is returned to the caller unchanged.
pub fn try_walk<E, F>(root: &mut Value, mut handler: F) -> Result<(), E>
where
    F: FnMut(&mut Visit<'_>) -> Result<(), E>,
{
    let mut path = Vec::new();
    let (outcome, action) = {
        let mut visit = Visit {
            holder: &mut *root,
            path: &[],
            action: Action::Descend,
        };
        let outcome = handler(&mut visit);
        (outcome, visit.action)
    };
    outcome?;

    match action {
        Action::Descend => {
            if walk_children(root, &mut path, &mut handler)? {
                tracing::debug!("ignoring request to remove the document root");
            }
        }
        Action::Remove | Action::RemoveParent => {
            tracing::debug!("ignoring request to remove the document root");
        }
        Action::Skip => {}
    }
    Ok(())
}

/// Visit the children of `container`. Returns true when a child asked for
/// `container` itself to be removed.
fn walk_children<E, F>(container: &mut Value, path: &mut Vec<Key>, handler: &mut F) -> Result<bool, E>
where
    F: FnMut(&mut Visit<'_>) -> Result<(), E>,
{
    let keys: Vec<Key> = match container {
        Value::Object(map) => map.keys().map(|k| Key::Name(k.clone())).collect(),
        Value::Array(items) => (0..items.len()).map(Key::Index).collect(),
        _ => return Ok(false),
    };

    let mut pending = Vec::new();
    let mut remove_container = false;

    for key in keys {
        if child(container, &key).is_none() {
            continue;
        }

        path.push(key);
        let (outcome, action) = {
            let mut visit = Visit {
                holder: &mut *container,
                path: path.as_slice(),
                action: Action::Descend,
            };
            let outcome = handler(&mut visit);
            (outcome, visit.action)
        };
        let Some(key) = path.pop() else {
            break;
        };
        outcome?;

        match action {
            Action::Remove => pending.push(key),
            Action::RemoveParent => {
                remove_container = true;
                break;
            }
            Action::Skip => {}
            Action::Descend => {
                if let Some(child) = child_mut(container, &key) {
                    path.push(key.clone());
                    let remove_child = walk_children(child, path, handler)?;
                    path.pop();
                    if remove_child {
                        pending.push(key);
                    }
                }
            }
        }
    }

    remove_entries(container, pending);
    Ok(remove_container)
}

/// Read-only pre-order traversal, for analyses that never mutate the tree.
pub fn for_each<F>(root: &Value, mut f: F)
where
    F: FnMut(&[Key], &Value),
{
    fn inner<F: FnMut(&[Key], &Value)>(node: &Value, path: &mut Vec<Key>, f: &mut F) {
        f(path, node);
        match node {
            Value::Object(map) => {
                for (name, child) in map {
                    path.push(Key::Name(name.clone()));
                    inner(child, path, f);
                    path.pop();
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate() {
                    path.push(Key::Index(index));
                    inner(child, path, f);
                    path.pop();
                }
            }
            _ => {}
        }
    }
    inner(root, &mut Vec::new(), &mut f);
}

/// Delete `keys` from `container`, highest array index first.
pub(crate) fn remove_entries(container: &mut Value, mut keys: Vec<Key>) {
    match container {
        Value::Object(map) => {
            for key in keys {
                if let Key::Name(name) = key {
                    map.shift_remove(&name);
                }
            }
        }
        Value::Array(items) => {
            keys.sort_unstable();
            keys.dedup();
            for key in keys.into_iter().rev() {
                if let Key::Index(index) = key
                    && index < items.len()
                {
                    items.remove(index);
                }
            }
        }
        _ => {}
    }
}

/// Child of an object or array.
pub fn child<'v>(value: &'v Value, key: &Key) -> Option<&'v Value> {
    match (value, key) {
        (Value::Object(map), Key::Name(name)) => map.get(name),
        (Value::Array(items), Key::Index(index)) => items.get(*index),
        _ => None,
    }
}

pub fn child_mut<'v>(value: &'v mut Value, key: &Key) -> Option<&'v mut Value> {
    match (value, key) {
        (Value::Object(map), Key::Name(name)) => map.get_mut(name),
        (Value::Array(items), Key::Index(index)) => items.get_mut(*index),
        _ => None,
    }
}

/// Entry of `container` under `key`. Visits only exist for entries that are
/// present, so the fallbacks are never taken.
fn slot_mut<'v>(container: &'v mut Value, key: &Key) -> &'v mut Value {
    if matches!((&*container, key), (Value::Array(items), Key::Index(index)) if *index >= items.len()) {
        return container;
    }
    match (container, key) {
        (Value::Object(map), Key::Name(name)) => map.entry(name.clone()).or_insert(Value::Null),
        (Value::Array(items), Key::Index(index)) => &mut items[*index],
        (other, _) => other,
    }
}

/// Value at `path` below `root`.
pub fn get<'v>(root: &'v Value, path: &[Key]) -> Option<&'v Value> {
    path.iter().try_fold(root, |node, key| child(node, key))
}

pub fn get_mut<'v>(root: &'v mut Value, path: &[Key]) -> Option<&'v mut Value> {
    path.iter().try_fold(root, |node, key| child_mut(node, key))
}

/// Delete the entry at `path` from its parent and return it. Array entries
/// are spliced out; object entries keep the order of the remaining keys.
pub fn remove(root: &mut Value, path: &[Key]) -> Option<Value> {
    let (last, parent_path) = path.split_last()?;
    match (get_mut(root, parent_path)?, last) {
        (Value::Object(map), Key::Name(name)) => map.shift_remove(name),
        (Value::Array(items), Key::Index(index)) if *index < items.len() => {
            Some(items.remove(*index))
        }
        _ => None,
    }
}

/// Dotted rendering of a path, e.g. `components.schemas.Pet`.
pub fn path_string(path: &[Key]) -> String {
    path.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(".")
}
