//! Dotted path helpers over snapshots.
//!
//! Paths are dot-delimited. Runs of dots collapse into one separator and empty
//! segments are dropped, so `a..b`, `a.b` and `.a.b.` all address the same
//! node.

use std::sync::Arc;

use crate::value::{Map, Value};

/// Split a dotted path into its segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('.').filter(|seg| !seg.is_empty()).collect()
}

/// Read the node at `segments`, if every step along the way exists.
pub fn get_in<'a, S: AsRef<str>>(root: &'a Value, segments: &[S]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(root, |node, seg| node.get(seg.as_ref()))
}

/// Read the node at a dotted path.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    get_in(root, &split_path(path))
}

/// Read the node at a dotted path, or `default` when it is absent.
pub fn get_or(root: &Value, path: &str, default: Value) -> Value {
    get_path(root, path).cloned().unwrap_or(default)
}

/// Produce a new snapshot equal to `root` except at `segments`.
///
/// `root` is untouched. Only the nodes along the path are rebuilt; every
/// sibling subtree is shared with `root`. Missing or scalar intermediates are
/// replaced by objects. On arrays, a segment that parses as an index no
/// larger than the length addresses that slot (the length itself appends).
pub fn set_in<S: AsRef<str>>(root: &Value, segments: &[S], value: Value) -> Value {
    let Some((head, rest)) = segments.split_first() else {
        return value;
    };
    let head = head.as_ref();

    if let Value::Array(items) = root {
        if let Some(index) = head.parse::<usize>().ok().filter(|i| *i <= items.len()) {
            let mut items = (**items).clone();
            let child = items.get(index).cloned().unwrap_or_default();
            let child = set_in(&child, rest, value);
            if index == items.len() {
                items.push_back(child);
            } else {
                items.set(index, child);
            }
            return Value::Array(Arc::new(items));
        }
    }

    let mut map = match root {
        Value::Object(map) => (**map).clone(),
        _ => Map::new(),
    };
    let child = map.get(head).cloned().unwrap_or_default();
    map.insert(head.to_owned(), set_in(&child, rest, value));
    Value::Object(Arc::new(map))
}
