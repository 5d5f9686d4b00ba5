// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Path-addressed read access over configuration trees
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 13 unit tests
//!
//! ERROR CONDITIONS:
//!   - Misses are `None` / untouched output slots, never errors
//!   - Kind mismatches on extraction are ignored (debug diagnostic only)
//!   - `ref` chains longer than the hop budget resolve to `None`
//!
//! INVARIANTS:
//!   - Resolution never recurses; the hop budget bounds the number of lookups
//!   - Trees are only read, so resolution may run concurrently on a shared tree

use std::collections::HashSet;

use log::debug;

use crate::path::{PathKey, MAX_PATH_LEN};
use crate::tree::{ConfigNode, NodeKind, Value};

/// Group attribute naming the path this group stands for.
pub const REF_ATTR: &str = "ref";

/// Destination for [`get_value`]; each slot type accepts the value tags it can hold.
pub trait ValueSlot {
    /// Stores `value` if its tag fits the slot and reports whether it did.
    fn accept(&mut self, value: &Value) -> bool;
}

impl ValueSlot for i32 {
    fn accept(&mut self, value: &Value) -> bool {
        match value {
            Value::Integer(v) => {
                *self = *v;
                true
            }
            _ => false,
        }
    }
}

impl ValueSlot for i64 {
    fn accept(&mut self, value: &Value) -> bool {
        match value {
            Value::Integer(v) => {
                *self = i64::from(*v);
                true
            }
            Value::Integer64(v) => {
                *self = *v;
                true
            }
            _ => false,
        }
    }
}

impl ValueSlot for bool {
    fn accept(&mut self, value: &Value) -> bool {
        match value {
            Value::Boolean(v) => {
                *self = *v;
                true
            }
            _ => false,
        }
    }
}

impl ValueSlot for f64 {
    fn accept(&mut self, value: &Value) -> bool {
        match value {
            Value::Float(v) => {
                *self = *v;
                true
            }
            _ => false,
        }
    }
}

/// Text never flows through [`get_value`]; use [`get_field_string`].
impl ValueSlot for String {
    fn accept(&mut self, _value: &Value) -> bool {
        false
    }
}

impl<T: ValueSlot + Default> ValueSlot for Option<T> {
    fn accept(&mut self, value: &Value) -> bool {
        let mut slot = T::default();
        if slot.accept(value) {
            *self = Some(slot);
            return true;
        }
        false
    }
}

/// Writes a leaf's value into `out` when the kinds line up; anything else is a no-op.
pub fn get_value<S: ValueSlot + ?Sized>(node: &ConfigNode, out: &mut S) {
    match node.kind() {
        NodeKind::Leaf(value) => {
            if !out.accept(value) {
                debug!(
                    "config: '{}' holds {} which the destination does not take, ignored",
                    node.name(),
                    value.kind_name()
                );
            }
        }
        NodeKind::Group(_) => {}
    }
}

/// Direct member lookup.
pub fn get_child<'a>(node: &'a ConfigNode, name: &str) -> Option<&'a ConfigNode> {
    if name.is_empty() {
        return None;
    }
    node.children().iter().find(|child| child.name() == name)
}

/// Resolves `path` below `root`, or uses `root` itself when no path is given, then extracts.
pub fn get_field<S: ValueSlot + ?Sized>(root: &ConfigNode, path: Option<&str>, out: &mut S) {
    if let Some(elem) = select(root, path) {
        get_value(elem, out);
    }
}

/// Text-only variant of [`get_field`].
pub fn get_field_string<'a>(root: &'a ConfigNode, path: Option<&str>) -> Option<&'a str> {
    match select(root, path)?.value() {
        Some(Value::Text(text)) => Some(text.as_str()),
        _ => None,
    }
}

/// Calls `cb(name, value)` for every leaf member and for every member of a nested group.
///
/// Nested members are reported under the *outer* member's name, one level deep only.
pub fn iterate_fields(node: &ConfigNode, mut cb: impl FnMut(&str, &str)) {
    for entry in node.children() {
        match entry.kind() {
            NodeKind::Leaf(value) => cb(entry.name(), &value.as_text()),
            NodeKind::Group(elems) => {
                for elem in elems {
                    cb(entry.name(), &elem.text_or_empty());
                }
            }
        }
    }
}

/// Plain lookup of `path` in `tree`. A group carrying `ref` is returned as is.
pub fn get_node<'a>(tree: &'a ConfigNode, path: &PathKey) -> Option<&'a ConfigNode> {
    lookup(tree, &path.render(MAX_PATH_LEN))
}

/// Looks `path` up in `tree`, following `ref` redirections at most `max_hops` times.
pub fn resolve_node<'a>(
    tree: &'a ConfigNode,
    path: &PathKey,
    max_hops: u32,
) -> Option<&'a ConfigNode> {
    follow(tree, path, max_hops, None)
}

/// Like [`resolve_node`] but also stops as soon as a path is visited twice.
pub fn resolve_node_strict<'a>(
    tree: &'a ConfigNode,
    path: &PathKey,
    max_hops: u32,
) -> Option<&'a ConfigNode> {
    let mut visited = HashSet::new();
    follow(tree, path, max_hops, Some(&mut visited))
}

fn follow<'a>(
    tree: &'a ConfigNode,
    path: &PathKey,
    max_hops: u32,
    mut visited: Option<&mut HashSet<String>>,
) -> Option<&'a ConfigNode> {
    let mut key = path.clone();
    let mut hops_left = max_hops;
    loop {
        let root = key.render(MAX_PATH_LEN);
        if let Some(seen) = visited.as_deref_mut() {
            if !seen.insert(root.clone()) {
                debug!("config: reference cycle through '{root}'");
                return None;
            }
        }
        let elem = lookup(tree, &root)?;
        let Some(target) = reference_of(elem) else {
            return Some(elem);
        };
        if hops_left == 0 {
            debug!("config: hop budget of {max_hops} exhausted at '{root}'");
            return None;
        }
        hops_left -= 1;
        key.replace_with(target);
    }
}

fn reference_of(node: &ConfigNode) -> Option<&str> {
    if !node.is_group() {
        return None;
    }
    get_field_string(node, Some(REF_ATTR))
}

fn select<'a>(root: &'a ConfigNode, path: Option<&str>) -> Option<&'a ConfigNode> {
    match path {
        Some(path) => lookup(root, path),
        None => Some(root),
    }
}

/// Single path-string lookup, segment by segment.
fn lookup<'a>(root: &'a ConfigNode, path: &str) -> Option<&'a ConfigNode> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.').try_fold(root, |node, segment| get_child(node, segment))
}
