// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Queries over a loaded update description
//! OWNERS: @runtime
//! STATUS: Functional
//! TEST_COVERAGE: 7 unit tests
//!
//! Root selection order:
//!   - with a software set + running mode: `software.<board>.<set>.<mode>`, then
//!     `software.<set>.<mode>`; nothing else
//!   - otherwise: `software.<board>`, then `software`
//!
//! Every candidate goes through `resolve_node`, so `ref` redirections are honoured.

use log::debug;
use nexus_config::{get_child, get_field, get_field_string, iterate_fields, resolve_node};
use nexus_config::{ConfigNode, PathKey, Value};

use crate::request::InstallRequest;

/// Redirection budget used by description lookups.
pub const DEFAULT_MAX_HOPS: u32 = 10;

const SOFTWARE: &str = "software";
const HW_COMPAT: &str = "hardware-compatibility";
const IMAGES: &str = "images";

/// Picks the description subtree that applies to `board` and the request's selection.
pub fn select_root<'a>(
    tree: &'a ConfigNode,
    board: Option<&str>,
    request: &InstallRequest,
    max_hops: u32,
) -> Option<&'a ConfigNode> {
    let mut candidates = Vec::with_capacity(2);
    match request.selection() {
        Some((set, mode)) => {
            if let Some(board) = board {
                candidates.push(PathKey::from_segments([SOFTWARE, board, set, mode]));
            }
            candidates.push(PathKey::from_segments([SOFTWARE, set, mode]));
        }
        None => {
            if let Some(board) = board {
                candidates.push(PathKey::from_segments([SOFTWARE, board]));
            }
            candidates.push(PathKey::from(SOFTWARE));
        }
    }
    candidates.iter().find_map(|path| {
        let found = resolve_node(tree, path, max_hops);
        if found.is_none() {
            debug!("updates: description has no '{path}'");
        }
        found
    })
}

/// True when `revision` is listed under `hardware-compatibility`, or no list exists.
pub fn hardware_compatible(root: &ConfigNode, revision: &str) -> bool {
    let Some(list) = get_child(root, HW_COMPAT) else {
        return true;
    };
    list.children().iter().any(|entry| match get_field_string(entry, None) {
        Some(listed) => listed == revision,
        None => {
            let kind = entry.value().map_or("group", Value::kind_name);
            debug!("updates: ignoring {kind} entry in {HW_COMPAT}; revisions are strings");
            false
        }
    })
}

/// One artifact listed under `images`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageEntry {
    pub name: String,
    pub filename: String,
    pub device: String,
    pub kind: String,
    pub version: String,
    pub installed_directly: bool,
}

pub fn images(root: &ConfigNode) -> Vec<ImageEntry> {
    let Some(list) = get_child(root, IMAGES) else {
        return Vec::new();
    };
    list.children()
        .iter()
        .filter(|entry| entry.is_group())
        .map(|entry| {
            let text = |field: &str| get_field_string(entry, Some(field)).unwrap_or_default().to_owned();
            let mut installed_directly = false;
            get_field(entry, Some("installed-directly"), &mut installed_directly);
            ImageEntry {
                name: text("name"),
                filename: text("filename"),
                device: text("device"),
                kind: text("type"),
                version: text("version"),
                installed_directly,
            }
        })
        .collect()
}

/// Flattened `(name, value)` pairs of `node`, in declaration order.
pub fn aliases(node: &ConfigNode) -> Vec<(String, String)> {
    let mut out = Vec::new();
    iterate_fields(node, |name, value| out.push((name.to_owned(), value.to_owned())));
    out
}
