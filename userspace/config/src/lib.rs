// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Configuration tree domain library (device/board/software descriptions)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: Unit tests per module + integration tests (via tests/updates_host)
//!   - path rendering and truncation
//!   - typed value extraction and mismatch no-op
//!   - one-level field flattening
//!   - bounded `ref` indirection (cycles, long chains)
//!   - TOML description loading
//!
//! PUBLIC API:
//!   - ConfigNode / Value: immutable tree of named groups and typed leaves
//!   - PathKey: dotted path addressing
//!   - resolve: get_value, get_child, get_field, get_field_string, iterate_fields, get_node,
//!     resolve_node
//!   - ConfigTree: TOML-backed owner of a loaded tree
//!
//! DEPENDENCIES:
//!   - toml: description parsing (order preserving)
//!   - thiserror: loader errors
//!   - log: mismatch diagnostics

#![forbid(unsafe_code)]

pub mod load;
pub mod path;
pub mod resolve;
pub mod tree;

pub use load::{ConfigTree, Error};
pub use path::{PathKey, MAX_PATH_LEN};
pub use resolve::{
    get_child, get_field, get_field_string, get_node, get_value, iterate_fields,
    resolve_node, resolve_node_strict, ValueSlot, REF_ATTR,
};
pub use tree::{ConfigNode, NodeKind, Value};
