// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Configuration tree node model
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 4 unit tests
//!
//! INVARIANTS:
//!   - A leaf never has children
//!   - Group children keep insertion order; duplicate names are not merged

use std::fmt;

/// Scalar carried by a leaf node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i32),
    Integer64(i64),
    Text(String),
    Boolean(bool),
    Float(f64),
}

impl Value {
    /// Short tag used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "int",
            Value::Integer64(_) => "int64",
            Value::Text(_) => "string",
            Value::Boolean(_) => "bool",
            Value::Float(_) => "float",
        }
    }

    /// Renders the scalar as text regardless of its tag.
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Integer64(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Leaf(Value),
    Group(Vec<ConfigNode>),
}

/// Named node of a configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigNode {
    name: String,
    kind: NodeKind,
}

impl ConfigNode {
    pub fn leaf(name: impl Into<String>, value: Value) -> Self {
        Self { name: name.into(), kind: NodeKind::Leaf(value) }
    }

    pub fn group(name: impl Into<String>, children: Vec<ConfigNode>) -> Self {
        Self { name: name.into(), kind: NodeKind::Group(children) }
    }

    /// Appends `child` when `self` is a group. Leaves stay childless.
    pub fn with_child(mut self, child: ConfigNode) -> Self {
        if let NodeKind::Group(children) = &mut self.kind {
            children.push(child);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Leaf(value) => Some(value),
            NodeKind::Group(_) => None,
        }
    }

    pub fn children(&self) -> &[ConfigNode] {
        match &self.kind {
            NodeKind::Leaf(_) => &[],
            NodeKind::Group(children) => children,
        }
    }

    pub fn len(&self) -> usize {
        self.children().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children().is_empty()
    }

    /// Text rendering used by field iteration; aggregates render empty.
    pub(crate) fn text_or_empty(&self) -> String {
        self.value().map(Value::as_text).unwrap_or_default()
    }
}
