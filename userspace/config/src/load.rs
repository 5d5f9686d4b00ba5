// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: TOML description loading into configuration trees
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 4 unit tests
//!
//! MAPPING:
//!   - tables -> groups (document order preserved)
//!   - arrays -> groups whose members are named "0", "1", ...
//!   - integers -> `Integer` when they fit 32 bits, `Integer64` otherwise
//!   - datetimes -> `Text` (RFC 3339)

use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::tree::{ConfigNode, Value};

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read description {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse description {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Owner of a loaded description; derefs to its unnamed root group.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTree {
    root: ConfigNode,
}

impl ConfigTree {
    pub fn new(root: ConfigNode) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &ConfigNode {
        &self.root
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let data = fs::read_to_string(path)
            .map_err(|source| Error::Read { path: path.to_path_buf(), source })?;
        Self::parse(&data, path)
    }

    pub fn from_toml_str(data: &str) -> Result<Self, Error> {
        Self::parse(data, Path::new("<memory>"))
    }

    fn parse(data: &str, origin: &Path) -> Result<Self, Error> {
        let table: toml::Table = toml::from_str(data)
            .map_err(|source| Error::Parse { path: origin.to_path_buf(), source })?;
        Ok(Self { root: table_node("", table) })
    }
}

impl Deref for ConfigTree {
    type Target = ConfigNode;

    fn deref(&self) -> &ConfigNode {
        &self.root
    }
}

fn table_node(name: &str, table: toml::Table) -> ConfigNode {
    let children = table.into_iter().map(|(key, value)| convert(&key, value)).collect();
    ConfigNode::group(name, children)
}

fn convert(name: &str, value: toml::Value) -> ConfigNode {
    match value {
        toml::Value::String(s) => ConfigNode::leaf(name, Value::Text(s)),
        toml::Value::Integer(i) => match i32::try_from(i) {
            Ok(narrow) => ConfigNode::leaf(name, Value::Integer(narrow)),
            Err(_) => ConfigNode::leaf(name, Value::Integer64(i)),
        },
        toml::Value::Float(f) => ConfigNode::leaf(name, Value::Float(f)),
        toml::Value::Boolean(b) => ConfigNode::leaf(name, Value::Boolean(b)),
        toml::Value::Datetime(dt) => ConfigNode::leaf(name, Value::Text(dt.to_string())),
        toml::Value::Array(items) => {
            let children = items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| convert(&idx.to_string(), item))
                .collect();
            ConfigNode::group(name, children)
        }
        toml::Value::Table(table) => table_node(name, table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{get_field, get_field_string, iterate_fields};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DESCRIPTION: &str = r#"
version = "2.1.0"

[software.board-a]
hardware-compatibility = ["1.0", "1.2"]

[software.board-a.images.rootfs]
filename = "rootfs.ext4"
size = 4096
offset = 8589934592
verify = true

[software.board-b]
ref = "software.board-a"
"#;

    #[test]
    fn tables_and_scalars_map_to_nodes() {
        let tree = ConfigTree::from_toml_str(DESCRIPTION).unwrap();
        assert_eq!(tree.name(), "");
        assert_eq!(get_field_string(&tree, Some("version")), Some("2.1.0"));

        let mut size = 0i32;
        get_field(&tree, Some("software.board-a.images.rootfs.size"), &mut size);
        assert_eq!(size, 4096);

        let mut offset = 0i32;
        get_field(&tree, Some("software.board-a.images.rootfs.offset"), &mut offset);
        assert_eq!(offset, 0, "64-bit values do not fit an int slot");
        let mut offset = 0i64;
        get_field(&tree, Some("software.board-a.images.rootfs.offset"), &mut offset);
        assert_eq!(offset, 8_589_934_592);
    }

    #[test]
    fn arrays_become_indexed_groups() {
        let tree = ConfigTree::from_toml_str(DESCRIPTION).unwrap();
        assert_eq!(get_field_string(&tree, Some("software.board-a.hardware-compatibility.1")), Some("1.2"));

        let mut seen = Vec::new();
        let board = crate::resolve::get_child(&tree, "software")
            .and_then(|sw| crate::resolve::get_child(sw, "board-a"))
            .unwrap();
        iterate_fields(board, |name, value| seen.push(format!("{name}={value}")));
        assert_eq!(seen[..2], ["hardware-compatibility=1.0", "hardware-compatibility=1.2"]);
    }

    #[test]
    fn document_order_is_preserved() {
        let tree = ConfigTree::from_toml_str("zeta = 1\nalpha = 2\nmid = 3\n").unwrap();
        let names: Vec<_> = tree.children().iter().map(ConfigNode::name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn load_reports_path_on_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[broken").unwrap();
        let err = ConfigTree::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));

        let err = ConfigTree::load(Path::new("/nonexistent/sw-description.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }
}
