// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Description loading and resolution against on-disk TOML
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: 3 tests

use std::fs;

use nexus_config::{get_field, get_field_string, resolve_node, resolve_node_strict, ConfigTree};
use nexus_config::PathKey;
use updates::description::{self, DEFAULT_MAX_HOPS};
use updates::InstallRequest;

const DESCRIPTION: &str = r#"
[software]
version = "3.1"

[software.rpi4]
ref = "software.boards.rpi"

[software.boards.rpi]
hardware-compatibility = ["1.0", "1.1"]

[[software.boards.rpi.images]]
name = "rootfs"
filename = "rootfs.ext4.gz"
device = "/dev/mmcblk0p2"
type = "raw"
installed-directly = true

[software.loop.a]
ref = "software.loop.b"

[software.loop.b]
ref = "software.loop.a"
"#;

fn load() -> (tempfile::TempDir, ConfigTree) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sw-description.toml");
    fs::write(&path, DESCRIPTION).unwrap();
    let tree = ConfigTree::load(&path).unwrap();
    (dir, tree)
}

#[test]
fn test_board_root_through_ref() {
    let (_dir, tree) = load();
    let root = description::select_root(&tree, Some("rpi4"), &InstallRequest::new(false), DEFAULT_MAX_HOPS)
        .unwrap();
    assert!(description::hardware_compatible(root, "1.1"));
    assert!(!description::hardware_compatible(root, "2.0"));

    let images = description::images(root);
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].filename, "rootfs.ext4.gz");
    assert!(images[0].installed_directly);
}

#[test]
fn test_cycle_terminates_in_both_modes() {
    let (_dir, tree) = load();
    let path = PathKey::parse("software.loop.a");
    assert!(resolve_node(&tree, &path, DEFAULT_MAX_HOPS).is_none());
    assert!(resolve_node_strict(&tree, &path, u32::MAX).is_none());
}

#[test]
fn test_typed_fields_from_file() {
    let (_dir, tree) = load();
    assert_eq!(get_field_string(&tree, Some("software.version")), Some("3.1"));

    let mut flag = false;
    get_field(&tree, Some("software.boards.rpi.images.0.installed-directly"), &mut flag);
    assert!(flag);

    // Text never lands in a numeric slot.
    let mut number = 7i32;
    get_field(&tree, Some("software.version"), &mut number);
    assert_eq!(number, 7);
}
