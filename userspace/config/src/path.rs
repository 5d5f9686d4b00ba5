// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Dotted path addressing for configuration trees
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 5 unit tests
//!
//! INVARIANTS:
//!   - Rendering joins with `.` and never emits a leading separator
//!   - Rendering stops at `capacity` bytes (char boundary), it never errors

use std::fmt;

/// Capacity used for every lookup path rendered by the resolver.
pub const MAX_PATH_LEN: usize = 1024;

const SEPARATOR: char = '.';

/// Ordered path segments, e.g. `["images", "rootfs"]` for `images.rootfs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PathKey {
    segments: Vec<String>,
}

impl PathKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits a dotted path. Empty input yields an empty key.
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::default();
        }
        Self { segments: path.split(SEPARATOR).map(str::to_string).collect() }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { segments: segments.into_iter().map(Into::into).collect() }
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Redirects the key to `target` (a dotted path taken from a `ref` attribute).
    pub fn replace_with(&mut self, target: &str) {
        *self = Self::parse(target);
    }

    /// Joins the segments with `.`, truncating once `capacity` bytes are used.
    pub fn render(&self, capacity: usize) -> String {
        let mut out = String::with_capacity(capacity.min(MAX_PATH_LEN));
        for segment in &self.segments {
            let needs_sep = !out.is_empty();
            let wanted = segment.len() + usize::from(needs_sep);
            let left = capacity - out.len();
            if wanted <= left {
                if needs_sep {
                    out.push(SEPARATOR);
                }
                out.push_str(segment);
                continue;
            }
            // Partial segment: keep whatever fits, but never a dangling separator.
            let budget = left.saturating_sub(usize::from(needs_sep));
            if budget > 0 {
                if needs_sep {
                    out.push(SEPARATOR);
                }
                out.push_str(truncate_at_boundary(segment, budget));
            }
            break;
        }
        out
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(MAX_PATH_LEN))
    }
}

impl From<&str> for PathKey {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

fn truncate_at_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
