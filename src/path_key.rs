//! Canonical lookup keys for virtual folders.
//!
//! The host reports folder paths in whatever shape the calling widget had on
//! hand: mixed separators, trailing slashes, inconsistent casing. Folder
//! identity in the host is case-insensitive, so everything is folded into a
//! single lowercase, `/`-separated form before it touches the store:
//!
//! - `\` is treated as `/` and repeated separators collapse
//! - `.` segments are dropped, `..` pops the previous segment (never above root)
//! - the key always starts with `/` and never ends with one, except the root `/`

use std::fmt;

use serde::Serialize;

/// A normalized folder path. Two paths naming the same folder always produce
/// equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PathKey(String);

/// Normalizes a raw virtual folder path into a [`PathKey`].
///
/// Total and idempotent: `normalize(normalize(p).as_str()) == normalize(p)`.
pub fn normalize(raw: &str) -> PathKey {
    let mut segments: Vec<String> = Vec::new();

    for segment in raw.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_lowercase()),
        }
    }

    if segments.is_empty() {
        return PathKey::root();
    }

    let mut key = String::with_capacity(raw.len() + 1);
    for segment in &segments {
        key.push('/');
        key.push_str(segment);
    }

    PathKey(key)
}

impl PathKey {
    pub fn root() -> Self {
        PathKey("/".to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// The last path segment, or an empty string for the root.
    pub fn name(&self) -> &str {
        match self.0.rfind('/') {
            Some(index) => &self.0[index + 1..],
            None => &self.0,
        }
    }

    pub fn parent(&self) -> Option<PathKey> {
        if self.is_root() {
            return None;
        }

        match self.0.rfind('/') {
            Some(0) | None => Some(PathKey::root()),
            Some(index) => Some(PathKey(self.0[..index].to_owned())),
        }
    }

    /// Iterates over every ancestor of this key, nearest first. The root is
    /// yielded last. The key itself is not included.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            next: self.parent(),
        }
    }

    /// Returns true if `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &PathKey) -> bool {
        if self == ancestor {
            return false;
        }

        if ancestor.is_root() {
            return true;
        }

        self.0.starts_with(&ancestor.0) && self.0.as_bytes().get(ancestor.0.len()) == Some(&b'/')
    }

    /// Rewrites this key as if the folder `from` had been renamed to `to`.
    /// Returns `None` when this key is neither `from` nor below it.
    pub fn reprefix(&self, from: &PathKey, to: &PathKey) -> Option<PathKey> {
        if self == from {
            return Some(to.clone());
        }

        if !self.is_descendant_of(from) {
            return None;
        }

        let suffix = if from.is_root() {
            &self.0[..]
        } else {
            &self.0[from.0.len()..]
        };

        if to.is_root() {
            Some(PathKey(suffix.to_owned()))
        } else {
            Some(PathKey(format!("{}{}", to.0, suffix)))
        }
    }

    pub fn join(&self, child: &str) -> PathKey {
        normalize(&format!("{}/{}", self.0, child))
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PathKey {
    fn from(raw: &str) -> Self {
        normalize(raw)
    }
}

impl AsRef<str> for PathKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub struct Ancestors {
    next: Option<PathKey>,
}

impl Iterator for Ancestors {
    type Item = PathKey;

    fn next(&mut self) -> Option<PathKey> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}
