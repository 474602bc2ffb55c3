//! The boundary between the plugin and the host editor.
//!
//! Everything the plugin needs from the host goes through the two traits in
//! this module. When the host API drifts, only the implementations of these
//! traits need to change; bump [`ADAPTER_VERSION`] whenever the traits do.

use std::fmt;

use crate::{overlay::Decoration, path_key::PathKey, record::FolderState};

/// Version of the adapter traits below. Hosts compiled against a different
/// version must be updated before they can load the plugin.
pub const ADAPTER_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// A message meant for the user, usually shown as a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Queries against the host's virtual folder tree.
pub trait FolderHost {
    fn folder_exists(&self, key: &PathKey) -> bool;

    /// Every folder currently in the virtual tree.
    fn enumerate_folders(&self) -> Vec<PathKey>;

    /// Shows `notification` to the user and records it in the host log.
    fn notify(&self, notification: Notification);
}

/// A folder entry currently drawn by one of the browser's views.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisibleFolder {
    /// The path as the widget reports it, virtual prefix included.
    pub virtual_path: String,
    pub state: FolderState,
}

impl VisibleFolder {
    pub fn new(virtual_path: impl Into<String>, state: FolderState) -> Self {
        Self {
            virtual_path: virtual_path.into(),
            state,
        }
    }
}

/// The browser's tree and grid views.
pub trait BrowserAdapter {
    fn visible_folders(&self) -> Vec<VisibleFolder>;

    /// Replaces whatever decoration `folder` currently shows.
    fn apply_decoration(&mut self, folder: &VisibleFolder, decoration: &Decoration);
}

/// Strips the browser's synthetic virtual prefix, turning `/All/Game/Maps`
/// into `/Game/Maps`. Paths without the prefix are returned unchanged. The
/// comparison ignores case and respects segment boundaries.
pub fn to_invariant_path<'a>(virtual_path: &'a str, prefix: &str) -> &'a str {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() || virtual_path.len() < prefix.len() {
        return virtual_path;
    }

    let (head, rest) = virtual_path.split_at(
        // A multi-byte char straddling the prefix length can't match anyway.
        if virtual_path.is_char_boundary(prefix.len()) {
            prefix.len()
        } else {
            return virtual_path;
        },
    );

    if !head.eq_ignore_ascii_case(prefix) {
        return virtual_path;
    }

    if rest.is_empty() {
        "/"
    } else if rest.starts_with('/') {
        rest
    } else {
        virtual_path
    }
}
