//! Per-folder colors and icons for a content browser.
//!
//! A [`FolderTintSession`] owns everything for one open project: the saved
//! customizations, the queue of folder changes reported by the host, the
//! overlay that turns customizations into decorations, and the context menu
//! commands. The host talks to it through the traits in [`host`].

pub mod commands;
pub mod config;
pub mod host;
pub mod icons;
mod json;
pub mod logging;
pub mod overlay;
pub mod path_key;
pub mod persist;
pub mod presets;
pub mod reconciler;
pub mod record;
pub mod save_scheduler;
mod session;
pub mod store;
pub mod vfs_host;

pub use commands::{CommandArg, CommandError, CommandOutcome, CommandTable, MenuEntry, MenuSection};
pub use config::{ConfigError, FolderTintConfig, PresetConfig};
pub use host::{
    BrowserAdapter, FolderHost, Notification, NotificationLevel, VisibleFolder, ADAPTER_VERSION,
};
pub use icons::IconCatalog;
pub use overlay::{Decoration, OverlayBridge};
pub use path_key::{normalize, PathKey};
pub use persist::{
    DiskStoreFile, ErrorClass, LoadWarning, MemoryStoreFile, PersistError, StoreFile,
    WriteDurability,
};
pub use reconciler::{FolderEvent, FolderEventSender, ReconcileReport};
pub use record::{CustomizationRecord, FolderState, IconId, NameStyle, Rgba};
pub use session::{FolderTintSession, SessionError};
pub use store::CustomizationStore;
pub use vfs_host::VfsFolderHost;
