//! A [`FolderHost`] backed by a `memofs` virtual file system.
//!
//! Virtual roots such as `/Game` are mounted onto real directories, for
//! example `<project>/Content`. Folder identity is case-insensitive like the
//! rest of the plugin, so lookups walk the directory tree and compare names
//! without case.

use std::{
    collections::VecDeque,
    path::{Component, Path, PathBuf},
    sync::{Arc, Mutex},
};

use crossbeam_channel::Receiver;
use memofs::{IoResultExt, Vfs, VfsEvent};

use crate::{
    host::{FolderHost, Notification, NotificationLevel},
    path_key::{normalize, PathKey},
    reconciler::{FolderEvent, FolderEventSender},
};

/// Notifications kept for [`VfsFolderHost::take_notifications`]. Older ones
/// are dropped once this many are waiting; they are still in the log.
pub const MAX_PENDING_NOTIFICATIONS: usize = 64;

struct Mount {
    root: PathKey,
    dir: PathBuf,
}

pub struct VfsFolderHost {
    vfs: Arc<Vfs>,
    mounts: Vec<Mount>,
    events: Receiver<VfsEvent>,
    notifications: Mutex<VecDeque<Notification>>,
}

impl VfsFolderHost {
    /// `mounts` pairs a virtual root like `/Game` with the directory that
    /// backs it.
    pub fn new<I>(vfs: Arc<Vfs>, mounts: I) -> Self
    where
        I: IntoIterator<Item = (String, PathBuf)>,
    {
        let mounts = mounts
            .into_iter()
            .map(|(root, dir)| Mount {
                root: normalize(&root),
                dir,
            })
            .collect();

        let events = vfs.event_receiver();

        Self {
            vfs,
            mounts,
            events,
            notifications: Mutex::new(VecDeque::new()),
        }
    }

    pub fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    /// Notifications raised since the last call, oldest first. At most
    /// [`MAX_PENDING_NOTIFICATIONS`] are kept between calls.
    pub fn take_notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().drain(..).collect()
    }

    /// The directory backing `key`, if the folder exists.
    pub fn resolve(&self, key: &PathKey) -> Option<PathBuf> {
        let mount = self
            .mounts
            .iter()
            .find(|mount| key == &mount.root || key.is_descendant_of(&mount.root))?;

        let mut current = mount.dir.clone();
        if !self.is_dir(&current) {
            return None;
        }

        let relative = &key.as_str()[mount.root.as_str().len()..];
        for segment in relative.split('/').filter(|segment| !segment.is_empty()) {
            current = self.find_child_dir(&current, segment)?;
        }

        Some(current)
    }

    /// The key for a path inside one of the mounted directories.
    pub fn key_for_path(&self, path: &Path) -> Option<PathKey> {
        self.mounts.iter().find_map(|mount| {
            let relative = path.strip_prefix(&mount.dir).ok()?;

            let mut key = mount.root.clone();
            for component in relative.components() {
                match component {
                    Component::Normal(name) => key = key.join(&name.to_string_lossy()),
                    _ => return None,
                }
            }
            Some(key)
        })
    }

    /// Turns a file system event into a folder event. Writes and events for
    /// files are ignored. Removals can't be checked against the disk anymore
    /// and are always reported.
    pub fn translate_event(&self, event: &VfsEvent) -> Option<FolderEvent> {
        match event {
            VfsEvent::Create(path) => {
                let key = self.key_for_path(path)?;
                self.is_dir(path).then_some(FolderEvent::Created(key))
            }
            VfsEvent::Remove(path) => self.key_for_path(path).map(FolderEvent::Deleted),
            _ => None,
        }
    }

    /// Applies every file system event received so far to the VFS and
    /// forwards the folder events among them. Returns how many were
    /// forwarded.
    pub fn pump_events(&self, sender: &FolderEventSender) -> usize {
        let mut forwarded = 0;

        for event in self.events.try_iter() {
            log::trace!("VFS event: {:?}", event);

            if let Err(err) = self.vfs.commit_event(&event) {
                log::warn!("Could not apply file system change: {}", err);
                continue;
            }

            if let Some(folder_event) = self.translate_event(&event) {
                sender.send(folder_event);
                forwarded += 1;
            }
        }

        forwarded
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(
            self.vfs.metadata(path).with_not_found(),
            Ok(Some(metadata)) if metadata.is_dir()
        )
    }

    fn find_child_dir(&self, parent: &Path, name: &str) -> Option<PathBuf> {
        let exact = parent.join(name);
        if self.is_dir(&exact) {
            return Some(exact);
        }

        let entries = match self.vfs.read_dir(parent) {
            Ok(entries) => entries,
            Err(err) => {
                log::debug!("Could not list {}: {}", parent.display(), err);
                return None;
            }
        };

        entries.filter_map(Result::ok).find_map(|entry| {
            let path = entry.path();
            let matches = path
                .file_name()
                .is_some_and(|file_name| file_name.to_string_lossy().to_lowercase() == name);

            (matches && self.is_dir(path)).then(|| path.to_path_buf())
        })
    }

    fn collect_dirs(&self, dir: &Path, key: &PathKey, out: &mut Vec<PathKey>) {
        let entries = match self.vfs.read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                log::debug!("Could not list {}: {}", dir.display(), err);
                return;
            }
        };

        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if !self.is_dir(path) {
                continue;
            }

            if let Some(name) = path.file_name() {
                let child = key.join(&name.to_string_lossy());
                self.collect_dirs(path, &child, out);
                out.push(child);
            }
        }
    }
}

impl FolderHost for VfsFolderHost {
    fn folder_exists(&self, key: &PathKey) -> bool {
        if key.is_root() {
            return true;
        }

        // Ancestors of a mount root, like `/engine` for `/engine/content`,
        // exist as long as the mount does.
        let above_mount = self
            .mounts
            .iter()
            .any(|mount| mount.root.is_descendant_of(key) && self.is_dir(&mount.dir));

        above_mount || self.resolve(key).is_some()
    }

    fn enumerate_folders(&self) -> Vec<PathKey> {
        let mut folders = Vec::new();

        for mount in &self.mounts {
            if !self.is_dir(&mount.dir) {
                continue;
            }
            folders.push(mount.root.clone());
            self.collect_dirs(&mount.dir, &mount.root, &mut folders);
        }

        folders.sort();
        folders.dedup();
        folders
    }

    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Info => log::info!("{}", notification),
            NotificationLevel::Warning => log::warn!("{}", notification),
            NotificationLevel::Error => log::error!("{}", notification),
        }

        let mut pending = self.notifications.lock().unwrap();
        if pending.len() == MAX_PENDING_NOTIFICATIONS {
            pending.pop_front();
        }
        pending.push_back(notification);
    }
}
