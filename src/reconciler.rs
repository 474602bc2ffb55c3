//! Keeps stored keys in step with folders that change outside the plugin.
//!
//! The host tells us about folder lifecycle changes after the fact. Each
//! change is turned into a pending `(old, new)` pair, where `new` is `None`
//! for a deletion, and the queue is drained in arrival order before anything
//! reads the store again.
//!
//! Descendant folders always travel with their parent: a rename or move
//! re-prefixes every key below the old path, and a delete removes every key
//! below it, whether or not the parent itself had a record.

use std::collections::VecDeque;

use crossbeam_channel::{Receiver, Sender};

use crate::{host::FolderHost, path_key::PathKey, store::CustomizationStore};

/// A folder lifecycle notification from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderEvent {
    Created(PathKey),
    Renamed { from: PathKey, to: PathKey },
    Moved { from: PathKey, to: PathKey },
    Deleted(PathKey),
}

/// One queued rewrite. `new` is `None` when the folder is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReconciliation {
    pub old: PathKey,
    pub new: Option<PathKey>,
}

/// What a drain pass did to the store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub processed: usize,
    pub moved: usize,
    pub removed: usize,
}

impl ReconcileReport {
    pub fn changed_store(&self) -> bool {
        self.moved > 0 || self.removed > 0
    }
}

/// Cloneable handle hosts use to deliver folder events from any thread.
#[derive(Debug, Clone)]
pub struct FolderEventSender {
    sender: Sender<FolderEvent>,
}

impl FolderEventSender {
    pub fn send(&self, event: FolderEvent) {
        if self.sender.send(event).is_err() {
            log::debug!("Folder event dropped: session already closed");
        }
    }
}

pub struct Reconciler {
    pending: VecDeque<PendingReconciliation>,
    incoming_sender: Sender<FolderEvent>,
    incoming: Receiver<FolderEvent>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        let (incoming_sender, incoming) = crossbeam_channel::unbounded();

        Self {
            pending: VecDeque::new(),
            incoming_sender,
            incoming,
        }
    }

    pub fn sender(&self) -> FolderEventSender {
        FolderEventSender {
            sender: self.incoming_sender.clone(),
        }
    }

    /// Queues an event. Anything already waiting on the channel is queued
    /// first so arrival order is kept across both entry points.
    pub fn enqueue(&mut self, event: FolderEvent) {
        self.collect_incoming();
        self.push_event(event);
    }

    /// Queues a removal for a key whose folder no longer exists.
    pub fn schedule_removal(&mut self, key: PathKey) {
        self.collect_incoming();
        self.pending.push_back(PendingReconciliation {
            old: key,
            new: None,
        });
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty() || !self.incoming.is_empty()
    }

    /// Queues a removal for every stored key the host no longer knows about.
    /// Returns how many were queued.
    pub fn sweep_stale(&mut self, store: &CustomizationStore, host: &dyn FolderHost) -> usize {
        let mut stale: Vec<PathKey> = store
            .keys()
            .filter(|key| !host.folder_exists(key))
            .cloned()
            .collect();
        stale.sort();

        for key in &stale {
            log::debug!("Folder {} no longer exists, scheduling removal", key);
        }

        let count = stale.len();
        for key in stale {
            self.schedule_removal(key);
        }
        count
    }

    /// Applies every queued rewrite to `store`, oldest first.
    pub fn drain(&mut self, store: &mut CustomizationStore) -> ReconcileReport {
        self.collect_incoming();

        let mut report = ReconcileReport::default();

        while let Some(pending) = self.pending.pop_front() {
            report.processed += 1;

            match pending.new {
                Some(new) => report.moved += apply_rename(store, &pending.old, &new),
                None => report.removed += apply_delete(store, &pending.old),
            }
        }

        if report.changed_store() {
            log::info!(
                "Reconciled {} folder event(s): {} moved, {} removed",
                report.processed,
                report.moved,
                report.removed
            );
        }

        report
    }

    fn collect_incoming(&mut self) {
        while let Ok(event) = self.incoming.try_recv() {
            self.push_event(event);
        }
    }

    fn push_event(&mut self, event: FolderEvent) {
        match event {
            FolderEvent::Created(path) => {
                log::trace!("Folder created: {}", path);
            }
            FolderEvent::Renamed { from, to } | FolderEvent::Moved { from, to } => {
                log::trace!("Folder moved: {} -> {}", from, to);
                self.pending.push_back(PendingReconciliation {
                    old: from,
                    new: Some(to),
                });
            }
            FolderEvent::Deleted(path) => {
                log::trace!("Folder deleted: {}", path);
                self.pending.push_back(PendingReconciliation {
                    old: path,
                    new: None,
                });
            }
        }
    }
}

fn apply_rename(store: &mut CustomizationStore, from: &PathKey, to: &PathKey) -> usize {
    if from == to {
        return 0;
    }

    if to.is_descendant_of(from) {
        log::warn!(
            "Ignoring move of folder {} into its own subfolder {}",
            from,
            to
        );
        return 0;
    }

    let mut affected = Vec::new();
    if store.get(from).is_some() {
        affected.push(from.clone());
    }
    affected.extend(store.keys_under(from));

    // Take everything out before writing anything back so a destination
    // inside the moved set can't be clobbered mid-way.
    let mut moved = Vec::with_capacity(affected.len());
    for old_key in affected {
        let Some(new_key) = old_key.reprefix(from, to) else {
            continue;
        };
        if let Some(record) = store.remove(&old_key) {
            moved.push((new_key, record));
        }
    }

    let count = moved.len();
    for (new_key, record) in moved {
        if store.get(&new_key).is_some() {
            log::debug!("Moved customization replaces existing entry at {}", new_key);
        }
        store.set(new_key, record);
    }

    count
}

fn apply_delete(store: &mut CustomizationStore, path: &PathKey) -> usize {
    let mut removed = usize::from(store.remove(path).is_some());

    for key in store.keys_under(path) {
        if store.remove(&key).is_some() {
            removed += 1;
        }
    }

    removed
}
