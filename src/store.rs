//! The in-memory map from folder keys to their customization.

use std::collections::{hash_map, HashMap};

use crate::{path_key::PathKey, record::CustomizationRecord};

/// Holds every folder customization for one project session.
///
/// Writes that change nothing leave the store untouched. Every effective
/// write marks the store dirty and bumps its generation, which readers use
/// to invalidate anything they derived from an older state.
#[derive(Debug, Default)]
pub struct CustomizationStore {
    records: HashMap<PathKey, CustomizationRecord>,
    dirty: bool,
    generation: u64,
}

impl CustomizationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from already-validated records. The result is clean.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (PathKey, CustomizationRecord)>,
    {
        let records = records
            .into_iter()
            .map(|(key, record)| (key, record.pruned()))
            .filter(|(_, record)| !record.is_empty())
            .collect();

        Self {
            records,
            dirty: false,
            generation: 0,
        }
    }

    pub fn get(&self, key: &PathKey) -> Option<&CustomizationRecord> {
        self.records.get(key)
    }

    /// Upserts the record for `key`. An empty record removes the entry.
    ///
    /// Returns whether the store changed.
    pub fn set(&mut self, key: PathKey, record: CustomizationRecord) -> bool {
        let record = record.pruned();

        if record.is_empty() {
            return self.remove(&key).is_some();
        }

        match self.records.entry(key) {
            hash_map::Entry::Occupied(mut entry) => {
                if *entry.get() == record {
                    return false;
                }
                entry.insert(record);
            }
            hash_map::Entry::Vacant(entry) => {
                entry.insert(record);
            }
        }

        self.touch();
        true
    }

    pub fn remove(&mut self, key: &PathKey) -> Option<CustomizationRecord> {
        let removed = self.records.remove(key);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Applies `change` to the record at `key` (starting from an empty record
    /// if there is none) and stores the result through [`set`](Self::set).
    pub fn update<F>(&mut self, key: &PathKey, change: F) -> bool
    where
        F: FnOnce(&mut CustomizationRecord),
    {
        let mut record = self.records.get(key).cloned().unwrap_or_default();
        change(&mut record);
        self.set(key.clone(), record)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathKey, &CustomizationRecord)> {
        self.records.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &PathKey> {
        self.records.keys()
    }

    /// Keys strictly below `ancestor`, sorted.
    pub fn keys_under(&self, ancestor: &PathKey) -> Vec<PathKey> {
        let mut keys: Vec<PathKey> = self
            .records
            .keys()
            .filter(|key| key.is_descendant_of(ancestor))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Swaps in a freshly loaded set of records. The store ends up clean but
    /// with a new generation so cached lookups are discarded.
    pub fn replace_all(&mut self, loaded: CustomizationStore) {
        self.records = loaded.records;
        self.dirty = false;
        self.generation += 1;
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.generation += 1;
    }
}
