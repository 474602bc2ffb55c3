//! Reading and writing the per-project customization file.
//!
//! The file is a small JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "folders": {
//!     "/game/maps": { "color": "#FF0000FF", "icon": "Maps" }
//!   }
//! }
//! ```
//!
//! Loading never fails. A missing file is a first run, an unreadable file is
//! one warning and an empty store, and each malformed folder entry is one
//! warning and skipped. Writing goes through a temporary file in the same
//! directory that is renamed over the target, so a crash mid-write leaves
//! either the old file or the new one.

use std::{
    collections::{BTreeMap, HashMap},
    fmt, io,
    io::Write as _,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use memofs::IoResultExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    path_key::{normalize, PathKey},
    record::CustomizationRecord,
    store::CustomizationStore,
};

pub const STORE_FORMAT_VERSION: u32 = 1;

/// How hard a write tries to reach stable storage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WriteDurability {
    /// Temp file plus rename. No explicit sync.
    #[default]
    BestEffort,

    /// Also syncs the temp file's contents before renaming it into place.
    Durable,
}

/// How the session should react to a persistence failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Try again later; nothing is lost yet.
    Transient,
    /// The bytes themselves are bad.
    Data,
    /// Persistence is not possible for this session.
    Fatal,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error on store file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Store directory {} is not accessible", .path.display())]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not encode folder customizations")]
    Encode(#[from] serde_json::Error),

    #[error("The save thread stopped unexpectedly")]
    WriterGone,
}

impl PersistError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PersistError::Io { source, .. } => match source.kind() {
                io::ErrorKind::WouldBlock
                | io::ErrorKind::Interrupted
                | io::ErrorKind::TimedOut
                | io::ErrorKind::PermissionDenied
                | io::ErrorKind::ResourceBusy => ErrorClass::Transient,
                _ => ErrorClass::Fatal,
            },
            PersistError::DirectoryUnavailable { .. } | PersistError::WriterGone => {
                ErrorClass::Fatal
            }
            PersistError::Encode(_) => ErrorClass::Data,
        }
    }
}

/// A problem found while loading that did not stop the load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// The folder entry the warning is about, if it concerns a single entry.
    pub key: Option<String>,
    pub message: String,
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}: {}", key, self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub store: CustomizationStore,
    pub warnings: Vec<LoadWarning>,
}

#[derive(Serialize)]
struct PersistedStore<'a> {
    version: u32,
    folders: BTreeMap<&'a str, &'a CustomizationRecord>,
}

/// Serializes the store into the on-disk format. Keys are written sorted so
/// that unchanged stores produce identical bytes.
pub fn encode(store: &CustomizationStore) -> Result<Vec<u8>, PersistError> {
    let document = PersistedStore {
        version: STORE_FORMAT_VERSION,
        folders: store
            .iter()
            .map(|(key, record)| (key.as_str(), record))
            .collect(),
    };

    let mut bytes = serde_json::to_vec_pretty(&document)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parses the on-disk format, keeping every entry that decodes. Entries whose
/// keys normalize to the same folder keep the one that comes last in the
/// file.
pub fn decode(contents: &[u8], source: &str) -> LoadOutcome {
    let mut warnings = Vec::new();

    let document = match crate::json::value_from_slice(contents, source) {
        Ok(value) => value,
        Err(err) => {
            warnings.push(LoadWarning {
                key: None,
                message: format!("{:#}; starting with no folder customizations", err),
            });
            return LoadOutcome {
                store: CustomizationStore::new(),
                warnings,
            };
        }
    };

    let Some(document) = document.as_object() else {
        warnings.push(LoadWarning {
            key: None,
            message: format!("{}: expected a JSON object at the top level", source),
        });
        return LoadOutcome {
            store: CustomizationStore::new(),
            warnings,
        };
    };

    if let Some(version) = document.get("version").and_then(|v| v.as_u64()) {
        if version > u64::from(STORE_FORMAT_VERSION) {
            warnings.push(LoadWarning {
                key: None,
                message: format!(
                    "{} was written by a newer version (format {}, supported {}); \
                     reading what is understood",
                    source, version, STORE_FORMAT_VERSION
                ),
            });
        }
    }

    let folders = match document.get("folders") {
        None | Some(serde_json::Value::Null) => serde_json::Map::new(),
        Some(serde_json::Value::Object(folders)) => folders.clone(),
        Some(_) => {
            warnings.push(LoadWarning {
                key: None,
                message: format!("{}: \"folders\" is not an object", source),
            });
            serde_json::Map::new()
        }
    };

    let mut records: HashMap<PathKey, CustomizationRecord> = HashMap::new();

    for (raw_key, raw_record) in folders {
        if !raw_key.starts_with('/') {
            warnings.push(LoadWarning {
                key: Some(raw_key),
                message: "folder key must be an absolute virtual path".to_owned(),
            });
            continue;
        }

        let record = match CustomizationRecord::deserialize(raw_record) {
            Ok(record) => record,
            Err(err) => {
                warnings.push(LoadWarning {
                    key: Some(raw_key),
                    message: format!("skipped malformed entry: {}", err),
                });
                continue;
            }
        };

        let key = normalize(&raw_key);
        if records.insert(key.clone(), record).is_some() {
            warnings.push(LoadWarning {
                key: Some(raw_key),
                message: format!("duplicates another entry for {}; keeping this one", key),
            });
        }
    }

    LoadOutcome {
        store: CustomizationStore::from_records(records),
        warnings,
    }
}

/// The backing storage for one project's customization file.
pub trait StoreFile: Send + Sync {
    /// Human readable location, used in logs and notifications.
    fn describe(&self) -> String;

    /// Reads the whole file. `Ok(None)` means it does not exist yet.
    fn read(&self) -> Result<Option<Vec<u8>>, PersistError>;

    /// Replaces the whole file atomically.
    fn write(&self, contents: &[u8]) -> Result<(), PersistError>;
}

/// Loads the store through `file`, downgrading every failure to warnings.
pub fn load(file: &dyn StoreFile) -> LoadOutcome {
    match file.read() {
        Ok(Some(contents)) => decode(&contents, &file.describe()),
        Ok(None) => {
            log::debug!("No folder customizations at {} yet", file.describe());
            LoadOutcome {
                store: CustomizationStore::new(),
                warnings: Vec::new(),
            }
        }
        Err(err) => LoadOutcome {
            store: CustomizationStore::new(),
            warnings: vec![LoadWarning {
                key: None,
                message: format!("{}; starting with no folder customizations", err),
            }],
        },
    }
}

/// A customization file on the local disk.
#[derive(Debug, Clone)]
pub struct DiskStoreFile {
    path: PathBuf,
    durability: WriteDurability,
}

impl DiskStoreFile {
    pub fn new(path: impl Into<PathBuf>, durability: WriteDurability) -> Self {
        Self {
            path: path.into(),
            durability,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StoreFile for DiskStoreFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> Result<Option<Vec<u8>>, PersistError> {
        fs_err::read(&self.path)
            .with_not_found()
            .map_err(|source| self.io_error(source))
    }

    fn write(&self, contents: &[u8]) -> Result<(), PersistError> {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let unavailable = |source: io::Error| PersistError::DirectoryUnavailable {
            path: directory.clone(),
            source,
        };

        fs_err::create_dir_all(&directory).map_err(unavailable)?;

        // Dropping the temp file on any early return deletes it.
        let mut temp = tempfile::NamedTempFile::new_in(&directory).map_err(unavailable)?;

        temp.write_all(contents)
            .map_err(|source| self.io_error(source))?;
        temp.flush().map_err(|source| self.io_error(source))?;

        if self.durability == WriteDurability::Durable {
            temp.as_file()
                .sync_all()
                .map_err(|source| self.io_error(source))?;
        }

        temp.persist(&self.path)
            .map_err(|err| self.io_error(err.error))?;

        log::trace!("Wrote {} bytes to {}", contents.len(), self.path.display());
        Ok(())
    }
}

/// A customization "file" that only lives in memory. Used when the project
/// has no writable location and by tests.
#[derive(Debug, Default)]
pub struct MemoryStoreFile {
    contents: Mutex<Option<Vec<u8>>>,
    writes: AtomicUsize,
}

impl MemoryStoreFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<Vec<u8>>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of completed writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.contents.lock().unwrap().clone()
    }
}

impl StoreFile for MemoryStoreFile {
    fn describe(&self) -> String {
        "<memory>".to_owned()
    }

    fn read(&self) -> Result<Option<Vec<u8>>, PersistError> {
        Ok(self.contents.lock().unwrap().clone())
    }

    fn write(&self, contents: &[u8]) -> Result<(), PersistError> {
        *self.contents.lock().unwrap() = Some(contents.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
