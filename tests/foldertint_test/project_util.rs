use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::Mutex,
};

use tempfile::{tempdir, TempDir};

use foldertint::{
    normalize, BrowserAdapter, Decoration, FolderHost, FolderTintConfig, FolderTintSession,
    Notification, PathKey, VisibleFolder,
};

/// A host whose folder tree is a plain set of keys that tests edit directly.
#[derive(Default)]
pub struct TestHost {
    folders: Mutex<BTreeSet<PathKey>>,
    notifications: Mutex<Vec<Notification>>,
}

impl TestHost {
    pub fn with_folders(paths: &[&str]) -> Self {
        let host = Self::default();
        for path in paths {
            host.add(path);
        }
        host
    }

    pub fn add(&self, path: &str) {
        let key = normalize(path);
        let mut folders = self.folders.lock().unwrap();
        folders.extend(key.ancestors().filter(|ancestor| !ancestor.is_root()));
        folders.insert(key);
    }

    pub fn remove(&self, path: &str) {
        let key = normalize(path);
        self.folders
            .lock()
            .unwrap()
            .retain(|folder| folder != &key && !folder.is_descendant_of(&key));
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn messages_containing(&self, needle: &str) -> usize {
        self.notifications()
            .iter()
            .filter(|notification| notification.message.contains(needle))
            .count()
    }
}

impl FolderHost for TestHost {
    fn folder_exists(&self, key: &PathKey) -> bool {
        key.is_root() || self.folders.lock().unwrap().contains(key)
    }

    fn enumerate_folders(&self) -> Vec<PathKey> {
        self.folders.lock().unwrap().iter().cloned().collect()
    }

    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

/// Records every decoration it is asked to draw.
#[derive(Default)]
pub struct TestBrowser {
    pub visible: Vec<VisibleFolder>,
    pub drawn: Vec<(String, Decoration)>,
}

impl TestBrowser {
    pub fn showing(visible: Vec<VisibleFolder>) -> Self {
        Self {
            visible,
            drawn: Vec::new(),
        }
    }

    /// The most recent decoration drawn for `virtual_path`.
    pub fn last_drawn(&self, virtual_path: &str) -> Option<&Decoration> {
        self.drawn
            .iter()
            .rev()
            .find(|(path, _)| path == virtual_path)
            .map(|(_, decoration)| decoration)
    }
}

impl BrowserAdapter for TestBrowser {
    fn visible_folders(&self) -> Vec<VisibleFolder> {
        self.visible.clone()
    }

    fn apply_decoration(&mut self, folder: &VisibleFolder, decoration: &Decoration) {
        self.drawn
            .push((folder.virtual_path.clone(), decoration.clone()));
    }
}

/// A throwaway project directory.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: tempdir().expect("Couldn't create temporary project directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_config(&self, contents: &str) {
        write_creating_dirs(&FolderTintConfig::path_in(self.path()), contents);
    }

    pub fn store_path(&self) -> PathBuf {
        FolderTintConfig::default().store_file_path(self.path())
    }

    pub fn write_store(&self, contents: &str) {
        write_creating_dirs(&self.store_path(), contents);
    }

    pub fn read_store(&self) -> serde_json::Value {
        let contents = fs_err::read_to_string(self.store_path()).unwrap();
        serde_json::from_str(&contents).unwrap()
    }

    pub fn make_icons(&self, names: &[&str]) {
        let icons_dir = FolderTintConfig::default().icons_dir_path(self.path());
        for name in names {
            fs_err::create_dir_all(icons_dir.join(name)).unwrap();
        }
    }

    pub fn open(&self, host: TestHost) -> FolderTintSession<TestHost> {
        FolderTintSession::open(self.path(), host)
    }
}

fn write_creating_dirs(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent).unwrap();
    }
    fs_err::write(path, contents).unwrap();
}
