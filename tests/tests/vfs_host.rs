use std::{path::Path, sync::Arc};

use foldertint::{
    normalize, FolderEvent, FolderHost, FolderTintConfig, FolderTintSession, Rgba, VfsFolderHost,
};
use memofs::{Vfs, VfsEvent};
use pretty_assertions::assert_eq;

use crate::foldertint_test::project_util::TestProject;

const RED: Rgba = Rgba::opaque(0xFF, 0, 0);

fn make_dirs(root: &Path, dirs: &[&str]) {
    for dir in dirs {
        fs_err::create_dir_all(root.join(dir)).unwrap();
    }
}

fn disk_host(project: &TestProject) -> VfsFolderHost {
    let vfs = Vfs::new_default();
    vfs.set_watch_enabled(false);

    let config = FolderTintConfig::default();
    VfsFolderHost::new(Arc::new(vfs), config.mount_dirs(project.path()))
}

#[test]
fn enumerates_folders_on_disk() {
    let project = TestProject::new();
    make_dirs(project.path(), &["Content/Maps/Arena", "Content/Audio"]);
    fs_err::write(project.path().join("Content/Maps/Arena.umap"), "map").unwrap();

    let host = disk_host(&project);
    let folders: Vec<String> = host
        .enumerate_folders()
        .iter()
        .map(|key| key.to_string())
        .collect();

    assert_eq!(
        folders,
        vec!["/game", "/game/audio", "/game/maps", "/game/maps/arena"]
    );
    assert!(host.folder_exists(&normalize("/GAME/maps/ARENA")));
    assert!(!host.folder_exists(&normalize("/Game/Maps/Arena.umap")));
}

#[test]
fn session_on_disk_sweeps_missing_folders() {
    let project = TestProject::new();
    make_dirs(project.path(), &["Content/Maps", "Content/Audio"]);

    {
        let mut session = FolderTintSession::open(project.path(), disk_host(&project));
        session.set_color("/Game/Maps", RED).unwrap();
        session.set_color("/Game/Audio", RED).unwrap();
        session.shutdown().unwrap();
    }

    fs_err::remove_dir_all(project.path().join("Content/Audio")).unwrap();

    let mut session = FolderTintSession::open(project.path(), disk_host(&project));
    let keys: Vec<String> = session.store().keys().map(|key| key.to_string()).collect();
    assert_eq!(keys, vec!["/game/maps"]);
}

#[test]
fn removed_directories_become_folder_deletions() {
    let project = TestProject::new();
    make_dirs(project.path(), &["Content/Maps/Arena"]);

    let host = disk_host(&project);
    let content = project.path().join("Content");

    assert_eq!(
        host.translate_event(&VfsEvent::Remove(content.join("Maps"))),
        Some(FolderEvent::Deleted(normalize("/Game/Maps")))
    );
    assert_eq!(
        host.translate_event(&VfsEvent::Create(content.join("Maps/Arena"))),
        Some(FolderEvent::Created(normalize("/Game/Maps/Arena")))
    );
    assert_eq!(
        host.translate_event(&VfsEvent::Remove(project.path().join("Saved"))),
        None
    );
}
