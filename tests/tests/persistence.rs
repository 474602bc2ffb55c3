use std::{collections::BTreeMap, sync::Arc, thread, time::Duration};

use foldertint::{
    CustomizationRecord, FolderTintConfig, FolderTintSession, IconCatalog, IconId,
    MemoryStoreFile, NameStyle, Rgba,
};
use pretty_assertions::assert_eq;

use crate::foldertint_test::project_util::{TestHost, TestProject};

const RED: Rgba = Rgba::opaque(0xFF, 0, 0);
const BLUE: Rgba = Rgba::opaque(0, 0, 0xFF);

fn snapshot(session: &mut FolderTintSession<TestHost>) -> BTreeMap<String, CustomizationRecord> {
    session
        .store()
        .iter()
        .map(|(key, record)| (key.to_string(), record.clone()))
        .collect()
}

#[test]
fn save_then_load_reproduces_the_store() {
    let project = TestProject::new();
    project.make_icons(&["Maps"]);
    let folders = ["/Game/Maps", "/Game/Audio", "/Game/Audio/Music"];

    let mut session = project.open(TestHost::with_folders(&folders));
    session.set_color("/Game/Maps", RED).unwrap();
    session.set_icon("/Game/Maps", IconId::new("Maps")).unwrap();
    session.set_color("/Game/Audio", BLUE).unwrap();
    session.set_applies_to_subfolders("/Game/Audio", true).unwrap();
    session
        .set_name_style(
            "/Game/Audio/Music",
            NameStyle {
                bold: true,
                italic: false,
            },
        )
        .unwrap();

    let before = snapshot(&mut session);
    session.shutdown().unwrap();

    let mut reopened = project.open(TestHost::with_folders(&folders));
    assert_eq!(snapshot(&mut reopened), before);
    assert!(reopened.host().notifications().is_empty());
}

#[test]
fn saved_file_has_the_documented_shape() {
    let project = TestProject::new();
    let mut session = project.open(TestHost::with_folders(&["/Game/Maps"]));

    session.set_color("/Game/Maps", RED).unwrap();
    session.set_applies_to_subfolders("/Game/Maps", true).unwrap();
    session.shutdown().unwrap();

    assert_eq!(
        project.read_store(),
        serde_json::json!({
            "version": 1,
            "folders": {
                "/game/maps": { "color": "#FF0000FF", "appliesToSubfolders": true }
            }
        })
    );
}

#[test]
fn dropping_the_session_saves() {
    let project = TestProject::new();

    {
        let mut session = project.open(TestHost::with_folders(&["/Game"]));
        session.set_color("/Game", BLUE).unwrap();
    }

    let mut reopened = project.open(TestHost::with_folders(&["/Game"]));
    assert_eq!(reopened.get("/Game").and_then(|r| r.color), Some(BLUE));
}

#[test]
fn one_malformed_entry_among_ten() {
    let project = TestProject::new();

    let mut folders = serde_json::Map::new();
    let mut paths = Vec::new();
    for i in 0..10 {
        let path = format!("/game/folder{}", i);
        let color = if i == 4 { "not a color" } else { "#00FF00FF" };
        folders.insert(path.clone(), serde_json::json!({ "color": color }));
        paths.push(path);
    }
    project.write_store(
        &serde_json::json!({ "version": 1, "folders": folders }).to_string(),
    );

    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let mut session = project.open(TestHost::with_folders(&path_refs));

    assert_eq!(session.store().len(), 9);
    assert!(session.get("/game/folder4").is_none());
    assert_eq!(session.host().notifications().len(), 1);
    assert_eq!(session.host().messages_containing("1 folder customization problem"), 1);
}

#[test]
fn unknown_fields_and_newer_versions_still_load() {
    let project = TestProject::new();
    project.write_store(
        r##"{
            "version": 2,
            "exportedBy": "a future release",
            "folders": {
                "/Game/Maps/": { "color": "#FF0000", "glow": true }
            }
        }"##,
    );

    let mut session = project.open(TestHost::with_folders(&["/Game/Maps"]));

    assert_eq!(session.get("/game/maps").and_then(|r| r.color), Some(RED));
    assert_eq!(session.host().notifications().len(), 1);
}

#[test]
fn garbage_file_starts_empty_with_one_warning() {
    let project = TestProject::new();
    project.write_store("{ this is not json");

    let mut session = project.open(TestHost::with_folders(&["/Game"]));

    assert!(session.store().is_empty());
    assert_eq!(session.host().notifications().len(), 1);
}

#[test]
fn two_saves_before_a_write_make_one_write() {
    let file = Arc::new(MemoryStoreFile::new());
    let mut session = FolderTintSession::open_with(
        None,
        FolderTintConfig::default(),
        TestHost::with_folders(&["/A"]),
        file.clone(),
        IconCatalog::default(),
    );

    session.set_color("/A", RED).unwrap();
    session.set_color("/A", BLUE).unwrap();
    session.tick();
    session.shutdown().unwrap();

    assert_eq!(file.write_count(), 1);

    let saved: serde_json::Value = serde_json::from_slice(&file.contents().unwrap()).unwrap();
    assert_eq!(saved["folders"]["/a"]["color"], "#0000FFFF");
}

#[test]
fn unwritable_store_falls_back_to_memory_with_one_warning() {
    let project = TestProject::new();
    fs_err::write(project.path().join("Blocker"), "a file, not a directory").unwrap();
    project.write_config(r#"{ storePath: "Blocker/folders.json" }"#);

    let mut session = project.open(TestHost::with_folders(&["/Game", "/Game/Maps"]));
    session.set_color("/Game", RED).unwrap();

    for _ in 0..500 {
        session.tick();
        if session.is_memory_only() {
            break;
        }
        thread::sleep(Duration::from_millis(2));
    }
    assert!(session.is_memory_only());

    session.set_color("/Game/Maps", BLUE).unwrap();
    session.tick();
    session.tick();

    assert_eq!(session.effective("/Game").color, Some(RED));
    assert_eq!(session.effective("/Game/Maps").color, Some(BLUE));
    assert_eq!(session.host().messages_containing("won't be saved"), 1);
    session.shutdown().unwrap();
}
