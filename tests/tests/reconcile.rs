use foldertint::{normalize, FolderEvent, IconId, Rgba};
use pretty_assertions::assert_eq;

use crate::foldertint_test::project_util::{TestHost, TestProject};

const RED: Rgba = Rgba::opaque(0xFF, 0, 0);
const GREEN: Rgba = Rgba::opaque(0, 0xFF, 0);

fn renamed(from: &str, to: &str) -> FolderEvent {
    FolderEvent::Renamed {
        from: normalize(from),
        to: normalize(to),
    }
}

#[test]
fn customization_follows_a_renamed_parent() {
    let project = TestProject::new();
    let host = TestHost::with_folders(&["/A/B"]);
    let mut session = project.open(host);

    session.set_color("/A/B", RED).unwrap();

    session.host().remove("/A");
    session.host().add("/X/B");
    session.on_folder_event(renamed("/A", "/X"));

    assert_eq!(session.get("/A/B"), None);
    assert_eq!(session.get("/X/B").and_then(|r| r.color), Some(RED));
    assert_eq!(session.effective("/X/B").color, Some(RED));

    session.shutdown().unwrap();
    assert_eq!(
        project.read_store(),
        serde_json::json!({
            "version": 1,
            "folders": { "/x/b": { "color": "#FF0000FF" } }
        })
    );
}

#[test]
fn moves_and_renames_apply_in_order() {
    let project = TestProject::new();
    let mut session = project.open(TestHost::with_folders(&["/Game/Old", "/Game/Archive"]));

    session.set_color("/Game/Old", GREEN).unwrap();

    let sender = session.event_sender();
    sender.send(renamed("/Game/Old", "/Game/New"));
    sender.send(FolderEvent::Moved {
        from: normalize("/Game/New"),
        to: normalize("/Game/Archive/New"),
    });

    let keys: Vec<String> = session.store().keys().map(|key| key.to_string()).collect();
    assert_eq!(keys, vec!["/game/archive/new"]);
}

#[test]
fn deleting_a_parent_drops_every_descendant() {
    let project = TestProject::new();
    let mut session = project.open(TestHost::with_folders(&[
        "/Game/Maps/Arena",
        "/Game/Maps/Lobby",
        "/Game/Mapsuite",
    ]));

    session.set_color("/Game/Maps/Arena", RED).unwrap();
    session.set_icon("/Game/Maps/Lobby", IconId::new("Default")).unwrap();
    session.set_color("/Game/Mapsuite", GREEN).unwrap();

    session.on_folder_event(FolderEvent::Deleted(normalize("/Game/Maps")));

    let keys: Vec<String> = session.store().keys().map(|key| key.to_string()).collect();
    assert_eq!(keys, vec!["/game/mapsuite"]);
}

#[test]
fn folders_removed_while_closed_are_swept_on_open() {
    let project = TestProject::new();

    {
        let mut session = project.open(TestHost::with_folders(&["/Game/Kept", "/Game/Gone"]));
        session.set_color("/Game/Kept", RED).unwrap();
        session.set_color("/Game/Gone", GREEN).unwrap();
        session.shutdown().unwrap();
    }

    let mut session = project.open(TestHost::with_folders(&["/Game/Kept"]));
    let keys: Vec<String> = session.store().keys().map(|key| key.to_string()).collect();
    assert_eq!(keys, vec!["/game/kept"]);

    // The sweep itself counts as a change worth saving.
    session.shutdown().unwrap();
    assert_eq!(
        project.read_store()["folders"]
            .as_object()
            .map(|folders| folders.len()),
        Some(1)
    );
}

#[test]
fn explicit_sweep_catches_folders_removed_while_open() {
    let project = TestProject::new();
    let mut session = project.open(TestHost::with_folders(&["/Game/Maps", "/Game/Audio"]));

    session.set_color("/Game/Maps", RED).unwrap();
    session.set_color("/Game/Audio", GREEN).unwrap();

    session.host().remove("/Game/Audio");
    assert_eq!(session.sweep_stale(), 1);
    assert!(session.get("/Game/Audio").is_none());
    assert_eq!(session.get("/Game/Maps").and_then(|r| r.color), Some(RED));
}
