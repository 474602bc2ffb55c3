use foldertint::{
    CommandArg, CommandError, FolderState, IconId, NameStyle, Rgba, SessionError, VisibleFolder,
};
use pretty_assertions::assert_eq;

use crate::foldertint_test::project_util::{TestBrowser, TestHost, TestProject};

const RED: Rgba = Rgba::opaque(0xFF, 0, 0);
const BLUE: Rgba = Rgba::opaque(0, 0, 0xFF);

#[test]
fn inherited_attributes_come_from_the_nearest_ancestor() {
    let project = TestProject::new();
    project.make_icons(&["Maps"]);
    let mut session = project.open(TestHost::with_folders(&["/Game/Maps/Arena/Props"]));

    session.set_color("/Game", RED).unwrap();
    session.set_applies_to_subfolders("/Game", true).unwrap();
    session.set_icon("/Game/Maps", IconId::new("Maps")).unwrap();
    session.set_color("/Game/Maps", BLUE).unwrap();
    session
        .set_name_style(
            "/Game/Maps/Arena",
            NameStyle {
                bold: true,
                italic: false,
            },
        )
        .unwrap();

    // Below /Game every record takes part, nearest first.
    let props = session.effective("/Game/Maps/Arena/Props");
    assert_eq!(props.color, Some(BLUE));
    assert_eq!(props.icon, Some(IconId::new("Maps")));
    assert_eq!(
        props.name_style,
        Some(NameStyle {
            bold: true,
            italic: false,
        })
    );
    assert!(!props.applies_to_subfolders);

    // Turning the flag off stops inheritance at once.
    session.set_applies_to_subfolders("/Game", false).unwrap();
    let props = session.effective("/Game/Maps/Arena/Props");
    assert_eq!(props.color, None);
    assert_eq!(props.icon, None);
    assert_eq!(props.name_style, None);
}

#[test]
fn subfolder_flag_survives_without_visual_attributes() {
    let project = TestProject::new();
    let mut session = project.open(TestHost::with_folders(&["/Game/Maps/Arena"]));

    session.set_color("/Game/Maps", RED).unwrap();
    session.set_applies_to_subfolders("/Game/Maps", true).unwrap();
    session.clear_color("/Game/Maps").unwrap();
    assert_eq!(
        session.get("/Game/Maps").map(|r| r.applies_to_subfolders),
        Some(true)
    );

    session.set_color("/Game/Maps", BLUE).unwrap();
    assert_eq!(session.effective("/Game/Maps/Arena").color, Some(BLUE));

    let outcome = session.set_applies_to_subfolders("/Game/Maps/Arena", true).unwrap();
    assert_eq!(outcome.changed, 1);
    assert!(session.host().notifications().is_empty());

    session.shutdown().unwrap();
    assert_eq!(
        project.read_store()["folders"]["/game/maps/arena"],
        serde_json::json!({ "appliesToSubfolders": true })
    );
}

#[test]
fn decorate_draws_visible_folders_once_per_change() {
    let project = TestProject::new();
    project.make_icons(&["Maps"]);
    let mut session = project.open(TestHost::with_folders(&["/Game/Maps", "/Game/Audio"]));

    session.set_icon("/Game/Maps", IconId::new("Maps")).unwrap();
    session.set_color("/Game/Maps", RED).unwrap();

    let mut browser = TestBrowser::showing(vec![
        VisibleFolder::new("/All/Game/Maps", FolderState::ColumnOpen),
        VisibleFolder::new("/All/Game/Audio", FolderState::Normal),
    ]);

    assert_eq!(session.decorate(&mut browser), 2);
    let maps = browser.last_drawn("/All/Game/Maps").unwrap();
    assert_eq!(maps.tint, Some(RED));
    assert_eq!(maps.icon_brush.as_deref(), Some("Maps.ColumnOpen"));
    assert!(browser.last_drawn("/All/Game/Audio").unwrap().is_plain());

    assert_eq!(session.decorate(&mut browser), 0);

    session.clear_color("/All/Game/Maps").unwrap();
    assert_eq!(session.decorate(&mut browser), 2);
    assert_eq!(browser.last_drawn("/All/Game/Maps").unwrap().tint, None);
}

#[test]
fn presets_from_config_color_matching_folders() {
    let project = TestProject::new();
    project.write_config(
        r##"{
            // Folder names are matched without case.
            folderPresets: [{ pattern: "^materials$", color: "#00FF00" }],
            pathPresets: [{ pattern: "^/game/maps(/|$)", icon: "Default" }],
        }"##,
    );

    let mut session = project.open(TestHost::with_folders(&[
        "/Game/Props/Materials",
        "/Game/Maps/Arena",
    ]));

    assert_eq!(
        session.effective("/Game/Props/Materials").color,
        Some(Rgba::opaque(0, 0xFF, 0))
    );
    assert_eq!(
        session.effective("/Game/Maps/Arena").icon,
        Some(IconId::new("Default"))
    );

    session.set_color("/Game/Props/Materials", RED).unwrap();
    assert_eq!(session.effective("/Game/Props/Materials").color, Some(RED));
    assert!(session.host().notifications().is_empty());
}

#[test]
fn broken_config_falls_back_to_defaults_with_a_warning() {
    let project = TestProject::new();
    project.write_config("{ storePath: ");

    let mut session = project.open(TestHost::with_folders(&["/Game"]));

    assert_eq!(session.config().virtual_prefix, "/All");
    assert_eq!(session.host().messages_containing("using defaults"), 1);

    session.set_color("/Game", RED).unwrap();
    session.shutdown().unwrap();
    assert_eq!(project.read_store()["folders"]["/game"]["color"], "#FF0000FF");
}

#[test]
fn context_menu_lists_installed_icons_and_palette() {
    let project = TestProject::new();
    project.make_icons(&["Maps", "Audio"]);
    let mut session = project.open(TestHost::with_folders(&["/Game/Maps"]));

    let menu = session.context_menu(&["/All/Game/Maps"]);
    let headings: Vec<_> = menu.iter().map(|section| section.heading).collect();
    assert_eq!(
        headings,
        vec!["Set Folder Icon", "Set Color", "Name Style", "Folder Icons"]
    );

    let icons: Vec<_> = menu[0].entries.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(icons, vec!["Audio", "Default", "Maps"]);

    let colors: Vec<_> = menu[1].entries.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(colors.first(), Some(&"Red"));

    // Running an entry straight from the menu works.
    let red = menu[1].entries[0].clone();
    let outcome = session
        .execute(red.command_id, red.arg, &["/All/Game/Maps"])
        .unwrap();
    assert_eq!(outcome.changed, 1);
    assert!(session.get("/Game/Maps").and_then(|r| r.color).is_some());
}

#[test]
fn command_errors_reach_the_user() {
    let project = TestProject::new();
    let mut session = project.open(TestHost::with_folders(&["/Game"]));

    let err = session
        .execute("foldertint.set-color", CommandArg::Flag(true), &["/Game"])
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Command {
            source: CommandError::InvalidArgument { .. }
        }
    ));

    let err = session
        .execute("foldertint.explode", CommandArg::None, &["/Game"])
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Command {
            source: CommandError::UnknownCommand(_)
        }
    ));

    assert_eq!(session.host().notifications().len(), 2);
    assert!(session.get("/Game").is_none());
}

#[test]
fn clear_all_removes_the_record() {
    let project = TestProject::new();
    let mut session = project.open(TestHost::with_folders(&["/Game/Maps", "/Game/Audio"]));

    session.set_color("/Game/Maps", RED).unwrap();
    session.set_color("/Game/Audio", BLUE).unwrap();
    session.set_applies_to_subfolders("/Game/Maps", true).unwrap();

    let outcome = session
        .execute(
            "foldertint.clear-all",
            CommandArg::None,
            &["/Game/Maps", "/Game/Audio"],
        )
        .unwrap();
    assert_eq!(outcome.changed, 2);
    assert!(session.store().is_empty());
}
