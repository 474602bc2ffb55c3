//! The folder context-menu commands.
//!
//! Every command is an object with a `validate`/`execute` pair registered in
//! a [`CommandTable`] under a stable id. The table checks the selection
//! against the host before anything is written, so a folder deleted between
//! the menu opening and the click is skipped with a toast instead of
//! resurrecting a record for it.

use indexmap::IndexMap;
use thiserror::Error;

use crate::{
    host::{FolderHost, Notification},
    icons::IconCatalog,
    path_key::PathKey,
    record::{CustomizationRecord, IconId, NameStyle, Rgba},
    store::CustomizationStore,
};

pub const SET_COLOR: &str = "foldertint.set-color";
pub const CLEAR_COLOR: &str = "foldertint.clear-color";
pub const SET_ICON: &str = "foldertint.set-icon";
pub const CLEAR_ICON: &str = "foldertint.clear-icon";
pub const SET_APPLIES_TO_SUBFOLDERS: &str = "foldertint.set-applies-to-subfolders";
pub const SET_NAME_STYLE: &str = "foldertint.set-name-style";
pub const CLEAR_NAME_STYLE: &str = "foldertint.clear-name-style";
pub const CLEAR_ALL: &str = "foldertint.clear-all";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown folder command '{0}'")]
    UnknownCommand(String),

    #[error("Folder command '{command}' expects {expected}")]
    InvalidArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("Icon '{0}' is not installed")]
    UnknownIcon(IconId),

    #[error("No folders selected")]
    EmptySelection,
}

/// The value a command was invoked with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandArg {
    None,
    Color(Rgba),
    Icon(IconId),
    Flag(bool),
    NameStyle(NameStyle),
}

pub trait FolderCommand {
    fn id(&self) -> &'static str;

    fn label(&self) -> &'static str;

    /// Rejects invocations that can't succeed for any folder.
    fn validate(&self, arg: &CommandArg, catalog: &IconCatalog) -> Result<(), CommandError>;

    /// Applies the command to one folder's record. Only called after
    /// `validate` accepted `arg`.
    fn execute(&self, record: &mut CustomizationRecord, arg: &CommandArg);
}

fn expect_none(command: &'static str, arg: &CommandArg) -> Result<(), CommandError> {
    match arg {
        CommandArg::None => Ok(()),
        _ => Err(CommandError::InvalidArgument {
            command,
            expected: "no argument",
        }),
    }
}

pub struct SetColor;

impl FolderCommand for SetColor {
    fn id(&self) -> &'static str {
        SET_COLOR
    }

    fn label(&self) -> &'static str {
        "Set Color"
    }

    fn validate(&self, arg: &CommandArg, _catalog: &IconCatalog) -> Result<(), CommandError> {
        match arg {
            CommandArg::Color(_) => Ok(()),
            _ => Err(CommandError::InvalidArgument {
                command: SET_COLOR,
                expected: "a color",
            }),
        }
    }

    fn execute(&self, record: &mut CustomizationRecord, arg: &CommandArg) {
        if let CommandArg::Color(color) = arg {
            record.color = Some(*color);
        }
    }
}

pub struct ClearColor;

impl FolderCommand for ClearColor {
    fn id(&self) -> &'static str {
        CLEAR_COLOR
    }

    fn label(&self) -> &'static str {
        "Clear Color"
    }

    fn validate(&self, arg: &CommandArg, _catalog: &IconCatalog) -> Result<(), CommandError> {
        expect_none(CLEAR_COLOR, arg)
    }

    fn execute(&self, record: &mut CustomizationRecord, _arg: &CommandArg) {
        record.color = None;
    }
}

pub struct SetIcon;

impl FolderCommand for SetIcon {
    fn id(&self) -> &'static str {
        SET_ICON
    }

    fn label(&self) -> &'static str {
        "Set Folder Icon"
    }

    fn validate(&self, arg: &CommandArg, catalog: &IconCatalog) -> Result<(), CommandError> {
        match arg {
            CommandArg::Icon(icon) if catalog.contains(icon) => Ok(()),
            CommandArg::Icon(icon) => Err(CommandError::UnknownIcon(icon.clone())),
            _ => Err(CommandError::InvalidArgument {
                command: SET_ICON,
                expected: "an icon name",
            }),
        }
    }

    fn execute(&self, record: &mut CustomizationRecord, arg: &CommandArg) {
        if let CommandArg::Icon(icon) = arg {
            record.icon = Some(icon.clone());
        }
    }
}

pub struct ClearIcon;

impl FolderCommand for ClearIcon {
    fn id(&self) -> &'static str {
        CLEAR_ICON
    }

    fn label(&self) -> &'static str {
        "Clear Icon"
    }

    fn validate(&self, arg: &CommandArg, _catalog: &IconCatalog) -> Result<(), CommandError> {
        expect_none(CLEAR_ICON, arg)
    }

    fn execute(&self, record: &mut CustomizationRecord, _arg: &CommandArg) {
        record.icon = None;
    }
}

pub struct SetAppliesToSubfolders;

impl FolderCommand for SetAppliesToSubfolders {
    fn id(&self) -> &'static str {
        SET_APPLIES_TO_SUBFOLDERS
    }

    fn label(&self) -> &'static str {
        "Apply to Subfolders"
    }

    fn validate(&self, arg: &CommandArg, _catalog: &IconCatalog) -> Result<(), CommandError> {
        match arg {
            CommandArg::Flag(_) => Ok(()),
            _ => Err(CommandError::InvalidArgument {
                command: SET_APPLIES_TO_SUBFOLDERS,
                expected: "true or false",
            }),
        }
    }

    fn execute(&self, record: &mut CustomizationRecord, arg: &CommandArg) {
        if let CommandArg::Flag(applies) = arg {
            record.applies_to_subfolders = *applies;
        }
    }
}

pub struct SetNameStyle;

impl FolderCommand for SetNameStyle {
    fn id(&self) -> &'static str {
        SET_NAME_STYLE
    }

    fn label(&self) -> &'static str {
        "Set Name Style"
    }

    fn validate(&self, arg: &CommandArg, _catalog: &IconCatalog) -> Result<(), CommandError> {
        match arg {
            CommandArg::NameStyle(_) => Ok(()),
            _ => Err(CommandError::InvalidArgument {
                command: SET_NAME_STYLE,
                expected: "a name style",
            }),
        }
    }

    fn execute(&self, record: &mut CustomizationRecord, arg: &CommandArg) {
        if let CommandArg::NameStyle(style) = arg {
            record.name_style = Some(*style);
        }
    }
}

pub struct ClearNameStyle;

impl FolderCommand for ClearNameStyle {
    fn id(&self) -> &'static str {
        CLEAR_NAME_STYLE
    }

    fn label(&self) -> &'static str {
        "Clear Name Style"
    }

    fn validate(&self, arg: &CommandArg, _catalog: &IconCatalog) -> Result<(), CommandError> {
        expect_none(CLEAR_NAME_STYLE, arg)
    }

    fn execute(&self, record: &mut CustomizationRecord, _arg: &CommandArg) {
        record.name_style = None;
    }
}

pub struct ClearAll;

impl FolderCommand for ClearAll {
    fn id(&self) -> &'static str {
        CLEAR_ALL
    }

    fn label(&self) -> &'static str {
        "Reset Folder"
    }

    fn validate(&self, arg: &CommandArg, _catalog: &IconCatalog) -> Result<(), CommandError> {
        expect_none(CLEAR_ALL, arg)
    }

    fn execute(&self, record: &mut CustomizationRecord, _arg: &CommandArg) {
        *record = CustomizationRecord::default();
    }
}

/// What running a command over a selection did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Folders whose record changed.
    pub changed: usize,

    /// Folders that vanished before the command ran.
    pub skipped: Vec<PathKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub command_id: &'static str,
    pub label: String,
    pub arg: CommandArg,

    /// `Some` for toggles, holding the current state.
    pub checked: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSection {
    pub heading: &'static str,
    pub entries: Vec<MenuEntry>,
}

pub struct CommandTable {
    commands: IndexMap<&'static str, Box<dyn FolderCommand>>,
}

impl Default for CommandTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.register(Box::new(SetIcon));
        table.register(Box::new(ClearIcon));
        table.register(Box::new(SetColor));
        table.register(Box::new(ClearColor));
        table.register(Box::new(SetNameStyle));
        table.register(Box::new(ClearNameStyle));
        table.register(Box::new(SetAppliesToSubfolders));
        table.register(Box::new(ClearAll));
        table
    }
}

impl CommandTable {
    pub fn empty() -> Self {
        Self {
            commands: IndexMap::new(),
        }
    }

    /// Adds `command`, replacing any command already registered under its id.
    pub fn register(&mut self, command: Box<dyn FolderCommand>) {
        self.commands.insert(command.id(), command);
    }

    pub fn get(&self, id: &str) -> Option<&dyn FolderCommand> {
        self.commands.get(id).map(|command| &**command)
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }

    /// Runs command `id` on every folder in `selection`.
    ///
    /// Folders the host no longer knows about are skipped, each with a
    /// warning toast. Argument problems fail the whole invocation before
    /// anything is written.
    pub fn execute(
        &self,
        id: &str,
        arg: &CommandArg,
        selection: &[PathKey],
        store: &mut CustomizationStore,
        host: &dyn FolderHost,
        catalog: &IconCatalog,
    ) -> Result<CommandOutcome, CommandError> {
        let command = self
            .get(id)
            .ok_or_else(|| CommandError::UnknownCommand(id.to_owned()))?;

        if selection.is_empty() {
            return Err(CommandError::EmptySelection);
        }

        command.validate(arg, catalog)?;

        let mut outcome = CommandOutcome::default();

        for folder in selection {
            if !host.folder_exists(folder) {
                log::info!("{}: folder {} no longer exists, skipping", id, folder);
                host.notify(Notification::warning(format!(
                    "Folder {} no longer exists",
                    folder
                )));
                outcome.skipped.push(folder.clone());
                continue;
            }

            if store.update(folder, |record| command.execute(record, arg)) {
                outcome.changed += 1;
            }
        }

        log::debug!(
            "{}: {} folder(s) changed, {} skipped",
            id,
            outcome.changed,
            outcome.skipped.len()
        );

        Ok(outcome)
    }

    /// Builds the context menu for `selection`. Only commands present in the
    /// table show up.
    pub fn context_menu(
        &self,
        selection: &[PathKey],
        store: &CustomizationStore,
        catalog: &IconCatalog,
        palette: &IndexMap<String, Rgba>,
    ) -> Vec<MenuSection> {
        let mut sections = Vec::new();

        if self.get(SET_ICON).is_some() {
            sections.push(MenuSection {
                heading: "Set Folder Icon",
                entries: catalog
                    .iter()
                    .map(|icon| MenuEntry {
                        command_id: SET_ICON,
                        label: icon.to_string(),
                        arg: CommandArg::Icon(icon.clone()),
                        checked: None,
                    })
                    .collect(),
            });
        }

        if self.get(SET_COLOR).is_some() {
            sections.push(MenuSection {
                heading: "Set Color",
                entries: palette
                    .iter()
                    .map(|(name, color)| MenuEntry {
                        command_id: SET_COLOR,
                        label: name.clone(),
                        arg: CommandArg::Color(*color),
                        checked: None,
                    })
                    .collect(),
            });
        }

        if self.get(SET_NAME_STYLE).is_some() {
            let styles = [
                ("Bold", true, false),
                ("Italic", false, true),
                ("Bold Italic", true, true),
            ];
            sections.push(MenuSection {
                heading: "Name Style",
                entries: styles
                    .into_iter()
                    .map(|(label, bold, italic)| MenuEntry {
                        command_id: SET_NAME_STYLE,
                        label: label.to_owned(),
                        arg: CommandArg::NameStyle(NameStyle { bold, italic }),
                        checked: None,
                    })
                    .collect(),
            });
        }

        let mut options = Vec::new();
        if let Some(command) = self.get(SET_APPLIES_TO_SUBFOLDERS) {
            let all_apply = !selection.is_empty()
                && selection.iter().all(|folder| {
                    store
                        .get(folder)
                        .is_some_and(|record| record.applies_to_subfolders)
                });

            options.push(MenuEntry {
                command_id: SET_APPLIES_TO_SUBFOLDERS,
                label: command.label().to_owned(),
                arg: CommandArg::Flag(!all_apply),
                checked: Some(all_apply),
            });
        }

        for id in [CLEAR_COLOR, CLEAR_ICON, CLEAR_NAME_STYLE, CLEAR_ALL] {
            if let Some(command) = self.get(id) {
                options.push(MenuEntry {
                    command_id: command.id(),
                    label: command.label().to_owned(),
                    arg: CommandArg::None,
                    checked: None,
                });
            }
        }

        if !options.is_empty() {
            sections.push(MenuSection {
                heading: "Folder Icons",
                entries: options,
            });
        }

        sections
    }
}
