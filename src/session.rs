use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;

use crate::{
    commands::{self, CommandArg, CommandError, CommandOutcome, CommandTable, MenuSection},
    config::FolderTintConfig,
    host::{to_invariant_path, BrowserAdapter, FolderHost, Notification},
    icons::IconCatalog,
    overlay::OverlayBridge,
    path_key::{normalize, PathKey},
    persist::{self, DiskStoreFile, MemoryStoreFile, PersistError, StoreFile},
    presets::PresetSet,
    reconciler::{FolderEvent, FolderEventSender, ReconcileReport, Reconciler},
    record::{CustomizationRecord, IconId, NameStyle, Rgba},
    save_scheduler::{SaveEvent, SaveScheduler},
    store::CustomizationStore,
};

/// All of the folder customization state for one open project.
///
/// The session owns the store and is the only way to reach it. Every read
/// first applies queued folder events, so a rename the host reported is
/// never observed half done. Everything runs on the thread that owns the
/// session except the disk write itself.
pub struct FolderTintSession<H> {
    scheduler: SaveScheduler,

    project_dir: Option<PathBuf>,
    config: FolderTintConfig,
    host: H,
    store: CustomizationStore,
    reconciler: Reconciler,
    overlay: OverlayBridge,
    commands: CommandTable,
    catalog: IconCatalog,

    memory_only_reported: bool,
    closed: bool,
}

impl<H: FolderHost> FolderTintSession<H> {
    /// Opens the session for the project at `project_dir`, reading the config
    /// and saved customizations from their default locations.
    ///
    /// Never fails because of bad or missing files. Problems are shown to the
    /// user through `host` and the session continues with what it could
    /// load.
    pub fn open(project_dir: impl AsRef<Path>, host: H) -> Self {
        let project_dir = project_dir.as_ref();
        log::trace!("Opening folder customization session at {}", project_dir.display());

        let (config, config_errors) = FolderTintConfig::load_or_default(project_dir);
        for err in config_errors {
            log::warn!("{:#}", anyhow::Error::from(err));
            host.notify(Notification::warning(
                "Folder customization settings could not be read; using defaults",
            ));
        }

        let file = DiskStoreFile::new(config.store_file_path(project_dir), config.durability);
        let catalog = match IconCatalog::scan(&config.icons_dir_path(project_dir)) {
            Ok(catalog) => catalog,
            Err(err) => {
                log::warn!("{:#}", err);
                IconCatalog::default()
            }
        };

        Self::open_with(
            Some(project_dir.to_path_buf()),
            config,
            host,
            Arc::new(file),
            catalog,
        )
    }

    /// Opens a session that never touches the disk. Used when there is no
    /// project directory and by tests.
    pub fn open_in_memory(config: FolderTintConfig, host: H, catalog: IconCatalog) -> Self {
        Self::open_with(None, config, host, Arc::new(MemoryStoreFile::new()), catalog)
    }

    pub fn open_with(
        project_dir: Option<PathBuf>,
        config: FolderTintConfig,
        host: H,
        file: Arc<dyn StoreFile>,
        catalog: IconCatalog,
    ) -> Self {
        let (presets, preset_errors) =
            PresetSet::compile(&config.folder_presets, &config.path_presets);
        for err in &preset_errors {
            host.notify(Notification::warning(err.to_string()));
        }

        let store = load_store(file.as_ref(), &host);

        let mut session = Self {
            scheduler: SaveScheduler::new(file),
            project_dir,
            config,
            host,
            store,
            reconciler: Reconciler::new(),
            overlay: OverlayBridge::new(presets),
            commands: CommandTable::default(),
            catalog,
            memory_only_reported: false,
            closed: false,
        };

        session.sweep_stale();
        session
    }

    pub fn project_dir(&self) -> Option<&Path> {
        self.project_dir.as_deref()
    }

    pub fn config(&self) -> &FolderTintConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn catalog(&self) -> &IconCatalog {
        &self.catalog
    }

    pub fn commands_mut(&mut self) -> &mut CommandTable {
        &mut self.commands
    }

    pub fn is_memory_only(&self) -> bool {
        self.scheduler.is_memory_only()
    }

    /// The store with every queued folder event applied.
    pub fn store(&mut self) -> &CustomizationStore {
        self.reconcile();
        &self.store
    }

    /// Converts a path as the browser reports it into a store key.
    pub fn key_for(&self, virtual_path: &str) -> PathKey {
        normalize(to_invariant_path(virtual_path, &self.config.virtual_prefix))
    }

    /// A handle the host can use to report folder changes from any thread.
    pub fn event_sender(&self) -> FolderEventSender {
        self.reconciler.sender()
    }

    pub fn on_folder_event(&mut self, event: FolderEvent) {
        self.reconciler.enqueue(event);
    }

    /// Applies every queued folder event to the store.
    pub fn reconcile(&mut self) -> ReconcileReport {
        let report = self.reconciler.drain(&mut self.store);
        if report.changed_store() {
            self.scheduler.request_save();
        }
        report
    }

    /// Queues removal of every stored folder the host no longer has and
    /// applies it. Returns how many were removed.
    pub fn sweep_stale(&mut self) -> usize {
        let queued = self.reconciler.sweep_stale(&self.store, &self.host);
        if queued > 0 {
            log::info!("Dropping customizations of {} missing folder(s)", queued);
        }
        self.reconcile();
        queued
    }

    /// The customization `virtual_path` is drawn with, inherited attributes
    /// and presets included.
    pub fn effective(&mut self, virtual_path: &str) -> CustomizationRecord {
        let key = self.key_for(virtual_path);
        self.reconcile();
        self.overlay.effective(&self.store, &key)
    }

    /// The folder's own record, if it has one.
    pub fn get(&mut self, virtual_path: &str) -> Option<CustomizationRecord> {
        let key = self.key_for(virtual_path);
        self.reconcile();
        self.store.get(&key).cloned()
    }

    /// Periodic housekeeping, driven by the host's idle callback: applies
    /// folder events and moves saving along.
    pub fn tick(&mut self) {
        self.reconcile();

        match self.scheduler.tick(&mut self.store) {
            None | Some(SaveEvent::Saved) | Some(SaveEvent::Retrying(_)) => {}
            Some(SaveEvent::Failed(err)) => {
                self.host.notify(Notification::error(format!(
                    "Could not save folder customizations: {}",
                    err
                )));
            }
            Some(SaveEvent::PersistenceDisabled(err)) => self.report_memory_only(&err),
        }
    }

    /// Redraws the browser's visible folders if anything changed.
    pub fn decorate(&mut self, browser: &mut dyn BrowserAdapter) -> usize {
        self.reconcile();
        self.overlay.refresh(
            browser,
            &self.store,
            &self.catalog,
            &self.config.virtual_prefix,
        )
    }

    /// Rescans the icon directory, for when icon sets were added or removed.
    pub fn rescan_icons(&mut self) {
        let Some(project_dir) = &self.project_dir else {
            return;
        };

        match IconCatalog::scan(&self.config.icons_dir_path(project_dir)) {
            Ok(catalog) => {
                self.catalog = catalog;
                self.overlay.invalidate();
            }
            Err(err) => log::warn!("{:#}", err),
        }
    }

    /// Throws away the in-memory state and loads the saved file again.
    pub fn reload(&mut self) {
        self.reconcile();
        let loaded = load_store(self.scheduler.file(), &self.host);
        self.store.replace_all(loaded);
        self.sweep_stale();
    }

    pub fn context_menu(&mut self, selection: &[&str]) -> Vec<MenuSection> {
        let keys = self.keys_for(selection);
        self.reconcile();
        self.commands
            .context_menu(&keys, &self.store, &self.catalog, &self.config.palette)
    }

    /// Runs a command on the selected folders and schedules a save when
    /// anything changed. Failures are also shown to the user.
    pub fn execute(
        &mut self,
        command_id: &str,
        arg: CommandArg,
        selection: &[&str],
    ) -> Result<CommandOutcome, SessionError> {
        let keys = self.keys_for(selection);
        self.reconcile();

        let outcome = self
            .commands
            .execute(
                command_id,
                &arg,
                &keys,
                &mut self.store,
                &self.host,
                &self.catalog,
            )
            .inspect_err(|err| {
                self.host.notify(Notification::error(err.to_string()));
            })?;

        if outcome.changed > 0 {
            self.scheduler.request_save();
        }

        Ok(outcome)
    }

    pub fn set_color(&mut self, folder: &str, color: Rgba) -> Result<CommandOutcome, SessionError> {
        self.execute(commands::SET_COLOR, CommandArg::Color(color), &[folder])
    }

    pub fn clear_color(&mut self, folder: &str) -> Result<CommandOutcome, SessionError> {
        self.execute(commands::CLEAR_COLOR, CommandArg::None, &[folder])
    }

    pub fn set_icon(&mut self, folder: &str, icon: IconId) -> Result<CommandOutcome, SessionError> {
        self.execute(commands::SET_ICON, CommandArg::Icon(icon), &[folder])
    }

    pub fn clear_icon(&mut self, folder: &str) -> Result<CommandOutcome, SessionError> {
        self.execute(commands::CLEAR_ICON, CommandArg::None, &[folder])
    }

    pub fn set_applies_to_subfolders(
        &mut self,
        folder: &str,
        applies: bool,
    ) -> Result<CommandOutcome, SessionError> {
        self.execute(
            commands::SET_APPLIES_TO_SUBFOLDERS,
            CommandArg::Flag(applies),
            &[folder],
        )
    }

    pub fn set_name_style(
        &mut self,
        folder: &str,
        style: NameStyle,
    ) -> Result<CommandOutcome, SessionError> {
        self.execute(commands::SET_NAME_STYLE, CommandArg::NameStyle(style), &[folder])
    }

    pub fn clear_name_style(&mut self, folder: &str) -> Result<CommandOutcome, SessionError> {
        self.execute(commands::CLEAR_NAME_STYLE, CommandArg::None, &[folder])
    }

    pub fn clear_all(&mut self, folder: &str) -> Result<CommandOutcome, SessionError> {
        self.execute(commands::CLEAR_ALL, CommandArg::None, &[folder])
    }

    /// Writes out everything not yet saved and closes the session.
    pub fn shutdown(mut self) -> Result<(), SessionError> {
        self.close()
    }

    fn close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.reconcile();
        self.scheduler.flush(&mut self.store)?;
        log::trace!("Folder customization session closed");
        Ok(())
    }

    fn keys_for(&self, selection: &[&str]) -> Vec<PathKey> {
        selection.iter().map(|path| self.key_for(path)).collect()
    }

    fn report_memory_only(&mut self, err: &PersistError) {
        if self.memory_only_reported {
            return;
        }
        self.memory_only_reported = true;

        self.host.notify(Notification::warning(format!(
            "{}. Folder colors and icons will work until the editor closes but won't be saved.",
            err
        )));
    }
}

impl<H> Drop for FolderTintSession<H> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.reconciler.drain(&mut self.store);
        if let Err(err) = self.scheduler.flush(&mut self.store) {
            log::error!("Could not save folder customizations on shutdown: {}", err);
        }
    }
}

fn load_store(file: &dyn StoreFile, host: &dyn FolderHost) -> CustomizationStore {
    let outcome = persist::load(file);

    for warning in &outcome.warnings {
        log::warn!("{}: {}", file.describe(), warning);
    }

    if !outcome.warnings.is_empty() {
        host.notify(Notification::warning(format!(
            "{} folder customization problem(s) in {}; see the log for details",
            outcome.warnings.len(),
            file.describe()
        )));
    }

    log::info!(
        "Loaded {} folder customization(s) from {}",
        outcome.store.len(),
        file.describe()
    );

    outcome.store
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Command {
        #[from]
        source: CommandError,
    },

    #[error(transparent)]
    Persist {
        #[from]
        source: PersistError,
    },
}
