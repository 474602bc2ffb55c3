//! Per-project plugin configuration, read from
//! `<project>/Config/FolderTint.json5`.

use std::{
    io,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use memofs::IoResultExt;
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::{
    json,
    persist::WriteDurability,
    record::{IconId, NameStyle, Rgba},
};

pub const CONFIG_FILE_NAME: &str = "FolderTint.json5";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Config file {} is invalid", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Ignoring preset with invalid pattern '{pattern}'")]
    InvalidPreset {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unknown file log level '{0}', expected none, error, warn, info, debug or trace")]
    InvalidLogLevel(String),
}

/// One pattern-based default. A preset applies its attributes to every
/// folder whose name (or path, depending on the list it is in) matches.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetConfig {
    pub pattern: String,

    #[serde(default)]
    pub color: Option<Rgba>,

    #[serde(default)]
    pub icon: Option<IconId>,

    #[serde(default)]
    pub name_style: Option<NameStyle>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FolderTintConfig {
    /// Where customizations are saved, relative to the project directory.
    pub store_path: PathBuf,

    pub durability: WriteDurability,

    /// Synthetic root the browser puts in front of every path it reports.
    pub virtual_prefix: String,

    /// Virtual roots and the directories, relative to the project, that
    /// back them.
    pub mounts: IndexMap<String, PathBuf>,

    /// Directory containing one sub-directory per icon set, relative to the
    /// project.
    pub icons_dir: PathBuf,

    /// Colors offered in the context menu, in menu order.
    pub palette: IndexMap<String, Rgba>,

    pub folder_presets: Vec<PresetConfig>,
    pub path_presets: Vec<PresetConfig>,

    /// Level for the project log file. `none` turns file logging off.
    pub file_log_level: String,
}

impl Default for FolderTintConfig {
    fn default() -> Self {
        let mut mounts = IndexMap::new();
        mounts.insert("/Game".to_owned(), PathBuf::from("Content"));

        let palette = [
            ("Red", Rgba::opaque(0xE5, 0x39, 0x35)),
            ("Orange", Rgba::opaque(0xFB, 0x8C, 0x00)),
            ("Yellow", Rgba::opaque(0xFD, 0xD8, 0x35)),
            ("Green", Rgba::opaque(0x43, 0xA0, 0x47)),
            ("Blue", Rgba::opaque(0x1E, 0x88, 0xE5)),
            ("Purple", Rgba::opaque(0x8E, 0x24, 0xAA)),
            ("Gray", Rgba::opaque(0x75, 0x75, 0x75)),
        ]
        .into_iter()
        .map(|(name, color)| (name.to_owned(), color))
        .collect();

        Self {
            store_path: Path::new("Saved").join("FolderTint").join("folders.json"),
            durability: WriteDurability::default(),
            virtual_prefix: "/All".to_owned(),
            mounts,
            icons_dir: Path::new("Plugins")
                .join("FolderTint")
                .join("Resources")
                .join("Icons"),
            palette,
            folder_presets: Vec::new(),
            path_presets: Vec::new(),
            file_log_level: "info".to_owned(),
        }
    }
}

impl FolderTintConfig {
    pub fn path_in(project_dir: &Path) -> PathBuf {
        project_dir.join("Config").join(CONFIG_FILE_NAME)
    }

    /// Reads the config for `project_dir`. A missing file is `Ok(None)`.
    pub fn load(project_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = Self::path_in(project_dir);

        let contents = fs_err::read_to_string(&path)
            .with_not_found()
            .map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;

        let Some(contents) = contents else {
            return Ok(None);
        };

        Self::parse(&contents, &path).map(Some)
    }

    pub fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        json::from_str(contents, path.display()).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`load`](Self::load), but never fails. Problems come back as
    /// warnings alongside the defaults.
    pub fn load_or_default(project_dir: &Path) -> (Self, Vec<ConfigError>) {
        match Self::load(project_dir) {
            Ok(Some(config)) => {
                log::debug!(
                    "Loaded config from {}",
                    Self::path_in(project_dir).display()
                );
                (config, Vec::new())
            }
            Ok(None) => (Self::default(), Vec::new()),
            Err(err) => (Self::default(), vec![err]),
        }
    }

    pub fn store_file_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.store_path)
    }

    pub fn icons_dir_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.icons_dir)
    }

    /// The configured mounts with their directories resolved against
    /// `project_dir`.
    pub fn mount_dirs(&self, project_dir: &Path) -> Vec<(String, PathBuf)> {
        self.mounts
            .iter()
            .map(|(root, dir)| (root.clone(), project_dir.join(dir)))
            .collect()
    }

    /// Parses `file_log_level`. `Ok(None)` means file logging is disabled.
    pub fn file_log_level(&self) -> Result<Option<LevelFilter>, ConfigError> {
        parse_log_level(&self.file_log_level)
    }
}

fn parse_log_level(level: &str) -> Result<Option<LevelFilter>, ConfigError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "none" | "off" => Ok(None),
        "error" => Ok(Some(LevelFilter::ERROR)),
        "warn" | "warning" => Ok(Some(LevelFilter::WARN)),
        "info" => Ok(Some(LevelFilter::INFO)),
        "debug" => Ok(Some(LevelFilter::DEBUG)),
        "trace" => Ok(Some(LevelFilter::TRACE)),
        _ => Err(ConfigError::InvalidLogLevel(level.to_owned())),
    }
}
