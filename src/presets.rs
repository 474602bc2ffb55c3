//! Regex-driven default customizations.
//!
//! Folder presets are tested against a folder's name, path presets against
//! its whole key. Matching is a search, not a full match, and ignores case.
//! Within each list the first matching preset that sets an attribute wins.

use regex::{Regex, RegexBuilder};

use crate::{
    config::{ConfigError, PresetConfig},
    path_key::PathKey,
    record::{IconId, NameStyle, Rgba},
};

#[derive(Debug, Clone)]
pub struct Preset {
    regex: Regex,
    pub color: Option<Rgba>,
    pub icon: Option<IconId>,
    pub name_style: Option<NameStyle>,
}

impl Preset {
    pub fn compile(config: &PresetConfig) -> Result<Self, ConfigError> {
        let regex = RegexBuilder::new(&config.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigError::InvalidPreset {
                pattern: config.pattern.clone(),
                source,
            })?;

        Ok(Self {
            regex,
            color: config.color,
            icon: config.icon.clone(),
            name_style: config.name_style,
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PresetSet {
    folder: Vec<Preset>,
    path: Vec<Preset>,
}

impl PresetSet {
    /// Compiles both preset lists. Presets with a bad pattern are left out
    /// and reported.
    pub fn compile(
        folder_presets: &[PresetConfig],
        path_presets: &[PresetConfig],
    ) -> (Self, Vec<ConfigError>) {
        let mut errors = Vec::new();

        let mut compile_all = |configs: &[PresetConfig]| -> Vec<Preset> {
            configs
                .iter()
                .filter_map(|config| match Preset::compile(config) {
                    Ok(preset) => Some(preset),
                    Err(err) => {
                        log::warn!("{}", err);
                        errors.push(err);
                        None
                    }
                })
                .collect()
        };

        let folder = compile_all(folder_presets);
        let path = compile_all(path_presets);

        (Self { folder, path }, errors)
    }

    pub fn is_empty(&self) -> bool {
        self.folder.is_empty() && self.path.is_empty()
    }

    /// Presets that apply to `key`: folder-name matches first, then path
    /// matches, each in configured order.
    pub fn matching<'a>(&'a self, key: &'a PathKey) -> impl Iterator<Item = &'a Preset> + 'a {
        let name = key.name();
        let folder_matches = self.folder.iter().filter(move |preset| preset.is_match(name));
        let path_matches = self
            .path
            .iter()
            .filter(move |preset| preset.is_match(key.as_str()));

        folder_matches.chain(path_matches)
    }
}
