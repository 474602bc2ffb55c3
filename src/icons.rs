//! The set of icons a folder can be given.

use std::{collections::BTreeSet, path::Path};

use anyhow::Context as _;
use memofs::IoResultExt;

use crate::record::IconId;

/// Icon sets available to the browser, sorted by name. Each icon set is a
/// directory holding the `Normal`, `ColumnOpen` and `ColumnClosed` images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconCatalog {
    icons: BTreeSet<IconId>,
}

impl Default for IconCatalog {
    fn default() -> Self {
        Self::from_names(std::iter::empty::<&str>())
    }
}

impl IconCatalog {
    /// Builds a catalog from icon names. `Default` is always included.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut icons: BTreeSet<IconId> = names.into_iter().map(IconId::new).collect();
        icons.insert(IconId::new(IconId::DEFAULT));
        Self { icons }
    }

    /// Lists the sub-directories of `icons_dir`. A missing directory yields a
    /// catalog with only `Default`.
    pub fn scan(icons_dir: &Path) -> anyhow::Result<Self> {
        let entries = fs_err::read_dir(icons_dir)
            .with_not_found()
            .with_context(|| format!("Could not list icons in {}", icons_dir.display()))?;

        let Some(entries) = entries else {
            log::debug!(
                "Icon directory {} does not exist, only the default icon is available",
                icons_dir.display()
            );
            return Ok(Self::default());
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => log::warn!("Skipping icon with non UTF-8 name {:?}", name),
            }
        }

        let catalog = Self::from_names(names);
        log::debug!("Found {} icon(s) in {}", catalog.len(), icons_dir.display());
        Ok(catalog)
    }

    pub fn contains(&self, icon: &IconId) -> bool {
        self.icons.contains(icon)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IconId> {
        self.icons.iter()
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}
