//! The values stored per folder.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An 8-bit-per-channel color. Persisted as `#RRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 0xFF)
    }

    /// Converts to linear floating point channels in `0.0..=1.0`, the form
    /// the host's brushes take.
    pub fn to_linear(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid color '{attempted}'. Expected #RRGGBB or #RRGGBBAA")]
pub struct ParseColorError {
    attempted: String,
}

impl FromStr for Rgba {
    type Err = ParseColorError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let error = || ParseColorError {
            attempted: source.to_owned(),
        };

        let hex = source.trim().strip_prefix('#').ok_or_else(error)?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) || (hex.len() != 6 && hex.len() != 8) {
            return Err(error());
        }

        let channel = |index: usize| {
            u8::from_str_radix(&hex[index * 2..index * 2 + 2], 16).map_err(|_| error())
        };

        let alpha = if hex.len() == 8 { channel(3)? } else { 0xFF };
        Ok(Rgba::new(channel(0)?, channel(1)?, channel(2)?, alpha))
    }
}

impl TryFrom<String> for Rgba {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgba> for String {
    fn from(value: Rgba) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02X}{:02X}{:02X}{:02X}",
            self.r, self.g, self.b, self.a
        )
    }
}

/// Which variant of an icon a browser entry needs.
///
/// Grid and list views show a single folder glyph. The tree (column) view
/// shows an open or closed glyph depending on whether the row is expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FolderState {
    Normal,
    ColumnOpen,
    ColumnClosed,
}

impl FolderState {
    pub fn from_flags(is_column_view: bool, is_open: bool) -> Self {
        match (is_column_view, is_open) {
            (true, true) => FolderState::ColumnOpen,
            (true, false) => FolderState::ColumnClosed,
            (false, _) => FolderState::Normal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FolderState::Normal => "Normal",
            FolderState::ColumnOpen => "ColumnOpen",
            FolderState::ColumnClosed => "ColumnClosed",
        }
    }
}

/// Name of an icon set, e.g. `Default` or `Maps`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IconId(String);

impl IconId {
    pub const DEFAULT: &'static str = "Default";

    pub fn new(name: impl Into<String>) -> Self {
        IconId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The host brush name for this icon in the given state, e.g.
    /// `Maps.ColumnOpen`.
    pub fn brush_name(&self, state: FolderState) -> String {
        format!("{}.{}", self.0, state.as_str())
    }
}

impl fmt::Display for IconId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NameStyle {
    pub bold: bool,
    pub italic: bool,
}

impl NameStyle {
    pub fn is_plain(&self) -> bool {
        !self.bold && !self.italic
    }
}

/// Customization attached to a single folder.
///
/// A record that sets no visual attribute is equivalent to no record at all
/// and is never kept in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomizationRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<IconId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_style: Option<NameStyle>,

    #[serde(skip_serializing_if = "is_false")]
    pub applies_to_subfolders: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl CustomizationRecord {
    pub fn with_color(color: Rgba) -> Self {
        Self {
            color: Some(color),
            ..Default::default()
        }
    }

    pub fn with_icon(icon: IconId) -> Self {
        Self {
            icon: Some(icon),
            ..Default::default()
        }
    }

    pub fn inherited(mut self) -> Self {
        self.applies_to_subfolders = true;
        self
    }

    /// True when every field is unset. A record that only turns on the
    /// subfolder flag is kept so the toggle survives until a visual
    /// attribute is picked.
    pub fn is_empty(&self) -> bool {
        self.color.is_none()
            && self.icon.is_none()
            && self.name_style.map_or(true, |style| style.is_plain())
            && !self.applies_to_subfolders
    }

    /// Drops attributes that are set but carry no effect.
    pub fn pruned(mut self) -> Self {
        if self.name_style.is_some_and(|style| style.is_plain()) {
            self.name_style = None;
        }
        self
    }
}
