//! JSON5 reading for the files users edit by hand.
//!
//! The plugin config and the customization file both go through here, so a
//! comment or trailing comma added in a text editor never costs the user their
//! settings. Errors name the file they came from.

use std::fmt::Display;

use anyhow::Context as _;
use serde::de::DeserializeOwned;

/// Reads a whole document as an untyped value, for callers that want to
/// salvage what they can from a partly broken file.
pub fn value_from_str(text: &str, source: impl Display) -> anyhow::Result<serde_json::Value> {
    json5::from_str(text).with_context(|| format!("{} is not valid JSON5", source))
}

/// Like [`value_from_str`], for bytes straight from disk.
pub fn value_from_slice(slice: &[u8], source: impl Display) -> anyhow::Result<serde_json::Value> {
    let text = std::str::from_utf8(slice)
        .with_context(|| format!("{} is not valid UTF-8 text", source))?;
    value_from_str(text, source)
}

/// Reads a document straight into `T`. Both syntax errors and fields of the
/// wrong shape are reported against `source`.
pub fn from_str<T: DeserializeOwned>(text: &str, source: impl Display) -> anyhow::Result<T> {
    json5::from_str(text).with_context(|| format!("Could not read settings from {}", source))
}
