//! Profile manifest reading
//!
//! Nix has stored `manifest.json` in two shapes over time:
//!
//! ```json
//! {"elements": [{"priority": 5}, ...]}            // array, older releases
//! {"elements": {"hello": {"priority": 5}, ...}}   // map keyed by element name
//! ```
//!
//! Only priorities matter here. The shape is decided from the JSON type of
//! `elements` before any element is looked at, so a broken map is reported as
//! a broken map instead of being retried as an array.

use crate::error::{Error, Result};
use crate::priority::DEFAULT_PRIORITY;
use camino::Utf8Path;
use serde_json::{Map, Value};
use std::io;
use tracing::debug;

/// File name of the manifest inside a profile directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// One installed element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestElement {
    pub priority: i64,
}

/// Installed elements of a profile, in no particular order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub elements: Vec<ManifestElement>,
}

impl Manifest {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Highest priority of any element
    pub fn max_priority(&self) -> Option<i64> {
        self.elements.iter().map(|e| e.priority).max()
    }
}

/// Read the manifest of the profile at `profile`.
///
/// A profile without `manifest.json` has nothing installed and yields an
/// empty manifest.
pub fn read(profile: &Utf8Path) -> Result<Manifest> {
    let path = profile.join(MANIFEST_FILE);
    let data = match std::fs::read(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("no manifest at {}", path);
            return Ok(Manifest::default());
        }
        Err(source) => return Err(Error::ManifestRead { path, source }),
    };
    parse(&data, &path)
}

/// Decode manifest bytes; `path` is only used in error messages.
pub fn parse(data: &[u8], path: &Utf8Path) -> Result<Manifest> {
    let value: Value =
        serde_json::from_slice(data).map_err(|e| Error::manifest_decode(path, e.to_string()))?;
    let root = match value {
        Value::Object(root) => root,
        other => {
            return Err(Error::manifest_decode(
                path,
                format!("expected a JSON object, found {}", type_name(&other)),
            ))
        }
    };

    let elements: Vec<ManifestElement> = match root.get("elements") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(id, element)| decode_element(element, id))
            .collect::<std::result::Result<_, _>>()
            .map_err(|message| Error::manifest_decode(path, message))?,
        Some(Value::Array(list)) => list
            .iter()
            .enumerate()
            .map(|(index, element)| decode_element(element, &index.to_string()))
            .collect::<std::result::Result<_, _>>()
            .map_err(|message| Error::manifest_decode(path, message))?,
        Some(other) => {
            return Err(Error::manifest_decode(
                path,
                format!(
                    "`elements` must be an object or an array, found {}",
                    type_name(other)
                ),
            ))
        }
    };

    Ok(Manifest { elements })
}

fn decode_element(element: &Value, id: &str) -> std::result::Result<ManifestElement, String> {
    let fields: &Map<String, Value> = element
        .as_object()
        .ok_or_else(|| format!("element {}: expected an object, found {}", id, type_name(element)))?;

    let priority = match fields.get("priority") {
        None | Some(Value::Null) => DEFAULT_PRIORITY,
        Some(value) => value.as_i64().ok_or_else(|| {
            format!("element {}: priority must be an integer, found {}", id, value)
        })?,
    };
    Ok(ManifestElement { priority })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
