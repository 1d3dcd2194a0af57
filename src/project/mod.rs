//! Project settings document
//!
//! `Metadata/project_settings.config` is a flat JSON object holding every
//! printer, process and filament setting saved with the project. Values are
//! strings, numbers, booleans or lists (one entry per extruder); they are
//! flattened to text here so the resolver only ever compares strings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tmf_resolve::RawSettings;

/// Placeholder for a missing preset name
pub const UNKNOWN_PRESET: &str = "Unknown";

/// Key listing the settings changed relative to the system presets
const DIFF_TO_SYSTEM_KEY: &str = "different_settings_to_system";

/// Errors that can occur when parsing the project settings document
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("failed to parse project settings (invalid JSON): {0}")]
    Json(#[from] serde_json::Error),

    #[error("project settings root must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Names of the presets the project was sliced with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileIdentity {
    pub printer: String,
    pub process: String,
    pub filaments: Vec<String>,
}

impl Default for ProfileIdentity {
    fn default() -> Self {
        Self {
            printer: UNKNOWN_PRESET.to_string(),
            process: UNKNOWN_PRESET.to_string(),
            filaments: vec![UNKNOWN_PRESET.to_string()],
        }
    }
}

/// Parsed project settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSettings {
    settings: RawSettings,
    identity: ProfileIdentity,
    custom_keys: Vec<String>,
}

impl ProjectSettings {
    pub fn parse(text: &str) -> Result<Self, ProjectError> {
        let root: Value = serde_json::from_str(text)?;
        let Value::Object(map) = root else {
            return Err(ProjectError::NotAnObject(json_kind(&root)));
        };

        let mut settings = RawSettings::new();
        for (key, value) in &map {
            match value_text(value) {
                Some(text) => {
                    settings.insert(key.as_str(), text);
                }
                None => tracing::debug!(key = %key, "skipping non-scalar project setting"),
            }
        }

        let identity = identity(&map);
        let custom_keys = custom_keys(&map);
        tracing::debug!(
            settings = settings.len(),
            custom = custom_keys.len(),
            "parsed project settings"
        );

        Ok(Self {
            settings,
            identity,
            custom_keys,
        })
    }

    /// Every setting as text, in document order.
    pub fn settings(&self) -> &RawSettings {
        &self.settings
    }

    pub fn identity(&self) -> &ProfileIdentity {
        &self.identity
    }

    /// Keys the slicer flagged as changed from the system presets.
    pub fn custom_keys(&self) -> &[String] {
        &self.custom_keys
    }

    /// The flagged keys with their values.
    pub fn custom_global(&self) -> RawSettings {
        self.custom_keys
            .iter()
            .filter_map(|key| self.settings.get(key).map(|value| (key.as_str(), value)))
            .collect()
    }

    pub fn into_settings(self) -> RawSettings {
        self.settings
    }
}

/// Text form of a setting value.
///
/// Lists collapse to their only element or join with `,`; objects and
/// `null` have no text form.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let texts = items
                .iter()
                .map(|item| match item {
                    Value::Array(_) | Value::Object(_) => None,
                    other => value_text(other),
                })
                .collect::<Option<Vec<_>>>()?;
            Some(texts.join(","))
        }
        Value::Object(_) | Value::Null => None,
    }
}

fn identity(map: &Map<String, Value>) -> ProfileIdentity {
    let name = |key: &str| match map.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .first()
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_PRESET)
            .to_string(),
        _ => UNKNOWN_PRESET.to_string(),
    };

    let filaments = match map.get("filament_settings_id") {
        Some(Value::Array(items)) => items.iter().filter_map(value_text).collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => vec![UNKNOWN_PRESET.to_string()],
    };

    ProfileIdentity {
        printer: name("printer_settings_id"),
        process: name("print_settings_id"),
        filaments,
    }
}

fn custom_keys(map: &Map<String, Value>) -> Vec<String> {
    let first = match map.get(DIFF_TO_SYSTEM_KEY) {
        Some(Value::Array(items)) => items.first().and_then(Value::as_str),
        Some(Value::String(s)) => Some(s.as_str()),
        _ => None,
    };
    let Some(first) = first else {
        return Vec::new();
    };

    let mut keys: Vec<String> = Vec::new();
    for key in first.split(';').map(str::trim).filter(|k| !k.is_empty()) {
        if !map.contains_key(key) {
            tracing::debug!(key, "custom key not present in project settings");
            continue;
        }
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
