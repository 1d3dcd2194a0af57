//! Effective configuration with provenance
//!
//! The merged configuration plus the list of layers that contributed to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tmf_resolve::Normalization;

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::wiki::WikiSettings;

/// Schema version for effective_config
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "tmf-settings/effective_config@1";

/// Upper bound for both network timeouts, in seconds
const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Environment variables and the config path each one sets
const ENV_KEYS: &[(&str, &str)] = &[
    ("ORCASLICER_WIKI_BASE", "wiki.base"),
    ("ORCASLICER_REPO_OWNER", "wiki.repo_owner"),
    ("ORCASLICER_REPO_NAME", "wiki.repo_name"),
    ("ORCASLICER_BRANCH", "wiki.branch"),
    ("ORCASLICER_API_TIMEOUT", "wiki.api_timeout_seconds"),
    ("ORCASLICER_DOWNLOAD_TIMEOUT", "wiki.download_timeout_seconds"),
];

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    User,
    Env,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (user layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (user layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Effective configuration with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_version: u32,
    pub schema_id: String,

    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Build effective config from explicit layers.
    pub fn build(
        user_config_path: Option<&Path>,
        env_overrides: Option<Value>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(path) = user_config_path {
            if path.exists() {
                let (value, digest) = Self::load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::User,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            } else {
                tracing::debug!(path = %path.display(), "no user config file");
            }
        }

        if let Some(env) = env_overrides {
            layers.push(env);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Env,
                path: None,
                digest: None,
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        Self::validate_config(&merged)?;

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config: merged,
            sources,
        })
    }

    /// Build from the process environment.
    ///
    /// An explicitly named config file must exist; the default user file
    /// is optional.
    pub fn load(explicit_path: Option<&Path>, cli_overrides: Option<Value>) -> Result<Self, ConfigError> {
        let user_path = match explicit_path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::IoError(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path(),
        };
        let env = env_layer(|key| std::env::var(key).ok())?;
        Self::build(user_path.as_deref(), env, cli_overrides)
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;

        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        Ok((toml_to_json(toml_value), digest))
    }

    fn validate_config(config: &Value) -> Result<(), ConfigError> {
        if let Some(policy) = config.get("normalize") {
            let known = policy
                .as_str()
                .map(|s| s.parse::<Normalization>().is_ok())
                .unwrap_or(false);
            if !known {
                return Err(ConfigError::ValidationError(format!(
                    "normalize must be \"exact\" or \"canonical\", got {}",
                    policy
                )));
            }
        }

        for key in ["api_timeout_seconds", "download_timeout_seconds"] {
            let Some(value) = config.get("wiki").and_then(|w| w.get(key)) else {
                continue;
            };
            match value.as_u64() {
                Some(secs) if secs > 0 && secs <= MAX_TIMEOUT_SECONDS => {}
                _ => {
                    return Err(ConfigError::ValidationError(format!(
                        "wiki.{} must be in (0, {}]",
                        key, MAX_TIMEOUT_SECONDS
                    )));
                }
            }
        }

        for key in ["base", "repo_owner", "repo_name", "branch"] {
            if let Some(value) = config.get("wiki").and_then(|w| w.get(key)) {
                if value.as_str().map_or(true, str::is_empty) {
                    return Err(ConfigError::ValidationError(format!(
                        "wiki.{} must be a non-empty string",
                        key
                    )));
                }
            }
        }

        Ok(())
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Get a config value by path (dot-separated)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    /// Comparison policy for the resolver.
    pub fn normalization(&self) -> Normalization {
        self.get_str("normalize")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Typed view of the `wiki` table, defaults filled in.
    pub fn wiki(&self) -> WikiSettings {
        let defaults = BuiltinDefaults::default();
        let string = |key: &str, fallback: &str| {
            self.get_str(&format!("wiki.{}", key))
                .unwrap_or(fallback)
                .to_string()
        };
        let seconds = |key: &str, fallback: u64| {
            Duration::from_secs(self.get_u64(&format!("wiki.{}", key)).unwrap_or(fallback))
        };

        WikiSettings {
            base: string("base", &defaults.wiki_base),
            repo_owner: string("repo_owner", &defaults.repo_owner),
            repo_name: string("repo_name", &defaults.repo_name),
            branch: string("branch", &defaults.branch),
            api_timeout: seconds("api_timeout_seconds", defaults.api_timeout_seconds),
            download_timeout: seconds("download_timeout_seconds", defaults.download_timeout_seconds),
            data_dir: self
                .get_str("wiki.data_dir")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        }
    }
}

/// `<config_dir>/tmf-settings/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tmf-settings").join("config.toml"))
}

/// Build the environment layer from `lookup`. `None` when no variable is set.
pub fn env_layer<F>(lookup: F) -> Result<Option<Value>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut wiki = serde_json::Map::new();

    for (var, path) in ENV_KEYS {
        let Some(raw) = lookup(var) else {
            continue;
        };
        let key = path.trim_start_matches("wiki.");
        let value = if key.ends_with("_seconds") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("{} must be a whole number of seconds, got {:?}", var, raw))
            })?;
            Value::from(secs)
        } else {
            Value::String(raw)
        };
        wiki.insert(key.to_string(), value);
    }

    if wiki.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::json!({ "wiki": wiki })))
}

fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
