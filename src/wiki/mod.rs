//! Setting metadata and wiki links
//!
//! The slicer's own sources describe every setting: `PrintConfig.cpp`
//! carries labels, tooltips and defaults, `Tab.cpp` maps settings to wiki
//! pages. Both are fetched from GitHub (see [`update`]), parsed (see
//! [`parse`]) and cached as `settings_wiki.json` in the data directory.

pub mod parse;
pub mod update;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::BuiltinDefaults;

/// Name of the generated data file inside the data directory
pub const WIKI_JSON: &str = "settings_wiki.json";

/// Errors that can occur while fetching, parsing or loading wiki data
#[derive(Debug, thiserror::Error)]
pub enum WikiError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid wiki data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("refusing non-HTTPS URL: {0}")]
    InsecureUrl(String),

    #[error("got an HTML page instead of source from {0}")]
    HtmlResponse(String),

    #[error("source file not found: {0} (run `tmf-settings wiki update`)")]
    MissingSource(PathBuf),

    #[error("bad source pattern: {0}")]
    Pattern(#[from] regex_lite::Error),
}

impl WikiError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The two slicer source files the metadata is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFile {
    Tab,
    PrintConfig,
}

impl SourceFile {
    pub const ALL: [SourceFile; 2] = [SourceFile::Tab, SourceFile::PrintConfig];

    pub fn file_name(self) -> &'static str {
        match self {
            SourceFile::Tab => "Tab.cpp",
            SourceFile::PrintConfig => "PrintConfig.cpp",
        }
    }

    /// Path below `src/` in the slicer repository
    pub fn repo_path(self) -> &'static str {
        match self {
            SourceFile::Tab => "slic3r/GUI/Tab.cpp",
            SourceFile::PrintConfig => "libslic3r/PrintConfig.cpp",
        }
    }
}

/// Where wiki data comes from and where it is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiSettings {
    pub base: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub branch: String,
    pub api_timeout: Duration,
    pub download_timeout: Duration,
    pub data_dir: PathBuf,
}

impl Default for WikiSettings {
    fn default() -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            base: defaults.wiki_base,
            repo_owner: defaults.repo_owner,
            repo_name: defaults.repo_name,
            branch: defaults.branch,
            api_timeout: Duration::from_secs(defaults.api_timeout_seconds),
            download_timeout: Duration::from_secs(defaults.download_timeout_seconds),
            data_dir: defaults.data_dir,
        }
    }
}

impl WikiSettings {
    pub fn json_path(&self) -> PathBuf {
        self.data_dir.join(WIKI_JSON)
    }

    pub fn source_path(&self, source: SourceFile) -> PathBuf {
        self.data_dir.join(source.file_name())
    }

    pub fn raw_url(&self, source: SourceFile) -> String {
        format!(
            "https://raw.githubusercontent.com/{}/{}/{}/src/{}",
            self.repo_owner,
            self.repo_name,
            self.branch,
            source.repo_path()
        )
    }
}

/// Everything known about one setting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingInfo {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidetext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wiki_page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiMeta {
    #[serde(default)]
    pub updated: String,
    #[serde(default)]
    pub wiki_base: String,
    /// Source file name -> content hash prefix
    #[serde(default)]
    pub sha: BTreeMap<String, String>,
    #[serde(default)]
    pub total_settings: usize,
    #[serde(default)]
    pub with_wiki_page: usize,
}

/// On-disk shape of `settings_wiki.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiData {
    #[serde(rename = "_meta", default)]
    pub meta: WikiMeta,
    #[serde(default)]
    pub settings: BTreeMap<String, SettingInfo>,
}

/// Parse both sources and assemble the data file contents.
pub fn build_settings_data(tab: &[u8], print_config: &[u8], wiki_base: &str) -> Result<WikiData, WikiError> {
    let settings = parse::parse_print_config(&String::from_utf8_lossy(print_config))?;
    let pages = parse::parse_tab_cpp(&String::from_utf8_lossy(tab))?;
    let settings = parse::merge_sources(settings, pages);

    let sha = [
        (SourceFile::Tab, tab),
        (SourceFile::PrintConfig, print_config),
    ]
    .into_iter()
    .map(|(source, bytes)| (source.file_name().to_string(), update::content_hash(bytes)))
    .collect();

    let with_wiki_page = settings.values().filter(|s| s.wiki_page.is_some()).count();
    Ok(WikiData {
        meta: WikiMeta {
            updated: chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
            wiki_base: wiki_base.to_string(),
            sha,
            total_settings: settings.len(),
            with_wiki_page,
        },
        settings,
    })
}

/// Regenerate `settings_wiki.json` from the local sources.
pub fn generate_json(settings: &WikiSettings) -> Result<WikiData, WikiError> {
    let read = |source: SourceFile| {
        let path = settings.source_path(source);
        if !path.exists() {
            return Err(WikiError::MissingSource(path));
        }
        std::fs::read(&path).map_err(|e| WikiError::io(&path, e))
    };
    let tab = read(SourceFile::Tab)?;
    let print_config = read(SourceFile::PrintConfig)?;

    let data = build_settings_data(&tab, &print_config, &settings.base)?;
    let json = serde_json::to_string_pretty(&data)?;
    update::write_atomic(&settings.json_path(), json.as_bytes())?;

    tracing::info!(
        settings = data.meta.total_settings,
        with_wiki_page = data.meta.with_wiki_page,
        path = %settings.json_path().display(),
        "generated wiki data"
    );
    Ok(data)
}

/// Read-only lookup over the generated data.
#[derive(Debug, Clone, Default)]
pub struct WikiIndex {
    data: WikiData,
    base: String,
}

impl WikiIndex {
    /// Load the index, falling back to an empty one on any failure.
    pub fn load(settings: &WikiSettings) -> Self {
        match Self::try_load(settings) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(error = %e, "wiki data unavailable");
                Self::empty()
            }
        }
    }

    /// Load the index, generating the JSON first when only the sources exist.
    pub fn try_load(settings: &WikiSettings) -> Result<Self, WikiError> {
        let path = settings.json_path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "wiki data missing, generating from sources");
            let data = generate_json(settings)?;
            return Ok(Self::from_data(data, &settings.base));
        }

        let text = std::fs::read_to_string(&path).map_err(|e| WikiError::io(&path, e))?;
        let data: WikiData = serde_json::from_str(&text)?;
        tracing::debug!(settings = data.settings.len(), "loaded wiki data");
        Ok(Self::from_data(data, &settings.base))
    }

    /// `base` is used when the data does not record its own wiki base.
    pub fn from_data(data: WikiData, base: &str) -> Self {
        let base = if data.meta.wiki_base.is_empty() {
            base.to_string()
        } else {
            data.meta.wiki_base.clone()
        };
        Self { data, base }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn info(&self, key: &str) -> Option<&SettingInfo> {
        self.data.settings.get(key)
    }

    /// Wiki page URL for `key`, if it has one.
    pub fn url(&self, key: &str) -> Option<String> {
        let page = self.info(key)?.wiki_page.as_deref()?;
        Some(format!("{}{}", self.base, page))
    }

    pub fn meta(&self) -> &WikiMeta {
        &self.data.meta
    }

    pub fn len(&self) -> usize {
        self.data.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.settings.is_empty()
    }
}
