//! Built-in defaults (lowest layer)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_WIKI_BASE: &str = "https://github.com/OrcaSlicer/OrcaSlicer/wiki/";

/// Built-in configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Value comparison policy (default: "exact")
    pub normalize: String,

    /// Wiki URL prefix joined with each setting's page
    pub wiki_base: String,

    /// GitHub repository the slicer sources are fetched from
    pub repo_owner: String,
    pub repo_name: String,
    pub branch: String,

    /// Connect timeout for source downloads (default: 10)
    pub api_timeout_seconds: u64,

    /// Whole-request timeout for source downloads (default: 30)
    pub download_timeout_seconds: u64,

    /// Where the slicer sources and `settings_wiki.json` live
    pub data_dir: PathBuf,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            normalize: "exact".to_string(),
            wiki_base: DEFAULT_WIKI_BASE.to_string(),
            repo_owner: "OrcaSlicer".to_string(),
            repo_name: "OrcaSlicer".to_string(),
            branch: "main".to_string(),
            api_timeout_seconds: 10,
            download_timeout_seconds: 30,
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("tmf-settings"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

impl BuiltinDefaults {
    /// Layer value in the merged config shape
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "normalize": self.normalize,
            "wiki": {
                "base": self.wiki_base,
                "repo_owner": self.repo_owner,
                "repo_name": self.repo_name,
                "branch": self.branch,
                "api_timeout_seconds": self.api_timeout_seconds,
                "download_timeout_seconds": self.download_timeout_seconds,
                "data_dir": self.data_dir.to_string_lossy(),
            }
        })
    }
}
