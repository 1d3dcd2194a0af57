//! Refresh the slicer sources from GitHub.

use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use super::{generate_json, SourceFile, WikiData, WikiError, WikiSettings};

/// Length of the stored content hash prefix
pub const SHA_PREFIX_LEN: usize = 12;

/// Source of remote file contents.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, WikiError>;
}

/// Blocking HTTPS fetcher.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Result<Self, WikiError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .user_agent(concat!("tmf-settings/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn from_settings(settings: &WikiSettings) -> Result<Self, WikiError> {
        Self::new(settings.api_timeout, settings.download_timeout)
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, WikiError> {
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Sources changed (or were forced) and the JSON was regenerated
    Updated,
    UpToDate,
}

/// First [`SHA_PREFIX_LEN`] hex digits of the SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hex = hex::encode(Sha256::digest(bytes));
    hex.truncate(SHA_PREFIX_LEN);
    hex
}

/// Download `url` over HTTPS, rejecting HTML error pages.
pub fn download(fetcher: &dyn Fetch, url: &str) -> Result<Vec<u8>, WikiError> {
    if !url.starts_with("https://") {
        return Err(WikiError::InsecureUrl(url.to_string()));
    }
    let content = fetcher.fetch(url)?;
    if content.starts_with(b"<!DOCTYPE") || content.starts_with(b"<html") {
        return Err(WikiError::HtmlResponse(url.to_string()));
    }
    Ok(content)
}

/// Write through a temp file in the target directory, then rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), WikiError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|source| WikiError::io(dir, source))?;

    let mut tmp = tempfile::Builder::new()
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|source| WikiError::io(dir, source))?;
    tmp.write_all(bytes).map_err(|source| WikiError::io(tmp.path(), source))?;
    tmp.persist(path)
        .map_err(|e| WikiError::io(path, e.error))?;
    Ok(())
}

/// Bring local sources and `settings_wiki.json` up to date.
///
/// Without `force`, each source is downloaded and compared by content
/// hash with the hashes recorded in the JSON; only changed files are
/// written and the JSON is regenerated only if something changed. Missing
/// local sources trigger a full download.
pub fn update(settings: &WikiSettings, fetcher: &dyn Fetch, force: bool) -> Result<UpdateOutcome, WikiError> {
    let missing = SourceFile::ALL
        .iter()
        .find(|s| !settings.source_path(**s).exists());

    if force || missing.is_some() {
        if let Some(source) = missing {
            tracing::debug!(file = source.file_name(), "local source missing, downloading all");
        }
        for source in SourceFile::ALL {
            let url = settings.raw_url(source);
            tracing::debug!(%url, "downloading");
            let content = download(fetcher, &url)?;
            write_atomic(&settings.source_path(source), &content)?;
        }
        generate_json(settings)?;
        return Ok(UpdateOutcome::Updated);
    }

    let stored = stored_hashes(&settings.json_path());
    let mut changed = false;
    for source in SourceFile::ALL {
        let url = settings.raw_url(source);
        let content = download(fetcher, &url)?;
        let hash = content_hash(&content);

        if stored.get(source.file_name()) == Some(&hash) {
            tracing::debug!(file = source.file_name(), "up to date");
            continue;
        }
        write_atomic(&settings.source_path(source), &content)?;
        tracing::debug!(file = source.file_name(), %hash, "content changed");
        changed = true;
    }

    if !changed {
        return Ok(UpdateOutcome::UpToDate);
    }
    generate_json(settings)?;
    Ok(UpdateOutcome::Updated)
}

fn stored_hashes(json_path: &Path) -> std::collections::BTreeMap<String, String> {
    std::fs::read_to_string(json_path)
        .ok()
        .and_then(|text| serde_json::from_str::<WikiData>(&text).ok())
        .map(|data| data.meta.sha)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const PRINT_CONFIG: &str = r#"
    def = this->add("layer_height", coFloat);
    def->label = L("Layer height");
    def->set_default_value(new ConfigOptionFloat(0.2));
"#;
    const TAB: &str = r#"optgroup->append_single_option_line("layer_height", "quality_settings_layer_height");"#;

    struct FakeFetcher {
        files: RefCell<HashMap<String, Vec<u8>>>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeFetcher {
        fn new(settings: &WikiSettings, tab: &str, config: &str) -> Self {
            let files = [
                (settings.raw_url(SourceFile::Tab), tab.as_bytes().to_vec()),
                (settings.raw_url(SourceFile::PrintConfig), config.as_bytes().to_vec()),
            ]
            .into_iter()
            .collect();
            Self {
                files: RefCell::new(files),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Fetch for FakeFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, WikiError> {
            self.calls.borrow_mut().push(url.to_string());
            self.files
                .borrow()
                .get(url)
                .cloned()
                .ok_or_else(|| WikiError::HtmlResponse(url.to_string()))
        }
    }

    fn settings(dir: &TempDir) -> WikiSettings {
        WikiSettings {
            data_dir: dir.path().to_path_buf(),
            ..WikiSettings::default()
        }
    }

    #[test]
    fn test_content_hash_prefix() {
        let hash = content_hash(b"hello");
        assert_eq!(hash, "2cf24dba5fb0");
    }

    #[test]
    fn test_rejects_plain_http() {
        let dir = TempDir::new().unwrap();
        let fetcher = FakeFetcher::new(&settings(&dir), TAB, PRINT_CONFIG);
        let err = download(&fetcher, "http://example.com/Tab.cpp").unwrap_err();
        assert!(matches!(err, WikiError::InsecureUrl(_)));
        assert!(fetcher.calls.borrow().is_empty());
    }

    #[test]
    fn test_rejects_html_page() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        let fetcher = FakeFetcher::new(&settings, "<!DOCTYPE html><html></html>", PRINT_CONFIG);
        let err = update(&settings, &fetcher, false).unwrap_err();
        assert!(matches!(err, WikiError::HtmlResponse(_)));
        assert!(!settings.json_path().exists());
    }

    #[test]
    fn test_first_update_downloads_and_generates() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        let fetcher = FakeFetcher::new(&settings, TAB, PRINT_CONFIG);

        assert_eq!(update(&settings, &fetcher, false).unwrap(), UpdateOutcome::Updated);
        assert!(settings.source_path(SourceFile::Tab).exists());

        let data: WikiData =
            serde_json::from_str(&std::fs::read_to_string(settings.json_path()).unwrap()).unwrap();
        assert_eq!(data.meta.sha["Tab.cpp"], content_hash(TAB.as_bytes()));
        assert_eq!(
            data.settings["layer_height"].wiki_page.as_deref(),
            Some("quality_settings_layer_height")
        );
    }

    #[test]
    fn test_unchanged_sources_are_up_to_date() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        let fetcher = FakeFetcher::new(&settings, TAB, PRINT_CONFIG);

        update(&settings, &fetcher, false).unwrap();
        assert_eq!(update(&settings, &fetcher, false).unwrap(), UpdateOutcome::UpToDate);
        assert_eq!(update(&settings, &fetcher, true).unwrap(), UpdateOutcome::Updated);
    }

    #[test]
    fn test_changed_source_regenerates() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        let fetcher = FakeFetcher::new(&settings, TAB, PRINT_CONFIG);
        update(&settings, &fetcher, false).unwrap();

        let new_tab = r#"optgroup->append_single_option_line("layer_height", "new_page");"#;
        fetcher
            .files
            .borrow_mut()
            .insert(settings.raw_url(SourceFile::Tab), new_tab.as_bytes().to_vec());

        assert_eq!(update(&settings, &fetcher, false).unwrap(), UpdateOutcome::Updated);
        let data: WikiData =
            serde_json::from_str(&std::fs::read_to_string(settings.json_path()).unwrap()).unwrap();
        assert_eq!(data.settings["layer_height"].wiki_page.as_deref(), Some("new_page"));
    }

    #[test]
    fn test_write_atomic_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("file.txt");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
    }
}
