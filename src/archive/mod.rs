//! 3MF archive access
//!
//! A 3MF project is a ZIP container. Only the two slicer config documents
//! under `Metadata/` are read, straight into memory; nothing is extracted
//! to disk. Every entry name is validated up front so a crafted archive is
//! rejected as a whole.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Component, Path, PathBuf};

use zip::ZipArchive;

/// Global settings document (JSON)
pub const PROJECT_SETTINGS_PATH: &str = "Metadata/project_settings.config";

/// Per-object and per-plate settings document (XML)
pub const MODEL_SETTINGS_PATH: &str = "Metadata/model_settings.config";

/// Errors that can occur when reading a project archive
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid or corrupted 3MF archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("unsafe path in archive: {0}")]
    UnsafeEntry(String),

    #[error("failed to read {entry}: {source}")]
    Read {
        entry: String,
        #[source]
        source: std::io::Error,
    },
}

/// The config documents of one project archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectArchive {
    pub project_settings: Option<String>,
    pub model_settings: Option<String>,
}

impl ProjectArchive {
    /// Open `path` and read both config documents.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let has_3mf_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("3mf"));
        if !has_3mf_extension {
            tracing::warn!(path = %path.display(), "file does not have a .3mf extension");
        }

        let file = File::open(path).map_err(|source| ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "opening archive");
        Self::from_reader(BufReader::new(file))
    }

    /// Read both config documents from any seekable ZIP source.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, ArchiveError> {
        let mut archive = ZipArchive::new(reader)?;

        for name in archive.file_names() {
            validate_entry_name(name)?;
        }

        let project_settings = read_entry(&mut archive, PROJECT_SETTINGS_PATH)?;
        if project_settings.is_none() {
            tracing::warn!("project settings not found: {}", PROJECT_SETTINGS_PATH);
        }

        let model_settings = read_entry(&mut archive, MODEL_SETTINGS_PATH)?;
        if model_settings.is_none() {
            tracing::warn!("model settings not found: {}", MODEL_SETTINGS_PATH);
        }

        Ok(Self {
            project_settings,
            model_settings,
        })
    }
}

/// Reject absolute names and any `..` component.
pub fn validate_entry_name(name: &str) -> Result<(), ArchiveError> {
    let unsafe_entry = || ArchiveError::UnsafeEntry(name.to_string());

    if name.starts_with('/') || name.starts_with('\\') {
        return Err(unsafe_entry());
    }
    // drive prefix such as `C:`
    let bytes = name.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        return Err(unsafe_entry());
    }

    let normalized = name.replace('\\', "/");
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_entry());
            }
        }
    }
    Ok(())
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, ArchiveError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|source| ArchiveError::Read {
            entry: name.to_string(),
            source,
        })?;

    // Slicers write UTF-8; anything else is replaced rather than rejected
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(entry = name, "config document is not valid UTF-8");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };
    tracing::debug!(entry = name, bytes = text.len(), "read config document");
    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_reads_both_documents() {
        let bytes = zip_bytes(&[
            (PROJECT_SETTINGS_PATH, b"{\"layer_height\": \"0.2\"}"),
            (MODEL_SETTINGS_PATH, b"<config/>"),
            ("3D/3dmodel.model", b"<model/>"),
        ]);
        let archive = ProjectArchive::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.project_settings.as_deref(), Some("{\"layer_height\": \"0.2\"}"));
        assert_eq!(archive.model_settings.as_deref(), Some("<config/>"));
    }

    #[test]
    fn test_missing_documents_are_none() {
        let bytes = zip_bytes(&[("3D/3dmodel.model", b"<model/>")]);
        let archive = ProjectArchive::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(archive, ProjectArchive::default());
    }

    #[test]
    fn test_not_a_zip() {
        let result = ProjectArchive::from_reader(Cursor::new(b"plain text".to_vec()));
        assert!(matches!(result, Err(ArchiveError::Zip(_))));
    }

    #[test]
    fn test_entry_name_validation() {
        assert!(validate_entry_name("Metadata/project_settings.config").is_ok());
        assert!(validate_entry_name("./3D/model.model").is_ok());

        for bad in [
            "/etc/passwd",
            "\\windows\\system32",
            "C:/evil.txt",
            "../../../etc/passwd",
            "Metadata/../../escape",
            "Metadata\\..\\..\\escape",
        ] {
            assert!(
                matches!(validate_entry_name(bad), Err(ArchiveError::UnsafeEntry(_))),
                "{} accepted",
                bad
            );
        }
    }

    #[test]
    fn test_traversal_entry_rejects_archive() {
        let bytes = zip_bytes(&[
            (PROJECT_SETTINGS_PATH, b"{}"),
            ("../../../etc/passwd", b"malicious"),
        ]);
        let result = ProjectArchive::from_reader(Cursor::new(bytes));
        assert!(matches!(result, Err(ArchiveError::UnsafeEntry(_))));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let bytes = zip_bytes(&[(PROJECT_SETTINGS_PATH, b"{\"name\": \"\xff\"}")]);
        let archive = ProjectArchive::from_reader(Cursor::new(bytes)).unwrap();
        assert!(archive.project_settings.unwrap().contains('\u{FFFD}'));
    }
}
