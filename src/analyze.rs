//! Analysis pipeline
//!
//! archive -> project settings -> model settings -> scope tree -> resolved
//! report. The result is the `--json` payload and the renderer's input.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tmf_resolve::{HierarchyBuilder, Normalization, RawSettings, ResolveError, ResolvedReport};

use crate::archive::{ArchiveError, ProjectArchive};
use crate::model::{ModelError, ModelSettings};
use crate::project::{ProfileIdentity, ProjectError, ProjectSettings};

/// Errors that can occur while analyzing a project
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("inconsistent model settings: {0}")]
    Resolve(#[from] ResolveError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeOptions {
    pub normalization: Normalization,
}

/// Everything known about one project file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// File name without directories
    pub file: String,
    pub profile: ProfileIdentity,

    /// Settings the slicer flagged as changed from the system presets
    pub custom_global: RawSettings,

    pub tree: ResolvedReport,
}

impl AnalysisReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    options: AnalyzeOptions,
}

impl Analyzer {
    pub fn new(options: AnalyzeOptions) -> Self {
        Self { options }
    }

    pub fn analyze(&self, path: &Path) -> Result<AnalysisReport, AnalyzeError> {
        tracing::debug!(path = %path.display(), "starting analysis");
        let archive = ProjectArchive::open(path)?;
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.analyze_archive(file, archive)
    }

    /// Analyze already-read config documents.
    pub fn analyze_archive(&self, file: String, archive: ProjectArchive) -> Result<AnalysisReport, AnalyzeError> {
        let project = match archive.project_settings.as_deref() {
            Some(text) => ProjectSettings::parse(text)?,
            None => ProjectSettings::default(),
        };
        let model = match archive.model_settings.as_deref() {
            Some(text) => ModelSettings::parse(text)?,
            None => ModelSettings::default(),
        };

        let profile = project.identity().clone();
        let custom_global = project.custom_global();
        let (listing, overrides) = model.into_structure();

        let resolved = tmf_resolve::resolve(
            HierarchyBuilder::new(project.into_settings())
                .listing(listing)
                .overrides(overrides),
            self.options.normalization,
        )?;
        let tree = resolved.report()?;

        tracing::debug!(
            scopes = resolved.tree().len(),
            plates = tree.plates().len(),
            "analysis complete"
        );

        Ok(AnalysisReport {
            file,
            profile,
            custom_global,
            tree,
        })
    }
}
