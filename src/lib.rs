//! tmf-settings - inspect the slicer settings saved in 3MF projects
//!
//! Reads the project and model config documents out of a `.3mf` archive,
//! resolves every plate, object and part against the profile with
//! [`tmf_resolve`], and reports which values were customized and what they
//! replaced.

pub mod analyze;
pub mod archive;
pub mod config;
pub mod logging;
pub mod model;
pub mod project;
pub mod render;
pub mod wiki;

pub use analyze::{AnalysisReport, AnalyzeError, AnalyzeOptions, Analyzer};
pub use archive::{ArchiveError, ProjectArchive};
pub use config::{ConfigError, EffectiveConfig};
pub use render::{render, RenderOptions};
pub use wiki::{WikiError, WikiIndex, WikiSettings};
