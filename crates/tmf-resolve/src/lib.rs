//! Settings resolution and diff engine for 3MF slicer projects.
//!
//! A project is a tree of scopes: the profile (printer/process/filament
//! presets as saved in the project) at the root, then plates, objects and
//! parts. Each scope may override settings of its parent. This crate builds
//! that tree from already-parsed data, resolves the effective value of every
//! key at every scope, flags the values that deviate from the parent, and
//! explains each deviation as a diff entry.
//!
//! Nothing here reads files or parses document formats.

mod builder;
mod category;
mod diff;
mod error;
mod normalize;
mod report;
mod resolve;
mod scope;
mod settings;

pub use builder::{
    EntityRef, HierarchyBuilder, ObjectDecl, OverrideSets, PartDecl, PlateDecl, StructuralListing,
};
pub use category::{classify, Category, CategoryGroup, CategoryPartition};
pub use diff::{diff_scope, DiffEntry, PriorValue};
pub use error::ResolveError;
pub use normalize::Normalization;
pub use report::{ResolvedReport, ScopeReport, REPORT_SCHEMA_ID};
pub use resolve::{EffectiveMap, EffectiveValue, ResolvedTree, Resolver};
pub use scope::{Scope, ScopeId, ScopeKind, ScopeMeta, ScopeTree};
pub use settings::RawSettings;

/// Build and resolve in one step.
pub fn resolve(builder: HierarchyBuilder, normalization: Normalization) -> Result<ResolvedTree, ResolveError> {
    let tree = builder.build()?;
    Ok(Resolver::new(normalization).resolve(tree))
}
