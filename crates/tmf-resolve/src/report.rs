//! Serializable mirror of a resolved tree.

use serde::{Deserialize, Serialize};

use crate::diff::DiffEntry;
use crate::error::ResolveError;
use crate::normalize::Normalization;
use crate::resolve::{EffectiveMap, ResolvedTree};
use crate::scope::{ScopeId, ScopeKind, ScopeMeta};
use crate::settings::RawSettings;

/// Schema identifier carried by every report.
pub const REPORT_SCHEMA_ID: &str = "tmf-settings/resolved_report@1";

/// One scope with its overrides, effective map and diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeReport {
    pub scope: ScopeId,
    pub kind: ScopeKind,
    #[serde(flatten)]
    pub meta: ScopeMeta,
    pub overrides: RawSettings,
    pub effective: EffectiveMap,
    pub diff: Vec<DiffEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ScopeReport>,
}

/// The whole resolved tree, ready for JSON export or rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedReport {
    pub schema_id: String,
    pub normalization: Normalization,
    pub root: ScopeReport,
}

impl ResolvedReport {
    /// Depth-first walk, parents before children.
    pub fn scopes(&self) -> Vec<&ScopeReport> {
        let mut out = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(scope) = stack.pop() {
            out.push(scope);
            stack.extend(scope.children.iter().rev());
        }
        out
    }

    pub fn plates(&self) -> &[ScopeReport] {
        &self.root.children
    }
}

impl ResolvedTree {
    /// Build the serializable report for the whole tree.
    pub fn report(&self) -> Result<ResolvedReport, ResolveError> {
        Ok(ResolvedReport {
            schema_id: REPORT_SCHEMA_ID.to_string(),
            normalization: self.normalization(),
            root: self.scope_report(ScopeId::ROOT)?,
        })
    }

    /// Report for the subtree rooted at `id`.
    pub fn scope_report(&self, id: ScopeId) -> Result<ScopeReport, ResolveError> {
        let scope = self.scope(id)?;
        let children = scope
            .children
            .iter()
            .map(|child| self.scope_report(*child))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ScopeReport {
            scope: id,
            kind: scope.kind,
            meta: scope.meta.clone(),
            overrides: scope.raw_overrides.clone(),
            effective: self.effective(id)?.clone(),
            diff: self.diff(id)?,
            children,
        })
    }
}
