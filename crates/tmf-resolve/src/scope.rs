//! Scope tree types.
//!
//! Scopes live in an arena owned by [`ScopeTree`]; edges are indices. The
//! root (index 0) is always the profile scope. Trees are only produced by
//! [`crate::HierarchyBuilder`], which appends children after their parent,
//! so every parent index is smaller than its children's.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ResolveError;
use crate::settings::RawSettings;

/// Level of a scope in the override hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Profile,
    Plate,
    Object,
    Part,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Profile => "profile",
            ScopeKind::Plate => "plate",
            ScopeKind::Object => "object",
            ScopeKind::Part => "part",
        }
    }

    /// The only kind allowed directly above this one.
    pub fn parent_kind(&self) -> Option<ScopeKind> {
        match self {
            ScopeKind::Profile => None,
            ScopeKind::Plate => Some(ScopeKind::Profile),
            ScopeKind::Object => Some(ScopeKind::Plate),
            ScopeKind::Part => Some(ScopeKind::Object),
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of a scope inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(usize);

impl ScopeId {
    /// The profile root of every tree.
    pub const ROOT: ScopeId = ScopeId(0);

    pub const fn new(index: usize) -> Self {
        ScopeId(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifying data passed through unchanged for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeMeta {
    /// Identifier in the source document (plate id, object id, part id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Filament (extruder) index as written in the source document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filament: Option<String>,
}

/// A node of the override hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub meta: ScopeMeta,
    pub raw_overrides: RawSettings,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
}

/// Immutable tree of scopes rooted at the profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub(crate) fn with_profile(profile: RawSettings) -> Self {
        Self {
            scopes: vec![Scope {
                id: ScopeId::ROOT,
                kind: ScopeKind::Profile,
                meta: ScopeMeta::default(),
                raw_overrides: profile,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Append a child under an existing scope and return its id.
    pub(crate) fn push_child(
        &mut self,
        parent: ScopeId,
        kind: ScopeKind,
        meta: ScopeMeta,
        raw_overrides: RawSettings,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            id,
            kind,
            meta,
            raw_overrides,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.scopes[parent.0].children.push(id);
        id
    }

    pub fn root(&self) -> &Scope {
        &self.scopes[0]
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0)
    }

    /// Like [`ScopeTree::get`] but reports an unknown id as `MissingScope`.
    pub fn scope(&self, id: ScopeId) -> Result<&Scope, ResolveError> {
        self.get(id).ok_or(ResolveError::MissingScope(id))
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// All scopes in arena order (parents before children).
    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    pub fn children(&self, id: ScopeId) -> impl Iterator<Item = &Scope> {
        self.get(id)
            .map(|s| s.children.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|child| &self.scopes[child.0])
    }

    /// The scope itself followed by each ancestor up to the root.
    pub fn ancestry(&self, id: ScopeId) -> impl Iterator<Item = &Scope> {
        std::iter::successors(self.get(id), |s| s.parent.and_then(|p| self.get(p)))
    }

    pub fn plates(&self) -> impl Iterator<Item = &Scope> {
        self.children(ScopeId::ROOT)
    }
}
