//! Resolution engine.
//!
//! Computes the effective value of every key at every scope. Resolution runs
//! over a FIFO worklist seeded with the profile root; a scope's children are
//! enqueued only once its own map is stored, so every scope reads a finalized
//! parent map regardless of how siblings are ordered.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::diff::{diff_scope, DiffEntry};
use crate::error::ResolveError;
use crate::normalize::Normalization;
use crate::scope::{Scope, ScopeId, ScopeKind, ScopeTree};

/// The value of a key at one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveValue {
    pub value: String,

    /// Kind of the nearest scope that defines the key.
    pub origin: ScopeKind,

    /// Defined here with a value different from the parent's effective value.
    pub is_custom: bool,
}

/// Key -> effective value for one scope. Keys no scope defines are absent.
pub type EffectiveMap = BTreeMap<String, EffectiveValue>;

/// Runs resolution under a normalization policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver {
    normalization: Normalization,
}

impl Resolver {
    pub fn new(normalization: Normalization) -> Self {
        Self { normalization }
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Resolve every scope of `tree`, parents strictly before children.
    pub fn resolve(&self, tree: ScopeTree) -> ResolvedTree {
        let mut slots: Vec<Option<EffectiveMap>> = vec![None; tree.len()];
        let mut queue: VecDeque<ScopeId> = VecDeque::from([ScopeId::ROOT]);

        while let Some(id) = queue.pop_front() {
            let Some(scope) = tree.get(id) else {
                continue;
            };
            let parent_map = scope.parent.and_then(|p| slots[p.index()].as_ref());
            let map = match parent_map {
                Some(parent_map) => self.apply_overrides(parent_map, scope),
                None => baseline(scope),
            };
            slots[id.index()] = Some(map);
            queue.extend(scope.children.iter().copied());
        }

        ResolvedTree {
            effective: slots.into_iter().map(Option::unwrap_or_default).collect(),
            tree,
            normalization: self.normalization,
        }
    }

    fn apply_overrides(&self, parent_map: &EffectiveMap, scope: &Scope) -> EffectiveMap {
        let mut map: EffectiveMap = parent_map
            .iter()
            .map(|(key, inherited)| {
                (
                    key.clone(),
                    EffectiveValue {
                        is_custom: false,
                        ..inherited.clone()
                    },
                )
            })
            .collect();

        for (key, value) in scope.raw_overrides.iter() {
            let is_custom = match parent_map.get(key) {
                Some(prev) => !self.normalization.same(&prev.value, value),
                None => true,
            };
            map.insert(
                key.to_string(),
                EffectiveValue {
                    value: value.to_string(),
                    origin: scope.kind,
                    is_custom,
                },
            );
        }

        map
    }
}

/// The root's map: its own settings, never custom.
fn baseline(scope: &Scope) -> EffectiveMap {
    scope
        .raw_overrides
        .iter()
        .map(|(key, value)| {
            (
                key.to_string(),
                EffectiveValue {
                    value: value.to_string(),
                    origin: scope.kind,
                    is_custom: false,
                },
            )
        })
        .collect()
}

/// A scope tree with the effective map of every scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTree {
    tree: ScopeTree,
    effective: Vec<EffectiveMap>,
    normalization: Normalization,
}

impl ResolvedTree {
    pub fn tree(&self) -> &ScopeTree {
        &self.tree
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn scope(&self, id: ScopeId) -> Result<&Scope, ResolveError> {
        self.tree.scope(id)
    }

    pub fn effective(&self, id: ScopeId) -> Result<&EffectiveMap, ResolveError> {
        self.effective
            .get(id.index())
            .ok_or(ResolveError::MissingScope(id))
    }

    /// Effective value of `key` at `id`; `Ok(None)` when no scope defines it.
    pub fn value(&self, id: ScopeId, key: &str) -> Result<Option<&EffectiveValue>, ResolveError> {
        Ok(self.effective(id)?.get(key))
    }

    /// Effective value of `key` at the parent of `id`. `Ok(None)` for the
    /// root or when the parent has no value.
    pub fn parent_value(&self, id: ScopeId, key: &str) -> Result<Option<&EffectiveValue>, ResolveError> {
        match self.scope(id)?.parent {
            Some(parent) => self.value(parent, key),
            None => Ok(None),
        }
    }

    /// Keys flagged custom at `id`, in raw override order.
    pub fn diff(&self, id: ScopeId) -> Result<Vec<DiffEntry>, ResolveError> {
        diff_scope(self, id)
    }

    pub fn into_tree(self) -> ScopeTree {
        self.tree
    }
}
