//! Diff computer.

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;
use crate::resolve::ResolvedTree;
use crate::scope::ScopeId;

/// What a custom value replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriorValue {
    /// The parent's effective value.
    Inherited(String),

    /// No scope above defined the key. Serialized as `null`.
    Unset,
}

impl PriorValue {
    pub fn as_deref(&self) -> Option<&str> {
        match self {
            PriorValue::Inherited(v) => Some(v),
            PriorValue::Unset => None,
        }
    }
}

/// One override explained: the new value and the value it replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub key: String,
    pub custom_value: String,
    pub overridden_value: PriorValue,
}

/// Every custom key of scope `id`, in the insertion order of its raw
/// overrides. Reads the finalized maps only; nothing is re-resolved.
pub fn diff_scope(resolved: &ResolvedTree, id: ScopeId) -> Result<Vec<DiffEntry>, ResolveError> {
    let scope = resolved.scope(id)?;
    let effective = resolved.effective(id)?;

    let mut entries = Vec::new();
    for key in scope.raw_overrides.keys() {
        let Some(current) = effective.get(key) else {
            continue;
        };
        if !current.is_custom {
            continue;
        }
        let overridden_value = match resolved.parent_value(id, key)? {
            Some(prev) => PriorValue::Inherited(prev.value.clone()),
            None => PriorValue::Unset,
        };
        entries.push(DiffEntry {
            key: key.to_string(),
            custom_value: current.value.clone(),
            overridden_value,
        });
    }

    Ok(entries)
}
