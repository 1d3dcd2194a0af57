//! Scope hierarchy builder.
//!
//! Combines the structural listing (which plates hold which objects, which
//! objects are split into parts) with the override sets keyed by entity.
//! Every override set must land on a declared entity; anything left over is a
//! `MalformedHierarchy`. Cycles cannot be expressed by the listing shape.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use crate::error::ResolveError;
use crate::scope::{ScopeId, ScopeKind, ScopeMeta, ScopeTree};
use crate::settings::RawSettings;

/// A part of a compound object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartDecl {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub filament: Option<String>,
}

/// An object placed on a plate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDecl {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub filament: Option<String>,
    #[serde(default)]
    pub parts: Vec<PartDecl>,
}

/// A build plate and its objects in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateDecl {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub objects: Vec<ObjectDecl>,
}

/// Ordered plates -> objects -> parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralListing {
    pub plates: Vec<PlateDecl>,
}

/// Entity an override set is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityRef {
    Plate { plate: String },
    Object { object: String },
    Part { object: String, part: String },
}

impl EntityRef {
    pub fn plate(id: impl Into<String>) -> Self {
        EntityRef::Plate { plate: id.into() }
    }

    pub fn object(id: impl Into<String>) -> Self {
        EntityRef::Object { object: id.into() }
    }

    pub fn part(object: impl Into<String>, part: impl Into<String>) -> Self {
        EntityRef::Part {
            object: object.into(),
            part: part.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Plate { plate } => write!(f, "plate {}", plate),
            EntityRef::Object { object } => write!(f, "object {}", object),
            EntityRef::Part { object, part } => write!(f, "part {} of object {}", part, object),
        }
    }
}

/// Override sets keyed by the entity they belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideSets {
    sets: BTreeMap<EntityRef, RawSettings>,
}

impl OverrideSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach overrides to an entity. Empty sets are not recorded; a second
    /// set for the same entity extends the first.
    pub fn insert(&mut self, entity: EntityRef, overrides: RawSettings) {
        if overrides.is_empty() {
            return;
        }
        let slot = self.sets.entry(entity).or_default();
        for (k, v) in overrides.iter() {
            slot.insert(k, v);
        }
    }

    pub fn get(&self, entity: &EntityRef) -> Option<&RawSettings> {
        self.sets.get(entity)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityRef> {
        self.sets.keys()
    }
}

/// Builds a [`ScopeTree`] from one profile set, a listing and override sets.
#[derive(Debug, Clone, Default)]
pub struct HierarchyBuilder {
    profile: RawSettings,
    listing: StructuralListing,
    overrides: OverrideSets,
}

impl HierarchyBuilder {
    pub fn new(profile: RawSettings) -> Self {
        Self {
            profile,
            ..Default::default()
        }
    }

    pub fn listing(mut self, listing: StructuralListing) -> Self {
        self.listing = listing;
        self
    }

    pub fn overrides(mut self, overrides: OverrideSets) -> Self {
        self.overrides = overrides;
        self
    }

    /// Assemble the tree.
    ///
    /// An object placed several times (copies on one or more plates) becomes
    /// one scope per placement, each carrying the same override set.
    pub fn build(self) -> Result<ScopeTree, ResolveError> {
        let HierarchyBuilder {
            profile,
            listing,
            overrides,
        } = self;

        let mut tree = ScopeTree::with_profile(profile);
        let mut used: BTreeSet<&EntityRef> = BTreeSet::new();
        let mut plate_ids: HashSet<&str> = HashSet::new();

        for plate in &listing.plates {
            if !plate_ids.insert(plate.id.as_str()) {
                return Err(ResolveError::malformed(
                    EntityRef::plate(&plate.id),
                    "plate declared more than once",
                ));
            }
            let plate_scope = tree.push_child(
                ScopeId::ROOT,
                ScopeKind::Plate,
                ScopeMeta {
                    id: Some(plate.id.clone()),
                    name: plate.name.clone(),
                    filament: None,
                },
                take(&overrides, EntityRef::plate(&plate.id), &mut used),
            );

            for object in &plate.objects {
                let object_scope = tree.push_child(
                    plate_scope,
                    ScopeKind::Object,
                    ScopeMeta {
                        id: Some(object.id.clone()),
                        name: object.name.clone(),
                        filament: object.filament.clone(),
                    },
                    take(&overrides, EntityRef::object(&object.id), &mut used),
                );

                let mut part_ids: HashSet<&str> = HashSet::new();
                for part in &object.parts {
                    if !part_ids.insert(part.id.as_str()) {
                        return Err(ResolveError::malformed(
                            EntityRef::part(&object.id, &part.id),
                            "part declared more than once in the same object",
                        ));
                    }
                    tree.push_child(
                        object_scope,
                        ScopeKind::Part,
                        ScopeMeta {
                            id: Some(part.id.clone()),
                            name: part.name.clone(),
                            filament: part.filament.clone(),
                        },
                        take(&overrides, EntityRef::part(&object.id, &part.id), &mut used),
                    );
                }
            }
        }

        if let Some(orphan) = overrides.entities().find(|e| !used.contains(e)) {
            return Err(ResolveError::malformed(
                orphan,
                "override data references an entity missing from the structural listing",
            ));
        }

        Ok(tree)
    }
}

/// Clone the override set for `entity` (empty if none) and mark it consumed.
fn take<'a>(
    overrides: &'a OverrideSets,
    entity: EntityRef,
    used: &mut BTreeSet<&'a EntityRef>,
) -> RawSettings {
    match overrides.sets.get_key_value(&entity) {
        Some((key, set)) => {
            used.insert(key);
            set.clone()
        }
        None => RawSettings::new(),
    }
}
