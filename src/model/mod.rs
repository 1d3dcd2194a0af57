//! Model settings document
//!
//! `Metadata/model_settings.config` is XML:
//!
//! ```text
//! <config>
//!   <object id="1">
//!     <metadata key="name" value="Gear"/>
//!     <metadata key="wall_loops" value="4"/>
//!     <part id="0" subtype="normal_part">
//!       <metadata key="name" value="hub"/>
//!     </part>
//!   </object>
//!   <plate>
//!     <metadata key="plater_id" value="1"/>
//!     <model_instance>
//!       <metadata key="object_id" value="1"/>
//!       <metadata key="identify_id" value="42"/>
//!     </model_instance>
//!   </plate>
//! </config>
//! ```
//!
//! Every `<metadata>` that is not bookkeeping is a setting override of the
//! element that directly contains it.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use tmf_resolve::{EntityRef, ObjectDecl, OverrideSets, PartDecl, PlateDecl, RawSettings, StructuralListing};

/// Object and part keys that describe geometry or identity, never settings.
pub const SYSTEM_KEYS: &[&str] = &[
    "name",
    "matrix",
    "extruder",
    "face_count",
    "source_object_id",
    "source_volume_id",
    "source_offset_x",
    "source_offset_y",
    "source_offset_z",
];

/// Plate keys the slicer uses for its own bookkeeping.
pub const PLATE_KEYS: &[&str] = &[
    "plater_id",
    "plater_name",
    "locked",
    "thumbnail_file",
    "thumbnail_no_light_file",
    "top_file",
    "pick_file",
    "gcode_file",
    "pattern_bbox_file",
    "filament_map_mode",
    "filament_maps",
];

pub const DEFAULT_EXTRUDER: &str = "1";

/// Errors that can occur when parsing the model settings document
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to parse model settings (invalid XML) at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("failed to parse model settings (invalid XML): unclosed <{0}>")]
    Unclosed(String),
}

/// A `<part>` of an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartEntry {
    pub id: String,
    pub name: Option<String>,
    pub extruder: Option<String>,
    pub overrides: RawSettings,
}

/// An `<object>` description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub id: String,
    pub name: Option<String>,
    pub extruder: String,
    pub overrides: RawSettings,
    pub parts: Vec<PartEntry>,
}

/// A `<model_instance>` placing an object on a plate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instance {
    pub object_id: Option<String>,
    pub identify_id: i64,
}

/// A `<plate>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlateEntry {
    pub id: Option<String>,
    pub name: Option<String>,
    pub overrides: RawSettings,
    pub instances: Vec<Instance>,
}

/// Everything read from the model settings document, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSettings {
    pub objects: Vec<ObjectEntry>,
    pub plates: Vec<PlateEntry>,
}

/// Element currently being filled.
enum Open {
    Object(ObjectEntry),
    Part(PartEntry),
    Plate(PlateEntry),
    Instance(Instance),
    Other,
}

impl ModelSettings {
    pub fn parse(xml: &str) -> Result<Self, ModelError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut model = ModelSettings::default();
        let mut stack: Vec<(String, Open)> = Vec::new();
        let mut saw_root = false;

        loop {
            let event = reader.read_event().map_err(|source| ModelError::Xml {
                position: reader.error_position() as u64,
                source,
            })?;

            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if !saw_root {
                        saw_root = true;
                        if tag != "config" {
                            tracing::warn!(
                                root = %tag,
                                "unexpected root element in model settings, expected 'config'"
                            );
                        }
                    }

                    let open = open_element(&tag, e, stack.len());
                    if tag == "metadata" {
                        apply_metadata(e, stack.last_mut().map(|(_, open)| open));
                    }

                    if matches!(event, Event::Empty(_)) {
                        close_element(open, &mut stack, &mut model);
                    } else {
                        stack.push((tag, open));
                    }
                }
                Event::End(_) => {
                    if let Some((_, open)) = stack.pop() {
                        close_element(open, &mut stack, &mut model);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some((tag, _)) = stack.last() {
            return Err(ModelError::Unclosed(tag.clone()));
        }

        tracing::debug!(
            objects = model.objects.len(),
            plates = model.plates.len(),
            "parsed model settings"
        );
        Ok(model)
    }

    pub fn object(&self, id: &str) -> Option<&ObjectEntry> {
        // later descriptions of the same id win
        self.objects.iter().rev().find(|o| o.id == id)
    }

    /// Split into the structural listing and the override sets.
    ///
    /// Plates without an id are skipped. Objects on a plate are ordered by
    /// `identify_id`; an object referenced but never described gets a
    /// placeholder entry named `Object <id>`.
    pub fn into_structure(self) -> (StructuralListing, OverrideSets) {
        let mut overrides = OverrideSets::new();
        let mut listing = StructuralListing::default();

        let mut objects: HashMap<&str, &ObjectEntry> = HashMap::new();
        for object in &self.objects {
            if objects.insert(object.id.as_str(), object).is_some() {
                tracing::warn!(object = %object.id, "object described more than once, keeping the last");
            }
        }

        for object in objects.values() {
            overrides.insert(EntityRef::object(&object.id), object.overrides.clone());
            for part in &object.parts {
                overrides.insert(EntityRef::part(&object.id, &part.id), part.overrides.clone());
            }
        }

        for plate in &self.plates {
            let Some(plate_id) = plate.id.as_deref() else {
                if !plate.overrides.is_empty() || !plate.instances.is_empty() {
                    tracing::warn!("skipping plate without plater_id");
                }
                continue;
            };
            overrides.insert(EntityRef::plate(plate_id), plate.overrides.clone());

            let mut instances: Vec<&Instance> = plate.instances.iter().collect();
            instances.sort_by_key(|i| i.identify_id);

            let decls = instances
                .iter()
                .filter_map(|i| i.object_id.as_deref())
                .map(|object_id| match objects.get(object_id) {
                    Some(object) => object_decl(object),
                    None => {
                        tracing::debug!(object = object_id, "plate references undescribed object");
                        ObjectDecl {
                            id: object_id.to_string(),
                            name: Some(format!("Object {}", object_id)),
                            filament: Some(DEFAULT_EXTRUDER.to_string()),
                            parts: Vec::new(),
                        }
                    }
                })
                .collect();

            listing.plates.push(PlateDecl {
                id: plate_id.to_string(),
                name: plate.name.clone(),
                objects: decls,
            });
        }

        (listing, overrides)
    }
}

fn object_decl(object: &ObjectEntry) -> ObjectDecl {
    ObjectDecl {
        id: object.id.clone(),
        name: Some(
            object
                .name
                .clone()
                .unwrap_or_else(|| format!("Object {}", object.id)),
        ),
        filament: Some(object.extruder.clone()),
        parts: object
            .parts
            .iter()
            .map(|part| PartDecl {
                id: part.id.clone(),
                name: part.name.clone(),
                filament: Some(part.extruder.clone().unwrap_or_else(|| object.extruder.clone())),
            })
            .collect(),
    }
}

fn open_element(tag: &str, e: &BytesStart<'_>, depth: usize) -> Open {
    match tag {
        "object" => match attribute(e, "id") {
            Some(id) => Open::Object(ObjectEntry {
                id,
                name: None,
                extruder: DEFAULT_EXTRUDER.to_string(),
                overrides: RawSettings::new(),
                parts: Vec::new(),
            }),
            None => {
                tracing::warn!(depth, "skipping <object> without id");
                Open::Other
            }
        },
        "part" => Open::Part(PartEntry {
            id: attribute(e, "id").unwrap_or_default(),
            ..Default::default()
        }),
        "plate" => Open::Plate(PlateEntry::default()),
        "model_instance" => Open::Instance(Instance::default()),
        _ => Open::Other,
    }
}

/// Attach a `<metadata key value>` to its direct parent.
fn apply_metadata(e: &BytesStart<'_>, parent: Option<&mut Open>) {
    let Some(key) = attribute(e, "key") else {
        return;
    };
    let value = attribute(e, "value");

    match parent {
        Some(Open::Object(object)) => match key.as_str() {
            "name" => object.name = value,
            "extruder" => {
                if let Some(v) = value {
                    object.extruder = v;
                }
            }
            k if SYSTEM_KEYS.contains(&k) => {}
            _ => {
                if let Some(v) = value {
                    object.overrides.insert(key, v);
                }
            }
        },
        Some(Open::Part(part)) => match key.as_str() {
            "name" => part.name = value,
            "extruder" => part.extruder = value,
            k if SYSTEM_KEYS.contains(&k) => {}
            _ => {
                if let Some(v) = value {
                    part.overrides.insert(key, v);
                }
            }
        },
        Some(Open::Plate(plate)) => match key.as_str() {
            "plater_id" => plate.id = value.filter(|v| !v.is_empty()),
            "plater_name" => plate.name = value,
            k if PLATE_KEYS.contains(&k) => {}
            _ => {
                if let Some(v) = value {
                    plate.overrides.insert(key, v);
                }
            }
        },
        Some(Open::Instance(instance)) => match key.as_str() {
            "object_id" => instance.object_id = value.filter(|v| !v.is_empty()),
            "identify_id" => {
                instance.identify_id = value.and_then(|v| v.trim().parse().ok()).unwrap_or(0);
            }
            _ => {}
        },
        Some(Open::Other) | None => {}
    }
}

/// Hand a finished element to its parent (parts to objects) or the model.
fn close_element(open: Open, stack: &mut [(String, Open)], model: &mut ModelSettings) {
    match open {
        Open::Object(object) => model.objects.push(object),
        Open::Plate(plate) => model.plates.push(plate),
        Open::Part(mut part) => {
            let parent = stack.iter_mut().rev().find_map(|(_, open)| match open {
                Open::Object(object) => Some(object),
                _ => None,
            });
            match parent {
                Some(object) => {
                    if part.id.is_empty() {
                        part.id = object.parts.len().to_string();
                    }
                    object.parts.push(part);
                }
                None => tracing::debug!("ignoring <part> outside an object"),
            }
        }
        Open::Instance(instance) => {
            let plate = stack.iter_mut().rev().find_map(|(_, open)| match open {
                Open::Plate(plate) => Some(plate),
                _ => None,
            });
            if let Some(plate) = plate {
                plate.instances.push(instance);
            }
        }
        Open::Other => {}
    }
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name.as_bytes())
        .map(|attr| {
            let raw = String::from_utf8_lossy(&attr.value).into_owned();
            match quick_xml::escape::unescape(&raw) {
                Ok(text) => text.into_owned(),
                Err(_) => raw,
            }
        })
}
