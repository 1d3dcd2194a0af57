//! Test fixtures: 3MF archives built on the fly
//!
//! Archives are written into a temp directory with the `zip` writer so the
//! tests exercise the same reader path as real slicer output.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use tmf_settings::archive::{MODEL_SETTINGS_PATH, PROJECT_SETTINGS_PATH};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Project settings of a single-extruder printer with two custom keys
pub const SAMPLE_PROJECT: &str = r#"{
    "printer_settings_id": "Bambu Lab A1 mini 0.4 nozzle",
    "print_settings_id": "0.20mm Standard @BBL A1M",
    "filament_settings_id": ["Bambu PLA Basic @BBL A1M"],
    "layer_height": "0.2",
    "initial_layer_print_height": "0.2",
    "wall_loops": "3",
    "sparse_infill_density": "15%",
    "enable_support": "0",
    "brim_type": "auto_brim",
    "outer_wall_speed": "200",
    "travel_speed": "700",
    "nozzle_temperature": ["220"],
    "seam_position": "aligned",
    "different_settings_to_system": ["wall_loops;travel_speed", "", ""]
}"#;

/// One plate, one object with one same-named part
pub const SAMPLE_MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<config>
  <object id="2">
    <metadata key="name" value="Calibration Cube"/>
    <metadata key="extruder" value="1"/>
    <metadata key="layer_height" value="0.12"/>
    <metadata key="brim_type" value="brim_ears"/>
    <part id="1" subtype="normal_part">
      <metadata key="name" value="Calibration Cube"/>
      <metadata key="matrix" value="1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1"/>
    </part>
  </object>
  <plate>
    <metadata key="plater_id" value="1"/>
    <metadata key="plater_name" value=""/>
    <metadata key="locked" value="false"/>
    <model_instance>
      <metadata key="object_id" value="2"/>
      <metadata key="instance_id" value="0"/>
      <metadata key="identify_id" value="90"/>
    </model_instance>
  </plate>
</config>"#;

/// Builder for a 3MF archive in a temp directory.
#[derive(Debug, Default)]
pub struct ThreeMf {
    entries: Vec<(String, Vec<u8>)>,
}

impl ThreeMf {
    pub fn new() -> Self {
        Self::default()
    }

    /// The usual project layout around the given documents.
    pub fn with_documents(project: &str, model: &str) -> Self {
        Self::new()
            .entry("[Content_Types].xml", b"<Types/>")
            .entry("3D/3dmodel.model", b"<model/>")
            .entry(PROJECT_SETTINGS_PATH, project.as_bytes())
            .entry(MODEL_SETTINGS_PATH, model.as_bytes())
    }

    pub fn sample() -> Self {
        Self::with_documents(SAMPLE_PROJECT, SAMPLE_MODEL)
    }

    pub fn entry(mut self, name: &str, bytes: &[u8]) -> Self {
        self.entries.push((name.to_string(), bytes.to_vec()));
        self
    }

    /// Write the archive as `dir/name` and return its path.
    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (entry, bytes) in &self.entries {
            writer
                .start_file(entry.as_str(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
        path
    }
}
