//! Display grouping of setting keys.
//!
//! Pure lookup over keys; knows nothing about scopes or resolution.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Fixed, ordered display categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Basic,
    Speeds,
    Patterns,
    Retraction,
    Cooling,
    Temperature,
    Features,
    /// Keys missing from the lookup table.
    Other,
}

impl Category {
    /// Display order.
    pub const ALL: [Category; 8] = [
        Category::Basic,
        Category::Speeds,
        Category::Patterns,
        Category::Retraction,
        Category::Cooling,
        Category::Temperature,
        Category::Features,
        Category::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Basic => "Basic",
            Category::Speeds => "Speeds",
            Category::Patterns => "Patterns",
            Category::Retraction => "Retraction",
            Category::Cooling => "Cooling",
            Category::Temperature => "Temperature",
            Category::Features => "Features",
            Category::Other => "Uncategorized",
        }
    }

    /// Category of a key; `Other` when the table has no entry.
    pub fn of(key: &str) -> Category {
        CATEGORY_TABLE
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, c)| *c)
            .unwrap_or(Category::Other)
    }

    /// Keys the table assigns to this category, in table order.
    pub fn known_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        CATEGORY_TABLE
            .iter()
            .filter(move |(_, c)| c == self)
            .map(|(k, _)| *k)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const CATEGORY_TABLE: &[(&str, Category)] = &[
    // Basic
    ("layer_height", Category::Basic),
    ("initial_layer_print_height", Category::Basic),
    ("nozzle_diameter", Category::Basic),
    ("line_width", Category::Basic),
    ("print_flow_ratio", Category::Basic),
    ("filament_flow_ratio", Category::Basic),
    ("wall_loops", Category::Basic),
    ("sparse_infill_density", Category::Basic),
    ("skeleton_infill_density", Category::Basic),
    ("top_shell_layers", Category::Basic),
    ("bottom_shell_layers", Category::Basic),
    ("brim_type", Category::Basic),
    ("brim_width", Category::Basic),
    ("enable_support", Category::Basic),
    ("support_type", Category::Basic),
    ("seam_position", Category::Basic),
    // Speeds
    ("initial_layer_speed", Category::Speeds),
    ("outer_wall_speed", Category::Speeds),
    ("inner_wall_speed", Category::Speeds),
    ("sparse_infill_speed", Category::Speeds),
    ("internal_solid_infill_speed", Category::Speeds),
    ("top_surface_speed", Category::Speeds),
    ("gap_infill_speed", Category::Speeds),
    ("travel_speed", Category::Speeds),
    ("bridge_speed", Category::Speeds),
    ("internal_bridge_speed", Category::Speeds),
    ("support_speed", Category::Speeds),
    // Patterns
    ("sparse_infill_pattern", Category::Patterns),
    ("top_surface_pattern", Category::Patterns),
    ("bottom_surface_pattern", Category::Patterns),
    ("print_sequence", Category::Patterns),
    ("spiral_mode", Category::Patterns),
    ("ironing_type", Category::Patterns),
    ("fuzzy_skin", Category::Patterns),
    // Retraction
    ("retraction_length", Category::Retraction),
    ("retraction_speed", Category::Retraction),
    ("deretraction_speed", Category::Retraction),
    ("z_hop", Category::Retraction),
    ("z_hop_types", Category::Retraction),
    ("pressure_advance", Category::Retraction),
    // Cooling
    ("fan_min_speed", Category::Cooling),
    ("fan_max_speed", Category::Cooling),
    ("slow_down_for_layer_cooling", Category::Cooling),
    ("slow_down_layer_time", Category::Cooling),
    ("close_fan_the_first_x_layers", Category::Cooling),
    // Temperature
    ("nozzle_temperature", Category::Temperature),
    ("nozzle_temperature_initial_layer", Category::Temperature),
    ("hot_plate_temp", Category::Temperature),
    ("hot_plate_temp_initial_layer", Category::Temperature),
    ("bed_temperature", Category::Temperature),
    // Features
    ("enable_arc_fitting", Category::Features),
    ("enable_overhang_speed", Category::Features),
    ("timelapse_type", Category::Features),
];

/// Keys grouped by category. Only categories with at least one key appear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPartition {
    groups: Vec<CategoryGroup>,
}

/// One populated category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub category: Category,
    pub keys: Vec<String>,
}

impl CategoryPartition {
    /// Populated groups in [`Category::ALL`] order.
    pub fn groups(&self) -> &[CategoryGroup] {
        &self.groups
    }

    pub fn keys(&self, category: Category) -> &[String] {
        self.groups
            .iter()
            .find(|g| g.category == category)
            .map(|g| g.keys.as_slice())
            .unwrap_or_default()
    }

    /// Total number of keys across groups.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.keys.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Partition `keys` into categories. Duplicate input keys are kept once;
/// keys keep their input order within a category.
pub fn classify<I, S>(keys: I) -> CategoryPartition
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut buckets: Vec<Vec<String>> = vec![Vec::new(); Category::ALL.len()];

    for key in keys {
        let key = key.as_ref();
        if !seen.insert(key.to_string()) {
            continue;
        }
        let category = Category::of(key);
        // ALL is declared in enum order
        buckets[category as usize].push(key.to_string());
    }

    let groups = Category::ALL
        .iter()
        .zip(buckets)
        .filter(|(_, keys)| !keys.is_empty())
        .map(|(category, keys)| CategoryGroup {
            category: *category,
            keys,
        })
        .collect();

    CategoryPartition { groups }
}
