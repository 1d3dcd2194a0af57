//! Terminal report for an analyzed project.

mod table;

pub use table::{Align, Table};

use colored::{ColoredString, Colorize};
use std::cmp::Reverse;
use tmf_resolve::{classify, DiffEntry, ScopeReport};
use unicode_width::UnicodeWidthStr;

use crate::analyze::AnalysisReport;
use crate::wiki::WikiIndex;

/// Shown in diff mode when a custom value replaced nothing
pub const DEFAULT_LABEL: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Follow custom values with the value they replaced
    pub diff: bool,
    pub color: bool,
    /// Hyperlink setting names to their wiki pages
    pub wiki: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            diff: false,
            color: true,
            wiki: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    None,
    Mm,
    Speed,
    Percent,
    Celsius,
    Seconds,
    OnOff,
    Brim,
}

/// Profile settings shown in the global panel, in display order.
const GLOBAL_DISPLAY: &[(&str, &str, Unit)] = &[
    ("layer_height", "Layer Height", Unit::Mm),
    ("initial_layer_print_height", "Initial Layer Print Height", Unit::Mm),
    ("line_width", "Line Width", Unit::Mm),
    ("print_flow_ratio", "Print Flow Ratio", Unit::None),
    ("filament_flow_ratio", "Filament Flow Ratio", Unit::None),
    ("wall_loops", "Wall Loops", Unit::None),
    ("sparse_infill_density", "Sparse Infill Density", Unit::Percent),
    ("top_shell_layers", "Top Shell Layers", Unit::None),
    ("bottom_shell_layers", "Bottom Shell Layers", Unit::None),
    ("brim_type", "Brim Type", Unit::Brim),
    ("enable_support", "Enable Support", Unit::OnOff),
    ("seam_position", "Seam Position", Unit::None),
    ("initial_layer_speed", "Initial Layer Speed", Unit::Speed),
    ("outer_wall_speed", "Outer Wall Speed", Unit::Speed),
    ("inner_wall_speed", "Inner Wall Speed", Unit::Speed),
    ("sparse_infill_speed", "Sparse Infill Speed", Unit::Speed),
    ("top_surface_speed", "Top Surface Speed", Unit::Speed),
    ("travel_speed", "Travel Speed", Unit::Speed),
    ("bridge_speed", "Bridge Speed", Unit::Speed),
    ("sparse_infill_pattern", "Sparse Infill Pattern", Unit::None),
    ("top_surface_pattern", "Top Surface Pattern", Unit::None),
    ("print_sequence", "Print Sequence", Unit::None),
    ("spiral_mode", "Spiral Mode (Vase)", Unit::OnOff),
    ("ironing_type", "Ironing Type", Unit::None),
    ("fuzzy_skin", "Fuzzy Skin", Unit::None),
    ("retraction_length", "Retraction Length", Unit::Mm),
    ("retraction_speed", "Retraction Speed", Unit::Speed),
    ("z_hop", "Z-Hop", Unit::Mm),
    ("pressure_advance", "Pressure Advance", Unit::None),
    ("fan_min_speed", "Fan Min Speed", Unit::Percent),
    ("fan_max_speed", "Fan Max Speed", Unit::Percent),
    ("slow_down_for_layer_cooling", "Slow Down for Layer Cooling", Unit::OnOff),
    ("slow_down_layer_time", "Slow Down Layer Time", Unit::Seconds),
    ("nozzle_temperature", "Nozzle Temperature", Unit::Celsius),
    ("hot_plate_temp", "Bed Temperature", Unit::Celsius),
    ("enable_arc_fitting", "Enable Arc Fitting", Unit::OnOff),
    ("enable_overhang_speed", "Enable Overhang Speed", Unit::OnOff),
    ("timelapse_type", "Timelapse Type", Unit::None),
];

const INFILL_KEYS: [&str; 2] = ["sparse_infill_density", "skeleton_infill_density"];

/// Keys with their own column in the objects table, per row kind
const OBJECT_COLUMN_KEYS: &[&str] = &[
    "layer_height",
    "wall_loops",
    "sparse_infill_density",
    "skeleton_infill_density",
    "enable_support",
    "brim_type",
    "outer_wall_speed",
];
const PART_COLUMN_KEYS: &[&str] = &[
    "wall_loops",
    "sparse_infill_density",
    "skeleton_infill_density",
    "outer_wall_speed",
];

const OBJECT_COLUMNS: &[(&str, Align)] = &[
    ("Plate", Align::Center),
    ("Name", Align::Left),
    ("Filament", Align::Center),
    ("Layer Height", Align::Center),
    ("Wall Loops", Align::Center),
    ("Infill Density", Align::Center),
    ("Support", Align::Center),
    ("Brim Type", Align::Center),
    ("Outer Wall Speed", Align::Center),
];

/// Friendly label for a `brim_type` value; unknown values pass through.
pub fn brim_label(value: &str) -> &str {
    match value {
        "brim_ears" => "Mouse ear",
        "no_brim" => "No",
        "outer_only" => "Outer",
        "inner_only" => "Inner",
        "outer_and_inner" => "Both",
        other => other,
    }
}

/// Slicer booleans are saved as `1`/`0` or `true`/`false`.
pub fn is_on(value: &str) -> bool {
    matches!(value, "1" | "true")
}

fn on_off(value: &str) -> &'static str {
    if is_on(value) {
        "On"
    } else {
        "Off"
    }
}

fn with_unit(value: &str, unit: Unit) -> String {
    match unit {
        Unit::None => value.to_string(),
        Unit::Mm => format!("{} mm", value),
        Unit::Speed => format!("{} mm/s", value),
        Unit::Percent if value.ends_with('%') => value.to_string(),
        Unit::Percent => format!("{}%", value),
        Unit::Celsius => format!("{}°C", value),
        Unit::Seconds => format!("{}s", value),
        Unit::OnOff => on_off(value).to_string(),
        Unit::Brim => brim_label(value).to_string(),
    }
}

/// Infill density without its `%`.
fn infill_text(value: &str) -> &str {
    value.trim_end_matches('%')
}

/// Applies colors when enabled and wiki links when available.
struct Painter<'a> {
    color: bool,
    wiki: Option<&'a WikiIndex>,
}

impl Painter<'_> {
    fn paint(&self, text: &str, style: fn(ColoredString) -> ColoredString) -> String {
        if self.color {
            style(text.normal()).to_string()
        } else {
            text.to_string()
        }
    }

    /// `text` as an OSC 8 hyperlink to the wiki page of `key`.
    fn link(&self, text: &str, key: &str) -> String {
        match self.wiki.and_then(|w| w.url(key)) {
            Some(url) => osc8(&url, text),
            None => text.to_string(),
        }
    }
}

pub fn osc8(url: &str, text: &str) -> String {
    format!("\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\", url, text)
}

/// Render the whole report.
pub fn render(report: &AnalysisReport, options: &RenderOptions, wiki: Option<&WikiIndex>) -> String {
    let painter = Painter {
        color: options.color,
        wiki: if options.wiki { wiki } else { None },
    };

    let mut lines = Vec::new();
    header(&mut lines, report, &painter);
    profile(&mut lines, report, &painter);
    global_settings(&mut lines, report, &painter);
    custom_global(&mut lines, report, &painter);
    objects(&mut lines, report, options, &painter);

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn section_title(lines: &mut Vec<String>, title: &str, painter: &Painter) {
    lines.push(String::new());
    lines.push(painter.paint(title, |s| s.bold().bright_yellow()));
}

fn header(lines: &mut Vec<String>, report: &AnalysisReport, painter: &Painter) {
    let title = format!("3MF SETTINGS ANALYZER  │  {}", report.file);
    let rule = "═".repeat(title.width());
    lines.push(painter.paint(&rule, |s| s.cyan()));
    lines.push(format!(
        "{}  │  {}",
        painter.paint("3MF SETTINGS ANALYZER", |s| s.bold().cyan()),
        report.file
    ));
    lines.push(painter.paint(&rule, |s| s.cyan()));
}

/// One line of a key/value block.
struct KeyValue {
    /// Unstyled key, used for padding
    key: String,
    label: String,
    value: String,
}

impl KeyValue {
    fn plain(key: impl Into<String>, value: String) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            value,
        }
    }
}

/// Two-column key/value block; keys padded to the widest key.
fn key_values(lines: &mut Vec<String>, rows: &[KeyValue], painter: &Painter) {
    let width = rows.iter().map(|row| row.key.width()).max().unwrap_or(0);
    for row in rows {
        let pad = " ".repeat(width - row.key.width());
        let label = painter.paint(&row.label, |s| s.dimmed());
        lines.push(format!("  {}{}  {}", label, pad, row.value));
    }
}

fn profile(lines: &mut Vec<String>, report: &AnalysisReport, painter: &Painter) {
    section_title(lines, "PROFILE", painter);
    let identity = &report.profile;

    let mut rows = vec![
        KeyValue::plain("Printer", identity.printer.clone()),
        KeyValue::plain("Process", painter.paint(&identity.process, |s| s.green())),
    ];
    for (i, filament) in identity.filaments.iter().enumerate() {
        rows.push(KeyValue::plain(
            format!("Filament {}", i + 1),
            painter.paint(filament, |s| s.magenta()),
        ));
    }
    key_values(lines, &rows, painter);
}

fn global_settings(lines: &mut Vec<String>, report: &AnalysisReport, painter: &Painter) {
    let effective = &report.tree.root.effective;
    let shown = GLOBAL_DISPLAY
        .iter()
        .filter(|(key, _, _)| effective.contains_key(*key))
        .map(|(key, _, _)| *key);
    let partition = classify(shown);
    if partition.is_empty() {
        return;
    }

    section_title(lines, "GLOBAL SETTINGS", painter);
    for group in partition.groups() {
        lines.push(format!("  {}", painter.paint(group.category.label(), |s| s.bold())));

        let rows: Vec<KeyValue> = group
            .keys
            .iter()
            .filter_map(|key| {
                let (_, label, unit) = GLOBAL_DISPLAY.iter().find(|(k, _, _)| *k == key.as_str())?;
                let value = &effective.get(key.as_str())?.value;
                let text = with_unit(value, *unit);
                let text = match unit {
                    Unit::Speed => painter.paint(&text, |s| s.cyan()),
                    Unit::Celsius => painter.paint(&text, |s| s.red()),
                    _ => text,
                };
                Some(KeyValue {
                    key: label.to_string(),
                    label: painter.link(label, key),
                    value: text,
                })
            })
            .collect();

        let mut block = Vec::new();
        key_values(&mut block, &rows, painter);
        lines.extend(block.into_iter().map(|l| format!("  {}", l)));
    }
}

fn custom_global(lines: &mut Vec<String>, report: &AnalysisReport, painter: &Painter) {
    if report.custom_global.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(format!(
        "{} {}",
        painter.paint("CUSTOM GLOBAL SETTINGS", |s| s.bold().bright_red()),
        painter.paint("(changed from profile)", |s| s.dimmed())
    ));

    let width = report.custom_global.keys().map(|k| k.width()).max().unwrap_or(0);
    for (key, value) in report.custom_global.iter() {
        let pad = " ".repeat(width - key.width());
        let name = painter.paint(&painter.link(key, key), |s| s.yellow());
        lines.push(format!("  ✎ {}{}  {}", name, pad, value));
    }
}

/// Display value for one setting column of a scope row.
struct ColumnValue {
    text: String,
    custom: bool,
    /// What the custom value replaced, for diff mode
    previous: Option<String>,
}

impl ColumnValue {
    /// The first of `keys` the scope sets itself, else the inherited key
    /// from the most specific scope.
    fn of(scope: &ScopeReport, keys: &[&str], format: fn(&str) -> String) -> Self {
        let own = keys.iter().find(|key| scope.overrides.contains_key(key));
        let key = own.or_else(|| {
            keys.iter()
                .filter(|key| scope.effective.contains_key(**key))
                .min_by_key(|key| Reverse(scope.effective[**key].origin))
        });
        let found = key.and_then(|key| scope.effective.get(*key).map(|value| (*key, value)));
        let Some((key, value)) = found else {
            return Self::blank();
        };
        Self {
            text: format(&value.value),
            custom: value.is_custom,
            previous: diff_entry(&scope.diff, key).map(|d| previous_text(d, format)),
        }
    }

    fn blank() -> Self {
        Self {
            text: String::new(),
            custom: false,
            previous: None,
        }
    }

    fn cell(&self, diff: bool, painter: &Painter) -> String {
        if self.text.is_empty() || !self.custom {
            return self.text.clone();
        }

        let mut cell = painter.paint(&format!("*{}", self.text), |s| s.bold().yellow());
        if let (true, Some(previous)) = (diff, &self.previous) {
            cell.push(' ');
            cell.push_str(&painter.paint(&format!("←{}", previous), |s| s.dimmed()));
        }
        cell
    }
}

fn diff_entry<'a>(diff: &'a [DiffEntry], key: &str) -> Option<&'a DiffEntry> {
    diff.iter().find(|d| d.key == key)
}

fn previous_text(entry: &DiffEntry, format: fn(&str) -> String) -> String {
    entry
        .overridden_value
        .as_deref()
        .map(format)
        .unwrap_or_else(|| DEFAULT_LABEL.to_string())
}

fn plain_text(value: &str) -> String {
    value.to_string()
}

fn infill_column(value: &str) -> String {
    infill_text(value).to_string()
}

fn brim_column(value: &str) -> String {
    brim_label(value).to_string()
}

fn support_column(value: &str) -> String {
    on_off(value).to_string()
}

fn plate_color(index: usize) -> fn(ColoredString) -> ColoredString {
    let colors: [fn(ColoredString) -> ColoredString; 6] = [
        |s| s.bold().bright_white(),
        |s| s.bold().yellow(),
        |s| s.bold().bright_magenta(),
        |s| s.bold().bright_cyan(),
        |s| s.bold().bright_green(),
        |s| s.bold().bright_blue(),
    ];
    colors[index % colors.len()]
}

fn filament_color(filament: &str) -> fn(ColoredString) -> ColoredString {
    let colors: [fn(ColoredString) -> ColoredString; 6] = [
        |s| s.cyan(),
        |s| s.magenta(),
        |s| s.green(),
        |s| s.yellow(),
        |s| s.blue(),
        |s| s.red(),
    ];
    match filament.parse::<usize>() {
        Ok(n) if n > 0 => colors[(n - 1) % colors.len()],
        _ => |s| s.white(),
    }
}

const NAME_COLUMN: usize = 1;

fn objects(lines: &mut Vec<String>, report: &AnalysisReport, options: &RenderOptions, painter: &Painter) {
    let plates = report.tree.plates();
    if plates.iter().all(|p| p.children.is_empty()) {
        lines.push(String::new());
        lines.push(painter.paint("No objects found", |s| s.red()));
        return;
    }

    section_title(lines, "OBJECTS", painter);
    let columns: Vec<(String, Align)> = OBJECT_COLUMNS
        .iter()
        .map(|(header, align)| (painter.paint(header, |s| s.bold().blue()), *align))
        .collect();
    let mut table = Table::new(&columns);

    for (index, plate) in plates.iter().enumerate() {
        let plate_id = plate.meta.id.clone().unwrap_or_default();
        let plate_cell = painter.paint(&plate_id, plate_color(index));

        if !plate.overrides.is_empty() {
            let label = plate.meta.name.clone().unwrap_or_else(|| format!("Plate {}", plate_id));
            table.push(vec![plate_cell.clone(), painter.paint(&label, |s| s.italic())]);
            override_notes(&mut table, plate, &[], options.diff, painter);
        }
        for object in &plate.children {
            object_rows(&mut table, object, plate_cell.clone(), options, painter);
        }
    }

    lines.extend(table.render().lines().map(str::to_string));
    lines.push(format!(
        "{} = custom value (overrides profile default)",
        painter.paint("*", |s| s.bold().yellow())
    ));
}

fn object_rows(table: &mut Table, object: &ScopeReport, plate: String, options: &RenderOptions, painter: &Painter) {
    let name = object.meta.name.clone().unwrap_or_default();
    let support = ColumnValue::of(object, &["enable_support"], support_column);

    table.push(vec![
        plate,
        painter.paint(&name, |s| s.bold()),
        filament_cell(object, painter),
        ColumnValue::of(object, &["layer_height"], plain_text).cell(options.diff, painter),
        ColumnValue::of(object, &["wall_loops"], plain_text).cell(options.diff, painter),
        ColumnValue::of(object, &INFILL_KEYS, infill_column).cell(options.diff, painter),
        support_cell(&support, options.diff, painter),
        ColumnValue::of(object, &["brim_type"], brim_column).cell(options.diff, painter),
        ColumnValue::of(object, &["outer_wall_speed"], plain_text).cell(options.diff, painter),
    ]);
    override_notes(table, object, OBJECT_COLUMN_KEYS, options.diff, painter);

    let single_same_name = object.children.len() == 1
        && object.children[0].meta.name.as_deref() == Some(name.as_str());
    if single_same_name {
        return;
    }

    for part in &object.children {
        let part_name = format!("  {}", part.meta.name.as_deref().unwrap_or("Part"));
        // Support is decided per object; parts only show the inherited state
        let inherited = ColumnValue {
            custom: false,
            ..ColumnValue::of(part, &["enable_support"], support_column)
        };

        table.push(vec![
            String::new(),
            painter.paint(&part_name, |s| s.dimmed()),
            filament_cell(part, painter),
            String::new(),
            ColumnValue::of(part, &["wall_loops"], plain_text).cell(options.diff, painter),
            ColumnValue::of(part, &INFILL_KEYS, infill_column).cell(options.diff, painter),
            support_cell(&inherited, options.diff, painter),
            String::new(),
            ColumnValue::of(part, &["outer_wall_speed"], plain_text).cell(options.diff, painter),
        ]);
        override_notes(table, part, PART_COLUMN_KEYS, options.diff, painter);
    }
}

fn filament_cell(scope: &ScopeReport, painter: &Painter) -> String {
    let filament = scope.meta.filament.clone().unwrap_or_default();
    painter.paint(&filament, filament_color(&filament))
}

fn support_cell(value: &ColumnValue, diff: bool, painter: &Painter) -> String {
    if value.custom || value.text.is_empty() {
        return value.cell(diff, painter);
    }
    let style: fn(ColoredString) -> ColoredString = if value.text == "On" {
        |s| s.green()
    } else {
        |s| s.dimmed()
    };
    painter.paint(&value.text, style)
}

/// Overrides without their own column, as a tree under the row.
fn override_notes(table: &mut Table, scope: &ScopeReport, columns: &[&str], diff: bool, painter: &Painter) {
    let remaining: Vec<(&str, &str)> = scope
        .overrides
        .iter()
        .filter(|(key, _)| !columns.contains(key))
        .collect();

    for (i, (key, value)) in remaining.iter().enumerate() {
        let branch = if i + 1 == remaining.len() { "└─" } else { "├─" };
        let mut note = format!(
            "  {} {}",
            painter.paint(branch, |s| s.dimmed()),
            painter.paint(&format!("{}: {}", painter.link(key, key), value), |s| s.yellow())
        );

        if diff {
            if let Some(entry) = diff_entry(&scope.diff, key) {
                note.push(' ');
                note.push_str(&painter.paint(&format!("←{}", previous_text(entry, plain_text)), |s| s.dimmed()));
            }
        }
        table.push_note(NAME_COLUMN, note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::Analyzer;
    use crate::archive::ProjectArchive;
    use crate::wiki::{SettingInfo, WikiData};

    const PROJECT: &str = r#"{
        "printer_settings_id": "Bambu Lab A1 mini 0.4 nozzle",
        "print_settings_id": "0.20mm Standard",
        "filament_settings_id": ["PLA Basic", "PETG"],
        "layer_height": "0.2",
        "wall_loops": "2",
        "sparse_infill_density": "15%",
        "enable_support": "0",
        "brim_type": "auto_brim",
        "outer_wall_speed": "200",
        "nozzle_temperature": ["220", "240"],
        "different_settings_to_system": ["wall_loops;brim_type"]
    }"#;

    const MODEL: &str = r#"<config>
        <plate>
            <metadata key="plater_id" value="1"/>
            <model_instance><metadata key="object_id" value="1"/></model_instance>
            <model_instance><metadata key="object_id" value="2"/></model_instance>
        </plate>
        <object id="1">
            <metadata key="name" value="Box"/>
            <metadata key="extruder" value="1"/>
            <metadata key="wall_loops" value="4"/>
            <metadata key="brim_type" value="brim_ears"/>
            <metadata key="seam_position" value="back"/>
            <part id="1" subtype="normal_part">
                <metadata key="name" value="Box"/>
            </part>
        </object>
        <object id="2">
            <metadata key="name" value="Bracket"/>
            <metadata key="extruder" value="2"/>
            <metadata key="enable_support" value="1"/>
            <part id="1" subtype="normal_part">
                <metadata key="name" value="Body"/>
            </part>
            <part id="2" subtype="modifier_part">
                <metadata key="name" value="Modifier"/>
                <metadata key="sparse_infill_density" value="40%"/>
                <metadata key="top_shell_layers" value="6"/>
            </part>
        </object>
    </config>"#;

    fn report_for(model: &str) -> AnalysisReport {
        Analyzer::default()
            .analyze_archive(
                "demo.3mf".to_string(),
                ProjectArchive {
                    project_settings: Some(PROJECT.to_string()),
                    model_settings: Some(model.to_string()),
                },
            )
            .unwrap()
    }

    fn report() -> AnalysisReport {
        report_for(MODEL)
    }

    fn single_object(metadata: &str) -> String {
        format!(
            r#"<config>
                <plate>
                    <metadata key="plater_id" value="1"/>
                    <model_instance><metadata key="object_id" value="1"/></model_instance>
                </plate>
                <object id="1">
                    <metadata key="name" value="Box"/>
                    {}
                    <part id="1" subtype="normal_part"><metadata key="name" value="Box"/></part>
                </object>
            </config>"#,
            metadata
        )
    }

    fn plain() -> RenderOptions {
        RenderOptions {
            color: false,
            ..RenderOptions::default()
        }
    }

    fn line_with<'a>(out: &'a str, needle: &str) -> &'a str {
        out.lines().find(|l| l.contains(needle)).unwrap()
    }

    #[test]
    fn test_units_and_labels() {
        assert_eq!(with_unit("0.2", Unit::Mm), "0.2 mm");
        assert_eq!(with_unit("15%", Unit::Percent), "15%");
        assert_eq!(with_unit("80", Unit::Percent), "80%");
        assert_eq!(with_unit("220", Unit::Celsius), "220°C");
        assert_eq!(with_unit("1", Unit::OnOff), "On");
        assert_eq!(with_unit("false", Unit::OnOff), "Off");
        assert_eq!(brim_label("outer_and_inner"), "Both");
        assert_eq!(brim_label("auto_brim"), "auto_brim");
    }

    #[test]
    fn test_header_and_profile() {
        let out = render(&report(), &plain(), None);
        assert!(out.contains("3MF SETTINGS ANALYZER  │  demo.3mf"));
        assert!(line_with(&out, "Printer").contains("Bambu Lab A1 mini 0.4 nozzle"));
        assert!(line_with(&out, "Filament 2").contains("PETG"));
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn test_global_settings_grouped() {
        let out = render(&report(), &plain(), None);
        let basic = out.find("  Basic").unwrap();
        let speeds = out.find("  Speeds").unwrap();
        let temperature = out.find("  Temperature").unwrap();
        assert!(basic < speeds && speeds < temperature);

        assert!(line_with(&out, "Layer Height").ends_with("0.2 mm"));
        assert!(line_with(&out, "Outer Wall Speed").ends_with("200 mm/s"));
        assert!(line_with(&out, "Nozzle Temperature").ends_with("220,240°C"));
        assert!(line_with(&out, "Enable Support").ends_with("Off"));
    }

    #[test]
    fn test_custom_global_list() {
        let out = render(&report(), &plain(), None);
        assert!(out.contains("CUSTOM GLOBAL SETTINGS"));
        assert!(line_with(&out, "✎ wall_loops").ends_with("2"));
        assert!(line_with(&out, "✎ brim_type").ends_with("auto_brim"));
    }

    #[test]
    fn test_object_rows() {
        let out = render(&report(), &plain(), None);
        let box_row = line_with(&out, "│ Box");
        assert!(box_row.contains("*4"));
        assert!(box_row.contains("*Mouse ear"));
        assert!(box_row.contains("15"));
        assert!(!box_row.contains("15%"));

        let bracket = line_with(&out, "│ Bracket");
        assert!(bracket.contains("*On"));
        assert!(bracket.contains(" 2 "));

        // single part named like its object is folded away
        assert_eq!(out.matches("Box").count(), 1);
        assert!(out.contains("│   Body"));
        assert!(line_with(&out, "Modifier").contains("*40"));
    }

    #[test]
    fn test_override_tree() {
        let out = render(&report(), &plain(), None);
        assert!(out.contains("└─ seam_position: back"));
        assert!(out.contains("└─ top_shell_layers: 6"));
        // columns are not repeated in the tree
        assert!(!out.contains("─ wall_loops: 4"));
    }

    #[test]
    fn test_diff_mode() {
        let options = RenderOptions {
            diff: true,
            ..plain()
        };
        let out = render(&report(), &options, None);
        assert!(line_with(&out, "│ Box").contains("*4 ←2"));
        assert!(line_with(&out, "│ Box").contains("*Mouse ear ←auto_brim"));
        assert!(out.contains("└─ seam_position: back ←default"));
        assert!(line_with(&out, "Modifier").contains("*40 ←15"));

        let without = render(&report(), &plain(), None);
        assert!(!without.contains('←'));
    }

    #[test]
    fn test_skeleton_infill_alias_shown() {
        let model = single_object(r#"<metadata key="skeleton_infill_density" value="40%"/>"#);
        let out = render(&report_for(&model), &RenderOptions { diff: true, ..plain() }, None);

        let row = line_with(&out, "│ Box");
        assert!(row.contains("*40 ←default"), "{}", row);
        assert!(!row.contains(" 15 "));
    }

    #[test]
    fn test_inherited_alias_reaches_parts() {
        let model = r#"<config>
            <plate>
                <metadata key="plater_id" value="1"/>
                <model_instance><metadata key="object_id" value="1"/></model_instance>
            </plate>
            <object id="1">
                <metadata key="name" value="Box"/>
                <metadata key="skeleton_infill_density" value="40%"/>
                <part id="1" subtype="normal_part"><metadata key="name" value="Shell"/></part>
            </object>
        </config>"#;
        let out = render(&report_for(model), &plain(), None);
        let part = line_with(&out, "│   Shell");
        assert!(part.contains(" 40 "), "{}", part);
    }

    #[test]
    fn test_wide_names_keep_table_aligned() {
        let model = r#"<config>
            <plate>
                <metadata key="plater_id" value="1"/>
                <model_instance><metadata key="object_id" value="1"/></model_instance>
                <model_instance><metadata key="object_id" value="2"/></model_instance>
            </plate>
            <object id="1"><metadata key="name" value="齿轮零件"/></object>
            <object id="2"><metadata key="name" value="Box"/></object>
        </config>"#;
        let out = render(&report_for(model), &plain(), None);

        let widths: Vec<usize> = out
            .lines()
            .filter(|l| l.starts_with(['╭', '│', '├', '╰']))
            .map(|l| l.width())
            .collect();
        assert!(widths.len() > 4);
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "{:?}", widths);
    }

    #[test]
    fn test_plate_overrides_listed() {
        let model = r#"<config>
            <plate>
                <metadata key="plater_id" value="1"/>
                <metadata key="print_sequence" value="by object"/>
                <model_instance><metadata key="object_id" value="1"/></model_instance>
            </plate>
            <object id="1"><metadata key="name" value="Box"/></object>
        </config>"#;
        let report = report_for(model);

        let out = render(&report, &plain(), None);
        assert!(out.contains("Plate 1"));
        assert!(out.contains("└─ print_sequence: by object"));
        assert!(out.find("print_sequence").unwrap() < out.find("│ Box").unwrap());

        let diff = render(&report, &RenderOptions { diff: true, ..plain() }, None);
        assert!(diff.contains("└─ print_sequence: by object ←default"));
    }

    #[test]
    fn test_wiki_links() {
        let mut data = WikiData::default();
        data.settings.insert(
            "layer_height".to_string(),
            SettingInfo {
                wiki_page: Some("quality_settings_layer_height".to_string()),
                ..SettingInfo::default()
            },
        );
        let index = WikiIndex::from_data(data, "https://wiki.example/");
        let link = osc8("https://wiki.example/quality_settings_layer_height", "Layer Height");

        let linked = render(&report(), &RenderOptions { wiki: true, ..plain() }, Some(&index));
        assert!(linked.contains(&link));

        let unlinked = render(&report(), &plain(), Some(&index));
        assert!(!unlinked.contains(&link));
    }

    #[test]
    fn test_no_objects() {
        let empty = Analyzer::default()
            .analyze_archive("empty.3mf".to_string(), ProjectArchive::default())
            .unwrap();
        let out = render(&empty, &plain(), None);
        assert!(out.contains("No objects found"));
        assert!(!out.contains("GLOBAL SETTINGS"));
    }
}
