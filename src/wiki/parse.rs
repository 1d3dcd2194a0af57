//! Extract setting metadata from slicer sources.
//!
//! `PrintConfig.cpp` declares every option:
//!
//! ```text
//! def = this->add("layer_height", coFloat);
//! def->label = L("Layer height");
//! def->tooltip = L("Slicing height for each layer. "
//!                  "Smaller layer height means more accurate.");
//! def->set_default_value(new ConfigOptionFloat(0.2));
//! ```
//!
//! `Tab.cpp` places options on settings pages, which name the wiki page.

use regex_lite::Regex;
use std::collections::BTreeMap;

use super::{SettingInfo, WikiError};

/// Wiki pages for options the `Tab.cpp` scan cannot map.
pub const WIKI_FALLBACKS: &[(&str, &str)] = &[
    ("bridge_speed", "speed_settings_other_layers_speed#bridge"),
    ("internal_bridge_speed", "speed_settings_other_layers_speed#bridge"),
    ("bed_temperature", "material_temperatures#bed"),
    ("top_one_wall_type", "quality_settings_wall_and_surfaces#only-one-wall"),
];

/// Readable name of a C++ option type; unknown types pass through.
pub fn type_name(cpp_type: &str) -> &str {
    match cpp_type {
        "coFloat" | "coFloats" => "float",
        "coInt" | "coInts" => "int",
        "coBool" | "coBools" => "bool",
        "coPercent" | "coPercents" => "percent",
        "coString" | "coStrings" => "string",
        "coEnum" => "enum",
        "coPoint" => "point",
        "coPoints" => "points",
        other => other,
    }
}

struct ConfigPatterns {
    add: Regex,
    label: Regex,
    full_label: Regex,
    category: Regex,
    sidetext: Regex,
    tooltip_start: Regex,
    quoted: Regex,
    numeric_default: Regex,
    bool_default: Regex,
}

impl ConfigPatterns {
    fn new() -> Result<Self, WikiError> {
        Ok(Self {
            add: Regex::new(r#"this->add\("(\w+)",\s*(co\w+)\)"#)?,
            label: Regex::new(r#"def->label\s*=\s*L\("(.+?)"\)"#)?,
            full_label: Regex::new(r#"def->full_label\s*=\s*L\("(.+?)"\)"#)?,
            category: Regex::new(r#"def->category\s*=\s*L\("(.+?)"\)"#)?,
            sidetext: Regex::new(r#"def->sidetext\s*=\s*L\("(.+?)"\)"#)?,
            tooltip_start: Regex::new(r#"def->tooltip\s*=\s*L\("#)?,
            quoted: Regex::new(r#""((?:[^"\\]|\\.)*)""#)?,
            numeric_default: Regex::new(
                r#"set_default_value\(new\s+ConfigOption(?:Float|Int|Percent)\(([^)]+)\)"#,
            )?,
            bool_default: Regex::new(r#"set_default_value\(new\s+ConfigOptionBool\((\w+)\)"#)?,
        })
    }

    fn capture(re: &Regex, text: &str) -> Option<String> {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn block(&self, cpp_type: &str, text: &str) -> Option<SettingInfo> {
        let label = Self::capture(&self.label, text)?;

        let tooltip = self.tooltip_start.find(text).and_then(|start| {
            let rest = &text[start.end()..];
            let call = rest.split(");").next().unwrap_or(rest);
            let parts: Vec<&str> = self
                .quoted
                .captures_iter(call)
                .filter_map(|c| c.get(1).map(|m| m.as_str()))
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.concat().replace("\\n", "\n").replace("\\\"", "\""))
            }
        });

        let default = Self::capture(&self.numeric_default, text)
            .or_else(|| Self::capture(&self.bool_default, text))
            .map(|raw| simplify_default(raw.trim()));

        Some(SettingInfo {
            kind: Some(type_name(cpp_type).to_string()),
            label: Some(label),
            full_label: Self::capture(&self.full_label, text),
            category: Self::capture(&self.category, text),
            tooltip,
            sidetext: Self::capture(&self.sidetext, text),
            default,
            wiki_page: None,
        })
    }
}

/// `0.20` -> `0.2`, `3.` -> `3.0`, integers unchanged, anything else raw.
fn simplify_default(raw: &str) -> String {
    if raw == "true" || raw == "false" {
        return raw.to_string();
    }
    if raw.contains('.') {
        if let Ok(f) = raw.parse::<f64>() {
            let text = f.to_string();
            return if text.contains('.') || text.contains('e') || !f.is_finite() {
                text
            } else {
                format!("{}.0", text)
            };
        }
    } else if let Ok(i) = raw.parse::<i64>() {
        return i.to_string();
    }
    raw.to_string()
}

/// Parse `PrintConfig.cpp`. Options without a label are dropped.
pub fn parse_print_config(text: &str) -> Result<BTreeMap<String, SettingInfo>, WikiError> {
    let patterns = ConfigPatterns::new()?;
    let mut settings = BTreeMap::new();

    let mut current: Option<(String, String)> = None;
    let mut block: Vec<&str> = Vec::new();

    let mut flush = |current: &Option<(String, String)>, block: &[&str]| {
        if let Some((key, cpp_type)) = current {
            if let Some(info) = patterns.block(cpp_type, &block.join("\n")) {
                settings.insert(key.clone(), info);
            }
        }
    };

    for line in text.lines() {
        if let Some(caps) = patterns.add.captures(line) {
            flush(&current, &block);
            current = Some((caps[1].to_string(), caps[2].to_string()));
            block.clear();
            block.push(line);
        } else if current.is_some() {
            block.push(line);
        }
    }
    flush(&current, &block);

    tracing::debug!(settings = settings.len(), "parsed PrintConfig.cpp");
    Ok(settings)
}

/// Parse `Tab.cpp` into key -> wiki page.
///
/// `append_single_option_line("key", "page")` maps directly (first wins).
/// Otherwise a `label_path = "page"` applies to each `get_option("key")`
/// until the group's `append_line`.
pub fn parse_tab_cpp(text: &str) -> Result<BTreeMap<String, String>, WikiError> {
    let direct = Regex::new(r#"append_single_option_line\("(\w+)"\s*,\s*"([^"]+)""#)?;
    let label_path = Regex::new(r#"label_path\s*=\s*"([^"]+)""#)?;
    let get_option = Regex::new(r#"get_option\("(\w+)""#)?;

    let mut pages = BTreeMap::new();
    for caps in direct.captures_iter(text) {
        pages
            .entry(caps[1].to_string())
            .or_insert_with(|| caps[2].to_string());
    }

    let mut group: Option<String> = None;
    for line in text.lines() {
        if let Some(caps) = label_path.captures(line) {
            group = Some(caps[1].to_string());
            continue;
        }
        let Some(page) = group.as_ref() else {
            continue;
        };
        if let Some(caps) = get_option.captures(line) {
            pages
                .entry(caps[1].to_string())
                .or_insert_with(|| page.clone());
            continue;
        }
        if line.contains("append_line") {
            group = None;
        }
    }

    tracing::debug!(pages = pages.len(), "parsed Tab.cpp");
    Ok(pages)
}

/// Combine both sources and the fallbacks into one settings table.
pub fn merge_sources(
    mut settings: BTreeMap<String, SettingInfo>,
    pages: BTreeMap<String, String>,
) -> BTreeMap<String, SettingInfo> {
    for (key, page) in pages {
        settings.entry(key).or_default().wiki_page = Some(page);
    }
    for (key, page) in WIKI_FALLBACKS {
        let info = settings.entry(key.to_string()).or_default();
        if info.wiki_page.is_none() {
            info.wiki_page = Some(page.to_string());
        }
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRINT_CONFIG: &str = r#"
    def = this->add("layer_height", coFloat);
    def->label = L("Layer height");
    def->category = L("Quality");
    def->tooltip = L("Layer height is the depth of each layer of filament deposited.");
    def->sidetext = L("mm");
    def->set_default_value(new ConfigOptionFloat(0.20));

    def = this->add("wall_loops", coInt);
    def->label = L("Wall loops");
    def->full_label = L("Number of wall loops");
    def->category = L("Strength");
    def->tooltip = L("Number of perimeter walls.");
    def->set_default_value(new ConfigOptionInt(2));

    def = this->add("enable_support", coBool);
    def->label = L("Enable support");
    def->category = L("Support");
    def->set_default_value(new ConfigOptionBool(false));

    def = this->add("seam_gap", coPercent);
    def->label = L("Seam gap");
    def->tooltip = L("In order to reduce the visibility of the seam, "
                     "the loop is interrupted.\n"
                     "Use \"0\" to disable.");
    def->set_default_value(new ConfigOptionPercent(10.));

    def = this->add("printer_technology", coEnum);
    def->set_default_value(new ConfigOptionEnum<PrinterTechnology>(ptFFF));
"#;

    const TAB: &str = r#"
    optgroup->append_single_option_line("layer_height", "quality_settings_layer_height");
    optgroup->append_single_option_line("wall_loops", "quality_settings_walls");
    optgroup->append_single_option_line("layer_height", "some_other_page");

    Line line = optgroup->create_option_line(m_config->get_option("enable_support"));
    line.label_path = "support_settings_enable";
    line.append_option(optgroup->get_option("support_type"));
    line.append_option(optgroup->get_option("wall_loops"));
    optgroup->append_line(line);
    line.append_option(optgroup->get_option("after_group"));
"#;

    #[test]
    fn test_print_config_fields() {
        let settings = parse_print_config(PRINT_CONFIG).unwrap();

        let layer = &settings["layer_height"];
        assert_eq!(layer.kind.as_deref(), Some("float"));
        assert_eq!(layer.label.as_deref(), Some("Layer height"));
        assert_eq!(layer.category.as_deref(), Some("Quality"));
        assert_eq!(layer.sidetext.as_deref(), Some("mm"));
        assert_eq!(layer.default.as_deref(), Some("0.2"));

        let walls = &settings["wall_loops"];
        assert_eq!(walls.full_label.as_deref(), Some("Number of wall loops"));
        assert_eq!(walls.default.as_deref(), Some("2"));

        assert_eq!(settings["enable_support"].default.as_deref(), Some("false"));
        assert_eq!(settings["enable_support"].tooltip, None);
    }

    #[test]
    fn test_multiline_tooltip() {
        let settings = parse_print_config(PRINT_CONFIG).unwrap();
        let seam = &settings["seam_gap"];
        assert_eq!(seam.kind.as_deref(), Some("percent"));
        assert_eq!(
            seam.tooltip.as_deref(),
            Some("In order to reduce the visibility of the seam, the loop is interrupted.\nUse \"0\" to disable.")
        );
        assert_eq!(seam.default.as_deref(), Some("10.0"));
    }

    #[test]
    fn test_unlabeled_option_dropped() {
        let settings = parse_print_config(PRINT_CONFIG).unwrap();
        assert!(!settings.contains_key("printer_technology"));
        assert_eq!(settings.len(), 4);
    }

    #[test]
    fn test_tab_pages() {
        let pages = parse_tab_cpp(TAB).unwrap();
        assert_eq!(pages["layer_height"], "quality_settings_layer_height");
        assert_eq!(pages["wall_loops"], "quality_settings_walls");
        assert_eq!(pages["support_type"], "support_settings_enable");
        // declared before the label_path line
        assert!(!pages.contains_key("enable_support"));
        assert!(!pages.contains_key("after_group"));
    }

    #[test]
    fn test_merge_applies_fallbacks() {
        let settings = parse_print_config(PRINT_CONFIG).unwrap();
        let pages = parse_tab_cpp(TAB).unwrap();
        let merged = merge_sources(settings, pages);

        assert_eq!(merged["layer_height"].wiki_page.as_deref(), Some("quality_settings_layer_height"));
        assert_eq!(merged["support_type"].label, None);
        assert_eq!(merged["bridge_speed"].wiki_page.as_deref(), Some("speed_settings_other_layers_speed#bridge"));
        assert_eq!(merged["bed_temperature"].wiki_page.as_deref(), Some("material_temperatures#bed"));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(type_name("coFloats"), "float");
        assert_eq!(type_name("coPoints"), "points");
        assert_eq!(type_name("coFloatOrPercent"), "coFloatOrPercent");
    }

    #[test]
    fn test_simplify_default() {
        assert_eq!(simplify_default("0.20"), "0.2");
        assert_eq!(simplify_default("3."), "3.0");
        assert_eq!(simplify_default("15"), "15");
        assert_eq!(simplify_default("true"), "true");
        assert_eq!(simplify_default("\"abc\""), "\"abc\"");
    }
}
