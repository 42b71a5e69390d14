use folio_config::CssConfig;
use tracing::debug;

use super::{CssError, CssResolver, Origin, StyleMap, StyleSheet, USER_AGENT_CSS, is_inherited};
use crate::dom::{Document, ElementRef};
use crate::resource::ResourceResolver;

/// Stylesheet-backed resolver: user-agent rules, document `<style>` blocks,
/// local `<link rel="stylesheet">` targets and inline `style` attributes.
#[derive(Debug, Clone)]
pub struct DefaultCssResolver {
    sheet: StyleSheet,
    default_font_size: String,
}

impl DefaultCssResolver {
    /// `config.default_font_size` must be an absolute length such as `12pt`.
    pub fn new(sheet: StyleSheet, config: &CssConfig) -> Result<Self, CssError> {
        let size = config.default_font_size.trim();
        match parse_length(size) {
            Some((_, unit)) if is_absolute_unit(unit) => Ok(Self {
                sheet,
                default_font_size: size.to_string(),
            }),
            _ => Err(CssError::InvalidFontSize(config.default_font_size.clone())),
        }
    }

    pub fn from_document(
        document: &Document,
        config: &CssConfig,
        resources: &ResourceResolver,
    ) -> Result<Self, CssError> {
        let mut sheet = StyleSheet::empty();
        if config.user_agent_stylesheet {
            sheet.add_source(Origin::UserAgent, USER_AGENT_CSS);
        }
        for element in document.elements() {
            if element.name() == "style" {
                sheet.add_source(Origin::Author, &element.text());
            } else if element.is_stylesheet_link() {
                let href = element.attr("href").unwrap_or_default();
                match resources.read_stylesheet(href) {
                    Some(css) => sheet.add_source(Origin::Author, &css),
                    None => debug!(href = %href, "stylesheet link not loaded"),
                }
            }
        }
        debug!(rules = sheet.len(), "stylesheet built");
        Self::new(sheet, config)
    }

    pub fn stylesheet(&self) -> &StyleSheet {
        &self.sheet
    }
}

impl CssResolver for DefaultCssResolver {
    fn resolve_styles(
        &self,
        element: ElementRef<'_>,
        parent: Option<&StyleMap>,
    ) -> Result<StyleMap, CssError> {
        let mut styles = self.sheet.compute_for(element, element.attr("style"));

        let inherit: Vec<String> = styles
            .iter()
            .filter(|(_, value)| value.eq_ignore_ascii_case("inherit"))
            .map(|(name, _)| name.clone())
            .collect();
        for name in inherit {
            match parent.and_then(|p| p.get(&name)) {
                Some(value) => styles.insert(name, value.clone()),
                None => styles.remove(&name),
            };
        }

        let parent_size = parent
            .and_then(|p| p.get("font-size"))
            .map_or(self.default_font_size.as_str(), String::as_str);
        let font_size = styles
            .get("font-size")
            .and_then(|value| resolve_font_size(value, parent_size, &self.default_font_size))
            .unwrap_or_else(|| parent_size.to_string());
        styles.insert("font-size".to_string(), font_size);

        if let Some(parent) = parent {
            for (name, value) in parent {
                if is_inherited(name) && !styles.contains_key(name) {
                    styles.insert(name.clone(), value.clone());
                }
            }
        }
        Ok(styles)
    }
}

/// Resolve a font size against the parent's (absolute) size. `None` when the
/// value cannot be interpreted.
fn resolve_font_size(value: &str, parent: &str, root: &str) -> Option<String> {
    let value = value.trim().to_ascii_lowercase();
    let (parent_size, parent_unit) = parse_length(parent)?;
    let absolute = match value.as_str() {
        "xx-small" => Some(7.0),
        "x-small" => Some(7.5),
        "small" => Some(10.0),
        "medium" => Some(12.0),
        "large" => Some(13.5),
        "x-large" => Some(18.0),
        "xx-large" => Some(24.0),
        _ => None,
    };
    if let Some(points) = absolute {
        return Some(format_length(points, "pt"));
    }
    match value.as_str() {
        "larger" => return Some(format_length(parent_size * 1.2, parent_unit)),
        "smaller" => return Some(format_length(parent_size / 1.2, parent_unit)),
        _ => {}
    }
    let (amount, unit) = parse_length(&value)?;
    match unit {
        "em" => Some(format_length(parent_size * amount, parent_unit)),
        "%" => Some(format_length(parent_size * amount / 100.0, parent_unit)),
        "rem" => {
            let (root_size, root_unit) = parse_length(root)?;
            Some(format_length(root_size * amount, root_unit))
        }
        unit if is_absolute_unit(unit) => Some(format_length(amount, unit)),
        _ => None,
    }
}

fn parse_length(value: &str) -> Option<(f32, &str)> {
    let value = value.trim();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(value.len());
    let amount = value[..split].parse::<f32>().ok()?;
    Some((amount, value[split..].trim()))
}

fn is_absolute_unit(unit: &str) -> bool {
    matches!(unit, "pt" | "px" | "pc" | "in" | "cm" | "mm")
}

fn format_length(amount: f32, unit: &str) -> String {
    let rounded = (amount * 100.0).round() / 100.0;
    format!("{rounded}{unit}")
}
