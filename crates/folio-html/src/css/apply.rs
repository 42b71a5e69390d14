use std::collections::HashMap;
use std::sync::Arc;

use super::StyleMap;
use crate::attach::{ProcessorContext, TagWorker};
use crate::dom::ElementRef;

/// Transfers an element's resolved styles onto its worker's result.
pub trait CssApplier: Send + Sync {
    fn apply(&self, context: &ProcessorContext<'_>, element: ElementRef<'_>, worker: &mut dyn TagWorker);
}

pub trait CssApplierFactory {
    fn css_applier(&self, tag: &str) -> Option<&dyn CssApplier>;
}

const BOX_SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

const TEXT_PROPERTIES: &[&str] = &[
    "color",
    "background-color",
    "font-family",
    "font-size",
    "font-style",
    "font-variant",
    "font-weight",
    "letter-spacing",
    "line-height",
    "text-decoration",
    "text-transform",
    "vertical-align",
    "white-space",
    "word-spacing",
    "outline-width",
    "outline-style",
    "outline-color",
    "outline-offset",
];

const BLOCK_PROPERTIES: &[&str] = &[
    "text-align",
    "text-indent",
    "list-style-type",
    "width",
    "height",
    "min-width",
    "max-width",
    "min-height",
    "max-height",
    "border-collapse",
    "page-break-before",
    "page-break-after",
    "margin-top",
    "margin-right",
    "margin-bottom",
    "margin-left",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
];

const INLINE_BOX_PROPERTIES: &[&str] = &[
    "width",
    "height",
    "margin-left",
    "margin-right",
    "padding-left",
    "padding-right",
];

/// Applier for block containers, paragraphs, lists and table parts.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockCssApplier;

impl CssApplier for BlockCssApplier {
    fn apply(&self, context: &ProcessorContext<'_>, element: ElementRef<'_>, worker: &mut dyn TagWorker) {
        apply_filtered(context, element, worker, &[TEXT_PROPERTIES, BLOCK_PROPERTIES]);
    }
}

/// Applier for phrasing elements, links and images.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineCssApplier;

impl CssApplier for InlineCssApplier {
    fn apply(&self, context: &ProcessorContext<'_>, element: ElementRef<'_>, worker: &mut dyn TagWorker) {
        apply_filtered(context, element, worker, &[TEXT_PROPERTIES, INLINE_BOX_PROPERTIES]);
    }
}

fn apply_filtered(
    context: &ProcessorContext<'_>,
    element: ElementRef<'_>,
    worker: &mut dyn TagWorker,
    allowed: &[&[&str]],
) {
    let (Some(styles), Some(result)) = (context.styles(element.id()), worker.result_mut()) else {
        return;
    };
    for (name, value) in expand_shorthands(styles) {
        if allowed.iter().any(|list| list.contains(&name.as_str())) {
            result.set_property(name, value);
        }
    }
}

/// Expand `margin`, `padding` and `outline` into their longhands. A longhand
/// set explicitly is kept over the value derived from the shorthand.
pub fn expand_shorthands(styles: &StyleMap) -> StyleMap {
    let mut out = StyleMap::new();
    let mut derived = Vec::new();
    for (name, value) in styles {
        match expand_shorthand(name, value) {
            Some(longhands) => derived.extend(longhands),
            None => {
                out.insert(name.clone(), value.clone());
            }
        }
    }
    for (name, value) in derived {
        out.entry(name).or_insert(value);
    }
    out
}

/// Longhands of a single shorthand declaration; `None` when `name` is not a
/// supported shorthand. A malformed box shorthand expands to nothing.
pub(crate) fn expand_shorthand(name: &str, value: &str) -> Option<Vec<(String, String)>> {
    match name {
        "margin" | "padding" => Some(
            box_sides(value)
                .map(|sides| {
                    BOX_SIDES
                        .iter()
                        .zip(sides)
                        .map(|(side, side_value)| (format!("{name}-{side}"), side_value))
                        .collect()
                })
                .unwrap_or_default(),
        ),
        "outline" => Some(
            outline_parts(value)
                .into_iter()
                .map(|(longhand, part)| (longhand.to_string(), part))
                .collect(),
        ),
        _ => None,
    }
}

/// CSS 1-4 value box shorthand as `[top, right, bottom, left]`.
fn box_sides(value: &str) -> Option<[String; 4]> {
    let parts = split_values(value);
    let [top, right, bottom, left] = match parts.as_slice() {
        [all] => [all, all, all, all],
        [vertical, horizontal] => [vertical, horizontal, vertical, horizontal],
        [top, horizontal, bottom] => [top, horizontal, bottom, horizontal],
        [top, right, bottom, left] => [top, right, bottom, left],
        _ => return None,
    };
    Some([top.clone(), right.clone(), bottom.clone(), left.clone()])
}

fn outline_parts(value: &str) -> Vec<(&'static str, String)> {
    const STYLES: &[&str] = &[
        "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset",
        "outset", "auto",
    ];
    let mut parts = Vec::new();
    for token in split_values(value) {
        let lower = token.to_ascii_lowercase();
        let name = if STYLES.contains(&lower.as_str()) {
            "outline-style"
        } else if matches!(lower.as_str(), "thin" | "medium" | "thick")
            || lower.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        {
            "outline-width"
        } else {
            "outline-color"
        };
        parts.push((name, token));
    }
    parts
}

/// Split on whitespace outside parentheses, so `rgb(0, 0, 0)` stays whole.
fn split_values(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for ch in value.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Applier registry keyed by lower-case tag name.
#[derive(Clone)]
pub struct DefaultCssApplierFactory {
    appliers: HashMap<&'static str, Arc<dyn CssApplier>>,
}

impl DefaultCssApplierFactory {
    pub fn empty() -> Self {
        Self {
            appliers: HashMap::new(),
        }
    }

    /// Appliers for every tag the default worker registry handles, except
    /// `br` and `tr` which carry no styles of their own.
    pub fn new() -> Self {
        let mut factory = Self::empty();
        let block: Arc<dyn CssApplier> = Arc::new(BlockCssApplier);
        let inline: Arc<dyn CssApplier> = Arc::new(InlineCssApplier);
        for tag in [
            "html", "body", "div", "section", "article", "header", "footer", "nav", "main",
            "aside", "address", "blockquote", "figure", "figcaption", "form", "center", "p",
            "pre", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "table", "td", "th",
        ] {
            factory.register(tag, Arc::clone(&block));
        }
        for tag in [
            "span", "b", "strong", "i", "em", "u", "s", "small", "code", "sub", "sup", "label",
            "mark", "abbr", "cite", "q", "font", "big", "tt", "kbd", "samp", "var", "del", "ins",
            "a", "img",
        ] {
            factory.register(tag, Arc::clone(&inline));
        }
        factory
    }

    pub fn register(&mut self, tag: &'static str, applier: Arc<dyn CssApplier>) {
        self.appliers.insert(tag, applier);
    }
}

impl Default for DefaultCssApplierFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CssApplierFactory for DefaultCssApplierFactory {
    fn css_applier(&self, tag: &str) -> Option<&dyn CssApplier> {
        self.appliers.get(tag).map(|applier| applier.as_ref())
    }
}
