//! Style resolution and application.
//!
//! [`CssResolver`] produces the cascaded property mapping of one element;
//! [`CssApplier`]s later transfer the relevant part of that mapping onto the
//! layout element a worker built.

mod apply;
mod resolver;
mod stylesheet;
mod ua;

use std::collections::BTreeMap;

use crate::dom::ElementRef;

pub use apply::{
    BlockCssApplier, CssApplier, CssApplierFactory, DefaultCssApplierFactory, InlineCssApplier,
    expand_shorthands,
};
pub use resolver::DefaultCssResolver;
pub use stylesheet::{Origin, StyleSheet};
pub use ua::USER_AGENT_CSS;

/// Resolved property name to value mapping of a single element.
pub type StyleMap = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum CssError {
    #[error("failed to resolve styles for <{tag}>: {message}")]
    Resolution { tag: String, message: String },
    #[error("invalid font size '{0}'")]
    InvalidFontSize(String),
}

/// The style resolution collaborator of the processor.
///
/// Called once per element on enter, with the already resolved mapping of the
/// parent element when there is one. Must be idempotent for an unchanged node.
pub trait CssResolver {
    fn resolve_styles(
        &self,
        element: ElementRef<'_>,
        parent: Option<&StyleMap>,
    ) -> Result<StyleMap, CssError>;
}

/// `display: none` prunes an element together with its subtree.
pub fn is_displayable(styles: &StyleMap) -> bool {
    styles
        .get("display")
        .is_none_or(|display| !display.trim().eq_ignore_ascii_case("none"))
}

/// Properties passed from parent to child when the child does not set them.
pub fn is_inherited(property: &str) -> bool {
    matches!(
        property,
        "color"
            | "font-family"
            | "font-size"
            | "font-style"
            | "font-variant"
            | "font-weight"
            | "letter-spacing"
            | "line-height"
            | "list-style-type"
            | "text-align"
            | "text-indent"
            | "text-transform"
            | "visibility"
            | "white-space"
            | "word-spacing"
    )
}
