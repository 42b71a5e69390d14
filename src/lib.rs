//! Folio: HTML to layout element conversion.
//!
//! Thin entry points over `folio-html` that wire the default style resolver,
//! worker and applier registries together from a [`FolioConfig`].

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use url::Url;

pub use folio_config::FolioConfig;
pub use folio_html::{
    Conversion, Diagnostic, Document, HtmlProcessor, LayoutElement, LayoutKind, ProcessError,
};
use folio_html::css::DefaultCssResolver;
use folio_html::resource::ResourceResolver;

/// Convert the children of `<body>` into top-level layout elements.
pub fn convert_elements(html: &str, config: &FolioConfig) -> Result<Conversion<Vec<LayoutElement>>> {
    let document = Document::parse_html(html);
    let processor = processor_for(&document, config)?;
    processor
        .process_elements(&document)
        .context("failed to convert HTML elements")
}

/// Convert a whole HTML document into its single root layout element.
pub fn convert_document(html: &str, config: &FolioConfig) -> Result<Conversion<LayoutElement>> {
    let document = Document::parse_html(html);
    let processor = processor_for(&document, config)?;
    processor
        .process_document(&document)
        .context("failed to convert HTML document")
}

/// Read and convert an HTML file. Relative resources resolve against the
/// file's directory unless `config` already names a base.
pub fn convert_file(path: &Path, config: &FolioConfig) -> Result<Conversion<Vec<LayoutElement>>> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read HTML file '{}'", path.display()))?;
    let mut config = config.clone();
    if config.resources.base_path.is_none() {
        config.resources.base_path = path.parent().map(Path::to_path_buf);
    }
    if config.resources.base_url.is_none() {
        config.resources.base_url = path
            .canonicalize()
            .ok()
            .and_then(|absolute| Url::from_file_path(absolute).ok())
            .map(String::from);
    }
    info!(path = %path.display(), "converting html file");
    convert_elements(&html, &config)
}

fn processor_for(document: &Document, config: &FolioConfig) -> Result<HtmlProcessor> {
    let resources = ResourceResolver::from_config(&config.resources);
    let resolver = DefaultCssResolver::from_document(document, &config.css, &resources)
        .context("failed to build style resolver")?;
    Ok(HtmlProcessor::new(resolver)
        .with_resources(resources)
        .with_config(config.processor.clone()))
}
