//! Folio configuration system
//!
//! This crate provides centralized configuration for the HTML conversion
//! pipeline, loading settings from `folio.toml` with environment variable
//! overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors raised while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FolioConfig {
    /// Tree processing settings
    pub processor: ProcessorConfig,
    /// Style resolution settings
    pub css: CssConfig,
    /// Resource (image, link) resolution settings
    pub resources: ResourceConfig,
}

/// Tree processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Tags that map to no worker and are skipped without a diagnostic.
    pub ignored_tags: Vec<String>,
    /// Tags whose workers deliberately get no CSS applier.
    /// Content from `tr` is handed up to the parent; the others inherit anyway.
    pub ignored_css_tags: Vec<String>,
    /// Mark top-level results of element collection with `collapsing-margins`.
    pub collapsing_margins: bool,
}

/// Style resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CssConfig {
    /// Font size assigned to the root when no rule sets one
    pub default_font_size: String,
    /// Include the built-in user-agent stylesheet in the cascade
    pub user_agent_stylesheet: bool,
}

/// Resource resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ResourceConfig {
    /// Directory relative resources are looked up from
    pub base_path: Option<PathBuf>,
    /// Base URL relative links are joined against (e.g. "https://example.com/docs/")
    pub base_url: Option<String>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            ignored_tags: vec!["head".into(), "style".into(), "tbody".into()],
            ignored_css_tags: vec!["br".into(), "title".into(), "meta".into(), "tr".into()],
            collapsing_margins: true,
        }
    }
}

impl ProcessorConfig {
    pub fn is_ignored_tag(&self, tag: &str) -> bool {
        self.ignored_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn is_ignored_css_tag(&self, tag: &str) -> bool {
        self.ignored_css_tags
            .iter()
            .any(|t| t.eq_ignore_ascii_case(tag))
    }
}

impl Default for CssConfig {
    fn default() -> Self {
        Self {
            default_font_size: "12pt".to_string(),
            user_agent_stylesheet: true,
        }
    }
}

impl FolioConfig {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the folio.toml configuration file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from the default location (folio.toml in the current directory)
    /// or return default configuration if the file doesn't exist
    pub fn load_or_default() -> Self {
        Self::load_from_file("folio.toml").unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        if let Ok(path) = std::env::var("FOLIO_BASE_PATH") {
            self.resources.base_path = Some(PathBuf::from(path));
        }
        if let Ok(url) = std::env::var("FOLIO_BASE_URL") {
            self.resources.base_url = Some(url);
        }
        if let Ok(size) = std::env::var("FOLIO_DEFAULT_FONT_SIZE") {
            if !size.trim().is_empty() {
                self.css.default_font_size = size.trim().to_string();
            }
        }
        if let Ok(val) = std::env::var("FOLIO_COLLAPSING_MARGINS") {
            self.processor.collapsing_margins = parse_flag(&val);
        }
        if let Ok(val) = std::env::var("FOLIO_USER_AGENT_STYLESHEET") {
            self.css.user_agent_stylesheet = parse_flag(&val);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from folio.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}
