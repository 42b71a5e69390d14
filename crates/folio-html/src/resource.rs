use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use folio_config::ResourceConfig;
use tracing::{debug, warn};
use url::Url;

/// Where a `src` or `href` attribute points after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Any non-file URL, `data:` and `mailto:` included.
    Url(Url),
    /// A local file. It may not exist.
    Path(PathBuf),
    /// Kept as written: fragments, and relative targets with nothing to
    /// resolve them against.
    Verbatim(String),
}

impl Reference {
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Reference::Path(path) => Some(path),
            _ => None,
        }
    }

    fn from_url(url: Url) -> Self {
        if url.scheme() == "file" {
            if let Ok(path) = url.to_file_path() {
                return Reference::Path(path);
            }
        }
        Reference::Url(url)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Url(url) => f.write_str(url.as_str()),
            Reference::Path(path) => write!(f, "{}", path.display()),
            Reference::Verbatim(raw) => f.write_str(raw),
        }
    }
}

/// Resolves `src`/`href` attribute values against the document's location.
#[derive(Debug, Clone, Default)]
pub struct ResourceResolver {
    base_path: Option<PathBuf>,
    base_url: Option<Url>,
}

impl ResourceResolver {
    pub fn new(base_path: Option<PathBuf>, base_url: Option<Url>) -> Self {
        Self {
            base_path,
            base_url,
        }
    }

    /// An unparseable `base_url` is logged and ignored.
    pub fn from_config(config: &ResourceConfig) -> Self {
        let base_url = config
            .base_url
            .as_deref()
            .and_then(|raw| match Url::parse(raw) {
                Ok(url) => Some(url),
                Err(err) => {
                    warn!(base_url = %raw, error = %err, "ignoring invalid base url");
                    None
                }
            });
        Self::new(config.base_path.clone(), base_url)
    }

    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Resolve a hyperlink target. Absolute URLs win, then the base URL,
    /// then the base directory.
    pub fn resolve(&self, raw: &str) -> Reference {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Reference::Verbatim(trimmed.to_string());
        }
        if let Ok(url) = Url::parse(trimmed) {
            return Reference::from_url(url);
        }
        if let Some(joined) = self.base_url.as_ref().and_then(|base| base.join(trimmed).ok()) {
            return Reference::from_url(joined);
        }
        match &self.base_path {
            Some(base) => Reference::Path(base.join(trimmed)),
            None => Reference::Verbatim(trimmed.to_string()),
        }
    }

    /// Resolve an embedded resource (image, stylesheet). A local file that
    /// is not where [`resolve`](Self::resolve) puts it is looked for in each
    /// ancestor of the base directory.
    pub fn locate(&self, raw: &str) -> Reference {
        let reference = self.resolve(raw);
        let missing = match &reference {
            Reference::Path(path) => !path.exists(),
            Reference::Verbatim(kept) => !kept.is_empty() && !kept.starts_with('#'),
            Reference::Url(_) => false,
        };
        if !missing {
            return reference;
        }
        self.search_ancestors(raw.trim())
            .map(Reference::Path)
            .unwrap_or(reference)
    }

    /// Contents of a `<link rel="stylesheet">` target. Only local files are
    /// read; remote stylesheets are skipped.
    pub fn read_stylesheet(&self, href: &str) -> Option<String> {
        match self.locate(href) {
            Reference::Path(path) => match fs::read_to_string(&path) {
                Ok(css) => Some(css),
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "stylesheet not readable");
                    None
                }
            },
            Reference::Url(url) => {
                debug!(href = %url, "skipped remote stylesheet link");
                None
            }
            Reference::Verbatim(raw) if !raw.is_empty() => fs::read_to_string(raw).ok(),
            Reference::Verbatim(_) => None,
        }
    }

    /// Directory relative targets are searched from: the base path, or the
    /// directory of a `file:` base URL.
    fn base_dir(&self) -> Option<PathBuf> {
        if let Some(base) = &self.base_path {
            return Some(base.clone());
        }
        let url = self.base_url.as_ref().filter(|url| url.scheme() == "file")?;
        let path = url.to_file_path().ok()?;
        if url.path().ends_with('/') {
            Some(path)
        } else {
            path.parent().map(Path::to_path_buf)
        }
    }

    fn search_ancestors(&self, raw: &str) -> Option<PathBuf> {
        if Url::parse(raw).is_ok() {
            return None;
        }
        let relative = Path::new(raw.trim_start_matches('/'));
        if relative.as_os_str().is_empty() {
            return None;
        }
        let base = self.base_dir()?;
        base.ancestors()
            .map(|dir| dir.join(relative))
            .find(|candidate| candidate.exists())
    }
}
