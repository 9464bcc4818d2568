//! Site options.
//!
//! Options live in a YAML document at the site root (`wokconfig` by default).
//! Loading starts from the stock defaults and merges the user document on top
//! of them, key by key, so a config file only needs the values it changes:
//!
//! ```yaml
//! site_title: My Site
//! url_pattern: /{category}/{slug}{page}/index.html
//! url_include_index: false
//! authors:
//!   - Jane Doe <jane@example.com>
//! nav: !include nav.yaml
//! ```
//!
//! ## Defaults
//!
//! ```yaml
//! content_dir: content
//! template_dir: templates
//! output_dir: output
//! output_exclude: []
//! media_dir: media
//! site_title: Some random Wok site
//! url_pattern: /{category}/{slug}{page}.{ext}
//! url_include_index: true
//! relative_urls: false
//! ```
//!
//! ## Includes
//!
//! A value tagged `!include <path>` is replaced by the parsed contents of that
//! file. The path is resolved against the directory of the including file, so
//! included files may themselves include siblings.
//!
//! ## Free-form keys
//!
//! Keys the engine does not know about are kept and handed to templates as
//! `site.<key>`. `author`/`authors` are normalised into a list of [`Author`].

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Config file looked up at the site root unless overridden.
pub const DEFAULT_CONFIG_FILE: &str = "wokconfig";

/// Config file name used by old sites. Still honoured, with a warning.
pub const LEGACY_CONFIG_FILE: &str = "config";

/// Nesting limit for `!include`, so a file including itself fails cleanly.
const MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML parse error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid options: {0}")]
    Deserialize(#[from] serde_yaml::Error),
    #[error("Bad !include in {path}: {reason}")]
    Include { path: PathBuf, reason: String },
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Resolved site options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Directory holding the content files, relative to the site root.
    pub content_dir: String,
    /// Directory holding the templates.
    pub template_dir: String,
    /// Directory the site is generated into.
    pub output_dir: String,
    /// Glob patterns of top-level output entries that survive clearing.
    pub output_exclude: Vec<String>,
    /// Directory whose entries are copied verbatim into the output root.
    pub media_dir: String,
    pub site_title: String,
    /// Output URL of each page. Placeholders: `{category}`, `{slug}`,
    /// `{page}`, `{ext}`, `{date}`.
    pub url_pattern: String,
    /// Keep a trailing `index.html` in page URLs.
    pub url_include_index: bool,
    /// Emit URLs without the leading `/`.
    pub relative_urls: bool,
    /// Site authors, from either `author` or `authors`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
    /// Everything else, passed through to templates.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            content_dir: "content".to_string(),
            template_dir: "templates".to_string(),
            output_dir: "output".to_string(),
            output_exclude: Vec::new(),
            media_dir: "media".to_string(),
            site_title: "Some random Wok site".to_string(),
            url_pattern: "/{category}/{slug}{page}.{ext}".to_string(),
            url_include_index: true,
            relative_urls: false,
            authors: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl Options {
    /// Validate values that would otherwise fail late, mid-build.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url_pattern.trim().is_empty() {
            return Err(ConfigError::Validation(
                "url_pattern must not be empty".into(),
            ));
        }
        if self.output_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output_dir must not be empty".into(),
            ));
        }
        for pattern in &self.output_exclude {
            glob::Pattern::new(pattern).map_err(|e| {
                ConfigError::Validation(format!("bad output_exclude pattern {pattern:?}: {e}"))
            })?;
        }
        Ok(())
    }

    /// Add the implicit dotfile exclusion. Idempotent.
    pub fn exclude_dotfiles(&mut self) {
        if !self.output_exclude.iter().any(|p| p == ".*") {
            self.output_exclude.push(".*".to_string());
        }
    }

    /// Absolute locations of every directory the pipeline touches.
    pub fn layout(&self, root: &Path) -> SiteLayout {
        SiteLayout {
            root: root.to_path_buf(),
            content: root.join(&self.content_dir),
            templates: root.join(&self.template_dir),
            output: root.join(&self.output_dir),
            media: root.join(&self.media_dir),
            hooks: root.join("hooks"),
            renderers: root.join("renderers"),
        }
    }
}

/// Directories of one site, resolved against its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLayout {
    pub root: PathBuf,
    pub content: PathBuf,
    pub templates: PathBuf,
    pub output: PathBuf,
    pub media: PathBuf,
    pub hooks: PathBuf,
    pub renderers: PathBuf,
}

/// A site or page author, written as `Name` or `Name <email>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Author {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(open) = raw.find('<')
            && let Some(close) = raw[open..].find('>')
        {
            let email = raw[open + 1..open + close].trim();
            return Self {
                name: raw[..open].trim().to_string(),
                email: (!email.is_empty()).then(|| email.to_string()),
            };
        }
        Self {
            name: raw.to_string(),
            email: None,
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.email {
            Some(email) => write!(f, "{} <{}>", self.name, email),
            None => f.write_str(&self.name),
        }
    }
}

/// Normalise an `author`/`authors` value: a YAML list, a single string, or a
/// legacy comma-separated string. The flag reports the legacy form.
pub fn parse_authors(value: &Value) -> (Vec<Author>, bool) {
    match value {
        Value::Sequence(items) => {
            let authors = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(Author::parse(s)),
                    Value::Mapping(_) => serde_yaml::from_value(item.clone()).ok(),
                    _ => None,
                })
                .collect();
            (authors, false)
        }
        Value::String(s) => {
            let authors: Vec<Author> = s
                .split(',')
                .filter(|part| !part.trim().is_empty())
                .map(Author::parse)
                .collect();
            let legacy_csv = authors.len() > 1;
            (authors, legacy_csv)
        }
        Value::Mapping(_) => (serde_yaml::from_value(value.clone()).into_iter().collect(), false),
        _ => (Vec::new(), false),
    }
}

/// Deprecated user input. Reported as warnings, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deprecation {
    LegacyConfigFile { expected: String },
    CsvAuthors,
    TypePlaceholder,
}

impl fmt::Display for Deprecation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LegacyConfigFile { expected } => write!(
                f,
                "Using deprecated `{LEGACY_CONFIG_FILE}' file instead of `{expected}'"
            ),
            Self::CsvAuthors => f.write_str(
                "Deprecation Warning: Use YAML lists instead of CSV for multiple authors. \
                 i.e. [\"John Doe\", \"Jane Smith\"] instead of \"John Doe, Jane Smith\".",
            ),
            Self::TypePlaceholder => f.write_str(
                "Deprecation Warning: You should use {ext} instead of {type} in the url pattern.",
            ),
        }
    }
}

/// Inspect a raw user document for deprecated syntax.
pub fn detect_deprecations(user: Option<&Value>, legacy_file: Option<&str>) -> Vec<Deprecation> {
    let mut found = Vec::new();
    if let Some(expected) = legacy_file {
        found.push(Deprecation::LegacyConfigFile {
            expected: expected.to_string(),
        });
    }
    if let Some(Value::Mapping(map)) = user {
        let authors = map.get("authors").or_else(|| map.get("author"));
        if let Some(value) = authors
            && parse_authors(value).1
        {
            found.push(Deprecation::CsvAuthors);
        }
        if let Some(Value::String(pattern)) = map.get("url_pattern")
            && pattern.contains("{type}")
        {
            found.push(Deprecation::TypePlaceholder);
        }
    }
    found
}

// =============================================================================
// Loading, includes and merging
// =============================================================================

/// Stock defaults as a YAML mapping, the base layer for merging.
pub fn stock_defaults_value() -> Value {
    serde_yaml::to_value(Options::default()).unwrap_or(Value::Mapping(Mapping::new()))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Mappings merge key by key (overlay wins).
/// - Any other overlay value replaces the base value.
/// - Base keys missing from the overlay are kept.
pub fn merge_yaml(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => merge_yaml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged);
            }
            Value::Mapping(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Load a YAML file with `!include` support.
///
/// Returns `Ok(None)` when the file does not exist. An empty file is an empty
/// mapping.
pub fn load_yaml_file(path: &Path) -> Result<Option<Value>, ConfigError> {
    if !path.is_file() {
        return Ok(None);
    }
    read_yaml(path, 0).map(Some)
}

fn read_yaml(path: &Path, depth: usize) -> Result<Value, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    let value = match value {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    };
    let base_dir = path.parent().unwrap_or(Path::new("."));
    resolve_includes(value, base_dir, path, depth)
}

/// Replace every `!include <path>` node with the document it points to.
pub fn resolve_includes(
    value: Value,
    base_dir: &Path,
    source: &Path,
    depth: usize,
) -> Result<Value, ConfigError> {
    match value {
        Value::Tagged(tagged) if tagged.tag == "!include" => {
            let Value::String(rel) = &tagged.value else {
                return Err(ConfigError::Include {
                    path: source.to_path_buf(),
                    reason: "!include expects a file path".into(),
                });
            };
            if depth >= MAX_INCLUDE_DEPTH {
                return Err(ConfigError::Include {
                    path: source.to_path_buf(),
                    reason: format!("include nesting deeper than {MAX_INCLUDE_DEPTH} ({rel})"),
                });
            }
            let target = base_dir.join(rel);
            debug!("including {}", target.display());
            read_yaml(&target, depth + 1)
        }
        Value::Mapping(map) => {
            let mut resolved = Mapping::with_capacity(map.len());
            for (key, val) in map {
                resolved.insert(key, resolve_includes(val, base_dir, source, depth)?);
            }
            Ok(Value::Mapping(resolved))
        }
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| resolve_includes(item, base_dir, source, depth))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        other => Ok(other),
    }
}

/// Merge an optional user document onto the defaults, then deserialize and
/// validate.
pub fn resolve_options(base: Value, overlay: Option<Value>) -> Result<Options, ConfigError> {
    let merged = match overlay {
        Some(Value::Mapping(map)) => merge_yaml(base, Value::Mapping(map)),
        Some(other) => {
            return Err(ConfigError::Validation(format!(
                "config must be a mapping, found {}",
                yaml_kind(&other)
            )));
        }
        None => base,
    };
    let Value::Mapping(mut map) = merged else {
        return Err(ConfigError::Validation("config must be a mapping".into()));
    };

    let raw_authors = map.remove("authors").or_else(|| map.remove("author"));
    map.remove("author");
    let authors = raw_authors
        .map(|value| parse_authors(&value).0)
        .unwrap_or_default();

    let mut options: Options = serde_yaml::from_value(Value::Mapping(map))?;
    options.authors = authors;
    options.validate()?;
    Ok(options)
}

/// Load options for the site at `root`.
///
/// A legacy `config` file takes precedence when present; deprecations are
/// logged as warnings.
pub fn load_options(root: &Path, config_name: &str) -> Result<Options, ConfigError> {
    let legacy = root.join(LEGACY_CONFIG_FILE);
    let (path, legacy_used) = if config_name != LEGACY_CONFIG_FILE && legacy.is_file() {
        (legacy, Some(config_name))
    } else {
        (root.join(config_name), None)
    };

    let user = load_yaml_file(&path)?;
    if user.is_none() {
        debug!("no config file at {}, using defaults", path.display());
    }
    for deprecation in detect_deprecations(user.as_ref(), legacy_used) {
        warn!("{deprecation}");
    }
    resolve_options(stock_defaults_value(), user)
}

fn yaml_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
