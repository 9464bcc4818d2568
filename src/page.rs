//! The page model.
//!
//! A [`Page`] is one output document. Most come from content files; hooks can
//! contribute synthetic ones, and a paginated page spawns one extra page per
//! additional chunk of its list while it renders.
//!
//! ## Content files
//!
//! A content file is an optional YAML header followed by a `---` line and the
//! body. The header may also be fenced Jekyll-style:
//!
//! ```text
//! title: Hello
//! tags: [rust, web]
//! ---
//! Body in whatever markup the file extension selects.
//! ```
//!
//! A file without a separator is all body with an empty header. A header that
//! does not parse as a YAML mapping makes the file unloadable (logged, skipped).
//!
//! ## Meta defaults
//!
//! | Key | Default |
//! |-----|---------|
//! | `title` | the slug, or the file stem |
//! | `slug` | `slugify(title)`, or `slugify(file stem)` |
//! | `category` | the file's directory below the content dir |
//! | `published`, `make_file` | `true` |
//! | `template` | `default` |
//! | `type` | the source file extension |
//!
//! ## URLs
//!
//! `url_pattern` placeholders: `{category}` (joined with `/`), `{slug}`,
//! `{page}` (empty on the first page, the page number after), `{ext}` (the
//! extension of the page's template file), `{date}` (`YYYY/MM/DD`) and the
//! legacy `{type}`, an alias for `{ext}`. Repeated slashes collapse. A URL
//! ending in `/` is written to `index.html` in that directory.

use crate::config::{Author, Options, SiteLayout, parse_authors};
use crate::renderers::Renderer;
use crate::template::{TemplateEngine, TemplateError, resolve_glob};
use crate::util::{file_extension, get_rooturl, slugify};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Error, Debug)]
pub enum PageError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid page meta: {0}")]
    Meta(String),
}

/// Site-wide settings every page needs to place itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEnv {
    pub content_dir: PathBuf,
    pub output_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub url_pattern: String,
    pub url_include_index: bool,
    pub relative_urls: bool,
}

impl PageEnv {
    pub fn new(options: &Options, layout: &SiteLayout) -> Arc<Self> {
        Arc::new(Self {
            content_dir: layout.content.clone(),
            output_dir: layout.output.clone(),
            templates_dir: layout.templates.clone(),
            url_pattern: options.url_pattern.clone(),
            url_include_index: options.url_include_index,
            relative_urls: options.relative_urls,
        })
    }

    /// Extension of the file `template` resolves to; `html` if unresolved.
    fn template_ext(&self, template: &str) -> String {
        resolve_glob(&self.templates_dir, &format!("{template}.*"))
            .ok()
            .and_then(|path| {
                path.file_name()
                    .map(|name| file_extension(&name.to_string_lossy()).to_string())
            })
            .unwrap_or_else(|| "html".to_string())
    }
}

/// Request to split a list across several pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationSpec {
    /// Dotted path into the render context, e.g. `page.subpages`.
    pub list: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    #[serde(default)]
    pub sort_reverse: bool,
}

fn default_limit() -> usize {
    10
}

/// Normalised page metadata. Unknown header keys are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageMeta {
    pub title: String,
    pub slug: String,
    pub category: Vec<String>,
    pub tags: BTreeSet<String>,
    pub published: bool,
    pub make_file: bool,
    pub template: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationSpec>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Fallbacks for keys a header leaves out.
#[derive(Debug, Clone, Default)]
pub struct MetaHints {
    pub stem: String,
    pub category: Vec<String>,
    pub kind: String,
}

impl MetaHints {
    pub fn for_file(path: &Path, content_dir: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let category = path
            .parent()
            .and_then(|dir| dir.strip_prefix(content_dir).ok())
            .map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            kind: file_extension(&name).to_string(),
            stem,
            category,
        }
    }
}

impl PageMeta {
    /// Build meta from raw header fields, filling defaults from `hints`.
    pub fn from_fields(mut fields: Map<String, Value>, hints: &MetaHints) -> Self {
        let raw_title = take_string(&mut fields, "title");
        let raw_slug = take_string(&mut fields, "slug");
        let (title, slug) = match (raw_title, raw_slug) {
            (Some(title), Some(slug)) => (title, slug),
            (Some(title), None) => {
                let slug = slugify(&title);
                (title, slug)
            }
            (None, Some(slug)) => (slug.clone(), slug),
            (None, None) => (hints.stem.clone(), slugify(&hints.stem)),
        };

        let category = match fields.remove("category") {
            Some(Value::String(s)) => split_category(&s),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(scalar_string)
                .flat_map(|s| split_category(&s))
                .collect(),
            Some(Value::Null) | None => hints.category.clone(),
            Some(other) => {
                warn!("ignoring category {other}; expected a string or list");
                hints.category.clone()
            }
        };

        let tags = match fields.remove("tags") {
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(scalar_string)
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            _ => BTreeSet::new(),
        };

        let authors = fields
            .remove("authors")
            .or_else(|| fields.remove("author"))
            .and_then(|v| serde_yaml::to_value(v).ok())
            .map(|v| parse_authors(&v).0)
            .unwrap_or_default();
        fields.remove("author");

        let pagination = match fields.remove("pagination") {
            None | Some(Value::Null) => None,
            Some(raw) => match serde_json::from_value::<PaginationSpec>(raw) {
                Ok(spec) => Some(spec),
                Err(e) => {
                    warn!("ignoring pagination for {slug}: {e}");
                    None
                }
            },
        };

        let mut meta = Self {
            published: take_bool(&mut fields, "published").unwrap_or(true),
            make_file: take_bool(&mut fields, "make_file").unwrap_or(true),
            template: take_string(&mut fields, "template").unwrap_or_else(|| "default".into()),
            url: take_string(&mut fields, "url").unwrap_or_default(),
            kind: take_string(&mut fields, "type").unwrap_or_else(|| hints.kind.clone()),
            date: take_string(&mut fields, "date"),
            time: take_string(&mut fields, "time"),
            datetime: take_string(&mut fields, "datetime"),
            title,
            slug,
            category,
            tags,
            authors,
            pagination,
            extra: fields.into_iter().collect(),
        };
        meta.normalize_dates();
        meta
    }

    /// Fill in whichever of `date`/`time`/`datetime` can be derived from the
    /// others and rewrite all three in canonical form.
    fn normalize_dates(&mut self) {
        let parsed_dt = self.datetime.as_deref().and_then(|raw| {
            let dt = parse_datetime(raw);
            if dt.is_none() {
                warn!("{}: unrecognised datetime {raw:?}", self.slug);
            }
            dt
        });
        let parsed_date = self.date.as_deref().and_then(|raw| {
            let d = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok();
            if d.is_none() {
                warn!("{}: unrecognised date {raw:?}", self.slug);
            }
            d
        });
        let parsed_time = self.time.as_deref().and_then(|raw| {
            let t = parse_time(raw);
            if t.is_none() {
                warn!("{}: unrecognised time {raw:?}", self.slug);
            }
            t
        });

        let datetime = parsed_dt.or_else(|| {
            parsed_date.and_then(|d| match parsed_time {
                Some(t) => Some(d.and_time(t)),
                None => d.and_hms_opt(0, 0, 0),
            })
        });
        if let Some(dt) = datetime {
            self.datetime = Some(dt.format("%Y-%m-%d %H:%M:%S").to_string());
            self.date = Some(dt.format("%Y-%m-%d").to_string());
            if parsed_dt.is_some() || parsed_time.is_some() {
                self.time = Some(dt.format("%H:%M:%S").to_string());
            }
        } else if let Some(t) = parsed_time {
            self.time = Some(t.format("%H:%M:%S").to_string());
        }
    }

    fn parsed_date(&self) -> Option<NaiveDate> {
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    .or_else(|| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

fn split_category(raw: &str) -> Vec<String> {
    raw.split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    fields.remove(key).and_then(|v| scalar_string(&v))
}

fn take_bool(fields: &mut Map<String, Value>, key: &str) -> Option<bool> {
    match fields.remove(key)? {
        Value::Bool(b) => Some(b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

/// Split file text into `(header, body)`.
pub fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut offset = 0;
    let mut separators = Vec::with_capacity(2);
    for line in text.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']).trim_end() == "---" {
            separators.push((offset, offset + line.len()));
            // A leading fence opens the header; the next one closes it.
            if separators.len() == 2 || offset != 0 {
                break;
            }
        }
        offset += line.len();
    }
    match separators.as_slice() {
        [(0, open_end), (close_start, close_end), ..] => {
            (Some(&text[*open_end..*close_start]), &text[*close_end..])
        }
        [(0, _)] => (None, text),
        [(start, end), ..] => (Some(&text[..*start]), &text[*end..]),
        [] => (None, text),
    }
}

fn parse_header(header: &str) -> Result<Map<String, Value>, String> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(header).map_err(|e| e.to_string())?;
    match serde_json::to_value(yaml).map_err(|e| e.to_string())? {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        _ => Err("front matter is not a mapping".into()),
    }
}

/// One output document.
#[derive(Debug, Clone)]
pub struct Page {
    /// Source file, `None` for synthetic pages.
    pub path: Option<PathBuf>,
    pub meta: PageMeta,
    /// Body before the markup renderer ran.
    pub original: String,
    /// Body after the markup renderer ran.
    pub content: String,
    /// Metas of child pages, filled in by the tree builder.
    pub subpages: Vec<Value>,
    /// Template output, set by [`Page::render`].
    pub rendered: Option<String>,
    output_rel: PathBuf,
    page_number: usize,
    explicit_url: bool,
    pagination_state: Option<Value>,
    env: Arc<PageEnv>,
}

impl Page {
    /// Load a content file, rendering its body with `renderer`.
    ///
    /// Returns `None` when the file cannot be read, its header is malformed or
    /// the renderer fails. The reason is logged.
    pub fn from_file(path: &Path, env: &Arc<PageEnv>, renderer: &Renderer) -> Option<Page> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                error!("Could not read {}: {e}", path.display());
                return None;
            }
        };
        let (header, body) = split_front_matter(&text);
        let fields = match header.map(parse_header).transpose() {
            Ok(fields) => fields.unwrap_or_default(),
            Err(reason) => {
                warn!("Skipping {}: bad front matter: {reason}", path.display());
                return None;
            }
        };
        let meta = PageMeta::from_fields(fields, &MetaHints::for_file(path, &env.content_dir));

        // Unpublished pages are dropped by the loader; skip the renderer.
        let content = if meta.published {
            match renderer.render(body) {
                Ok(html) => html,
                Err(e) => {
                    error!("Skipping {}: {e}", path.display());
                    return None;
                }
            }
        } else {
            String::new()
        };
        debug!("loaded {} as {}", path.display(), meta.slug);
        Some(Self::assemble(
            Some(path.to_path_buf()),
            meta,
            body.to_string(),
            content,
            env,
        ))
    }

    /// A page with no source file. `content` is used as already-rendered body.
    pub fn synthetic(meta: Value, content: String, env: &Arc<PageEnv>) -> Result<Page, PageError> {
        let Value::Object(fields) = meta else {
            return Err(PageError::Meta(format!("meta must be an object, got {meta}")));
        };
        let hints = MetaHints {
            kind: "html".into(),
            ..MetaHints::default()
        };
        let meta = PageMeta::from_fields(fields, &hints);
        if meta.slug.is_empty() {
            return Err(PageError::Meta("synthetic page needs a title or slug".into()));
        }
        Ok(Self::assemble(None, meta, content.clone(), content, env))
    }

    fn assemble(
        path: Option<PathBuf>,
        meta: PageMeta,
        original: String,
        content: String,
        env: &Arc<PageEnv>,
    ) -> Self {
        let mut page = Self {
            path,
            explicit_url: !meta.url.is_empty(),
            meta,
            original,
            content,
            subpages: Vec::new(),
            rendered: None,
            output_rel: PathBuf::new(),
            page_number: 1,
            pagination_state: None,
            env: Arc::clone(env),
        };
        page.place(1);
        page
    }

    /// Set URL and output location for page number `n`.
    fn place(&mut self, n: usize) {
        let (url, rel) = self.url_for_page(n);
        self.meta.url = url;
        self.output_rel = rel;
        self.page_number = n;
    }

    /// Public URL and output-relative file path of page number `n`.
    pub fn url_for_page(&self, n: usize) -> (String, PathBuf) {
        let raw = if n <= 1 && self.explicit_url {
            collapse_slashes(&format!("/{}", self.meta.url))
        } else {
            let ext = self.env.template_ext(&self.meta.template);
            expand_url(&self.env.url_pattern, &self.meta, &ext, n)
        };
        let raw = match confine_url(&raw) {
            Some(confined) => {
                warn!(
                    "{}: url {raw} leaves the output dir, using {confined}",
                    self.meta.slug
                );
                confined
            }
            None => raw,
        };

        let mut rel = raw.trim_start_matches('/').to_string();
        if rel.is_empty() || rel.ends_with('/') {
            rel.push_str("index.html");
        }

        let mut url = raw;
        if !self.env.url_include_index && (url == "/index.html" || url.ends_with("/index.html")) {
            url.truncate(url.len() - "index.html".len());
        }
        if self.env.relative_urls {
            url = url.trim_start_matches('/').to_string();
        }
        (url, PathBuf::from(rel))
    }

    pub fn output_path(&self) -> PathBuf {
        self.env.output_dir.join(&self.output_rel)
    }

    /// Output file path relative to the output dir.
    pub fn output_rel(&self) -> &Path {
        &self.output_rel
    }

    pub fn page_number(&self) -> usize {
        self.page_number
    }

    /// Meta as a template value, with subpages and a single `author`.
    pub fn meta_value(&self) -> Value {
        let mut map = match serde_json::to_value(&self.meta) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        if let Some(first) = self.meta.authors.first() {
            map.insert("author".into(), json!(first));
        }
        map.insert("subpages".into(), Value::Array(self.subpages.clone()));
        Value::Object(map)
    }

    /// Everything templates see as `page`.
    pub fn to_value(&self) -> Value {
        let mut value = self.meta_value();
        if let Value::Object(map) = &mut value {
            map.insert("content".into(), Value::String(self.content.clone()));
            map.insert("rooturl".into(), Value::String(get_rooturl(&self.meta.url)));
        }
        value
    }

    /// Render through the page's template.
    ///
    /// `context` holds the site part; `page` and, when paginating,
    /// `pagination` are added here. Returns the pages this render spawned.
    pub fn render(
        &mut self,
        mut context: Map<String, Value>,
        engine: &dyn TemplateEngine,
    ) -> Result<Vec<Page>, PageError> {
        context.insert("page".into(), self.to_value());

        let mut spawned = Vec::new();
        if let Some(spec) = self.meta.pagination.clone() {
            let state = match self.pagination_state.take() {
                Some(state) => state,
                None => {
                    let items = lookup_list(&context, &spec.list);
                    let mut states = self.pagination_states(paginate(items, &spec));
                    for (i, state) in states.drain(1..).enumerate() {
                        spawned.push(self.paginated_copy(i + 2, state));
                    }
                    states.pop().unwrap_or(Value::Null)
                }
            };
            context.insert("pagination".into(), state);
        }

        let template = format!("{}.*", self.meta.template);
        self.rendered = Some(engine.render(&template, &Value::Object(context))?);
        Ok(spawned)
    }

    fn pagination_states(&self, chunks: Vec<Vec<Value>>) -> Vec<Value> {
        let num_pages = chunks.len();
        let urls: Vec<String> = (1..=num_pages).map(|n| self.url_for_page(n).0).collect();
        chunks
            .into_iter()
            .enumerate()
            .map(|(i, page_items)| {
                json!({
                    "page_items": page_items,
                    "cur_page": i + 1,
                    "num_pages": num_pages,
                    "prev_page": i.checked_sub(1).map(|p| urls[p].clone()),
                    "next_page": urls.get(i + 1),
                })
            })
            .collect()
    }

    fn paginated_copy(&self, n: usize, state: Value) -> Page {
        let mut copy = self.clone();
        copy.rendered = None;
        copy.pagination_state = Some(state);
        copy.place(n);
        copy
    }

    /// Write the rendered document below the output dir.
    pub fn write(&self) -> Result<PathBuf, PageError> {
        let path = self.output_path();
        let write_err = |source| PageError::Write {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let body = self.rendered.as_deref().unwrap_or(&self.content);
        fs::write(&path, body).map_err(write_err)?;
        debug!("wrote {}", path.display());
        Ok(path)
    }
}

/// Expand `pattern` for page number `n`, collapsing repeated slashes.
pub fn expand_url(pattern: &str, meta: &PageMeta, ext: &str, n: usize) -> String {
    let page = if n > 1 { n.to_string() } else { String::new() };
    let date = meta
        .parsed_date()
        .map(|d| d.format("%Y/%m/%d").to_string())
        .unwrap_or_default();
    let expanded = pattern
        .replace("{category}", &meta.category.join("/"))
        .replace("{slug}", &meta.slug)
        .replace("{page}", &page)
        .replace("{ext}", ext)
        .replace("{type}", ext)
        .replace("{date}", &date);
    collapse_slashes(&format!("/{expanded}"))
}

/// `url` without `.` and `..` segments, or `None` when it has none.
///
/// Output files must land below the output dir whatever a page's `url` or
/// category says.
fn confine_url(url: &str) -> Option<String> {
    let is_dot = |segment: &str| segment == "." || segment == "..";
    if !url.split('/').any(is_dot) {
        return None;
    }
    let kept: Vec<&str> = url
        .split('/')
        .filter(|segment| !segment.is_empty() && !is_dot(segment))
        .collect();
    let mut confined = format!("/{}", kept.join("/"));
    if url.ends_with('/') && !kept.is_empty() {
        confined.push('/');
    }
    Some(confined)
}

fn collapse_slashes(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}

/// Resolve a dotted path such as `site.tags.rust` to a list of items.
fn lookup_list(context: &Map<String, Value>, path: &str) -> Vec<Value> {
    let mut segments = path.split('.');
    let mut current = segments.next().and_then(|first| context.get(first));
    for segment in segments {
        current = current.and_then(|value| match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        });
    }
    match current {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Object(map)) => map.values().cloned().collect(),
        Some(other) => {
            warn!("pagination list {path} is not a list ({other})");
            Vec::new()
        }
        None => {
            warn!("pagination list {path} not found in context");
            Vec::new()
        }
    }
}

/// Sort and chunk. Always yields at least one (possibly empty) chunk.
fn paginate(mut items: Vec<Value>, spec: &PaginationSpec) -> Vec<Vec<Value>> {
    if let Some(key) = &spec.sort_key {
        items.sort_by(|a, b| compare_values(a.get(key), b.get(key)));
    }
    if spec.sort_reverse {
        items.reverse();
    }
    let limit = spec.limit.max(1);
    if items.is_empty() {
        return vec![Vec::new()];
    }
    items.chunks(limit).map(<[Value]>::to_vec).collect()
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
