//! The render loop.
//!
//! Every page is rendered against a freshly built context:
//!
//! ```text
//! site.title / datetime / date / time
//! site.tags        tag  → [meta]      (built once per run)
//! site.slugs       slug → meta        (built once, last page wins)
//! site.categories  top category → [meta]
//! site.pages       every page known so far, including spawned ones
//! site.author(s)   when configured
//! site.<option>    every other option, verbatim
//! page             the page itself (see Page::to_value)
//! ```
//!
//! Rendering can create pages (pagination). The loop is a worklist: pop a
//! page, render it, queue what it spawned, move it to the rendered list. It
//! ends when the queue is empty, so every page renders exactly once.

use crate::config::Options;
use crate::page::{Page, PageError};
use crate::template::TemplateEngine;
use crate::tree::{CategoryForest, categories_value};
use chrono::Local;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use tracing::{debug, info};

/// Options that are consumed by the engine and not handed to templates.
const PRIVATE_OPTIONS: &[&str] = &[
    "site_title",
    "output_dir",
    "content_dir",
    "media_dir",
    "url_pattern",
];

/// Tag → indices of the pages carrying it, in page order.
pub fn build_tag_index(pages: &[Page]) -> BTreeMap<String, Vec<usize>> {
    let mut index: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, page) in pages.iter().enumerate() {
        for tag in &page.meta.tags {
            index.entry(tag.clone()).or_default().push(i);
        }
    }
    index
}

/// Slug → index of the last page with that slug.
pub fn build_slug_index(pages: &[Page]) -> BTreeMap<String, usize> {
    pages
        .iter()
        .enumerate()
        .map(|(i, page)| (page.meta.slug.clone(), i))
        .collect()
}

/// Site part of the render context, shared by every page of a run.
#[derive(Debug, Clone)]
pub struct SiteContext {
    base: Map<String, Value>,
    pages: Vec<Value>,
}

impl SiteContext {
    pub fn new(options: &Options, pages: &[Page], forest: &CategoryForest) -> Self {
        let metas: Vec<Value> = pages.iter().map(Page::meta_value).collect();

        let mut base = match serde_json::to_value(options) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for key in PRIVATE_OPTIONS {
            base.remove(*key);
        }
        base.insert("title".into(), json!(options.site_title));
        if let Some(first) = options.authors.first() {
            base.insert("author".into(), json!(first));
            base.insert("authors".into(), json!(options.authors));
        }

        let tags: Map<String, Value> = build_tag_index(pages)
            .into_iter()
            .map(|(tag, members)| {
                let list = members.iter().map(|&i| metas[i].clone()).collect();
                (tag, Value::Array(list))
            })
            .collect();
        let slugs: Map<String, Value> = build_slug_index(pages)
            .into_iter()
            .map(|(slug, i)| (slug, metas[i].clone()))
            .collect();
        base.insert("tags".into(), Value::Object(tags));
        base.insert("slugs".into(), Value::Object(slugs));
        base.insert("categories".into(), categories_value(pages, forest));

        Self { base, pages: metas }
    }

    /// Record a page created during rendering.
    pub fn push_page(&mut self, page: &Page) {
        self.pages.push(page.meta_value());
    }

    /// A fresh context for the next page.
    pub fn for_page(&self) -> Map<String, Value> {
        let now = Local::now();
        let mut site = self.base.clone();
        site.insert(
            "datetime".into(),
            json!(now.format("%Y-%m-%d %H:%M:%S").to_string()),
        );
        site.insert("date".into(), json!(now.format("%Y-%m-%d").to_string()));
        site.insert("time".into(), json!(now.format("%H:%M:%S").to_string()));
        site.insert("pages".into(), Value::Array(self.pages.clone()));

        let mut context = Map::new();
        context.insert("site".into(), Value::Object(site));
        context
    }
}

/// Drain a worklist: render each item once, queueing whatever it spawns.
///
/// `render_one` sees the item, the items already rendered and those still
/// queued. Items come back in render order.
pub fn render_worklist<P, E, F>(initial: Vec<P>, mut render_one: F) -> Result<Vec<P>, E>
where
    F: FnMut(&mut P, &[P], &VecDeque<P>) -> Result<Vec<P>, E>,
{
    let mut pending: VecDeque<P> = initial.into();
    let mut rendered = Vec::with_capacity(pending.len());
    while let Some(mut item) = pending.pop_front() {
        let spawned = render_one(&mut item, &rendered, &pending)?;
        rendered.push(item);
        pending.extend(spawned);
    }
    Ok(rendered)
}

/// Result of [`render_site`].
#[derive(Debug, Default)]
pub struct Rendered {
    /// Every page, in render order, including spawned ones.
    pub pages: Vec<Page>,
    /// Files written, in render order.
    pub written: Vec<PathBuf>,
}

/// Render every page and write those with `make_file`.
pub fn render_site(
    pages: Vec<Page>,
    forest: &CategoryForest,
    options: &Options,
    engine: &dyn TemplateEngine,
) -> Result<Rendered, PageError> {
    let mut site = SiteContext::new(options, &pages, forest);
    let mut written = Vec::new();

    let pages = render_worklist::<_, PageError, _>(pages, |page: &mut Page, _, _| {
        debug!("rendering {} ({})", page.meta.slug, page.meta.url);
        let spawned = page.render(site.for_page(), engine)?;
        for extra in &spawned {
            site.push_page(extra);
        }
        if page.meta.make_file {
            written.push(page.write()?);
        }
        Ok(spawned)
    })?;

    info!(
        "Rendered {} pages, wrote {} files",
        pages.len(),
        written.len()
    );
    Ok(Rendered { pages, written })
}
