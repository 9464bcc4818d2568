//! Content discovery.
//!
//! Builds the page list for one run: pages from `site.content.gather.pre`
//! hooks, then every published content file in file-name order, then pages
//! from `site.content.gather.post` hooks (which see everything loaded so far).

use crate::hooks::{HookArgs, HookContext, HookError, HookRegistry, Stage};
use crate::page::Page;
use crate::renderers::RendererRegistry;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Hook(#[from] HookError),
}

/// Pages found by [`load_pages`] plus what was left out.
#[derive(Debug, Default)]
pub struct Loaded {
    pub pages: Vec<Page>,
    /// Content files that could not be turned into pages.
    pub skipped: usize,
    /// Content files with `published: false`.
    pub unpublished: usize,
    /// Pages contributed by gather hooks.
    pub from_hooks: usize,
}

pub fn load_pages(
    renderers: &RendererRegistry,
    hooks: &HookRegistry,
    ctx: &HookContext<'_>,
) -> Result<Loaded, LoadError> {
    let mut loaded = Loaded::default();

    let pre = hooks.gather(Stage::GatherPre, ctx, HookArgs::None)?;
    loaded.from_hooks += pre.len();
    loaded.pages.extend(pre);

    let content_dir = &ctx.env.content_dir;
    for entry in WalkDir::new(content_dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable content entry: {e}");
                loaded.skipped += 1;
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') || !entry.path().is_file() {
            continue;
        }

        let renderer = renderers.resolve(&name);
        match Page::from_file(entry.path(), ctx.env, renderer) {
            Some(page) if page.meta.published => loaded.pages.push(page),
            Some(page) => {
                debug!("{} is unpublished", page.meta.slug);
                loaded.unpublished += 1;
            }
            None => loaded.skipped += 1,
        }
    }

    let post = hooks.gather(Stage::GatherPost, ctx, HookArgs::Pages(&loaded.pages))?;
    loaded.from_hooks += post.len();
    loaded.pages.extend(post);

    info!(
        "Loaded {} pages ({} skipped, {} unpublished)",
        loaded.pages.len(),
        loaded.skipped,
        loaded.unpublished
    );
    Ok(loaded)
}
