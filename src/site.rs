//! The build engine.
//!
//! [`Site::open`] does all the setup that can fail without touching the output
//! directory: it loads the options, checks that the content and template
//! directories exist, and loads renderer plugins and command hooks.
//! [`Site::generate`] then runs one full build:
//!
//! ```text
//! site.start → prepare output → load pages → category tree → render → site.done
//! ```
//!
//! Nothing is carried over between builds; calling `generate` again rebuilds
//! from scratch.

use crate::config::{ConfigError, Options, SiteLayout, load_options};
use crate::hooks::{HookArgs, HookContext, HookError, HookRegistry, Stage};
use crate::loader::{LoadError, load_pages};
use crate::page::{Page, PageEnv, PageError};
use crate::renderers::{RenderError, RendererRegistry};
use crate::render::render_site;
use crate::sync::{SyncError, SyncReport, prepare_output};
use crate::template::GlobTemplates;
use crate::tree::{build_tree, link_subpages};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum SiteError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{name} directory {} does not exist", .path.display())]
    MissingDir { name: &'static str, path: PathBuf },
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error(transparent)]
    Renderer(#[from] RenderError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Page(#[from] PageError),
}

/// Everything one build produced, for reporting.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Every rendered page, in render order.
    pub pages: Vec<Page>,
    pub written: Vec<PathBuf>,
    /// Slugs of pages left out of the category tree.
    pub orphans: Vec<String>,
    pub skipped: usize,
    pub unpublished: usize,
    pub from_hooks: usize,
    pub sync: SyncReport,
    pub elapsed: Duration,
}

/// A site ready to build.
pub struct Site {
    options: Options,
    layout: SiteLayout,
    env: Arc<PageEnv>,
    renderers: RendererRegistry,
    hooks: HookRegistry,
}

impl Site {
    /// Load the site at `root` the way the command line does: options from
    /// `config_name`, plugins from `renderers/`, command hooks from `hooks/`.
    pub fn open(root: &Path, config_name: &str) -> Result<Self, SiteError> {
        let options = load_options(root, config_name)?;
        let mut site = Self::new(root, options)?;

        let plugins = site.renderers.load_dir(&site.layout.renderers)?;
        if plugins > 0 {
            info!("Loaded {plugins} renderer plugins");
        }
        let hooks = site.hooks.load_dir(&site.layout.hooks)?;
        if hooks > 0 {
            info!("Loaded {hooks} hooks");
        }
        if site.renderers.is_degraded() {
            warn!("No markup renderers available; only plain text is supported");
        }
        Ok(site)
    }

    /// A site with the given options, the compiled-in renderers and no hooks.
    pub fn new(root: &Path, mut options: Options) -> Result<Self, SiteError> {
        let layout = options.layout(root);
        sanity_check(&layout)?;
        options.exclude_dotfiles();
        Ok(Self {
            env: PageEnv::new(&options, &layout),
            options,
            layout,
            renderers: RendererRegistry::with_defaults(),
            hooks: HookRegistry::new(),
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn layout(&self) -> &SiteLayout {
        &self.layout
    }

    pub fn renderers_mut(&mut self) -> &mut RendererRegistry {
        &mut self.renderers
    }

    pub fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    /// Run one full build.
    pub fn generate(&self) -> Result<BuildReport, SiteError> {
        let started = Instant::now();
        let ctx = HookContext {
            root: &self.layout.root,
            options: &self.options,
            env: &self.env,
        };

        self.hooks.run(Stage::SiteStart, &ctx, HookArgs::None)?;

        let sync = prepare_output(&self.options, &self.hooks, &ctx)?;
        let loaded = load_pages(&self.renderers, &self.hooks, &ctx)?;

        let mut pages = loaded.pages;
        let forest = build_tree(&mut pages);
        link_subpages(&mut pages, &forest);
        let orphans = forest
            .orphans
            .iter()
            .map(|&i| pages[i].meta.slug.clone())
            .collect();

        let engine = GlobTemplates::new(&self.layout.templates);
        let rendered = render_site(pages, &forest, &self.options, &engine)?;

        self.hooks.run(Stage::SiteDone, &ctx, HookArgs::None)?;

        Ok(BuildReport {
            pages: rendered.pages,
            written: rendered.written,
            orphans,
            skipped: loaded.skipped,
            unpublished: loaded.unpublished,
            from_hooks: loaded.from_hooks,
            sync,
            elapsed: started.elapsed(),
        })
    }
}

/// Content and template directories must exist before anything else runs.
fn sanity_check(layout: &SiteLayout) -> Result<(), SiteError> {
    for (name, path) in [
        ("template", &layout.templates),
        ("content", &layout.content),
    ] {
        if !path.is_dir() {
            return Err(SiteError::MissingDir {
                name,
                path: path.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CONFIG_FILE;
    use crate::test_helpers::{bare_site, find_page, setup_fixtures, subpage_slugs, write_page};
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[test]
    fn missing_template_dir_is_fatal() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("content")).unwrap();
        let result = Site::open(tmp.path(), DEFAULT_CONFIG_FILE);
        assert!(matches!(
            result,
            Err(SiteError::MissingDir { name: "template", .. })
        ));
    }

    #[test]
    fn missing_content_dir_is_fatal_and_output_untouched() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("templates")).unwrap();
        fs::create_dir_all(tmp.path().join("output")).unwrap();
        fs::write(tmp.path().join("output/keep.html"), "x").unwrap();
        let result = Site::open(tmp.path(), DEFAULT_CONFIG_FILE);
        assert!(matches!(
            result,
            Err(SiteError::MissingDir { name: "content", .. })
        ));
        assert!(tmp.path().join("output/keep.html").exists());
    }

    #[test]
    fn dotfiles_always_excluded() {
        let tmp = TempDir::new().unwrap();
        bare_site(tmp.path());
        let site = Site::open(tmp.path(), DEFAULT_CONFIG_FILE).unwrap();
        assert!(site.options().output_exclude.contains(&".*".to_string()));
    }

    #[test]
    fn generate_builds_site() {
        let tmp = TempDir::new().unwrap();
        bare_site(tmp.path());
        write_page(tmp.path(), "docs.txt", "title: Docs\n---\nTop");
        write_page(tmp.path(), "docs/guide.txt", "title: Guide\ncategory: docs\n---\nMiddle");
        write_page(tmp.path(), "lost.txt", "title: Lost\ncategory: nowhere\n---\n");

        let site = Site::open(tmp.path(), DEFAULT_CONFIG_FILE).unwrap();
        let report = site.generate().unwrap();

        assert_eq!(report.orphans, vec!["lost"]);
        assert_eq!(report.pages.len(), 3);
        let docs = find_page(&report.pages, "docs");
        assert_eq!(docs.subpages[0]["slug"], "guide");
        let html = fs::read_to_string(tmp.path().join("output/docs/guide.html")).unwrap();
        assert_eq!(html, "<h1>Guide</h1>\nMiddle");
    }

    #[test]
    fn stages_run_in_order() {
        let tmp = TempDir::new().unwrap();
        bare_site(tmp.path());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut site = Site::open(tmp.path(), DEFAULT_CONFIG_FILE).unwrap();
        for stage in Stage::ALL {
            let seen = Arc::clone(&seen);
            site.hooks_mut().register(stage, stage.name(), move |_, _| {
                seen.lock().unwrap().push(stage);
                Ok(Vec::new())
            });
        }
        site.generate().unwrap();
        assert_eq!(*seen.lock().unwrap(), Stage::ALL.to_vec());
    }

    #[test]
    fn missing_template_fails_build() {
        let tmp = TempDir::new().unwrap();
        bare_site(tmp.path());
        write_page(tmp.path(), "a.txt", "title: A\ntemplate: nope\n---\n");
        let site = Site::open(tmp.path(), DEFAULT_CONFIG_FILE).unwrap();
        let result = site.generate();
        assert!(matches!(result, Err(SiteError::Page(PageError::Template(_)))));
    }

    #[cfg(feature = "markdown")]
    #[test]
    fn fixture_site_builds() {
        let tmp = setup_fixtures();
        let site = Site::open(tmp.path(), DEFAULT_CONFIG_FILE).unwrap();
        let report = site.generate().unwrap();

        assert!(report.orphans.is_empty());
        assert_eq!(report.unpublished, 1);
        let blog = find_page(&report.pages, "blog");
        assert_eq!(
            subpage_slugs(blog),
            vec!["hello-world", "second-post", "third-post"]
        );

        let out = tmp.path().join("output");
        let first = fs::read_to_string(out.join("blog.html")).unwrap();
        assert!(first.contains("Blog (1/2)"));
        assert!(first.find("third-post").unwrap() < first.find("second-post").unwrap());
        assert!(first.contains(r#"<a rel="next" href="/blog2.html">"#));
        let second = fs::read_to_string(out.join("blog2.html")).unwrap();
        assert!(second.contains("Blog (2/2)"));
        assert!(second.contains("/blog/hello-world.html"));

        let home = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(home.contains("<title>Home | Fixture Site</title>"));
        assert!(home.contains("<footer>Notes from the workbench</footer>"));
        assert!(out.join("css/style.css").is_file());
        assert!(!out.join("draft.html").exists());
    }
}
