//! Shared test utilities for the wok test suite.
//!
//! Provides fixture sites, page builders, a template stub and lookup helpers
//! that panic with the list of available names on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let site = Site::open(tmp.path(), DEFAULT_CONFIG_FILE).unwrap();
//! let report = site.generate().unwrap();
//!
//! let page = find_page(&report.pages, "hello-world");
//! assert_eq!(page.meta.category, vec!["blog"]);
//! ```

use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::config::Options;
use crate::page::{Page, PageEnv};
use crate::template::{TemplateEngine, TemplateError};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Create the minimum a site needs: content and template dirs plus a
/// `default.html` template printing the page title and content.
pub fn bare_site(root: &Path) {
    std::fs::create_dir_all(root.join("content")).unwrap();
    std::fs::create_dir_all(root.join("templates")).unwrap();
    std::fs::write(
        root.join("templates/default.html"),
        "<h1>{{ page.title }}</h1>\n{{ page.content }}",
    )
    .unwrap();
}

/// Write `text` to `rel` under the content dir, creating parents.
pub fn write_page(root: &Path, rel: &str, text: &str) {
    let path = root.join("content").join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

// =========================================================================
// Page builders
// =========================================================================

/// Page environment for a site rooted at `root`, with default options.
pub fn page_env(root: &Path) -> Arc<PageEnv> {
    let options = Options::default();
    PageEnv::new(&options, &options.layout(root))
}

/// Synthetic page from a JSON meta object. Panics on invalid meta.
pub fn synthetic(env: &Arc<PageEnv>, meta: Value) -> Page {
    Page::synthetic(meta, String::new(), env).unwrap()
}

/// Synthetic page with just a title and a category path (`"a/b"`).
pub fn page_in(env: &Arc<PageEnv>, title: &str, category: &str) -> Page {
    synthetic(
        env,
        serde_json::json!({ "title": title, "category": category }),
    )
}

// =========================================================================
// Template stub
// =========================================================================

/// Renders `name|slug|content`, so tests can see which page and template
/// went through the engine without a template directory.
pub struct StubTemplates;

impl TemplateEngine for StubTemplates {
    fn render(&self, name: &str, context: &Value) -> Result<String, TemplateError> {
        let page = &context["page"];
        Ok(format!(
            "{}|{}|{}",
            name,
            page["slug"].as_str().unwrap_or_default(),
            page["content"].as_str().unwrap_or_default()
        ))
    }
}

// =========================================================================
// Log capture
// =========================================================================

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a subscriber that records every event at debug level or
/// above. Returns `f`'s result and the recorded lines.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .without_time()
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (result, logs)
}

// =========================================================================
// Lookups (panic with a clear message on miss)
// =========================================================================

/// Find a page by slug. Panics if not found.
pub fn find_page<'a>(pages: &'a [Page], slug: &str) -> &'a Page {
    pages.iter().find(|p| p.meta.slug == slug).unwrap_or_else(|| {
        panic!(
            "page '{slug}' not found. Available: {:?}",
            slugs(pages)
        )
    })
}

/// All page slugs, in order.
pub fn slugs(pages: &[Page]) -> Vec<&str> {
    pages.iter().map(|p| p.meta.slug.as_str()).collect()
}

/// Slugs of the metas in a `subpages` list.
pub fn subpage_slugs(page: &Page) -> Vec<String> {
    page.subpages
        .iter()
        .filter_map(|m| m["slug"].as_str().map(String::from))
        .collect()
}
