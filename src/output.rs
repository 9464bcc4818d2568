//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every page is shown by its identity (positional index and title) with the
//! file it became after `→`. The source file sits underneath as an indented
//! `Source:` line, and pages nest by category depth:
//!
//! ```text
//! Pages
//! 001 Docs → docs.html
//!     Source: docs.mkd
//!     002 Guide → docs/guide.html
//!         Source: docs/guide.mkd
//! 003 Blog → blog.html
//!     Source: blog.mkd
//!     page 2 → blog2.html
//! 004 Feed → feed.xml
//!     Source: (hook)
//!
//! Orphans
//!     lost
//!
//! Output
//!     Cleared 3 entries, kept 1 (.git)
//!     Copied 12 media files
//!
//! Built 5 pages, wrote 5 files in 42 ms
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::page::Page;
use crate::site::BuildReport;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Output location of a page, or a marker for pages that are not written.
fn destination(page: &Page) -> String {
    if page.meta.make_file {
        page.output_rel().to_string_lossy().into_owned()
    } else {
        "(not written)".to_string()
    }
}

/// Source file of a page relative to `root`, or `(hook)` for synthetic pages.
fn source_line(page: &Page, root: &Path) -> String {
    match &page.path {
        Some(path) => path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned(),
        None => "(hook)".to_string(),
    }
}

// ============================================================================
// Build output
// ============================================================================

/// Format the result of one build.
///
/// `content_root` is stripped from source paths.
pub fn format_build_output(report: &BuildReport, content_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Pages".to_string());
    let mut position = 0;
    for page in &report.pages {
        let base_indent = indent(page.meta.category.len());
        if page.page_number() > 1 {
            lines.push(format!(
                "{}    page {} \u{2192} {}",
                base_indent,
                page.page_number(),
                destination(page)
            ));
            continue;
        }
        position += 1;
        lines.push(format!(
            "{}{} {} \u{2192} {}",
            base_indent,
            format_index(position),
            page.meta.title,
            destination(page)
        ));
        lines.push(format!(
            "{}    Source: {}",
            base_indent,
            source_line(page, content_root)
        ));
    }

    if !report.orphans.is_empty() {
        lines.push(String::new());
        lines.push("Orphans".to_string());
        for slug in &report.orphans {
            lines.push(format!("    {}", slug));
        }
    }

    lines.push(String::new());
    lines.push("Output".to_string());
    let sync = &report.sync;
    if sync.refused {
        lines.push("    Not cleared: output dir contains the site".to_string());
    } else if sync.kept.is_empty() {
        lines.push(format!("    Cleared {} entries", sync.cleared.len()));
    } else {
        lines.push(format!(
            "    Cleared {} entries, kept {} ({})",
            sync.cleared.len(),
            sync.kept.len(),
            sync.kept.join(", ")
        ));
    }
    match &sync.media_error {
        Some(err) => lines.push(format!("    Media copy failed: {}", err)),
        None if sync.media_copied > 0 => {
            lines.push(format!("    Copied {} media files", sync.media_copied))
        }
        None => {}
    }

    lines.push(String::new());
    let mut summary = format!(
        "Built {} pages, wrote {} files in {} ms",
        report.pages.len(),
        report.written.len(),
        report.elapsed.as_millis()
    );
    let mut extras = Vec::new();
    if report.skipped > 0 {
        extras.push(format!("{} skipped", report.skipped));
    }
    if report.unpublished > 0 {
        extras.push(format!("{} unpublished", report.unpublished));
    }
    if report.from_hooks > 0 {
        extras.push(format!("{} from hooks", report.from_hooks));
    }
    if !extras.is_empty() {
        summary.push_str(&format!(" ({})", extras.join(", ")));
    }
    lines.push(summary);

    lines
}

/// Print build output to stdout.
pub fn print_build_output(report: &BuildReport, content_root: &Path) {
    for line in format_build_output(report, content_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Init and serve output
// ============================================================================

/// Format the list of files and directories created by `--init`.
pub fn format_init_output(title: &str, created: &[std::path::PathBuf], root: &Path) -> Vec<String> {
    let mut lines = vec![format!("Created site \"{}\"", title)];
    for path in created {
        let rel = path.strip_prefix(root).unwrap_or(path);
        let marker = if path.is_dir() { "/" } else { "" };
        lines.push(format!("    {}{}", rel.display(), marker));
    }
    lines
}

pub fn print_init_output(title: &str, created: &[std::path::PathBuf], root: &Path) {
    for line in format_init_output(title, created, root) {
        println!("{}", line);
    }
}

/// Format the dev server banner.
pub fn format_serve_banner(url: &str, watched: &[&Path]) -> Vec<String> {
    let mut lines = vec![format!("Serving on {}", url)];
    if !watched.is_empty() {
        lines.push("Watching".to_string());
        for dir in watched {
            lines.push(format!("    {}", dir.display()));
        }
    }
    lines.push("Press Ctrl+C to stop".to_string());
    lines
}

pub fn print_serve_banner(url: &str, watched: &[&Path]) {
    for line in format_serve_banner(url, watched) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SyncReport;
    use crate::test_helpers::{page_env, page_in, synthetic};
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn indent_four_spaces_per_level() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    // =========================================================================
    // Build output
    // =========================================================================

    fn report(tmp: &TempDir) -> BuildReport {
        let env = page_env(tmp.path());
        let mut hidden = synthetic(&env, json!({"title": "Partial", "make_file": false}));
        hidden.path = Some(tmp.path().join("content/partial.txt"));
        BuildReport {
            pages: vec![
                page_in(&env, "Docs", ""),
                page_in(&env, "Guide", "docs"),
                hidden,
            ],
            written: vec![
                tmp.path().join("output/docs.html"),
                tmp.path().join("output/docs/guide.html"),
            ],
            orphans: vec!["lost".into()],
            skipped: 1,
            unpublished: 0,
            from_hooks: 0,
            sync: SyncReport {
                cleared: vec!["old.html".into()],
                kept: vec![".git".into()],
                media_copied: 2,
                ..SyncReport::default()
            },
            elapsed: Duration::from_millis(7),
        }
    }

    #[test]
    fn build_output_layout() {
        let tmp = TempDir::new().unwrap();
        let lines = format_build_output(&report(&tmp), &tmp.path().join("content"));
        assert_eq!(
            lines,
            vec![
                "Pages",
                "001 Docs \u{2192} docs.html",
                "    Source: (hook)",
                "    002 Guide \u{2192} docs/guide.html",
                "        Source: (hook)",
                "003 Partial \u{2192} (not written)",
                "    Source: partial.txt",
                "",
                "Orphans",
                "    lost",
                "",
                "Output",
                "    Cleared 1 entries, kept 1 (.git)",
                "    Copied 2 media files",
                "",
                "Built 3 pages, wrote 2 files in 7 ms (1 skipped)",
            ]
        );
    }

    #[test]
    fn refused_output_reported() {
        let tmp = TempDir::new().unwrap();
        let mut report = report(&tmp);
        report.sync = SyncReport {
            refused: true,
            ..SyncReport::default()
        };
        let lines = format_build_output(&report, tmp.path());
        assert!(lines.contains(&"    Not cleared: output dir contains the site".to_string()));
    }

    #[test]
    fn serve_banner_lists_watched_dirs() {
        let lines = format_serve_banner(
            "http://localhost:8000/",
            &[Path::new("content"), Path::new("templates")],
        );
        assert_eq!(lines[0], "Serving on http://localhost:8000/");
        assert_eq!(lines[2], "    content");
        assert_eq!(lines.last().unwrap(), "Press Ctrl+C to stop");
    }

    #[test]
    fn init_output_marks_directories() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("content")).unwrap();
        let created = vec![tmp.path().join("content"), tmp.path().join("wokconfig")];
        let lines = format_init_output("Demo", &created, tmp.path());
        assert_eq!(lines, vec!["Created site \"Demo\"", "    content/", "    wokconfig"]);
    }
}
