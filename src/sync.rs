//! Output directory synchronisation.
//!
//! Before pages are written the output directory is emptied, then the media
//! directory is copied into it:
//!
//! ```text
//! is_sane_outdir? ──yes──► clear (keep output_exclude matches)
//!        │no                      │
//!        ▼                        ▼
//!   create dir ──────────► site.output.pre
//!                                 │
//!                           copy media/ → output/
//!                                 │
//!                          site.output.post
//! ```
//!
//! Clearing only looks at top-level entries. A failed media copy is logged and
//! the build carries on.

use crate::config::Options;
use crate::hooks::{HookArgs, HookContext, HookError, HookRegistry, Stage};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Bad output_exclude pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error(transparent)]
    Hook(#[from] HookError),
}

/// What [`prepare_output`] did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// The output dir failed the safety check and was left alone.
    pub refused: bool,
    /// Top-level entries removed.
    pub cleared: Vec<String>,
    /// Top-level entries kept because they match an exclude pattern.
    pub kept: Vec<String>,
    /// Files and links copied from the media dir.
    pub media_copied: usize,
    /// Set when the media copy failed part way.
    pub media_error: Option<String>,
}

/// Whether `outdir` may be emptied for a site rooted at `root`.
///
/// The directory must exist, and its canonical path must not be a prefix of
/// the root's canonical path unless what follows the prefix starts with `.`.
pub fn is_sane_outdir(outdir: &Path, root: &Path) -> bool {
    if !outdir.is_dir() {
        return false;
    }
    let (Ok(out), Ok(site)) = (outdir.canonicalize(), root.canonicalize()) else {
        return false;
    };
    let out = out.to_string_lossy();
    let site = site.to_string_lossy();
    match site.strip_prefix(out.as_ref()) {
        Some(rest) => rest.starts_with('.'),
        None => true,
    }
}

/// Empty the output dir, run the output hooks and copy media in.
pub fn prepare_output(
    options: &Options,
    hooks: &HookRegistry,
    ctx: &HookContext<'_>,
) -> Result<SyncReport, SyncError> {
    let layout = options.layout(ctx.root);
    let output = &layout.output;
    let mut report = SyncReport::default();

    if is_sane_outdir(output, ctx.root) {
        clear_output(output, &options.output_exclude, &mut report)?;
    } else {
        if output.exists() {
            warn!(
                "Not clearing {}: it contains the site itself",
                output.display()
            );
            report.refused = true;
        }
        fs::create_dir_all(output).map_err(|source| SyncError::Io {
            path: output.clone(),
            source,
        })?;
    }

    hooks.run(Stage::OutputPre, ctx, HookArgs::OutputDir(output))?;

    if layout.media.is_dir() {
        match copy_tree(&layout.media, output) {
            Ok(count) => {
                info!("Copied {count} media entries");
                report.media_copied = count;
            }
            Err(e) => {
                warn!("Failed to copy media from {}: {e}", layout.media.display());
                report.media_error = Some(e.to_string());
            }
        }
    }

    hooks.run(Stage::OutputPost, ctx, HookArgs::OutputDir(output))?;
    Ok(report)
}

fn clear_output(
    output: &Path,
    excludes: &[String],
    report: &mut SyncReport,
) -> Result<(), SyncError> {
    let patterns = excludes
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|source| SyncError::Pattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| SyncError::Io { path, source }
    };
    let mut entries = fs::read_dir(output)
        .map_err(io_err(output))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err(output))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        if patterns.iter().any(|p| p.matches(&name)) {
            debug!("keeping {name}");
            report.kept.push(name);
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type().map_err(io_err(&path))?;
        if file_type.is_dir() {
            fs::remove_dir_all(&path).map_err(io_err(&path))?;
        } else {
            fs::remove_file(&path).map_err(io_err(&path))?;
        }
        report.cleared.push(name);
    }
    Ok(())
}

/// Copy everything under `src` into `dst`, keeping symlinks as links.
/// Returns the number of files and links copied.
pub fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.map_err(std::io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(std::io::Error::other)?;
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            if target.symlink_metadata().is_ok() {
                fs::remove_file(&target)?;
            }
            make_symlink(&link, &target)?;
            copied += 1;
        } else if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(unix)]
fn make_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn make_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    let resolved = target.parent().map(|p| p.join(link)).unwrap_or_default();
    fs::copy(resolved, target).map(|_| ())
}
