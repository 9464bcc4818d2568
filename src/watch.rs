//! Watch mode: rebuild the site when its inputs change.
//!
//! ```text
//! notify events ──▶ Debouncer (300 ms quiet) ──▶ full rebuild under write lock
//! ```
//!
//! The watcher thread runs every rebuild itself, so rebuilds never overlap.
//! Events that arrive while a rebuild is running wait in the channel and are
//! coalesced into a single follow-up rebuild. A failed rebuild is logged and
//! the loop keeps watching.

use crate::config::SiteLayout;
use crate::site::Site;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

// ============================================================================
// Constants
// ============================================================================

pub const DEBOUNCE: Duration = Duration::from_millis(300);
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to watch {}: {source}", .path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("failed to create file watcher: {0}")]
    Create(#[source] notify::Error),
}

// ============================================================================
// Path filtering
// ============================================================================

/// Editor droppings and hidden files never trigger a rebuild.
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bak" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// The input directories a rebuild depends on, those that exist.
pub fn watched_dirs(layout: &SiteLayout) -> Vec<PathBuf> {
    [&layout.media, &layout.templates, &layout.content]
        .into_iter()
        .filter(|dir| dir.is_dir())
        .cloned()
        .collect()
}

// ============================================================================
// Debounce state
// ============================================================================

/// Collects changed paths until the quiet period has passed.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    pending: BTreeSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: BTreeSet::new(),
            last_event: None,
        }
    }

    /// Record changed paths seen at `now`. Returns how many were kept.
    pub fn add_at<I>(&mut self, paths: I, now: Instant) -> usize
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let before = self.pending.len();
        let mut kept = 0;
        for path in paths {
            if !is_temp_file(&path) {
                self.pending.insert(path);
                kept += 1;
            }
        }
        if kept > 0 {
            self.last_event = Some(now);
        }
        debug!("{} new pending changes", self.pending.len() - before);
        kept
    }

    /// True once something is pending and nothing new arrived for `quiet`.
    pub fn ready_at(&self, now: Instant) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| now.saturating_duration_since(t) >= self.quiet)
    }

    pub fn ready(&self) -> bool {
        self.ready_at(Instant::now())
    }

    /// Drain the batch.
    pub fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    /// How long the event loop may block before checking again.
    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            IDLE_TIMEOUT
        } else {
            self.quiet
        }
    }
}

// ============================================================================
// Rebuild
// ============================================================================

fn rebuild(site: &RwLock<Site>, changed: &[PathBuf]) {
    let root = site.read().layout().root.clone();
    let first = changed
        .first()
        .map(|p| p.strip_prefix(&root).unwrap_or(p).display().to_string())
        .unwrap_or_default();
    match changed.len() {
        1 => info!("{first} changed, rebuilding"),
        n => info!("{first} and {} more changed, rebuilding", n - 1),
    }

    let guard = site.write();
    match guard.generate() {
        Ok(report) => info!(
            "Rebuilt {} pages in {} ms",
            report.pages.len(),
            report.elapsed.as_millis()
        ),
        Err(e) => error!("Rebuild failed: {e}"),
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Watch the site's input directories and rebuild on change. Blocks until
/// the watcher shuts down.
pub fn watch_blocking(site: Arc<RwLock<Site>>) -> Result<(), WatchError> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).map_err(WatchError::Create)?;

    let dirs = watched_dirs(site.read().layout());
    for dir in &dirs {
        watcher
            .watch(dir, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Watch {
                path: dir.clone(),
                source,
            })?;
        debug!("watching {}", dir.display());
    }

    let mut debouncer = Debouncer::default();
    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => {
                debouncer.add_at(event.paths, Instant::now());
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("watch error: {e}"),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                rebuild(&site, &debouncer.take());
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}
