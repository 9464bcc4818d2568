//! Markup renderers, keyed by file extension.
//!
//! A [`Renderer`] is a plain value: a name, the extensions it claims and a
//! render function `raw text -> HTML`. The [`RendererRegistry`] maps every
//! extension to one renderer. Registration order is fixed:
//!
//! 1. Built-ins: the identity renderer (claims no extension, used as the
//!    fallback) and plain text (`txt`).
//! 2. Compiled-in renderers: Markdown (`markdown`, `mkd`, `md`) with the
//!    `markdown` cargo feature.
//! 3. Plugins: executables under the site's `renderers/` directory, sorted by
//!    file name. A plugin is named after the extension it handles and turns
//!    stdin into HTML on stdout.
//!
//! A later registration for the same extension replaces the earlier one, with a warning.

use crate::util::{is_executable, pipe_through};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to run renderer {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("renderer {program} exited with {status}: {stderr}")]
    Failed {
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },
    #[error("renderer {program} produced non-UTF-8 output")]
    Encoding { program: PathBuf },
    #[error("renderer plugin {0} is not executable")]
    NotExecutable(PathBuf),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type RenderFn = Arc<dyn Fn(&str) -> Result<String, RenderError> + Send + Sync>;

/// A named render function and the extensions it handles.
#[derive(Clone)]
pub struct Renderer {
    pub name: String,
    pub extensions: Vec<String>,
    render: RenderFn,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("name", &self.name)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    pub fn new<F>(name: impl Into<String>, extensions: &[&str], render: F) -> Self
    where
        F: Fn(&str) -> Result<String, RenderError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            render: Arc::new(render),
        }
    }

    /// Returns its input unchanged.
    pub fn identity() -> Self {
        Self::new("identity", &[], |raw| Ok(raw.to_string()))
    }

    /// Line breaks become `<br>`; nothing else is touched.
    pub fn plain() -> Self {
        Self::new("plain", &["txt"], |raw| Ok(raw.replace('\n', "<br>")))
    }

    #[cfg(feature = "markdown")]
    pub fn markdown() -> Self {
        use pulldown_cmark::{Options as MdOptions, Parser, html};

        Self::new("markdown", &["markdown", "mkd", "md"], |raw| {
            let options = MdOptions::ENABLE_FOOTNOTES
                | MdOptions::ENABLE_TABLES
                | MdOptions::ENABLE_STRIKETHROUGH
                | MdOptions::ENABLE_DEFINITION_LIST;
            let mut out = String::with_capacity(raw.len() * 3 / 2);
            html::push_html(&mut out, Parser::new_ext(raw, options));
            Ok(out)
        })
    }

    /// An external program handling one extension.
    pub fn command(extension: &str, program: &Path) -> Self {
        let program = program.to_path_buf();
        let cwd = program
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(
            format!("plugin:{extension}"),
            &[extension],
            move |raw| {
                let output = pipe_through(&program, &cwd, raw.as_bytes()).map_err(|source| {
                    RenderError::Spawn {
                        program: program.clone(),
                        source,
                    }
                })?;
                if !output.status.success() {
                    return Err(RenderError::Failed {
                        program: program.clone(),
                        status: output.status,
                        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    });
                }
                String::from_utf8(output.stdout).map_err(|_| RenderError::Encoding {
                    program: program.clone(),
                })
            },
        )
    }

    pub fn render(&self, raw: &str) -> Result<String, RenderError> {
        (self.render)(raw)
    }
}

/// Extension → renderer map with an identity fallback.
#[derive(Debug, Clone)]
pub struct RendererRegistry {
    by_extension: HashMap<String, Renderer>,
    identity: Renderer,
    contributed: usize,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererRegistry {
    /// Registry holding only the built-ins.
    pub fn new() -> Self {
        let mut by_extension = HashMap::new();
        let plain = Renderer::plain();
        for ext in &plain.extensions {
            by_extension.insert(ext.clone(), plain.clone());
        }
        Self {
            by_extension,
            identity: Renderer::identity(),
            contributed: 0,
        }
    }

    /// Built-ins plus every renderer compiled into this build.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "markdown")]
        registry.register(Renderer::markdown());
        registry
    }

    /// Claim every extension of `renderer`.
    ///
    /// An extension another renderer already claims moves to the new one with
    /// a warning. Returns the `(extension, previous renderer)` pairs replaced.
    pub fn register(&mut self, renderer: Renderer) -> Vec<(String, String)> {
        debug!(
            "registering renderer {} for {:?}",
            renderer.name, renderer.extensions
        );
        let mut shadowed = Vec::new();
        for ext in &renderer.extensions {
            if let Some(previous) = self.by_extension.insert(ext.clone(), renderer.clone()) {
                warn!(
                    "Renderer {} replaces {} for .{ext} files",
                    renderer.name, previous.name
                );
                shadowed.push((ext.clone(), previous.name));
            }
        }
        self.contributed += 1;
        shadowed
    }

    /// Register every plugin under `dir`, in file-name order.
    ///
    /// A missing directory registers nothing. Dotfiles are ignored; any other
    /// entry must be an executable file.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, RenderError> {
        if !dir.is_dir() {
            return Ok(0);
        }
        let io_err = |source| RenderError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut entries = fs::read_dir(dir)
            .map_err(io_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(io_err)?;
        entries.sort_by_key(|e| e.file_name());

        let mut loaded = 0;
        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            if !is_executable(&path) {
                return Err(RenderError::NotExecutable(path));
            }
            self.register(Renderer::command(&name, &path));
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn lookup(&self, extension: &str) -> Option<&Renderer> {
        self.by_extension.get(extension)
    }

    /// Renderer for a content file, by extension; unknown extensions get the
    /// identity renderer and a warning.
    pub fn resolve(&self, file_name: &str) -> &Renderer {
        let ext = crate::util::file_extension(file_name);
        match self.lookup(ext) {
            Some(renderer) => renderer,
            None => {
                warn!("No parser found for {file_name}. Using default renderer.");
                &self.identity
            }
        }
    }

    /// True when nothing beyond the built-ins was registered.
    pub fn is_degraded(&self) -> bool {
        self.contributed == 0
    }

    /// Claimed extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.by_extension.keys().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }
}
