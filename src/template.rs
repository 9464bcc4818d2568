//! Template engine seam.
//!
//! Pages only see the [`TemplateEngine`] trait. The shipped implementation,
//! [`GlobTemplates`], is a minijinja environment over the site's template
//! directory where every template name is a glob relative to that directory.
//! A page with `template: post` asks for `post.*`, which may resolve to
//! `post.html` or `post.xml`. Includes and `extends` inside templates go through
//! the same lookup.
//!
//! A glob matching more than one file is ambiguous and a glob matching nothing
//! is missing. Both are fatal to the build.

use minijinja::{AutoEscape, Environment, ErrorKind};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template not found: {name} (searched {dir})")]
    NotFound { name: String, dir: PathBuf },
    #[error("Ambiguous template {name}: matches {}", .matches.join(", "))]
    Ambiguous { name: String, matches: Vec<String> },
    #[error("Bad template name {name}: {reason}")]
    BadName { name: String, reason: String },
    #[error("Error rendering template {name}: {source}")]
    Render {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Renders a named template against a JSON context.
pub trait TemplateEngine {
    fn render(&self, name: &str, context: &serde_json::Value) -> Result<String, TemplateError>;
}

/// minijinja over a template directory, with glob names.
pub struct GlobTemplates {
    dir: PathBuf,
    env: Environment<'static>,
}

impl GlobTemplates {
    pub fn new(dir: &Path) -> Self {
        let mut env = Environment::new();
        // Output is HTML produced by trusted renderers.
        env.set_auto_escape_callback(|_| AutoEscape::None);
        let search = dir.to_path_buf();
        env.set_loader(move |name| match resolve_glob(&search, name) {
            Ok(path) => std::fs::read_to_string(&path).map(Some).map_err(|e| {
                minijinja::Error::new(
                    ErrorKind::InvalidOperation,
                    format!("could not read template {}", path.display()),
                )
                .with_source(e)
            }),
            Err(TemplateError::NotFound { .. }) => Ok(None),
            Err(e) => Err(minijinja::Error::new(
                ErrorKind::InvalidOperation,
                e.to_string(),
            )),
        });
        Self {
            dir: dir.to_path_buf(),
            env,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TemplateEngine for GlobTemplates {
    fn render(&self, name: &str, context: &serde_json::Value) -> Result<String, TemplateError> {
        // Resolve up front so ambiguity surfaces as its own error kind.
        resolve_glob(&self.dir, name)?;
        let render_err = |source| TemplateError::Render {
            name: name.to_string(),
            source,
        };
        let template = self.env.get_template(name).map_err(render_err)?;
        template.render(context).map_err(render_err)
    }
}

/// Find the single file under `dir` matching the glob `name`.
pub fn resolve_glob(dir: &Path, name: &str) -> Result<PathBuf, TemplateError> {
    if name.split('/').any(|part| part == "..") {
        return Err(TemplateError::BadName {
            name: name.to_string(),
            reason: "parent directory references are not allowed".into(),
        });
    }
    let pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        name.trim_start_matches('/')
    );
    let paths = glob::glob(&pattern).map_err(|e| TemplateError::BadName {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    let mut matches: Vec<PathBuf> = paths.flatten().filter(|p| p.is_file()).collect();
    match matches.len() {
        0 => Err(TemplateError::NotFound {
            name: name.to_string(),
            dir: dir.to_path_buf(),
        }),
        1 => Ok(matches.remove(0)),
        _ => {
            matches.sort();
            Err(TemplateError::Ambiguous {
                name: name.to_string(),
                matches: matches
                    .iter()
                    .map(|p| {
                        p.strip_prefix(dir)
                            .unwrap_or(p)
                            .to_string_lossy()
                            .into_owned()
                    })
                    .collect(),
            })
        }
    }
}
