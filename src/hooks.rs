//! Hook stages and the hook registry.
//!
//! Hooks run at six fixed points of a build:
//!
//! | Stage | Arguments | Pages returned |
//! |-------|-----------|----------------|
//! | `site.start` | none | ignored |
//! | `site.output.pre` | output dir | ignored |
//! | `site.output.post` | output dir | ignored |
//! | `site.content.gather.pre` | none | added to the site |
//! | `site.content.gather.post` | pages loaded so far | added to the site |
//! | `site.done` | none | ignored |
//!
//! Library users register closures with [`HookRegistry::register`]. The CLI
//! loads command hooks with [`HookRegistry::load_dir`]: every executable in the
//! site's `hooks/` directory whose name starts with a stage name, such as
//! `site.start` or `site.done.50-notify`. A command hook runs in the site
//! root, reads `{"stage", "options", "args"}` as JSON on stdin and may print a
//! JSON array of `{"meta": {...}, "content": "..."}` pages on stdout.

use crate::config::Options;
use crate::page::{Page, PageEnv, PageError};
use crate::util::{is_executable, pipe_through};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum HookError {
    #[error("hook {0} does not name a known stage")]
    UnknownStage(PathBuf),
    #[error("hook {0} is not executable")]
    NotExecutable(PathBuf),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to run hook {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("hook {program} exited with {status}: {stderr}")]
    Failed {
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },
    #[error("hook {program} printed invalid pages: {reason}")]
    Output { program: PathBuf, reason: String },
    #[error(transparent)]
    Page(#[from] PageError),
    #[error("hook {name} failed: {message}")]
    Custom { name: String, message: String },
}

/// A point in the build where hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    SiteStart,
    OutputPre,
    OutputPost,
    GatherPre,
    GatherPost,
    SiteDone,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::SiteStart,
        Stage::OutputPre,
        Stage::OutputPost,
        Stage::GatherPre,
        Stage::GatherPost,
        Stage::SiteDone,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::SiteStart => "site.start",
            Stage::OutputPre => "site.output.pre",
            Stage::OutputPost => "site.output.post",
            Stage::GatherPre => "site.content.gather.pre",
            Stage::GatherPost => "site.content.gather.post",
            Stage::SiteDone => "site.done",
        }
    }

    /// Stage named by a hook file: the whole name, or a prefix followed by
    /// `.`, `-` or `_`.
    pub fn from_file_name(file_name: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|stage| {
            file_name
                .strip_prefix(stage.name())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(['.', '-', '_']))
        })
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stage-specific arguments.
#[derive(Debug, Clone, Copy)]
pub enum HookArgs<'a> {
    None,
    OutputDir(&'a Path),
    Pages(&'a [Page]),
}

impl HookArgs<'_> {
    pub fn to_json(&self) -> Value {
        match self {
            HookArgs::None => Value::Null,
            HookArgs::OutputDir(dir) => json!(dir.to_string_lossy()),
            HookArgs::Pages(pages) => Value::Array(pages.iter().map(Page::to_value).collect()),
        }
    }
}

/// What every hook can see besides its arguments.
pub struct HookContext<'a> {
    pub root: &'a Path,
    pub options: &'a Options,
    /// Needed to build pages a hook returns.
    pub env: &'a Arc<PageEnv>,
}

pub type HookFn =
    Box<dyn Fn(&HookContext<'_>, &HookArgs<'_>) -> Result<Vec<Page>, HookError> + Send + Sync>;

struct NamedHook {
    name: String,
    run: HookFn,
}

/// Stage → ordered hooks.
#[derive(Default)]
pub struct HookRegistry {
    hooks: BTreeMap<Stage, Vec<NamedHook>>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: BTreeMap<&str, Vec<&str>> = self
            .hooks
            .iter()
            .map(|(stage, hooks)| {
                (
                    stage.name(),
                    hooks.iter().map(|h| h.name.as_str()).collect(),
                )
            })
            .collect();
        f.debug_struct("HookRegistry").field("hooks", &names).finish()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook to `stage`.
    pub fn register<F>(&mut self, stage: Stage, name: impl Into<String>, hook: F)
    where
        F: Fn(&HookContext<'_>, &HookArgs<'_>) -> Result<Vec<Page>, HookError>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        debug!("registering hook {name} for {stage}");
        self.hooks.entry(stage).or_default().push(NamedHook {
            name,
            run: Box::new(hook),
        });
    }

    /// Register every command hook in `dir`, in file-name order.
    ///
    /// A missing directory registers nothing. Dotfiles are ignored.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, HookError> {
        if !dir.is_dir() {
            return Ok(0);
        }
        let io_err = |source| HookError::Io {
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
            let executable = is_executable(&path);
            let Some(stage) = Stage::from_file_name(&name) else {
                // Notes and READMEs sit next to hooks; only programs must name a stage.
                if executable {
                    return Err(HookError::UnknownStage(path));
                }
                warn!("Ignoring {}: not a hook", path.display());
                continue;
            };
            if !executable {
                return Err(HookError::NotExecutable(path));
            }
            self.register(stage, name, command_hook(stage, path));
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn count(&self, stage: Stage) -> usize {
        self.hooks.get(&stage).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.values().all(Vec::is_empty)
    }

    /// Run every hook of `stage` in order, collecting each hook's pages.
    ///
    /// The first failing hook aborts the stage.
    pub fn run(
        &self,
        stage: Stage,
        ctx: &HookContext<'_>,
        args: HookArgs<'_>,
    ) -> Result<Vec<Vec<Page>>, HookError> {
        let Some(hooks) = self.hooks.get(&stage) else {
            return Ok(Vec::new());
        };
        hooks
            .iter()
            .map(|hook| {
                info!("Running hook {} ({stage})", hook.name);
                (hook.run)(ctx, &args)
            })
            .collect()
    }

    /// [`run`](Self::run), flattened into one page list.
    pub fn gather(
        &self,
        stage: Stage,
        ctx: &HookContext<'_>,
        args: HookArgs<'_>,
    ) -> Result<Vec<Page>, HookError> {
        Ok(self.run(stage, ctx, args)?.into_iter().flatten().collect())
    }
}

#[derive(Deserialize)]
struct HookPage {
    meta: Value,
    #[serde(default)]
    content: String,
}

fn command_hook(
    stage: Stage,
    program: PathBuf,
) -> impl Fn(&HookContext<'_>, &HookArgs<'_>) -> Result<Vec<Page>, HookError> + Send + Sync + 'static
{
    move |ctx, args| {
        let input = json!({
            "stage": stage.name(),
            "options": serde_json::to_value(ctx.options).unwrap_or(Value::Null),
            "args": args.to_json(),
        });
        let output = pipe_through(&program, ctx.root, input.to_string().as_bytes()).map_err(
            |source| HookError::Spawn {
                program: program.clone(),
                source,
            },
        )?;
        if !output.status.success() {
            return Err(HookError::Failed {
                program: program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        let pages: Vec<HookPage> =
            serde_json::from_str(&stdout).map_err(|e| HookError::Output {
                program: program.clone(),
                reason: e.to_string(),
            })?;
        pages
            .into_iter()
            .map(|p| Page::synthetic(p.meta, p.content, ctx.env).map_err(HookError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{capture_logs, page_env, page_in};
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn with_ctx<R>(f: impl FnOnce(&HookContext<'_>, &TempDir) -> R) -> R {
        let tmp = TempDir::new().unwrap();
        let options = Options::default();
        let env = page_env(tmp.path());
        let ctx = HookContext {
            root: tmp.path(),
            options: &options,
            env: &env,
        };
        f(&ctx, &tmp)
    }

    #[test]
    fn stage_names_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_file_name(stage.name()), Some(stage));
        }
    }

    #[test]
    fn stage_from_prefixed_file_name() {
        assert_eq!(
            Stage::from_file_name("site.done.50-notify"),
            Some(Stage::SiteDone)
        );
        assert_eq!(
            Stage::from_file_name("site.content.gather.post-tags"),
            Some(Stage::GatherPost)
        );
        assert_eq!(Stage::from_file_name("site.startup"), None);
        assert_eq!(Stage::from_file_name("deploy.sh"), None);
    }

    #[test]
    fn empty_stage_returns_nothing() {
        with_ctx(|ctx, _| {
            let registry = HookRegistry::new();
            assert!(registry.run(Stage::SiteStart, ctx, HookArgs::None).unwrap().is_empty());
        });
    }

    #[test]
    fn hooks_run_in_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        for name in ["first", "second"] {
            let calls = Arc::clone(&calls);
            registry.register(Stage::SiteDone, name, move |_, _| {
                calls.lock().unwrap().push(name);
                Ok(Vec::new())
            });
        }
        with_ctx(|ctx, _| {
            registry.run(Stage::SiteDone, ctx, HookArgs::None).unwrap();
        });
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(registry.count(Stage::SiteDone), 2);
        assert_eq!(registry.count(Stage::SiteStart), 0);
    }

    #[test]
    fn gather_flattens_pages() {
        let mut registry = HookRegistry::new();
        registry.register(Stage::GatherPre, "one", |ctx, _| {
            Ok(vec![page_in(ctx.env, "A", "")])
        });
        registry.register(Stage::GatherPre, "two", |ctx, _| {
            Ok(vec![page_in(ctx.env, "B", ""), page_in(ctx.env, "C", "")])
        });
        with_ctx(|ctx, _| {
            let pages = registry.gather(Stage::GatherPre, ctx, HookArgs::None).unwrap();
            let slugs: Vec<_> = pages.iter().map(|p| p.meta.slug.as_str()).collect();
            assert_eq!(slugs, vec!["a", "b", "c"]);
        });
    }

    #[test]
    fn failing_hook_aborts_stage() {
        let mut registry = HookRegistry::new();
        registry.register(Stage::SiteStart, "boom", |_, _| {
            Err(HookError::Custom {
                name: "boom".into(),
                message: "nope".into(),
            })
        });
        with_ctx(|ctx, _| {
            let result = registry.run(Stage::SiteStart, ctx, HookArgs::None);
            assert!(matches!(result, Err(HookError::Custom { .. })));
        });
    }

    #[test]
    fn missing_hook_dir_is_fine() {
        let tmp = TempDir::new().unwrap();
        let mut registry = HookRegistry::new();
        assert_eq!(registry.load_dir(&tmp.path().join("hooks")).unwrap(), 0);
        assert!(registry.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn stray_non_executable_file_skipped() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("hooks");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("README"), "notes").unwrap();
        let mut registry = HookRegistry::new();
        let (loaded, logs) = capture_logs(|| registry.load_dir(&dir).unwrap());
        assert_eq!(loaded, 0);
        assert!(registry.is_empty());
        assert!(logs.contains("not a hook"), "{logs}");
    }

    #[cfg(unix)]
    mod commands {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, name: &str, body: &str) {
            fs::create_dir_all(dir).unwrap();
            let path = dir.join(name);
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        #[test]
        fn executable_without_stage_is_error() {
            let tmp = TempDir::new().unwrap();
            let dir = tmp.path().join("hooks");
            script(&dir, "deploy", "exit 0");
            let mut registry = HookRegistry::new();
            assert!(matches!(
                registry.load_dir(&dir),
                Err(HookError::UnknownStage(_))
            ));
        }

        #[test]
        fn non_executable_hook_is_error() {
            let tmp = TempDir::new().unwrap();
            let dir = tmp.path().join("hooks");
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("site.start"), "").unwrap();
            let mut registry = HookRegistry::new();
            assert!(matches!(
                registry.load_dir(&dir),
                Err(HookError::NotExecutable(_))
            ));
        }

        #[test]
        fn command_hook_returns_pages() {
            with_ctx(|ctx, tmp| {
                let dir = tmp.path().join("hooks");
                script(
                    &dir,
                    "site.content.gather.pre.10-feed",
                    r#"cat > /dev/null
echo '[{"meta": {"title": "Feed", "template": "feed"}, "content": "<rss/>"}]'"#,
                );
                let mut registry = HookRegistry::new();
                assert_eq!(registry.load_dir(&dir).unwrap(), 1);
                let pages = registry.gather(Stage::GatherPre, ctx, HookArgs::None).unwrap();
                assert_eq!(pages.len(), 1);
                assert_eq!(pages[0].meta.slug, "feed");
                assert_eq!(pages[0].content, "<rss/>");
                assert!(pages[0].path.is_none());
            });
        }

        #[test]
        fn command_hook_sees_stage_and_args() {
            with_ctx(|ctx, tmp| {
                let dir = tmp.path().join("hooks");
                script(&dir, "site.output.pre", "cat > \"$PWD/input.json\"");
                let mut registry = HookRegistry::new();
                registry.load_dir(&dir).unwrap();
                let out = tmp.path().join("output");
                registry
                    .run(Stage::OutputPre, ctx, HookArgs::OutputDir(&out))
                    .unwrap();

                let input: Value = serde_json::from_str(
                    &fs::read_to_string(tmp.path().join("input.json")).unwrap(),
                )
                .unwrap();
                assert_eq!(input["stage"], "site.output.pre");
                assert_eq!(input["args"], json!(out.to_string_lossy()));
                assert_eq!(input["options"]["output_dir"], "output");
            });
        }

        #[test]
        fn non_zero_exit_is_fatal() {
            with_ctx(|ctx, tmp| {
                let dir = tmp.path().join("hooks");
                script(&dir, "site.done", "exit 2");
                let mut registry = HookRegistry::new();
                registry.load_dir(&dir).unwrap();
                let result = registry.run(Stage::SiteDone, ctx, HookArgs::None);
                assert!(matches!(result, Err(HookError::Failed { .. })));
            });
        }

        #[test]
        fn garbage_output_is_error() {
            with_ctx(|ctx, tmp| {
                let dir = tmp.path().join("hooks");
                script(&dir, "site.content.gather.post", "echo not-json");
                let mut registry = HookRegistry::new();
                registry.load_dir(&dir).unwrap();
                let result = registry.gather(Stage::GatherPost, ctx, HookArgs::Pages(&[]));
                assert!(matches!(result, Err(HookError::Output { .. })));
            });
        }
    }
}
