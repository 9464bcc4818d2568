//! # Wok
//!
//! A static site generator. A site is a directory of content files, a
//! directory of templates and an optional directory of media; wok turns it
//! into a tree of HTML files.
//!
//! ```text
//! site/
//! ├── wokconfig            # YAML options (legacy name: `config`)
//! ├── content/             # pages: YAML header, `---`, body
//! │   ├── blog.mkd
//! │   └── blog/
//! │       └── first-post.mkd
//! ├── templates/           # default.html, post.html, ...
//! ├── media/               # copied verbatim into output/
//! ├── hooks/               # optional executables named after a hook stage
//! └── renderers/           # optional executables named after an extension
//! ```
//!
//! # Architecture: One Pipeline, Rebuilt From Scratch
//!
//! Every build runs the same stages in order, each returning what the next
//! stage consumes:
//!
//! ```text
//! site.start
//!   → prepare output   clear output/ (minus excludes), copy media/
//!   → load pages       content/ + gather hooks        → Vec<Page>
//!   → category tree    nest pages by category path    → CategoryForest
//!   → render           worklist until no page spawns another
//! site.done
//! ```
//!
//! Nothing is cached between builds. Watch mode reruns the whole pipeline on
//! every change; sites are small and a full rebuild is what the user expects
//! to see.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `wokconfig` loading: stock defaults, YAML overlay, `!include`, deprecations |
//! | [`site`] | The build engine: setup checks, then one full run of the pipeline |
//! | [`sync`] | Output directory preparation: safety check, exclusive clearing, media copy |
//! | [`loader`] | Content discovery: walks `content/` and collects gather-hook pages |
//! | [`page`] | Page model: front matter, meta normalisation, URLs, pagination, writing |
//! | [`renderers`] | Markup renderers by file extension, built-in and plugin executables |
//! | [`hooks`] | Named pipeline stages and the hooks registered on them |
//! | [`tree`] | Category forest, orphan detection, `subpages` linking |
//! | [`render`] | Render context, tag and slug indices, the fixed-point worklist |
//! | [`template`] | Template engine seam and the minijinja implementation |
//! | [`watch`] | Debounced file watching for rebuild-on-change |
//! | [`serve`] | Development HTTP server over the output directory |
//! | [`init`] | `--init` site skeleton |
//! | [`output`] | CLI output formatting of build results |
//! | [`util`] | Slugs, root-relative URLs, piping through child processes |
//!
//! # Design Decisions
//!
//! ## Extension Points Are Registries
//!
//! Renderers and hooks are plain values held in registries owned by the
//! [`site::Site`]. Executables dropped into `renderers/` and `hooks/` are
//! wrapped into the same values as the built-ins, so the pipeline never
//! distinguishes them. Registering in Rust code
//! ([`site::Site::renderers_mut`], [`site::Site::hooks_mut`]) works the same
//! way.
//!
//! ## Rendering Until Nothing Is Left
//!
//! Rendering a page can produce more pages (pagination chunks, pages from
//! hooks). Rendering is a worklist: every page is rendered exactly once and
//! anything it returns is queued behind the rest. The loop stops when the
//! worklist is empty.
//!
//! ## Output Directory Safety
//!
//! `output/` is cleared on every build, keeping entries matched by
//! `output_exclude` (dotfiles always). If the output directory contains the
//! site itself, it is never cleared.

pub mod config;
pub mod hooks;
pub mod init;
pub mod loader;
pub mod output;
pub mod page;
pub mod render;
pub mod renderers;
pub mod serve;
pub mod site;
pub mod sync;
pub mod template;
pub mod tree;
pub mod util;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_helpers;
