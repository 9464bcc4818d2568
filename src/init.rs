//! `--init`: lay out a new site skeleton.
//!
//! ```text
//! wokconfig               site_title
//! content/home.mkd        sample page
//! templates/default.html  the template every page uses unless told otherwise
//! media/                  copied verbatim into the output dir
//! ```

use crate::config::LEGACY_CONFIG_FILE;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum InitError {
    #[error("a site already exists here: {}", .0.display())]
    Exists(PathBuf),
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>{{ page.title }} | {{ site.title }}</title>
</head>
<body>
  <header><a href="{{ page.rooturl }}">{{ site.title }}</a></header>
  <main>
    <h1>{{ page.title }}</h1>
    {{ page.content }}
  </main>
</body>
</html>
"#;

const HOME_PAGE: &str = "title: Home
slug: index
---
Welcome to your new site. Edit `content/home.mkd` to change this page,
or `templates/default.html` to change how every page looks.
";

fn write(path: PathBuf, contents: &str) -> Result<PathBuf, InitError> {
    fs::write(&path, contents).map_err(|source| InitError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn mkdir(path: PathBuf) -> Result<PathBuf, InitError> {
    fs::create_dir_all(&path).map_err(|source| InitError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Create a site skeleton titled `title` under `root`. Returns every path
/// created, in creation order.
///
/// Refuses when `root` already has a config file, current or legacy.
pub fn init_site(root: &Path, title: &str, config_name: &str) -> Result<Vec<PathBuf>, InitError> {
    for name in [config_name, LEGACY_CONFIG_FILE] {
        let existing = root.join(name);
        if existing.exists() {
            return Err(InitError::Exists(existing));
        }
    }

    let config = serde_yaml::to_string(&BTreeMap::from([("site_title", title)]))?;

    let created = vec![
        write(root.join(config_name), &config)?,
        mkdir(root.join("content"))?,
        write(root.join("content/home.mkd"), HOME_PAGE)?,
        mkdir(root.join("templates"))?,
        write(root.join("templates/default.html"), DEFAULT_TEMPLATE)?,
        mkdir(root.join("media"))?,
    ];
    info!("Initialised site \"{title}\" in {}", root.display());
    Ok(created)
}
