//! Full builds of a site on disk, through the public API only.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;
use wok::config::DEFAULT_CONFIG_FILE;
use wok::renderers::Renderer;
use wok::site::Site;

fn fixture_site() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    for entry in WalkDir::new(&src) {
        let entry = entry.unwrap();
        let dst = tmp.path().join(entry.path().strip_prefix(&src).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dst).unwrap();
        } else {
            fs::copy(entry.path(), &dst).unwrap();
        }
    }
    tmp
}

/// Every file under `dir` with its contents, keyed by relative path.
fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(dir)
        .into_iter()
        .map(Result::unwrap)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(dir).unwrap().to_path_buf();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

#[test]
fn rebuild_is_idempotent() {
    let tmp = fixture_site();
    let site = Site::open(tmp.path(), DEFAULT_CONFIG_FILE).unwrap();
    let output = tmp.path().join("output");

    let first_report = site.generate().unwrap();
    let first = snapshot(&output);
    let second_report = site.generate().unwrap();
    let second = snapshot(&output);

    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(first_report.written, second_report.written);
    // The second run cleared what the first one wrote.
    assert!(!second_report.sync.cleared.is_empty());
}

#[test]
fn stale_files_cleared_excluded_files_kept() {
    let tmp = fixture_site();
    let output = tmp.path().join("output");
    fs::create_dir_all(output.join(".git")).unwrap();
    fs::write(output.join(".git/HEAD"), "ref").unwrap();
    fs::write(output.join("notes.bak"), "keep").unwrap();
    fs::write(output.join("stale.html"), "old").unwrap();

    let site = Site::open(tmp.path(), DEFAULT_CONFIG_FILE).unwrap();
    site.generate().unwrap();

    assert!(output.join(".git/HEAD").is_file());
    assert!(output.join("notes.bak").is_file());
    assert!(!output.join("stale.html").exists());
}

#[test]
fn unknown_extension_falls_back_to_identity() {
    let tmp = fixture_site();
    fs::write(
        tmp.path().join("content/raw.rst"),
        "title: Raw\n---\n<p>*left alone*</p>\n",
    )
    .unwrap();

    let site = Site::open(tmp.path(), DEFAULT_CONFIG_FILE).unwrap();
    let report = site.generate().unwrap();

    let raw = report
        .pages
        .iter()
        .find(|p| p.meta.slug == "raw")
        .unwrap();
    assert_eq!(raw.content, "<p>*left alone*</p>\n");
    let html = fs::read_to_string(tmp.path().join("output/raw.html")).unwrap();
    assert!(html.contains("<main><p>*left alone*</p>\n</main>"));
}

#[test]
fn registered_renderer_takes_over_extension() {
    let tmp = fixture_site();
    fs::write(
        tmp.path().join("content/shout.rst"),
        "title: Shout\n---\nquiet words",
    )
    .unwrap();

    let mut site = Site::open(tmp.path(), DEFAULT_CONFIG_FILE).unwrap();
    site.renderers_mut()
        .register(Renderer::new("upper", &["rst"], |raw| Ok(raw.to_uppercase())));
    site.generate().unwrap();

    let html = fs::read_to_string(tmp.path().join("output/shout.html")).unwrap();
    assert!(html.contains("<main>QUIET WORDS</main>"));
}

#[test]
fn missing_content_dir_leaves_output_alone() {
    let tmp = fixture_site();
    fs::remove_dir_all(tmp.path().join("content")).unwrap();
    fs::create_dir_all(tmp.path().join("output")).unwrap();
    fs::write(tmp.path().join("output/keep.html"), "x").unwrap();

    assert!(Site::open(tmp.path(), DEFAULT_CONFIG_FILE).is_err());
    assert!(tmp.path().join("output/keep.html").is_file());
}
