//! Small helpers shared by the page model, loaders and the dev server.

use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Characters that separate words in a slug. Anything else survives as-is
/// after transliteration and lowercasing.
const SLUG_SEPARATORS: &[char] = &[
    '\t', ' ', '!', '"', '#', '$', '%', '&', '\'', '(', ')', '*', '-', '/', '<', '=', '>', '?',
    '@', '[', '\\', ']', '^', '_', '`', '{', '|', '}', ',', '.',
];

/// Turn arbitrary text into a URL-safe slug.
///
/// The text is transliterated to ASCII, lowercased and split on whitespace and
/// punctuation; the remaining words are joined with `-`:
///
/// - `"hello world"` → `"hello-world"`
/// - `"This has... punctuation! *<yo>*."` → `"this-has-punctuation-yo"`
/// - `"Don't use Bob's stuff"` → `"don-t-use-bob-s-stuff"`
pub fn slugify(text: &str) -> String {
    let ascii = deunicode::deunicode(text).to_lowercase();
    ascii
        .split(SLUG_SEPARATORS)
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Relative path from a page URL back to the site root.
///
/// Works for absolute (`/a/b.html`) and relative (`a/b.html`) URLs alike:
///
/// | URL | root |
/// |-----|------|
/// | `/` | `.` |
/// | `/a/` | `..` |
/// | `/a/b.html` | `..` |
/// | `a/b/c.html` | `../..` |
pub fn get_rooturl(url: &str) -> String {
    let depth = url.trim_start_matches('/').matches('/').count();
    if depth == 0 {
        ".".to_string()
    } else {
        vec![".."; depth].join("/")
    }
}

/// Extension of a content file name: everything after the final dot, or the
/// whole name when there is no dot.
pub fn file_extension(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Whether `path` can be run as a plugin executable.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Run `program`, feed `input` on stdin and collect its output.
///
/// Stdin is written from a scoped thread so a child that fills its stdout
/// pipe before draining stdin cannot deadlock us.
pub fn pipe_through(program: &Path, cwd: &Path, input: &[u8]) -> io::Result<Output> {
    let mut child = Command::new(program)
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    let mut stdin = child.stdin.take();
    std::thread::scope(|scope| {
        let writer = scope.spawn(move || match stdin.as_mut() {
            Some(pipe) => pipe.write_all(input),
            None => Ok(()),
        });
        let output = child.wait_with_output();
        // A child that exits without reading stdin closes the pipe early.
        match writer.join() {
            Ok(Err(e)) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
            _ => output,
        }
    })
}
