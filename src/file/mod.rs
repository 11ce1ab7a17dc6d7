//! Filesystem convenience wrappers.
//!
//! Path helpers work on `/`-separated strings and follow the lexical rules of
//! Go's `path/filepath` (an extension is everything from the last dot of the
//! final element, `.bashrc` included). Helpers that write take a [`FileLock`]
//! so concurrent writers in one process do not interleave.

mod lock;
mod log;

pub use self::lock::{FileGuard, FileLock};
pub use self::log::{escape_log_message, Logger, LOG_HEADER};

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use tracing::trace;

use crate::error::Result;

/// Name of the per-process scratch folder inside the system temp directory.
pub const TEMP_DIR_NAME: &str = "rust_utils";

/// True when something exists at `path`.
pub fn file_path_exists(path: impl AsRef<Path>) -> bool {
    fs::metadata(path).is_ok()
}

pub fn is_dir(path: impl AsRef<Path>) -> Result<bool> {
    Ok(fs::metadata(path)?.is_dir())
}

pub fn is_file(path: impl AsRef<Path>) -> Result<bool> {
    Ok(!fs::metadata(path)?.is_dir())
}

/// Read a whole file as UTF-8 text.
pub fn file_load(path: impl AsRef<Path>) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

/// Create or truncate `path` and write `data` to it.
pub fn file_save(lock: &FileLock, path: impl AsRef<Path>, data: &str) -> Result<()> {
    let _guard = lock.enter();
    let mut file = fs::File::create(path)?;
    if !data.is_empty() {
        file.write_all(data.as_bytes())?;
    }
    Ok(())
}

/// Append `data` to `path`, creating the file (mode 0644) if needed.
pub fn file_append(lock: &FileLock, path: impl AsRef<Path>, data: &str) -> Result<()> {
    let _guard = lock.enter();
    let path = path.as_ref();
    let mut options = OpenOptions::new();
    options.append(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    let mut file = options.open(path)?;
    if !data.is_empty() {
        file.write_all(data.as_bytes())?;
    }
    trace!(path = %path.display(), bytes = data.len(), "appended");
    Ok(())
}

pub fn file_remove(lock: &FileLock, path: impl AsRef<Path>) -> Result<()> {
    let _guard = lock.enter();
    fs::remove_file(path)?;
    Ok(())
}

/// Directory part of `file_path` with a trailing slash.
///
/// A path without an extension is taken to be a directory already.
pub fn path(file_path: &str) -> String {
    if !ext(file_path).is_empty() {
        format!("{}/", dir(file_path).trim_end_matches('/'))
    } else {
        format!("{}/", file_path.trim_end_matches('/'))
    }
}

/// Join two directory paths; the result ends with a slash.
pub fn path_join(path1: &str, path2: &str) -> String {
    format!(
        "{}/{}/",
        path1.trim_end_matches('/'),
        path2.trim_matches('/')
    )
}

/// Join a directory and a filename.
pub fn file_path_join(path: &str, filename: &str) -> String {
    format!("{}/{}", path.trim_end_matches('/'), filename)
}

/// Split after the final slash: `("dir/", "file")`.
pub fn file_path_split(file_path: &str) -> (String, String) {
    let (dir, file) = split(file_path);
    (dir.to_string(), file.to_string())
}

/// Flatten a path into a single filename: slashes become dashes, the
/// extension is dropped and one leading and one trailing dash are trimmed.
pub fn file_path_base_to_filename(file_path: &str) -> String {
    let stem = &file_path[..file_path.len() - ext(file_path).len()];
    let flat = stem.replace('/', "-");
    let flat = flat.strip_prefix('-').unwrap_or(&flat);
    flat.strip_suffix('-').unwrap_or(flat).to_string()
}

/// The path without its extension or trailing slashes.
pub fn file_path_base(file_path: &str) -> String {
    file_path[..file_path.len() - ext(file_path).len()]
        .trim_end_matches('/')
        .to_string()
}

/// Final element without its extension.
pub fn filename_base(file_path: &str) -> String {
    let name = base(file_path);
    name[..name.len() - ext(name).len()].to_string()
}

/// Final element, or an empty string when the path names a directory.
pub fn filename(file_path: &str) -> String {
    if file_path.is_empty() || file_path.ends_with('/') {
        return String::new();
    }
    base(file_path).to_string()
}

/// Extension without the leading dot.
pub fn filename_ext(file_path: &str) -> String {
    ext(file_path).trim_start_matches('.').to_string()
}

/// `<temp dir>/rust_utils/`, created with mode 0700 when missing.
pub fn temp_path() -> Result<String> {
    let temp = std::env::temp_dir();
    let path = format!(
        "{}/{}/",
        temp.to_string_lossy().trim_end_matches('/'),
        TEMP_DIR_NAME
    );
    if !file_path_exists(&path) {
        let mut builder = fs::DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(&path)?;
    }
    Ok(path)
}

/// A fresh, unused file name inside [`temp_path`]. The file is not created.
pub fn temp_file_path() -> Result<String> {
    let dir = temp_path()?;
    Ok(format!(
        "{}tmp_{}_{}.tmp",
        dir,
        Utc::now().timestamp_micros(),
        rand::random::<u32>()
    ))
}

// Lexical helpers mirroring Go's filepath.Ext/Base/Dir/Split/Clean.

fn ext(path: &str) -> &str {
    for (i, b) in path.bytes().enumerate().rev() {
        match b {
            b'/' => break,
            b'.' => return &path[i..],
            _ => {}
        }
    }
    ""
}

fn base(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

fn split(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(i) => path.split_at(i + 1),
        None => ("", path),
    }
}

fn dir(path: &str) -> String {
    clean(split(path).0)
}

fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            part => parts.push(part),
        }
    }
    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/a/b/c.txt", ".txt")]
    #[case("/a/b.d/c", "")]
    #[case("c.tar.gz", ".gz")]
    #[case(".bashrc", ".bashrc")]
    #[case("noext", "")]
    fn test_ext(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(ext(input), expected);
    }

    #[rstest]
    #[case("/a/b/c.txt", "/a/b/")]
    #[case("/a/b/", "/a/b/")]
    #[case("/a/b", "/a/b/")]
    #[case("c.txt", "./")]
    #[case("/a/./x/../b/c.go", "/a/b/")]
    fn test_path(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(path(input), expected);
    }

    #[test]
    fn test_joins() {
        assert_eq!(path_join("/a/", "/b/"), "/a/b/");
        assert_eq!(path_join("/a", "b"), "/a/b/");
        assert_eq!(file_path_join("/a/", "f.db"), "/a/f.db");
        assert_eq!(file_path_join("/a", "f.db"), "/a/f.db");
    }

    #[rstest]
    #[case("/a/b/c.txt", "/a/b/", "c.txt")]
    #[case("c.txt", "", "c.txt")]
    #[case("/a/b/", "/a/b/", "")]
    fn test_file_path_split(#[case] input: &str, #[case] dir: &str, #[case] file: &str) {
        assert_eq!(file_path_split(input), (dir.to_string(), file.to_string()));
    }

    #[test]
    fn test_file_path_base_to_filename() {
        assert_eq!(file_path_base_to_filename("/home/user/app.rs"), "home-user-app");
        assert_eq!(file_path_base_to_filename("rel/dir/"), "rel-dir");
    }

    #[test]
    fn test_file_path_base() {
        assert_eq!(file_path_base("/a/b/c.txt"), "/a/b/c");
        assert_eq!(file_path_base("/a/b/"), "/a/b");
    }

    #[rstest]
    #[case("/a/b/c.txt", "c", "c.txt", "txt")]
    #[case("foo.sqlite", "foo", "foo.sqlite", "sqlite")]
    #[case("/a/b/", "b", "", "")]
    #[case("archive.tar.gz", "archive.tar", "archive.tar.gz", "gz")]
    fn test_filename_parts(
        #[case] input: &str,
        #[case] stem: &str,
        #[case] name: &str,
        #[case] extension: &str,
    ) {
        assert_eq!(filename_base(input), stem);
        assert_eq!(filename(input), name);
        assert_eq!(filename_ext(input), extension);
    }

    #[rstest]
    #[case("", ".")]
    #[case("/", "/")]
    #[case("a/../..", "..")]
    #[case("/../a", "/a")]
    #[case("a//b/./c/", "a/b/c")]
    fn test_clean(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(clean(input), expected);
    }

    #[test]
    fn test_save_append_load_remove() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.txt");
        let lock = FileLock::new();

        file_save(&lock, &file, "one\n").unwrap();
        file_append(&lock, &file, "two\n").unwrap();
        assert_eq!(file_load(&file).unwrap(), "one\ntwo\n");
        assert!(is_file(&file).unwrap());
        assert!(!is_dir(&file).unwrap());
        assert!(is_dir(dir.path()).unwrap());

        file_remove(&lock, &file).unwrap();
        assert!(!file_path_exists(&file));
        assert!(is_file(&file).is_err());
        assert_eq!(lock.depth(), 0);
    }

    #[test]
    fn test_file_save_empty_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.txt");
        let lock = FileLock::new();
        file_save(&lock, &file, "content").unwrap();
        file_save(&lock, &file, "").unwrap();
        assert_eq!(file_load(&file).unwrap(), "");
    }

    #[test]
    fn test_temp_file_path() {
        let first = temp_file_path().unwrap();
        let second = temp_file_path().unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with(&temp_path().unwrap()));
        assert!(first.ends_with(".tmp"));
        assert!(is_dir(temp_path().unwrap()).unwrap());
    }
}
