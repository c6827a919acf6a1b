//! Path utilities for module specifiers
//!
//! Joins, normalizes and renders specifiers with `Path` APIs instead of
//! string manipulation where possible, so Windows separators never leak
//! into rewritten import strings.

use path_clean::PathClean;
use std::path::{Component, Path, PathBuf};

/// Join a relative specifier onto the directory of `from_file` and
/// normalize `.`/`..` components lexically (the target may not exist).
pub fn join_specifier(from_file: &Path, specifier: &str) -> PathBuf {
    let base = from_file.parent().unwrap_or_else(|| Path::new(""));
    base.join(specifier).clean()
}

/// True when the last path segment ends in `.<word>`, e.g. `util.js`, `data.json`.
pub fn has_extension(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    match name.rfind('.') {
        Some(dot) => {
            let ext = &name[dot + 1..];
            !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

/// `path` without its final extension, e.g. `/a/b.test.ts` -> `/a/b.test`.
pub fn without_extension(path: &Path) -> PathBuf {
    match path.file_stem() {
        Some(stem) => path.with_file_name(stem),
        None => path.to_path_buf(),
    }
}

/// Render a relative path as an import specifier: `/` separators and a
/// leading `./` when the path does not already climb with `../`.
pub fn to_specifier(relative: &Path) -> String {
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::CurDir => None,
            Component::ParentDir => Some("..".to_string()),
            other => Some(other.as_os_str().to_string_lossy().into_owned()),
        })
        .collect();

    let joined = parts.join("/");
    if joined.is_empty() {
        ".".to_string()
    } else if joined == ".." || joined.starts_with("../") {
        joined
    } else {
        format!("./{joined}")
    }
}
