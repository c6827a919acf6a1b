//! Specifier rewriting after a move
//!
//! Turns the references returned by a move reconciliation into text edits.
//! Applying the edits is left to the caller (an editor, a codemod runner).

use crate::fs::FileSystem;
use crate::parsing::paths::{to_specifier, without_extension};
use crate::types::{Position, Reference};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Replace the text between `start` and `end` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub start: Position,
    pub end: Position,
    pub new_text: String,
}

/// All edits for one file, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEdits {
    pub path: PathBuf,
    pub edits: Vec<TextEdit>,
}

/// Specifier that `reference` should use once `old_path` lives at `new_path`.
///
/// References to other targets (the moved file's own imports) are recomputed
/// from their source file's current location.
pub fn new_specifier(reference: &Reference, old_path: &Path, new_path: &Path) -> String {
    let target = if reference.reference_file_path == old_path {
        new_path
    } else {
        reference.reference_file_path.as_path()
    };

    let target = if reference.has_explicit_extension {
        target.to_path_buf()
    } else if reference.is_directory_index_reference && is_index_file(target) {
        target
            .parent()
            .map_or_else(|| target.to_path_buf(), Path::to_path_buf)
    } else {
        without_extension(target)
    };

    let base = reference
        .source_file_path
        .parent()
        .unwrap_or_else(|| Path::new(""));

    let Some(relative) = pathdiff::diff_paths(&target, base) else {
        tracing::debug!(
            "[rewrite] no relative path from {} to {}",
            base.display(),
            target.display()
        );
        return reference.raw_path.clone();
    };

    let specifier = to_specifier(&relative);
    if specifier == "." {
        "./".to_string()
    } else {
        specifier
    }
}

/// Group the edits needed after moving `old_path` to `new_path` by file.
///
/// Files that no longer exist are skipped: when a whole directory moves,
/// each of its files is reported by its own create event. For the same
/// reason the moved file's own imports of files that are gone are left
/// alone; the target's create event fixes them once its new location is
/// known. Edits that would not change the text are dropped.
pub fn plan_edits(
    references: &[Reference],
    old_path: &Path,
    new_path: &Path,
    fs: &dyn FileSystem,
) -> Vec<FileEdits> {
    let mut by_file: BTreeMap<&Path, Vec<TextEdit>> = BTreeMap::new();

    for reference in references {
        let source = reference.source_file_path.as_path();
        if !fs.is_file(source) {
            tracing::trace!("[rewrite] {} is gone, skipping", source.display());
            continue;
        }

        let target = reference.reference_file_path.as_path();
        if source == new_path && target != old_path && !fs.is_file(target) {
            tracing::trace!("[rewrite] {} is gone, keeping its specifier", target.display());
            continue;
        }

        let new_text = new_specifier(reference, old_path, new_path);
        if new_text == reference.raw_path {
            continue;
        }

        // Keep the quotes
        by_file.entry(source).or_default().push(TextEdit {
            start: Position::new(reference.start.line, reference.start.character + 1),
            end: Position::new(reference.end.line, reference.end.character.saturating_sub(1)),
            new_text,
        });
    }

    by_file
        .into_iter()
        .map(|(path, mut edits)| {
            edits.sort_by_key(|edit| edit.start);
            FileEdits {
                path: path.to_path_buf(),
                edits,
            }
        })
        .collect()
}

fn is_index_file(path: &Path) -> bool {
    path.file_stem().is_some_and(|stem| stem == "index")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFileSystem;
    use std::fs;
    use tempfile::TempDir;

    fn reference(source: &str, target: &str, raw: &str) -> Reference {
        Reference {
            source_file_path: PathBuf::from(source),
            reference_file_path: PathBuf::from(target),
            raw_path: raw.to_string(),
            has_explicit_extension: false,
            is_directory_index_reference: false,
            start: Position::new(0, 14),
            end: Position::new(0, 14 + raw.len() as u32 + 2),
        }
    }

    #[test]
    fn test_incoming_reference_follows_moved_file() {
        let r = reference("/p/src/a.ts", "/p/src/util.ts", "./util");
        let specifier = new_specifier(&r, Path::new("/p/src/util.ts"), Path::new("/p/lib/util.ts"));
        assert_eq!(specifier, "../lib/util");
    }

    #[test]
    fn test_same_directory_gets_dot_slash() {
        let r = reference("/p/a.ts", "/p/lib/util.ts", "./lib/util");
        let specifier = new_specifier(&r, Path::new("/p/lib/util.ts"), Path::new("/p/util.ts"));
        assert_eq!(specifier, "./util");
    }

    #[test]
    fn test_explicit_extension_is_kept() {
        let mut r = reference("/p/a.ts", "/p/style.css", "./style.css");
        r.has_explicit_extension = true;
        let specifier = new_specifier(&r, Path::new("/p/style.css"), Path::new("/p/css/main.css"));
        assert_eq!(specifier, "./css/main.css");
    }

    #[test]
    fn test_extension_change_is_hidden_without_explicit_extension() {
        let r = reference("/p/a.ts", "/p/util.js", "./util");
        let specifier = new_specifier(&r, Path::new("/p/util.js"), Path::new("/p/util.ts"));
        assert_eq!(specifier, "./util");
    }

    #[test]
    fn test_own_reference_after_source_moved() {
        // the moved file itself, now at /p/deep/nested/a.ts
        let r = reference("/p/deep/nested/a.ts", "/p/util.ts", "./util");
        let specifier = new_specifier(&r, Path::new("/p/a.ts"), Path::new("/p/deep/nested/a.ts"));
        assert_eq!(specifier, "../../util");
    }

    #[test]
    fn test_directory_index_reference() {
        let mut r = reference("/p/a.ts", "/p/util/index.ts", "./util");
        r.is_directory_index_reference = true;

        let specifier = new_specifier(&r, Path::new("/p/util/index.ts"), Path::new("/p/lib/helpers/index.ts"));
        assert_eq!(specifier, "./lib/helpers");

        // No longer an index file, so the file itself is named
        let specifier = new_specifier(&r, Path::new("/p/util/index.ts"), Path::new("/p/util/main.ts"));
        assert_eq!(specifier, "./util/main");
    }

    #[test]
    fn test_plan_edits_groups_and_filters() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("a.ts"), "").unwrap();
        fs::write(root.join("b.ts"), "").unwrap();
        fs::create_dir_all(root.join("lib")).unwrap();
        fs::write(root.join("lib/util.ts"), "").unwrap();

        let old = root.join("util.ts");
        let new = root.join("lib/util.ts");
        let path = |p: &str| root.join(p).to_string_lossy().into_owned();

        let mut second = reference(&path("a.ts"), &path("util.ts"), "./util");
        second.start = Position::new(3, 14);
        second.end = Position::new(3, 22);
        let references = vec![
            reference(&path("b.ts"), &path("util.ts"), "./util"),
            second,
            reference(&path("a.ts"), &path("util.ts"), "./util"),
            reference(&path("gone.ts"), &path("util.ts"), "./util"),
            // moved file's own import, still correct from the new location
            reference(&path("lib/util.ts"), &path("lib/dep.ts"), "./dep"),
        ];

        let plan = plan_edits(&references, &old, &new, &OsFileSystem);
        let files: Vec<_> = plan.iter().map(|f| f.path.clone()).collect();
        assert_eq!(files, vec![root.join("a.ts"), root.join("b.ts")]);

        let a_edits = &plan[0].edits;
        assert_eq!(a_edits.len(), 2);
        assert_eq!(a_edits[0].start, Position::new(0, 15));
        assert_eq!(a_edits[0].end, Position::new(0, 21));
        assert_eq!(a_edits[0].new_text, "./lib/util");
        assert_eq!(a_edits[1].start, Position::new(3, 15));
        assert_eq!(a_edits[1].end, Position::new(3, 21));
    }
}
