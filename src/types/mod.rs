use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Content-derived identifier of a file.
///
/// Equal fingerprints are treated as equal content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

/// Zero-based line and UTF-16 column, matching editor text ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

/// A module path literal as written in source, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReference {
    /// Unquoted module specifier, e.g. `./a` or `react`
    pub path: String,
    /// Start of the string literal token (on the opening quote)
    pub start: Position,
    /// End of the string literal token (after the closing quote)
    pub end: Position,
}

/// A resolved edge from a source file to the file it imports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub source_file_path: PathBuf,
    /// Resolved when the source file was last indexed; goes stale when the target moves.
    pub reference_file_path: PathBuf,
    /// The specifier as written, e.g. `../util`
    pub raw_path: String,
    pub has_explicit_extension: bool,
    /// Resolution fell through to `<dir>/index.<ext>`.
    pub is_directory_index_reference: bool,
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileState {
    Unindexed,
    Indexed,
}

/// Snapshot of what the index knows about one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
    /// `None` for files that are not source files.
    pub references: Option<Vec<Reference>>,
}

impl Fingerprint {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl RawReference {
    /// True for `./` and `../` specifiers; bare package names are not resolvable.
    pub fn is_relative(&self) -> bool {
        is_relative_specifier(&self.path)
    }
}

impl Reference {
    /// Copy of this reference as seen from a file that now lives at `source`.
    pub fn with_source(&self, source: &Path) -> Self {
        Self {
            source_file_path: source.to_path_buf(),
            ..self.clone()
        }
    }
}

/// True for module specifiers starting with `./` or `../`.
pub fn is_relative_specifier(path: &str) -> bool {
    path.starts_with("./") || path.starts_with("../")
}
