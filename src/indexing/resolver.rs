//! Resolution of relative module specifiers to files
//!
//! Mirrors how bundlers look up `./x`:
//! 1. A specifier with an extension names the file directly
//! 2. Otherwise `x<ext>` for each probe extension, in order
//! 3. Otherwise `x/index<ext>` for each probe extension, in order
//! 4. Otherwise the extensionless path is kept as a dangling target so a
//!    file created later can still be matched against it

use crate::fs::FileSystem;
use crate::parsing::paths::{has_extension, join_specifier};
use crate::types::is_relative_specifier;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Where a specifier points and how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    pub path: PathBuf,
    pub has_explicit_extension: bool,
    pub is_directory_index_reference: bool,
}

/// Resolves relative specifiers against the filesystem.
#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    /// Extensions with leading dot, e.g. `.tsx`
    probe_extensions: Vec<String>,
}

impl ReferenceResolver {
    pub fn new(probe_extensions: Vec<String>) -> Self {
        Self { probe_extensions }
    }

    pub fn probe_extensions(&self) -> &[String] {
        &self.probe_extensions
    }

    /// Resolve `specifier` as written in `from_file`.
    ///
    /// Returns `None` for bare specifiers (`react`, `@scope/pkg`); those must
    /// be filtered before resolution and are never indexed.
    pub fn resolve(
        &self,
        fs: &dyn FileSystem,
        from_file: &Path,
        specifier: &str,
    ) -> Option<ResolvedReference> {
        if !is_relative_specifier(specifier) {
            return None;
        }

        let joined = join_specifier(from_file, specifier);

        if has_extension(&joined) {
            return Some(ResolvedReference {
                path: joined,
                has_explicit_extension: true,
                is_directory_index_reference: false,
            });
        }

        if let Some(path) = self.probe(fs, &joined) {
            return Some(ResolvedReference {
                path,
                has_explicit_extension: false,
                is_directory_index_reference: false,
            });
        }

        if let Some(path) = self.probe(fs, &joined.join("index")) {
            return Some(ResolvedReference {
                path,
                has_explicit_extension: false,
                is_directory_index_reference: true,
            });
        }

        tracing::trace!(
            "[resolver] {specifier} from {} does not exist yet, keeping {}",
            from_file.display(),
            joined.display()
        );
        Some(ResolvedReference {
            path: joined,
            has_explicit_extension: false,
            is_directory_index_reference: false,
        })
    }

    /// First `base<ext>` that is an existing file.
    fn probe(&self, fs: &dyn FileSystem, base: &Path) -> Option<PathBuf> {
        self.probe_extensions.iter().find_map(|ext| {
            let mut candidate: OsString = base.as_os_str().to_owned();
            candidate.push(ext);
            let candidate = PathBuf::from(candidate);
            fs.is_file(&candidate).then_some(candidate)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFileSystem;
    use std::fs;
    use tempfile::TempDir;

    fn resolver() -> ReferenceResolver {
        ReferenceResolver::new(vec![".ts".to_string(), ".js".to_string()])
    }

    #[test]
    fn test_bare_specifier_is_not_resolved() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("a.ts");
        assert!(resolver().resolve(&OsFileSystem, &from, "react").is_none());
        assert!(resolver().resolve(&OsFileSystem, &from, "@scope/pkg").is_none());
    }

    #[test]
    fn test_explicit_extension_is_verbatim() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("src/a.ts");

        // Does not need to exist
        let resolved = resolver().resolve(&OsFileSystem, &from, "../styles/main.css").unwrap();
        assert_eq!(resolved.path, temp.path().join("styles/main.css"));
        assert!(resolved.has_explicit_extension);
        assert!(!resolved.is_directory_index_reference);
    }

    #[test]
    fn test_extension_inferred_from_disk() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("util.js"), "module.exports = {};").unwrap();
        let from = temp.path().join("a.ts");

        let resolved = resolver().resolve(&OsFileSystem, &from, "./util").unwrap();
        assert_eq!(resolved.path, temp.path().join("util.js"));
        assert!(!resolved.has_explicit_extension);
        assert!(!resolved.is_directory_index_reference);
    }

    #[test]
    fn test_probe_order_is_respected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("util.js"), "").unwrap();
        fs::write(temp.path().join("util.ts"), "").unwrap();
        let from = temp.path().join("a.ts");

        let resolved = resolver().resolve(&OsFileSystem, &from, "./util").unwrap();
        assert_eq!(resolved.path, temp.path().join("util.ts"));
    }

    #[test]
    fn test_directory_index_reference() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("util")).unwrap();
        fs::write(temp.path().join("util/index.ts"), "export {};").unwrap();
        let from = temp.path().join("a.ts");

        let resolved = resolver().resolve(&OsFileSystem, &from, "./util").unwrap();
        assert_eq!(resolved.path, temp.path().join("util/index.ts"));
        assert!(!resolved.has_explicit_extension);
        assert!(resolved.is_directory_index_reference);
    }

    #[test]
    fn test_same_name_file_beats_directory_index() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("util")).unwrap();
        fs::write(temp.path().join("util/index.ts"), "").unwrap();
        fs::write(temp.path().join("util.js"), "").unwrap();
        let from = temp.path().join("a.ts");

        let resolved = resolver().resolve(&OsFileSystem, &from, "./util").unwrap();
        assert_eq!(resolved.path, temp.path().join("util.js"));
        assert!(!resolved.is_directory_index_reference);
    }

    #[test]
    fn test_dangling_reference_keeps_extensionless_path() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("src/a.ts");

        let resolved = resolver().resolve(&OsFileSystem, &from, "./missing").unwrap();
        assert_eq!(resolved.path, temp.path().join("src/missing"));
        assert!(!resolved.has_explicit_extension);
        assert!(!resolved.is_directory_index_reference);
    }
}
