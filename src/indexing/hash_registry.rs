//! Content hash registry
//!
//! Keeps a bijection between content fingerprints and file paths. A file
//! whose fingerprint is already owned by another path is either a move (the
//! old path disappeared) or a true duplicate; the registry reports which
//! path owns the content and leaves the decision to the caller.

use crate::debug_event;
use crate::error::{IndexError, IndexResult};
use crate::fs::FileSystem;
use crate::types::Fingerprint;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

/// Hashing function applied to file bytes.
pub trait ContentHasher: Send + Sync {
    fn hash(&self, bytes: &[u8]) -> String;
}

/// SHA-256, lowercase hex.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn hash(&self, bytes: &[u8]) -> String {
        format!("{:x}", Sha256::digest(bytes))
    }
}

/// Ownership of a fingerprint moved from one path to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOperation {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    pub fingerprint: Fingerprint,
}

pub struct ContentHashRegistry {
    fingerprint_to_path: HashMap<Fingerprint, PathBuf>,
    path_to_fingerprint: HashMap<PathBuf, Fingerprint>,
    hasher: Arc<dyn ContentHasher>,
    /// Prefix fingerprints with the file creation time
    use_creation_time: bool,
}

impl std::fmt::Debug for ContentHashRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentHashRegistry")
            .field("files", &self.path_to_fingerprint.len())
            .field("use_creation_time", &self.use_creation_time)
            .finish()
    }
}

impl ContentHashRegistry {
    pub fn new(use_creation_time: bool) -> Self {
        Self::with_hasher(Arc::new(Sha256Hasher), use_creation_time)
    }

    pub fn with_hasher(hasher: Arc<dyn ContentHasher>, use_creation_time: bool) -> Self {
        Self {
            fingerprint_to_path: HashMap::new(),
            path_to_fingerprint: HashMap::new(),
            hasher,
            use_creation_time,
        }
    }

    /// Read the file and compute its fingerprint.
    pub fn fingerprint(&self, fs: &dyn FileSystem, path: &Path) -> IndexResult<Fingerprint> {
        let bytes = fs.read(path).map_err(|e| IndexError::unreadable(path, e))?;
        self.fingerprint_bytes(fs, path, &bytes)
    }

    /// Fingerprint already-read bytes of `path`.
    ///
    /// The filesystem is only consulted for the creation time when salting
    /// is enabled.
    pub fn fingerprint_bytes(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
        bytes: &[u8],
    ) -> IndexResult<Fingerprint> {
        let hash = self.hasher.hash(bytes);
        if !self.use_creation_time {
            return Ok(Fingerprint::new(hash));
        }

        match fs.created(path) {
            Ok(created) => {
                let millis = created
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis())
                    .unwrap_or_default();
                Ok(Fingerprint::new(format!("{millis}-{hash}")))
            }
            Err(e) if e.kind() == ErrorKind::Unsupported => {
                tracing::trace!(
                    "[registry] no creation time for {}, using plain content hash",
                    path.display()
                );
                Ok(Fingerprint::new(hash))
            }
            Err(e) => Err(IndexError::unreadable(path, e)),
        }
    }

    /// Path currently owning `fingerprint`.
    pub fn owner(&self, fingerprint: &Fingerprint) -> Option<&Path> {
        self.fingerprint_to_path.get(fingerprint).map(PathBuf::as_path)
    }

    pub fn fingerprint_of(&self, path: &Path) -> Option<&Fingerprint> {
        self.path_to_fingerprint.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.path_to_fingerprint.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.path_to_fingerprint.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path_to_fingerprint.is_empty()
    }

    /// Fail with `DuplicateContent` when another live path owns `fingerprint`.
    pub fn ensure_available(&self, path: &Path, fingerprint: &Fingerprint) -> IndexResult<()> {
        match self.owner(fingerprint) {
            Some(existing) if existing != path => Err(IndexError::DuplicateContent {
                existing: existing.to_path_buf(),
                path: path.to_path_buf(),
            }),
            _ => Ok(()),
        }
    }

    /// Record the content of a new file.
    ///
    /// Returns `Ok(None)` when the file cannot be read; nothing changes.
    pub fn record_new(&mut self, fs: &dyn FileSystem, path: &Path) -> IndexResult<Option<Fingerprint>> {
        let fingerprint = match self.fingerprint(fs, path) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                tracing::debug!("[registry] {e}");
                return Ok(None);
            }
        };
        self.ensure_available(path, &fingerprint)?;
        self.assign(path, fingerprint.clone());
        Ok(Some(fingerprint))
    }

    /// Recompute the fingerprint of a changed file.
    ///
    /// Returns the fingerprint that was released, if the path was tracked
    /// under a different one. Unreadable files leave the registry as is.
    pub fn replace(&mut self, fs: &dyn FileSystem, path: &Path) -> IndexResult<Option<Fingerprint>> {
        let fingerprint = match self.fingerprint(fs, path) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                tracing::debug!("[registry] {e}");
                return Ok(None);
            }
        };
        self.ensure_available(path, &fingerprint)?;
        Ok(self.assign(path, fingerprint))
    }

    /// Handle a newly created file: a move when its content is owned by
    /// another path, otherwise a plain new file.
    pub fn relocate(&mut self, fs: &dyn FileSystem, new_path: &Path) -> Option<MoveOperation> {
        let fingerprint = match self.fingerprint(fs, new_path) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                tracing::debug!("[registry] {e}");
                return None;
            }
        };

        if let Some(operation) = self.transfer(&fingerprint, new_path) {
            return Some(operation);
        }
        self.assign(new_path, fingerprint);
        None
    }

    /// Give `fingerprint` to `new_path` if a different path owns it.
    ///
    /// Both maps are updated together: the old path loses its entry and any
    /// fingerprint previously held by `new_path` is released.
    pub fn transfer(&mut self, fingerprint: &Fingerprint, new_path: &Path) -> Option<MoveOperation> {
        let old_path = self.fingerprint_to_path.get(fingerprint)?.clone();
        if old_path == new_path {
            return None;
        }

        self.path_to_fingerprint.remove(&old_path);
        self.assign(new_path, fingerprint.clone());
        debug_event!(
            "registry",
            "moved",
            "{} -> {}",
            old_path.display(),
            new_path.display()
        );

        Some(MoveOperation {
            old_path,
            new_path: new_path.to_path_buf(),
            fingerprint: fingerprint.clone(),
        })
    }

    /// Drop both directions of the mapping for `path`.
    pub fn remove(&mut self, path: &Path) -> Option<Fingerprint> {
        let fingerprint = self.path_to_fingerprint.remove(path)?;
        if self.fingerprint_to_path.get(&fingerprint).map(PathBuf::as_path) == Some(path) {
            self.fingerprint_to_path.remove(&fingerprint);
        }
        Some(fingerprint)
    }

    /// All tracked paths under `prefix` (usually a workspace root), sorted.
    pub fn paths_with_prefix(&self, prefix: &Path) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .path_to_fingerprint
            .keys()
            .filter(|path| path.starts_with(prefix))
            .cloned()
            .collect();
        paths.sort();
        paths
    }

    pub fn clear(&mut self) {
        self.fingerprint_to_path.clear();
        self.path_to_fingerprint.clear();
    }

    /// True when both maps mirror each other exactly.
    pub fn is_consistent(&self) -> bool {
        self.fingerprint_to_path.len() == self.path_to_fingerprint.len()
            && self
                .path_to_fingerprint
                .iter()
                .all(|(path, fp)| self.fingerprint_to_path.get(fp) == Some(path))
    }

    /// Store a fingerprint computed earlier for `path`.
    ///
    /// Fails like [`record_new`](Self::record_new) when another path took the
    /// content in the meantime.
    pub(crate) fn commit(&mut self, path: &Path, fingerprint: Fingerprint) -> IndexResult<()> {
        self.ensure_available(path, &fingerprint)?;
        self.assign(path, fingerprint);
        Ok(())
    }

    /// Point `path` at `fingerprint`, releasing the path's previous fingerprint.
    ///
    /// Callers guarantee `fingerprint` is unowned or owned by a path that has
    /// already been unlinked.
    fn assign(&mut self, path: &Path, fingerprint: Fingerprint) -> Option<Fingerprint> {
        let previous = self
            .path_to_fingerprint
            .insert(path.to_path_buf(), fingerprint.clone());

        let released = match previous {
            Some(old) if old != fingerprint => {
                if self.fingerprint_to_path.get(&old).map(PathBuf::as_path) == Some(path) {
                    self.fingerprint_to_path.remove(&old);
                }
                debug_event!("registry", "released", "{old}");
                Some(old)
            }
            _ => None,
        };

        self.fingerprint_to_path.insert(fingerprint, path.to_path_buf());
        released
    }
}

impl Default for ContentHashRegistry {
    fn default() -> Self {
        Self::new(false)
    }
}
