//! Thread-safe handle to a [`ReferenceIndex`].
//!
//! Watcher callbacks may arrive on several threads. Every lifecycle
//! operation takes the same lock, so the two registry maps and the reference
//! map are always observed together.

use crate::config::IndexConfig;
use crate::error::IndexResult;
use crate::fs::FileSystem;
use crate::indexing::index::{BulkIndexReport, MovedFile, ReferenceIndex};
use crate::types::{FileState, Reference, TrackedFile};
use parking_lot::{Mutex, MutexGuard};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SharedReferenceIndex {
    inner: Arc<Mutex<ReferenceIndex>>,
}

impl SharedReferenceIndex {
    pub fn new(index: ReferenceIndex) -> Self {
        Self {
            inner: Arc::new(Mutex::new(index)),
        }
    }

    pub fn with_fs(config: IndexConfig, fs: Arc<dyn FileSystem>) -> Self {
        Self::new(ReferenceIndex::new(config, fs))
    }

    /// Hold the lock across several calls, e.g. to check and reconcile a move atomically.
    pub fn lock(&self) -> MutexGuard<'_, ReferenceIndex> {
        self.inner.lock()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut ReferenceIndex) -> R) -> R {
        f(&mut *self.inner.lock())
    }

    pub fn index(&self, path: &Path) -> IndexResult<()> {
        self.inner.lock().index(path)
    }

    pub fn is_moved_path(&self, path: &Path) -> bool {
        self.inner.lock().is_moved_path(path)
    }

    pub fn reconcile_move(&self, new_path: &Path) -> Option<Vec<Reference>> {
        self.inner.lock().reconcile_move(new_path)
    }

    pub fn handle_created(&self, path: &Path) -> IndexResult<Option<MovedFile>> {
        self.inner.lock().handle_created(path)
    }

    pub fn remove(&self, path: &Path) -> bool {
        self.inner.lock().remove(path)
    }

    pub fn references_to(&self, path: &Path) -> Vec<Reference> {
        self.inner.lock().references_to(path)
    }

    pub fn references_from(&self, path: &Path) -> Option<Vec<Reference>> {
        self.inner.lock().references_from(path).map(<[Reference]>::to_vec)
    }

    pub fn state(&self, path: &Path) -> FileState {
        self.inner.lock().state(path)
    }

    pub fn tracked_file(&self, path: &Path) -> Option<TrackedFile> {
        self.inner.lock().tracked_file(path)
    }

    pub fn tracked_paths(&self, prefix: &Path) -> Vec<PathBuf> {
        self.inner.lock().tracked_paths(prefix)
    }

    pub fn bulk_index(&self, paths: Vec<PathBuf>) -> BulkIndexReport {
        self.inner.lock().bulk_index(paths)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}
