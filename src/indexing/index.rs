//! Reference index
//!
//! Combines the hash registry, the extractor and the resolver per file and
//! keeps the forward map `file -> references`. Reverse questions ("who
//! imports this path?") are answered by scanning the forward map, so there
//! is no second structure to keep in sync.
//!
//! The expected driver is a file watcher delivering events one at a time:
//!
//! ```text
//! created  -> is_moved_path ? reconcile_move : index
//! changed  -> index
//! deleted  -> remove
//! ```

use crate::config::IndexConfig;
use crate::error::{IndexError, IndexResult};
use crate::fs::{FileSystem, OsFileSystem};
use crate::indexing::hash_registry::{ContentHashRegistry, ContentHasher};
use crate::indexing::resolver::ReferenceResolver;
use crate::parsing::ReferenceExtractor;
use crate::types::{FileState, Fingerprint, Reference, TrackedFile};
use crate::{debug_event, log_event};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of reconciling a create event that turned out to be a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedFile {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    /// References in other files that pointed at `old_path`, followed by the
    /// moved file's own references.
    pub references: Vec<Reference>,
}

/// Outcome of [`ReferenceIndex::bulk_index`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkIndexReport {
    pub indexed: usize,
    /// Missing or unreadable files
    pub skipped: usize,
    /// Every file involved in a duplicate-content collision, both sides, sorted.
    pub duplicates: Vec<PathBuf>,
}

/// A file read, fingerprinted and parsed but not yet stored.
#[derive(Debug)]
struct PreparedFile {
    path: PathBuf,
    fingerprint: Fingerprint,
    /// `None` for files that are not source files
    references: Option<Vec<Reference>>,
}

pub struct ReferenceIndex {
    config: IndexConfig,
    fs: Arc<dyn FileSystem>,
    registry: ContentHashRegistry,
    extractor: ReferenceExtractor,
    resolver: ReferenceResolver,
    /// Outgoing references, only for source files
    references: HashMap<PathBuf, Vec<Reference>>,
}

impl std::fmt::Debug for ReferenceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceIndex")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("source_files", &self.references.len())
            .finish()
    }
}

impl ReferenceIndex {
    pub fn new(config: IndexConfig, fs: Arc<dyn FileSystem>) -> Self {
        let registry = ContentHashRegistry::new(config.use_creation_time_for_hash);
        Self::from_parts(config, fs, registry)
    }

    /// Index backed by the real filesystem.
    pub fn with_config(config: IndexConfig) -> Self {
        Self::new(config, Arc::new(OsFileSystem))
    }

    /// Use a custom content hash instead of SHA-256.
    pub fn with_hasher(
        config: IndexConfig,
        fs: Arc<dyn FileSystem>,
        hasher: Arc<dyn ContentHasher>,
    ) -> Self {
        let registry = ContentHashRegistry::with_hasher(hasher, config.use_creation_time_for_hash);
        Self::from_parts(config, fs, registry)
    }

    fn from_parts(config: IndexConfig, fs: Arc<dyn FileSystem>, registry: ContentHashRegistry) -> Self {
        Self {
            extractor: ReferenceExtractor::new(config.expression_references.clone()),
            resolver: ReferenceResolver::new(config.probe_extensions.clone()),
            config,
            fs,
            registry,
            references: HashMap::new(),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn registry(&self) -> &ContentHashRegistry {
        &self.registry
    }

    /// Index (or re-index) the file at `path`.
    ///
    /// Missing and unreadable files are a no-op. Fails with
    /// [`IndexError::DuplicateContent`] when another tracked path has the
    /// same content; in that case nothing is changed.
    pub fn index(&mut self, path: &Path) -> IndexResult<()> {
        match self.prepare(path) {
            Ok(Some(prepared)) => self.apply(prepared),
            Ok(None) => Ok(()),
            Err(e) => {
                tracing::debug!("[index] skipping: {e}");
                Ok(())
            }
        }
    }

    /// True when the file now at `path` has content owned by a different path.
    pub fn is_moved_path(&self, path: &Path) -> bool {
        match self.registry.fingerprint(self.fs.as_ref(), path) {
            Ok(fingerprint) => self
                .registry
                .owner(&fingerprint)
                .is_some_and(|owner| owner != path),
            Err(e) => {
                tracing::debug!("[index] move check skipped: {e}");
                false
            }
        }
    }

    /// Move the entry of the file whose content now sits at `new_path`.
    ///
    /// Returns `None` when no other path owns the content; the caller should
    /// then [`index`](Self::index) the file instead. Otherwise returns every
    /// reference that may need rewriting: references to the old path from
    /// other files, then the moved file's own references.
    pub fn reconcile_move(&mut self, new_path: &Path) -> Option<Vec<Reference>> {
        self.reconcile(new_path).map(|moved| moved.references)
    }

    /// Like [`reconcile_move`](Self::reconcile_move) but also reports the old path.
    pub fn reconcile(&mut self, new_path: &Path) -> Option<MovedFile> {
        let fingerprint = match self.registry.fingerprint(self.fs.as_ref(), new_path) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                tracing::debug!("[index] move reconcile skipped: {e}");
                return None;
            }
        };

        // Parse before mutating so the whole move is applied in one step
        let fresh_references = if self.config.is_source_file(new_path)
            && !self.registry.owner(&fingerprint).is_some_and(|owner| {
                self.references.contains_key(owner)
            }) {
            Some(self.read_references(new_path))
        } else {
            None
        };

        let operation = self.registry.transfer(&fingerprint, new_path)?;
        let old_path = operation.old_path;

        let migrated = self.references.remove(&old_path);
        if self.config.is_source_file(new_path) {
            let own = match (migrated, fresh_references) {
                (Some(list), _) => list.iter().map(|r| r.with_source(new_path)).collect(),
                (None, Some(fresh)) => fresh,
                (None, None) => Vec::new(),
            };
            self.references.insert(new_path.to_path_buf(), own);
        } else {
            self.references.remove(new_path);
        }

        let mut references: Vec<Reference> = self
            .references
            .iter()
            .filter(|(source, _)| source.as_path() != new_path)
            .flat_map(|(_, list)| list.iter())
            .filter(|reference| reference.reference_file_path == old_path)
            .cloned()
            .collect();
        sort_references(&mut references);

        if let Some(own) = self.references.get(new_path) {
            references.extend(own.iter().cloned());
        }

        log_event!(
            "index",
            "moved",
            "{} -> {} ({} references)",
            old_path.display(),
            new_path.display(),
            references.len()
        );

        Some(MovedFile {
            old_path,
            new_path: new_path.to_path_buf(),
            references,
        })
    }

    /// Handle a create event: reconcile a move or index a new file.
    pub fn handle_created(&mut self, path: &Path) -> IndexResult<Option<MovedFile>> {
        if self.is_moved_path(path) {
            if let Some(moved) = self.reconcile(path) {
                return Ok(Some(moved));
            }
        }
        self.index(path)?;
        Ok(None)
    }

    /// Forget everything about `path`. Returns false when it was not tracked.
    pub fn remove(&mut self, path: &Path) -> bool {
        let had_fingerprint = self.registry.remove(path).is_some();
        let had_references = self.references.remove(path).is_some();
        if had_fingerprint || had_references {
            debug_event!("index", "removed", "{}", path.display());
        }
        had_fingerprint || had_references
    }

    /// All references whose resolved target is `path`, sorted by source file.
    pub fn references_to(&self, path: &Path) -> Vec<Reference> {
        let mut references: Vec<Reference> = self
            .references
            .values()
            .flatten()
            .filter(|reference| reference.reference_file_path == path)
            .cloned()
            .collect();
        sort_references(&mut references);
        references
    }

    /// Outgoing references stored for `path`.
    pub fn references_from(&self, path: &Path) -> Option<&[Reference]> {
        self.references.get(path).map(Vec::as_slice)
    }

    pub fn state(&self, path: &Path) -> FileState {
        if self.registry.contains(path) {
            FileState::Indexed
        } else {
            FileState::Unindexed
        }
    }

    pub fn tracked_file(&self, path: &Path) -> Option<TrackedFile> {
        let fingerprint = self.registry.fingerprint_of(path)?.clone();
        Some(TrackedFile {
            path: path.to_path_buf(),
            fingerprint,
            references: self.references.get(path).cloned(),
        })
    }

    /// Tracked paths under `prefix`, sorted.
    pub fn tracked_paths(&self, prefix: &Path) -> Vec<PathBuf> {
        self.registry.paths_with_prefix(prefix)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn clear(&mut self) {
        self.registry.clear();
        self.references.clear();
    }

    /// Index many files, typically the initial project scan.
    ///
    /// Files are read, hashed and parsed in parallel; results are then
    /// stored one by one in input order, so duplicate detection behaves as if
    /// `index` had been called for each path in turn.
    pub fn bulk_index<I>(&mut self, paths: I) -> BulkIndexReport
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().collect();
        let prepared: Vec<IndexResult<Option<PreparedFile>>> =
            paths.par_iter().map(|path| self.prepare(path)).collect();

        let mut report = BulkIndexReport::default();
        let mut duplicates = BTreeSet::new();

        for result in prepared {
            match result {
                Ok(Some(file)) => match self.apply(file) {
                    Ok(()) => report.indexed += 1,
                    Err(IndexError::DuplicateContent { existing, path }) => {
                        tracing::warn!(
                            "[index] {} has the same content as {}",
                            path.display(),
                            existing.display()
                        );
                        duplicates.insert(path);
                        duplicates.insert(existing);
                    }
                    Err(e) => {
                        tracing::debug!("[index] {e}");
                        report.skipped += 1;
                    }
                },
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    tracing::debug!("[index] skipping: {e}");
                    report.skipped += 1;
                }
            }
        }

        report.duplicates = duplicates.into_iter().collect();
        log_event!(
            "index",
            "bulk",
            "{} indexed, {} skipped, {} with duplicate content",
            report.indexed,
            report.skipped,
            report.duplicates.len()
        );
        report
    }

    /// Read, fingerprint and parse `path` without touching the index.
    ///
    /// `Ok(None)` when the file does not exist.
    fn prepare(&self, path: &Path) -> IndexResult<Option<PreparedFile>> {
        if !self.fs.is_file(path) {
            return Ok(None);
        }

        let bytes = self
            .fs
            .read(path)
            .map_err(|e| IndexError::unreadable(path, e))?;
        let fingerprint = self
            .registry
            .fingerprint_bytes(self.fs.as_ref(), path, &bytes)?;

        let references = self
            .config
            .is_source_file(path)
            .then(|| self.collect_references(path, &String::from_utf8_lossy(&bytes)));

        Ok(Some(PreparedFile {
            path: path.to_path_buf(),
            fingerprint,
            references,
        }))
    }

    /// Store a prepared file. Either both the fingerprint and the references
    /// are stored or, on duplicate content, neither.
    fn apply(&mut self, file: PreparedFile) -> IndexResult<()> {
        self.registry.commit(&file.path, file.fingerprint)?;

        match file.references {
            Some(references) => {
                debug_event!(
                    "index",
                    "indexed",
                    "{} ({} references)",
                    file.path.display(),
                    references.len()
                );
                self.references.insert(file.path, references);
            }
            None => {
                self.references.remove(&file.path);
            }
        }
        Ok(())
    }

    fn read_references(&self, path: &Path) -> Vec<Reference> {
        match self.fs.read(path) {
            Ok(bytes) => self.collect_references(path, &String::from_utf8_lossy(&bytes)),
            Err(e) => {
                tracing::debug!("[index] cannot read {}: {e}", path.display());
                Vec::new()
            }
        }
    }

    /// Extract and resolve the relative references of one file.
    fn collect_references(&self, path: &Path, code: &str) -> Vec<Reference> {
        self.extractor
            .extract(code)
            .into_iter()
            .filter_map(|raw| {
                let resolved = self.resolver.resolve(self.fs.as_ref(), path, &raw.path)?;
                Some(Reference {
                    source_file_path: path.to_path_buf(),
                    reference_file_path: resolved.path,
                    raw_path: raw.path,
                    has_explicit_extension: resolved.has_explicit_extension,
                    is_directory_index_reference: resolved.is_directory_index_reference,
                    start: raw.start,
                    end: raw.end,
                })
            })
            .collect()
    }
}

fn sort_references(references: &mut [Reference]) {
    references.sort_by(|a, b| {
        a.source_file_path
            .cmp(&b.source_file_path)
            .then(a.start.cmp(&b.start))
    });
}
