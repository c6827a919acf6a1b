//! Error types for the reference index.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced while indexing files.
///
/// Only [`IndexError::DuplicateContent`] ever leaves a lifecycle operation.
/// Read failures are reported here internally and then downgraded to
/// "no effect" at the operation boundary.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Found files with duplicated content: {path} has the same content as {existing}")]
    DuplicateContent { existing: PathBuf, path: PathBuf },

    #[error("Failed to read file {path}: {source}")]
    UnreadableFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IndexError {
    /// The already indexed file that owns the colliding content.
    pub fn existing_path(&self) -> Option<&Path> {
        match self {
            IndexError::DuplicateContent { existing, .. } => Some(existing),
            _ => None,
        }
    }

    pub(crate) fn unreadable(path: &Path, source: std::io::Error) -> Self {
        IndexError::UnreadableFile {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type IndexResult<T> = Result<T, IndexError>;
