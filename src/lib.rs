//! Content-addressed index of module references in TypeScript/JavaScript
//! projects, used to keep import paths correct when files are moved.

pub mod config;
pub mod error;
pub mod fs;
pub mod indexing;
pub mod logging;
pub mod parsing;
pub mod types;

pub use config::{IndexConfig, LoggingConfig, Settings};
pub use error::{IndexError, IndexResult};
pub use fs::{FileSystem, OsFileSystem};
pub use indexing::{
    BulkIndexReport, ContentHashRegistry, ContentHasher, FileEdits, MoveOperation, MovedFile,
    ReferenceIndex, ReferenceResolver, SharedReferenceIndex, TextEdit, new_specifier, plan_edits,
};
pub use parsing::ReferenceExtractor;
pub use types::*;
