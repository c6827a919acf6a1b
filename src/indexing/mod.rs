pub mod hash_registry;
pub mod index;
pub mod resolver;
pub mod rewrite;
pub mod shared;

pub use hash_registry::{ContentHashRegistry, ContentHasher, MoveOperation, Sha256Hasher};
pub use index::{BulkIndexReport, MovedFile, ReferenceIndex};
pub use resolver::{ReferenceResolver, ResolvedReference};
pub use rewrite::{FileEdits, TextEdit, new_specifier, plan_edits};
pub use shared::SharedReferenceIndex;
