pub mod paths;
pub mod typescript;

pub use typescript::ReferenceExtractor;
