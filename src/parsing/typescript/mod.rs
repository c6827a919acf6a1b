//! TypeScript/JavaScript module reference support

pub mod extractor;

pub use extractor::ReferenceExtractor;
