//! Boardy Catalog
//!
//! The catalog ties the content-addressed blob store to the SQLite tag index.
//! `CatalogEngine` owns the consistency contract between the two: a blob
//! exists on disk exactly when its record exists in the index. `Catalog`
//! wires the engine up from a `Config` and owns its lifecycle.
//!
//! The `import` module holds the batch importers (file lists, directory
//! walks, URL fetches) that feed the engine one item at a time.

pub mod catalog;
pub mod engine;
pub mod import;

pub use catalog::Catalog;
pub use engine::{CatalogEngine, IngestStage};
pub use import::{
    DirectoryImporter, FileImporter, ImportControl, ImportProgress, ImportReport, RateLimiter,
    UrlImporter,
};
