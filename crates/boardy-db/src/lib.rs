//! Boardy DB Library
//!
//! SQLite persistence for the catalog: pool setup, schema migrations, and the
//! repositories behind the media index and the tag graph.

pub mod db;

pub use db::{connect, MediaRepository, TagRepository, TransactionGuard};
