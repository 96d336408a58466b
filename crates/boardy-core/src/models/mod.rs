//! Data models for the catalog
//!
//! Plain data records returned by explicit query methods. Nothing here performs
//! I/O on attribute access.

mod layout;
mod media;
mod search;
mod tag;

pub use layout::MediaLayout;
pub use media::{MediaKind, MediaRecord};
pub use search::Pagination;
pub use tag::{BatchTagReport, Tag};
