//! Validation modules

pub mod tag_name;

pub use tag_name::{normalize_tag_name, parse_tag_lines, parse_tag_list};
