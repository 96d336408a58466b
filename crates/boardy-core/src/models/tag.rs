use serde::{Deserialize, Serialize};

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// A tag. Names are unique and compared case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Outcome of creating many tags at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTagReport {
    pub created: Vec<Tag>,
    /// Names that were already present and left untouched.
    pub existing: Vec<String>,
}
