use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::constants::CONTENT_HASH_LEN;

/// Media kind enum
///
/// Persisted as the `is_video` boolean column of the `image` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_is_video(is_video: bool) -> Self {
        if is_video {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    pub fn is_video(self) -> bool {
        matches!(self, MediaKind::Video)
    }
}

impl FromStr for MediaKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            _ => Err(anyhow::anyhow!("Invalid media kind: {}", s)),
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// A stored image or video.
///
/// `filename` is the content hash followed by the original extension and is
/// unique across the catalog. Tag membership is not a field; query it with
/// `tags_for`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: i64,
    pub filename: String,
    pub kind: MediaKind,
}

impl MediaRecord {
    /// The content hash prefix of the storage filename.
    pub fn content_hash(&self) -> &str {
        self.filename
            .get(..CONTENT_HASH_LEN)
            .unwrap_or(self.filename.as_str())
    }

    pub fn is_video(&self) -> bool {
        self.kind.is_video()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kind_round_trips_through_is_video() {
        assert_eq!(MediaKind::from_is_video(true), MediaKind::Video);
        assert_eq!(MediaKind::from_is_video(false), MediaKind::Image);
        assert!(MediaKind::Video.is_video());
        assert!(!MediaKind::Image.is_video());
    }

    #[test]
    fn media_kind_parses_case_insensitively() {
        assert_eq!("VIDEO".parse::<MediaKind>().unwrap(), MediaKind::Video);
        assert_eq!("image".parse::<MediaKind>().unwrap(), MediaKind::Image);
        assert!("audio".parse::<MediaKind>().is_err());
    }

    #[test]
    fn content_hash_strips_extension() {
        let hash = "a".repeat(64);
        let record = MediaRecord {
            id: 1,
            filename: format!("{}.png", hash),
            kind: MediaKind::Image,
        };
        assert_eq!(record.content_hash(), hash);
    }
}
