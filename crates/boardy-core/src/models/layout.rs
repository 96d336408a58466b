use serde::{Deserialize, Serialize};

/// How a media item should be framed when displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaLayout {
    Portrait,
    Landscape,
}

impl MediaLayout {
    /// Taller than wide is portrait; square and wider are landscape.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if height > width {
            MediaLayout::Portrait
        } else {
            MediaLayout::Landscape
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_follows_aspect_ratio() {
        assert_eq!(MediaLayout::from_dimensions(1080, 1920), MediaLayout::Portrait);
        assert_eq!(MediaLayout::from_dimensions(1920, 1080), MediaLayout::Landscape);
        assert_eq!(MediaLayout::from_dimensions(500, 500), MediaLayout::Landscape);
    }
}
