//! Configuration module
//!
//! Runtime settings for the catalog: where the index and the blob trees live,
//! pool sizing, external tool paths and import limits. Values come from the
//! process environment (with `.env` support) and fall back to defaults that
//! reproduce the classic on-disk layout.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::constants::DEFAULT_PAGE_SIZE;

const DATABASE_URL: &str = "sqlite://instance/image_database.db";
const MEDIA_DIR: &str = "db/image_files";
const THUMBNAIL_DIR: &str = "db/thumbnails";
const MAX_CONNECTIONS: u32 = 4;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const THUMBNAIL_TIMEOUT_SECS: u64 = 60;
const FETCH_TIMEOUT_SECS: u64 = 30;
const FETCH_RATE_LIMIT_PER_MINUTE: u32 = 50;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub media_dir: PathBuf,
    pub thumbnail_dir: PathBuf,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub thumbnail_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub fetch_rate_limit_per_minute: u32,
    pub default_page_size: i64,
}

/// Read `key` and parse it, keeping `default` when unset or malformed.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: env::var("BOARDY_DATABASE_URL")
                .unwrap_or_else(|_| DATABASE_URL.to_string()),
            media_dir: env::var("BOARDY_MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(MEDIA_DIR)),
            thumbnail_dir: env::var("BOARDY_THUMBNAIL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(THUMBNAIL_DIR)),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            thumbnail_timeout_secs: env_or("THUMBNAIL_TIMEOUT_SECS", THUMBNAIL_TIMEOUT_SECS),
            fetch_timeout_secs: env_or("FETCH_TIMEOUT_SECS", FETCH_TIMEOUT_SECS),
            fetch_rate_limit_per_minute: env_or(
                "FETCH_RATE_LIMIT_PER_MINUTE",
                FETCH_RATE_LIMIT_PER_MINUTE,
            ),
            default_page_size: env_or("DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE),
        };

        config.validate()?;
        Ok(config)
    }

    /// Self-contained layout under `root`: `root/instance/image_database.db`,
    /// `root/db/image_files` and `root/db/thumbnails`. Tool paths and limits use
    /// their defaults; the environment is not consulted.
    pub fn for_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            database_url: format!(
                "sqlite://{}",
                root.join("instance").join("image_database.db").display()
            ),
            media_dir: root.join(MEDIA_DIR),
            thumbnail_dir: root.join(THUMBNAIL_DIR),
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            thumbnail_timeout_secs: THUMBNAIL_TIMEOUT_SECS,
            fetch_timeout_secs: FETCH_TIMEOUT_SECS,
            fetch_rate_limit_per_minute: FETCH_RATE_LIMIT_PER_MINUTE,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("sqlite:") {
            return Err(anyhow::anyhow!(
                "BOARDY_DATABASE_URL must be a sqlite connection string"
            ));
        }

        if self.media_dir == self.thumbnail_dir {
            return Err(anyhow::anyhow!(
                "BOARDY_MEDIA_DIR and BOARDY_THUMBNAIL_DIR must be different directories"
            ));
        }

        if self.db_max_connections == 0 {
            return Err(anyhow::anyhow!("DB_MAX_CONNECTIONS must be at least 1"));
        }

        if self.fetch_rate_limit_per_minute == 0 {
            return Err(anyhow::anyhow!(
                "FETCH_RATE_LIMIT_PER_MINUTE must be at least 1"
            ));
        }

        if self.default_page_size <= 0 {
            return Err(anyhow::anyhow!("DEFAULT_PAGE_SIZE must be at least 1"));
        }

        Ok(())
    }

    pub fn db_timeout(&self) -> Duration {
        Duration::from_secs(self.db_timeout_seconds)
    }

    pub fn thumbnail_timeout(&self) -> Duration {
        Duration::from_secs(self.thumbnail_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Filesystem path of the sqlite database, if the URL names a file.
    pub fn database_path(&self) -> Option<PathBuf> {
        let rest = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().unwrap_or(rest);
        if path.is_empty() || path == ":memory:" {
            None
        } else {
            Some(PathBuf::from(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_root_places_everything_under_root() {
        let config = Config::for_root("/srv/board");
        assert_eq!(config.media_dir, PathBuf::from("/srv/board/db/image_files"));
        assert_eq!(
            config.thumbnail_dir,
            PathBuf::from("/srv/board/db/thumbnails")
        );
        assert_eq!(
            config.database_path(),
            Some(PathBuf::from("/srv/board/instance/image_database.db"))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_sqlite_url() {
        let mut config = Config::for_root("/tmp/x");
        config.database_url = "postgresql://localhost/db".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_shared_blob_dirs() {
        let mut config = Config::for_root("/tmp/x");
        config.thumbnail_dir = config.media_dir.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let mut config = Config::for_root("/tmp/x");
        config.default_page_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::for_root("/tmp/x");
        config.fetch_rate_limit_per_minute = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn database_path_ignores_memory_and_query() {
        let mut config = Config::for_root("/tmp/x");
        config.database_url = "sqlite::memory:".to_string();
        assert_eq!(config.database_path(), None);
        config.database_url = "sqlite://data/index.db?mode=rwc".to_string();
        assert_eq!(config.database_path(), Some(PathBuf::from("data/index.db")));
    }
}
