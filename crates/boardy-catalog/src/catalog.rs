//! Catalog lifecycle
//!
//! A `Catalog` is opened once at process start and closed at shutdown. The
//! engine it hands out is cheap to clone and is passed explicitly to whatever
//! needs it.

use std::sync::Arc;

use boardy_core::{AppResult, Config};
use boardy_processing::{FFmpegThumbnailer, MediaProber, ThumbnailDeriver};
use boardy_storage::LocalStorage;
use sqlx::SqlitePool;

use crate::engine::CatalogEngine;

pub struct Catalog {
    pool: SqlitePool,
    engine: CatalogEngine,
    config: Config,
}

impl Catalog {
    /// Open the store described by `config`, deriving thumbnails with ffmpeg.
    pub async fn open(config: &Config) -> AppResult<Self> {
        let prober = MediaProber::new(config.ffprobe_path.clone(), config.thumbnail_timeout());
        let thumbnailer = FFmpegThumbnailer::new(config.ffmpeg_path.clone(), prober);
        Self::open_with(config, Arc::new(thumbnailer)).await
    }

    /// Open the store with a caller-supplied thumbnail deriver.
    pub async fn open_with(
        config: &Config,
        thumbnailer: Arc<dyn ThumbnailDeriver>,
    ) -> AppResult<Self> {
        config.validate()?;

        let storage = LocalStorage::new(&config.media_dir, &config.thumbnail_dir).await?;
        let pool = boardy_db::connect(config).await?;
        let prober = MediaProber::new(config.ffprobe_path.clone(), config.thumbnail_timeout());

        let engine = CatalogEngine::new(pool.clone(), Arc::new(storage), thumbnailer, prober)
            .with_default_page_size(config.default_page_size);

        tracing::info!(
            media_dir = %config.media_dir.display(),
            thumbnail_dir = %config.thumbnail_dir.display(),
            "Catalog opened"
        );

        Ok(Self {
            pool,
            engine,
            config: config.clone(),
        })
    }

    pub fn engine(&self) -> &CatalogEngine {
        &self.engine
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Close the connection pool. Clones of the engine stop working afterwards.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Catalog closed");
    }
}
