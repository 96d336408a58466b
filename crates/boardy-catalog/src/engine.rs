//! Catalog engine
//!
//! Every mutation goes through here so that the blob store and the index move
//! together. Mutations are serialized on an internal lock; reads go straight
//! to the repositories.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use boardy_core::constants::DEFAULT_PAGE_SIZE;
use boardy_core::models::{BatchTagReport, MediaKind, MediaLayout, MediaRecord, Pagination, Tag};
use boardy_core::{normalize_tag_name, AppError, AppResult};
use boardy_db::{MediaRepository, TagRepository, TransactionGuard};
use boardy_processing::{MediaProber, ThumbnailDeriver};
use boardy_storage::keys::validate_storage_filename;
use boardy_storage::{hash_file, storage_filename, Storage, StorageError};
use sqlx::SqlitePool;
use tokio::sync::Mutex;

/// Where an ingest currently is. Logged with every ingest event so a rollback
/// names the step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Validating,
    Hashing,
    Storing,
    Thumbnailing,
    Indexing,
    Committed,
    RolledBack,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestStage::Validating => "validating",
            IngestStage::Hashing => "hashing",
            IngestStage::Storing => "storing",
            IngestStage::Thumbnailing => "thumbnailing",
            IngestStage::Indexing => "indexing",
            IngestStage::Committed => "committed",
            IngestStage::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}

fn normalize_required(raw: &str) -> AppResult<String> {
    normalize_tag_name(raw)
        .ok_or_else(|| AppError::InvalidInput("Tag name must not be empty".to_string()))
}

/// Orchestrates ingestion, deletion and retrieval over the store and the index
#[derive(Clone)]
pub struct CatalogEngine {
    pool: SqlitePool,
    media: MediaRepository,
    tags: TagRepository,
    storage: Arc<dyn Storage>,
    thumbnailer: Arc<dyn ThumbnailDeriver>,
    prober: MediaProber,
    write_lock: Arc<Mutex<()>>,
    default_page_size: i64,
}

impl CatalogEngine {
    pub fn new(
        pool: SqlitePool,
        storage: Arc<dyn Storage>,
        thumbnailer: Arc<dyn ThumbnailDeriver>,
        prober: MediaProber,
    ) -> Self {
        Self {
            media: MediaRepository::new(pool.clone()),
            tags: TagRepository::new(pool.clone()),
            pool,
            storage,
            thumbnailer,
            prober,
            write_lock: Arc::new(Mutex::new(())),
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Page size used when a caller passes a non-positive one.
    pub fn with_default_page_size(mut self, page_size: i64) -> Self {
        if page_size > 0 {
            self.default_page_size = page_size;
        }
        self
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    fn pagination(&self, page: i64, page_size: i64) -> Pagination {
        let page_size = if page_size <= 0 {
            self.default_page_size
        } else {
            page_size
        };
        Pagination::new(page, page_size)
    }

    // =============================================================================
    // INGEST / DELETE
    // =============================================================================

    /// Store a file and index it with `tags`, all or nothing.
    ///
    /// Byte-identical content (with the same extension) that is already
    /// stored is refused with `AlreadyExists` before anything is written.
    #[tracing::instrument(skip(self, path, tags), fields(path = %path.display(), kind = %kind))]
    pub async fn ingest(
        &self,
        path: &Path,
        tags: &[String],
        kind: MediaKind,
    ) -> AppResult<MediaRecord> {
        let _guard = self.write_lock.lock().await;
        let start = Instant::now();

        let mut stage = IngestStage::Validating;
        tracing::debug!(stage = %stage, "Validating source file");
        let meta = tokio::fs::metadata(path).await.map_err(|e| {
            AppError::InvalidFile(format!("{}: {}", path.display(), e))
        })?;
        if !meta.is_file() {
            return Err(AppError::InvalidFile(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let mut tag_names: Vec<String> = Vec::with_capacity(tags.len());
        for raw in tags {
            let name = normalize_required(raw)?;
            if !tag_names.contains(&name) {
                tag_names.push(name);
            }
        }

        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::InvalidFile(format!("{} has no file name", path.display())))?;

        stage = IngestStage::Hashing;
        tracing::debug!(stage = %stage, "Hashing file");
        let hash = hash_file(path)
            .await
            .map_err(|e| AppError::InvalidFile(format!("{}: {}", path.display(), e)))?;
        let filename = storage_filename(&hash, &original_name);
        validate_storage_filename(&filename).map_err(|e| AppError::InvalidFile(e.to_string()))?;

        if self.storage.exists(&filename).await? {
            tracing::debug!(filename = %filename, stage = %stage, "Duplicate content, skipping");
            return Err(AppError::AlreadyExists(filename));
        }

        stage = IngestStage::Storing;
        let blob = self.storage.put_file(path, &filename).await.map_err(|e| {
            tracing::error!(filename = %filename, stage = %stage, error = %e, "Failed to store blob");
            AppError::from(e)
        })?;

        if kind.is_video() {
            stage = IngestStage::Thumbnailing;
            if let Err(e) = self.store_thumbnail(&blob.path, &filename).await {
                self.roll_back(&filename, kind, stage).await;
                return Err(e);
            }
        }

        stage = IngestStage::Indexing;
        let record = match self.index(&filename, kind, &tag_names).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(filename = %filename, stage = %stage, error = %e, "Index commit failed");
                self.roll_back(&filename, kind, stage).await;
                return Err(e);
            }
        };

        stage = IngestStage::Committed;
        tracing::info!(
            record_id = record.id,
            filename = %record.filename,
            size_bytes = blob.size_bytes,
            tags = tag_names.len(),
            stage = %stage,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Media ingested"
        );

        Ok(record)
    }

    async fn store_thumbnail(&self, video_path: &Path, filename: &str) -> AppResult<()> {
        let jpeg = self
            .thumbnailer
            .derive(video_path)
            .await
            .map_err(|e| AppError::ThumbnailCreation(format!("{}: {}", filename, e)))?;
        self.storage.put_thumbnail(filename, jpeg).await?;
        Ok(())
    }

    /// Record plus every tag association in one transaction.
    async fn index(
        &self,
        filename: &str,
        kind: MediaKind,
        tag_names: &[String],
    ) -> AppResult<MediaRecord> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let record = self
            .media
            .create_tx(tx.transaction()?, filename, kind)
            .await?;

        for name in tag_names {
            let tag = self.tags.get_or_create_tx(tx.transaction()?, name).await?;
            self.tags
                .attach_tx(tx.transaction()?, tag.id, record.id)
                .await?;
        }

        tx.commit().await?;
        Ok(record)
    }

    /// Undo the filesystem side of a failed ingest.
    async fn roll_back(&self, filename: &str, kind: MediaKind, failed_at: IngestStage) {
        if let Err(e) = self.storage.delete(filename).await {
            tracing::error!(
                filename = %filename,
                stage = %failed_at,
                error = %e,
                "Failed to remove blob during rollback"
            );
        }

        if kind.is_video() {
            match self.storage.delete_thumbnail(filename).await {
                Ok(()) | Err(StorageError::NotFound(_)) => {}
                Err(e) => tracing::error!(
                    filename = %filename,
                    stage = %failed_at,
                    error = %e,
                    "Failed to remove thumbnail during rollback"
                ),
            }
        }

        tracing::warn!(
            filename = %filename,
            stage = %failed_at,
            outcome = %IngestStage::RolledBack,
            "Ingest rolled back"
        );
    }

    /// Remove a record, then its blob, then its thumbnail.
    ///
    /// The index row goes first. If the blob is then missing or cannot be
    /// removed the store has diverged from the index and the call fails with
    /// `IntegrityViolation`.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut tx = TransactionGuard::begin(&self.pool).await?;
        let record = self
            .media
            .delete_tx(tx.transaction()?, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Media id {} does not exist", id)))?;
        tx.commit().await?;

        if let Err(e) = self.storage.delete(&record.filename).await {
            tracing::error!(
                record_id = id,
                filename = %record.filename,
                error = %e,
                "Blob removal failed after index delete"
            );
            return Err(AppError::IntegrityViolation(format!(
                "Blob for deleted record {} ({}) could not be removed: {}",
                id, record.filename, e
            )));
        }

        if record.is_video() {
            match self.storage.delete_thumbnail(&record.filename).await {
                Ok(()) => {}
                Err(StorageError::NotFound(_)) => {
                    tracing::warn!(filename = %record.filename, "Video had no thumbnail to remove");
                }
                Err(e) => {
                    tracing::error!(
                        record_id = id,
                        filename = %record.filename,
                        error = %e,
                        "Thumbnail removal failed after index delete"
                    );
                    return Err(AppError::IntegrityViolation(format!(
                        "Thumbnail for deleted record {} ({}) could not be removed: {}",
                        id, record.filename, e
                    )));
                }
            }
        }

        tracing::info!(record_id = id, filename = %record.filename, "Media deleted");
        Ok(())
    }

    // =============================================================================
    // RECORD QUERIES
    // =============================================================================

    /// Records tagged with every known name in `tag_names`, newest first.
    ///
    /// Names that match no tag are dropped from the filter. If none of them
    /// match, nothing does.
    pub async fn search(
        &self,
        tag_names: &[String],
        page: i64,
        page_size: i64,
    ) -> AppResult<Vec<MediaRecord>> {
        let pagination = self.pagination(page, page_size);

        if tag_names.is_empty() {
            return self.media.search(&[], pagination).await;
        }

        let names: Vec<String> = tag_names
            .iter()
            .filter_map(|n| normalize_tag_name(n))
            .collect();
        let resolved = self.tags.get_by_names(&names).await?;
        if resolved.is_empty() {
            tracing::debug!(filter = ?tag_names, "No filter tag exists, empty result");
            return Ok(Vec::new());
        }

        if resolved.len() < names.len() {
            tracing::debug!(
                requested = names.len(),
                resolved = resolved.len(),
                "Unknown tag names dropped from filter"
            );
        }

        let ids: Vec<i64> = resolved.iter().map(|t| t.id).collect();
        self.media.search(&ids, pagination).await
    }

    pub async fn count(&self) -> AppResult<i64> {
        self.media.count().await
    }

    /// `ceil(count / page_size)`, never less than 1.
    pub async fn max_page(&self, page_size: i64) -> AppResult<i64> {
        let pagination = self.pagination(1, page_size);
        let count = self.media.count().await?;
        Ok(Pagination::max_page(count, pagination.page_size))
    }

    pub async fn get(&self, id: i64) -> AppResult<Option<MediaRecord>> {
        self.media.get(id).await
    }

    pub async fn get_by_filename(&self, filename: &str) -> AppResult<Option<MediaRecord>> {
        self.media.get_by_filename(filename).await
    }

    pub async fn list_all(&self, newest_first: bool) -> AppResult<Vec<MediaRecord>> {
        self.media.list_all(newest_first).await
    }

    pub fn path_for(&self, filename: &str) -> AppResult<PathBuf> {
        Ok(self.storage.path_for(filename)?)
    }

    pub fn thumbnail_path_for(&self, filename: &str) -> AppResult<PathBuf> {
        Ok(self.storage.thumbnail_path_for(filename)?)
    }

    /// Portrait or landscape framing of a stored record.
    pub async fn layout_for(&self, record: &MediaRecord) -> AppResult<MediaLayout> {
        let path = self.path_for(&record.filename)?;
        self.prober
            .layout(&path, record.kind)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to probe {}: {}", record.filename, e)))
    }

    // =============================================================================
    // TAG OPERATIONS
    // =============================================================================

    pub async fn tags_for(&self, record_id: i64) -> AppResult<Vec<Tag>> {
        self.tags.tags_for(record_id).await
    }

    /// Create a tag. Fails with `AlreadyExists` if the normalized name is taken.
    pub async fn add_tag(&self, name: &str) -> AppResult<Tag> {
        let name = normalize_required(name)?;
        let _guard = self.write_lock.lock().await;
        let tag = self.tags.create(&name).await?;
        tracing::info!(tag_id = tag.id, tag = %tag.name, "Tag created");
        Ok(tag)
    }

    /// Create each tag, skipping names that already exist.
    pub async fn batch_create_tags(&self, names: &[String]) -> AppResult<BatchTagReport> {
        let _guard = self.write_lock.lock().await;
        let mut report = BatchTagReport::default();

        for raw in names {
            let Some(name) = normalize_tag_name(raw) else {
                continue;
            };
            match self.tags.create(&name).await {
                Ok(tag) => report.created.push(tag),
                Err(e) if e.is_already_exists() => report.existing.push(name),
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            created = report.created.len(),
            existing = report.existing.len(),
            "Batch tag creation finished"
        );
        Ok(report)
    }

    pub async fn get_tag(&self, id: i64) -> AppResult<Option<Tag>> {
        self.tags.get_by_id(id).await
    }

    pub async fn get_tag_by_name(&self, name: &str) -> AppResult<Option<Tag>> {
        self.tags.get_by_name(name).await
    }

    /// Up to ten tags starting with `prefix`, case-insensitively.
    pub async fn search_tags_by_prefix(&self, prefix: Option<&str>) -> AppResult<Vec<Tag>> {
        self.tags.search_by_prefix(prefix).await
    }

    pub async fn list_tags(&self) -> AppResult<Vec<Tag>> {
        self.tags.list_all().await
    }

    /// Returns `false` when the tag was already attached.
    pub async fn attach(&self, tag_id: i64, record_id: i64) -> AppResult<bool> {
        let _guard = self.write_lock.lock().await;
        self.tags.attach(tag_id, record_id).await
    }

    /// Attach a tag by name, creating the tag first if needed.
    ///
    /// The tag is not created when the record does not exist.
    pub async fn attach_by_name(&self, name: &str, record_id: i64) -> AppResult<bool> {
        let name = normalize_required(name)?;
        let _guard = self.write_lock.lock().await;

        let mut tx = TransactionGuard::begin(&self.pool).await?;
        let tag = self.tags.get_or_create_tx(tx.transaction()?, &name).await?;
        let attached = self
            .tags
            .attach_tx(tx.transaction()?, tag.id, record_id)
            .await?;
        tx.commit().await?;

        Ok(attached)
    }

    pub async fn detach(&self, tag_ids: &[i64], record_id: i64) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let removed = self.tags.detach(tag_ids, record_id).await?;
        tracing::debug!(record_id, removed, "Tags detached");
        Ok(())
    }

    /// Delete tags everywhere. Unknown ids fail the whole call.
    pub async fn delete_tags(&self, tag_ids: &[i64]) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        self.tags.delete_many(tag_ids).await?;
        Ok(())
    }
}
