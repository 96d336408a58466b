use crate::keys::{content_hash, shard_dir, storage_filename, thumbnail_filename};
use crate::traits::{Storage, StorageError, StorageResult, StoredBlob};
use async_trait::async_trait;
use filetime::FileTime;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    media_root: PathBuf,
    thumbnail_root: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `media_root` - Root directory for blobs (e.g., "db/image_files")
    /// * `thumbnail_root` - Root directory for video thumbnails (e.g., "db/thumbnails")
    ///
    /// Both directories are created if missing and stored in absolute form.
    pub async fn new(
        media_root: impl Into<PathBuf>,
        thumbnail_root: impl Into<PathBuf>,
    ) -> StorageResult<Self> {
        let media_root = Self::prepare_root(media_root.into()).await?;
        let thumbnail_root = Self::prepare_root(thumbnail_root.into()).await?;

        if media_root == thumbnail_root {
            return Err(StorageError::ConfigError(
                "Media and thumbnail roots must differ".to_string(),
            ));
        }

        Ok(LocalStorage {
            media_root,
            thumbnail_root,
        })
    }

    async fn prepare_root(root: PathBuf) -> StorageResult<PathBuf> {
        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        fs::canonicalize(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to canonicalize storage directory {}: {}",
                root.display(),
                e
            ))
        })
    }

    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    pub fn thumbnail_root(&self) -> &Path {
        &self.thumbnail_root
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Open `path` for writing, refusing to replace an existing blob.
    async fn create_new(&self, path: &Path, filename: &str) -> StorageResult<fs::File> {
        self.ensure_parent_dir(path).await?;
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::AlreadyExists(filename.to_string()),
                _ => StorageError::UploadFailed(format!(
                    "Failed to create file {}: {}",
                    path.display(),
                    e
                )),
            })
    }

    /// Best-effort removal of a half-written blob.
    async fn discard_partial(path: &Path) {
        if let Err(e) = fs::remove_file(path).await {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove partially written blob"
            );
        }
    }

    fn copy_file_times(source: &Path, target: &Path, meta: &std::fs::Metadata) {
        let atime = FileTime::from_last_access_time(meta);
        let mtime = FileTime::from_last_modification_time(meta);
        if let Err(e) = filetime::set_file_times(target, atime, mtime) {
            tracing::debug!(
                source = %source.display(),
                target = %target.display(),
                error = %e,
                "Could not preserve file times"
            );
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, data: Vec<u8>, original_name: &str) -> StorageResult<StoredBlob> {
        let filename = storage_filename(&content_hash(&data), original_name);
        let path = self.path_for(&filename)?;
        let size = data.len() as u64;

        let start = std::time::Instant::now();

        let mut file = self.create_new(&path, &filename).await?;

        let written = async {
            file.write_all(&data).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            Self::discard_partial(&path).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to write file {}: {}",
                path.display(),
                e
            )));
        }

        tracing::info!(
            path = %path.display(),
            filename = %filename,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(StoredBlob {
            filename,
            path,
            size_bytes: size,
        })
    }

    async fn put_file(&self, source: &Path, filename: &str) -> StorageResult<StoredBlob> {
        let path = self.path_for(filename)?;
        let start = std::time::Instant::now();

        let meta = fs::metadata(source).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(source.display().to_string()),
            _ => StorageError::IoError(e),
        })?;

        let mut reader = fs::File::open(source).await?;
        let mut file = self.create_new(&path, filename).await?;

        let copied = async {
            let n = tokio::io::copy(&mut reader, &mut file).await?;
            file.sync_all().await?;
            Ok::<u64, std::io::Error>(n)
        }
        .await;

        let size = match copied {
            Ok(n) => n,
            Err(e) => {
                drop(file);
                Self::discard_partial(&path).await;
                return Err(StorageError::UploadFailed(format!(
                    "Failed to copy {} to {}: {}",
                    source.display(),
                    path.display(),
                    e
                )));
            }
        };
        drop(file);

        Self::copy_file_times(source, &path, &meta);

        tracing::info!(
            source = %source.display(),
            path = %path.display(),
            filename = %filename,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put_file successful"
        );

        Ok(StoredBlob {
            filename: filename.to_string(),
            path,
            size_bytes: size,
        })
    }

    async fn delete(&self, filename: &str) -> StorageResult<()> {
        let path = self.path_for(filename)?;
        let start = std::time::Instant::now();

        fs::remove_file(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(filename.to_string()),
            _ => StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            )),
        })?;

        tracing::info!(
            path = %path.display(),
            filename = %filename,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn exists(&self, filename: &str) -> StorageResult<bool> {
        let path = self.path_for(filename)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn read(&self, filename: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(filename)?;

        fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(filename.to_string()),
            _ => StorageError::DownloadFailed(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            )),
        })
    }

    fn path_for(&self, filename: &str) -> StorageResult<PathBuf> {
        Ok(self.media_root.join(shard_dir(filename)?).join(filename))
    }

    fn thumbnail_path_for(&self, filename: &str) -> StorageResult<PathBuf> {
        Ok(self
            .thumbnail_root
            .join(shard_dir(filename)?)
            .join(thumbnail_filename(filename)?))
    }

    async fn put_thumbnail(&self, filename: &str, jpeg: Vec<u8>) -> StorageResult<PathBuf> {
        let path = self.thumbnail_path_for(filename)?;
        self.ensure_parent_dir(&path).await?;

        fs::write(&path, &jpeg).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write thumbnail {}: {}",
                path.display(),
                e
            ))
        })?;

        tracing::info!(
            path = %path.display(),
            filename = %filename,
            size_bytes = jpeg.len(),
            "Thumbnail stored"
        );

        Ok(path)
    }

    async fn delete_thumbnail(&self, filename: &str) -> StorageResult<()> {
        let path = self.thumbnail_path_for(filename)?;

        fs::remove_file(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(path.display().to_string()),
            _ => StorageError::DeleteFailed(format!(
                "Failed to delete thumbnail {}: {}",
                path.display(),
                e
            )),
        })?;

        tracing::info!(path = %path.display(), filename = %filename, "Thumbnail deleted");
        Ok(())
    }

    async fn thumbnail_exists(&self, filename: &str) -> StorageResult<bool> {
        let path = self.thumbnail_path_for(filename)?;
        Ok(fs::try_exists(&path).await?)
    }
}
