use boardy_core::models::{MediaKind, MediaRecord, Pagination};
use boardy_core::AppError;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool, Transaction};

use super::is_unique_violation;

/// Row shape of the `image` table. `is_video` is nullable in stores written
/// by other tools and reads as "image" when absent.
#[derive(Debug, FromRow)]
struct ImageRow {
    id: i64,
    filename: String,
    is_video: Option<bool>,
}

impl From<ImageRow> for MediaRecord {
    fn from(row: ImageRow) -> Self {
        MediaRecord {
            id: row.id,
            filename: row.filename,
            kind: MediaKind::from_is_video(row.is_video.unwrap_or(false)),
        }
    }
}

/// Repository for the media index
///
/// Rows are immutable once created; tag membership is managed by
/// [`TagRepository`](super::TagRepository).
#[derive(Clone)]
pub struct MediaRepository {
    pool: SqlitePool,
}

impl MediaRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a record inside the caller's transaction.
    ///
    /// A filename that is already indexed yields `AlreadyExists`.
    #[tracing::instrument(skip(self, tx), fields(db.table = "image", db.operation = "insert"))]
    pub async fn create_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        filename: &str,
        kind: MediaKind,
    ) -> Result<MediaRecord, AppError> {
        let row = sqlx::query_as::<Sqlite, ImageRow>(
            "INSERT INTO image (filename, is_video) VALUES (?, ?) RETURNING id, filename, is_video",
        )
        .bind(filename)
        .bind(kind.is_video())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::AlreadyExists(filename.to_string())
            } else {
                AppError::from(e)
            }
        })?;

        Ok(row.into())
    }

    #[tracing::instrument(skip(self), fields(db.table = "image", db.operation = "select", db.record_id = id))]
    pub async fn get(&self, id: i64) -> Result<Option<MediaRecord>, AppError> {
        let row = sqlx::query_as::<Sqlite, ImageRow>(
            "SELECT id, filename, is_video FROM image WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    #[tracing::instrument(skip(self), fields(db.table = "image", db.operation = "select"))]
    pub async fn get_by_filename(&self, filename: &str) -> Result<Option<MediaRecord>, AppError> {
        let row = sqlx::query_as::<Sqlite, ImageRow>(
            "SELECT id, filename, is_video FROM image WHERE filename = ?",
        )
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Every record, by id in the requested direction.
    #[tracing::instrument(skip(self), fields(db.table = "image", db.operation = "select"))]
    pub async fn list_all(&self, newest_first: bool) -> Result<Vec<MediaRecord>, AppError> {
        let sql = if newest_first {
            "SELECT id, filename, is_video FROM image ORDER BY id DESC"
        } else {
            "SELECT id, filename, is_video FROM image ORDER BY id ASC"
        };

        let rows = sqlx::query_as::<Sqlite, ImageRow>(sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "image", db.operation = "count"))]
    pub async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM image")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// One page of records carrying every tag in `tag_ids`, newest first.
    ///
    /// An empty `tag_ids` means no filter. Callers that need "no tag matched
    /// means nothing matches" must decide that before calling.
    #[tracing::instrument(skip(self), fields(db.table = "image", db.operation = "select"))]
    pub async fn search(
        &self,
        tag_ids: &[i64],
        pagination: Pagination,
    ) -> Result<Vec<MediaRecord>, AppError> {
        let mut ids = tag_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut query = QueryBuilder::<Sqlite>::new("SELECT id, filename, is_video FROM image");

        if !ids.is_empty() {
            query.push(" WHERE id IN (SELECT image_id FROM image_tag WHERE tag_id IN (");
            let mut separated = query.separated(", ");
            for id in &ids {
                separated.push_bind(*id);
            }
            separated.push_unseparated(") GROUP BY image_id HAVING COUNT(DISTINCT tag_id) = ");
            query.push_bind(ids.len() as i64);
            query.push(")");
        }

        query.push(" ORDER BY id DESC LIMIT ");
        query.push_bind(pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(pagination.offset());

        let rows = query
            .build_query_as::<ImageRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Remove a record and its tag associations inside the caller's transaction.
    ///
    /// Returns the removed record, or `None` when the id is unknown.
    #[tracing::instrument(skip(self, tx), fields(db.table = "image", db.operation = "delete", db.record_id = id))]
    pub async fn delete_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: i64,
    ) -> Result<Option<MediaRecord>, AppError> {
        let row = sqlx::query_as::<Sqlite, ImageRow>(
            "SELECT id, filename, is_video FROM image WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM image_tag WHERE image_id = ?")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        sqlx::query("DELETE FROM image WHERE id = ?")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(Some(row.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support;
    use crate::db::{TagRepository, TransactionGuard};

    fn name(n: u8) -> String {
        format!("{}.png", format!("{:02x}", n).repeat(32))
    }

    async fn insert(pool: &SqlitePool, repo: &MediaRepository, filename: &str, kind: MediaKind) -> MediaRecord {
        let mut tx = TransactionGuard::begin(pool).await.unwrap();
        let record = repo
            .create_tx(tx.transaction().unwrap(), filename, kind)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        record
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_dir, pool) = test_support::pool().await;
        let repo = MediaRepository::new(pool.clone());

        let record = insert(&pool, &repo, &name(1), MediaKind::Video).await;
        assert_eq!(record.kind, MediaKind::Video);

        assert_eq!(repo.get(record.id).await.unwrap(), Some(record.clone()));
        assert_eq!(repo.get_by_filename(&name(1)).await.unwrap(), Some(record));
        assert_eq!(repo.get(999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_filename_is_already_exists() {
        let (_dir, pool) = test_support::pool().await;
        let repo = MediaRepository::new(pool.clone());
        insert(&pool, &repo, &name(1), MediaKind::Image).await;

        let mut tx = TransactionGuard::begin(&pool).await.unwrap();
        let err = repo
            .create_tx(tx.transaction().unwrap(), &name(1), MediaKind::Image)
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        tx.rollback().await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_null_is_video_reads_as_image() {
        let (_dir, pool) = test_support::pool().await;
        let repo = MediaRepository::new(pool.clone());

        sqlx::query("INSERT INTO image (filename, is_video) VALUES (?, NULL)")
            .bind(name(7))
            .execute(&pool)
            .await
            .unwrap();

        let record = repo.get_by_filename(&name(7)).await.unwrap().unwrap();
        assert_eq!(record.kind, MediaKind::Image);
    }

    #[tokio::test]
    async fn test_search_pages_newest_first() {
        let (_dir, pool) = test_support::pool().await;
        let repo = MediaRepository::new(pool.clone());
        for n in 1..=5 {
            insert(&pool, &repo, &name(n), MediaKind::Image).await;
        }

        let first = repo.search(&[], Pagination::new(1, 2)).await.unwrap();
        let ids: Vec<i64> = first.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 4]);

        let third = repo.search(&[], Pagination::new(3, 2)).await.unwrap();
        assert_eq!(third.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1]);

        assert!(repo.search(&[], Pagination::new(4, 2)).await.unwrap().is_empty());

        let all = repo.list_all(false).await.unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_search_intersects_tags() {
        let (_dir, pool) = test_support::pool().await;
        let repo = MediaRepository::new(pool.clone());
        let tags = TagRepository::new(pool.clone());

        let a = tags.create("a").await.unwrap();
        let b = tags.create("b").await.unwrap();
        let only_a = insert(&pool, &repo, &name(1), MediaKind::Image).await;
        let both = insert(&pool, &repo, &name(2), MediaKind::Image).await;
        let only_b = insert(&pool, &repo, &name(3), MediaKind::Image).await;

        tags.attach(a.id, only_a.id).await.unwrap();
        tags.attach(a.id, both.id).await.unwrap();
        tags.attach(b.id, both.id).await.unwrap();
        tags.attach(b.id, only_b.id).await.unwrap();

        let hits = repo
            .search(&[a.id, b.id, a.id], Pagination::default())
            .await
            .unwrap();
        assert_eq!(hits, vec![both]);

        let hits = repo.search(&[a.id], Pagination::default()).await.unwrap();
        assert_eq!(hits.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_delete_removes_associations() {
        let (_dir, pool) = test_support::pool().await;
        let repo = MediaRepository::new(pool.clone());
        let tags = TagRepository::new(pool.clone());

        let tag = tags.create("cat").await.unwrap();
        let record = insert(&pool, &repo, &name(1), MediaKind::Image).await;
        tags.attach(tag.id, record.id).await.unwrap();

        let mut tx = TransactionGuard::begin(&pool).await.unwrap();
        let removed = repo
            .delete_tx(tx.transaction().unwrap(), record.id)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(removed, Some(record.clone()));
        assert_eq!(repo.get(record.id).await.unwrap(), None);
        assert_eq!(tags.get_by_id(tag.id).await.unwrap(), Some(tag));
        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM image_tag")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(links, 0);

        let mut tx = TransactionGuard::begin(&pool).await.unwrap();
        assert_eq!(
            repo.delete_tx(tx.transaction().unwrap(), record.id).await.unwrap(),
            None
        );
        tx.commit().await.unwrap();
    }
}
