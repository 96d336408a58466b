use boardy_core::constants::TAG_SEARCH_LIMIT;
use boardy_core::models::Tag;
use boardy_core::AppError;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use super::is_unique_violation;

/// Escape LIKE wildcards so a user prefix matches literally.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_id_list(query: &mut QueryBuilder<'_, Sqlite>, ids: &[i64]) {
    query.push("(");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Repository for tags and the image/tag association table
#[derive(Clone)]
pub struct TagRepository {
    pool: SqlitePool,
}

impl TagRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a tag. The name must already be normalized.
    #[tracing::instrument(skip(self), fields(db.table = "tag", db.operation = "insert"))]
    pub async fn create(&self, name: &str) -> Result<Tag, AppError> {
        sqlx::query_as::<Sqlite, Tag>("INSERT INTO tag (name) VALUES (?) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::AlreadyExists(format!("Tag {}", name))
                } else {
                    AppError::from(e)
                }
            })
    }

    /// Fetch a tag by name, creating it when missing, inside the caller's transaction.
    #[tracing::instrument(skip(self, tx), fields(db.table = "tag", db.operation = "upsert"))]
    pub async fn get_or_create_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        name: &str,
    ) -> Result<Tag, AppError> {
        sqlx::query("INSERT OR IGNORE INTO tag (name) VALUES (?)")
            .bind(name)
            .execute(&mut **tx)
            .await?;

        let tag = sqlx::query_as::<Sqlite, Tag>("SELECT id, name FROM tag WHERE name = ?")
            .bind(name)
            .fetch_one(&mut **tx)
            .await?;

        Ok(tag)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tag", db.operation = "select", db.record_id = id))]
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Tag>, AppError> {
        let tag = sqlx::query_as::<Sqlite, Tag>("SELECT id, name FROM tag WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    /// Exact, case-sensitive lookup.
    #[tracing::instrument(skip(self), fields(db.table = "tag", db.operation = "select"))]
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Tag>, AppError> {
        let tag = sqlx::query_as::<Sqlite, Tag>("SELECT id, name FROM tag WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    /// The subset of `names` that exist as tags. Unknown names are left out.
    #[tracing::instrument(skip(self), fields(db.table = "tag", db.operation = "select"))]
    pub async fn get_by_names(&self, names: &[String]) -> Result<Vec<Tag>, AppError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new("SELECT id, name FROM tag WHERE name IN (");
        let mut separated = query.separated(", ");
        for name in names {
            separated.push_bind(name.as_str());
        }
        separated.push_unseparated(") ORDER BY id");

        let tags = query.build_query_as::<Tag>().fetch_all(&self.pool).await?;
        Ok(tags)
    }

    /// Up to ten tags whose name starts with `prefix`, ignoring ASCII case.
    /// Without a prefix, any ten tags.
    #[tracing::instrument(skip(self), fields(db.table = "tag", db.operation = "select"))]
    pub async fn search_by_prefix(&self, prefix: Option<&str>) -> Result<Vec<Tag>, AppError> {
        let tags = match prefix {
            Some(prefix) => {
                sqlx::query_as::<Sqlite, Tag>(
                    "SELECT id, name FROM tag WHERE name LIKE ? ESCAPE '\\' ORDER BY name LIMIT ?",
                )
                .bind(like_prefix(prefix))
                .bind(TAG_SEARCH_LIMIT)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<Sqlite, Tag>("SELECT id, name FROM tag ORDER BY name LIMIT ?")
                    .bind(TAG_SEARCH_LIMIT)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(tags)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tag", db.operation = "select"))]
    pub async fn list_all(&self) -> Result<Vec<Tag>, AppError> {
        let tags = sqlx::query_as::<Sqlite, Tag>("SELECT id, name FROM tag ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(tags)
    }

    /// Tags attached to a record, by name. Empty for unknown records.
    #[tracing::instrument(skip(self), fields(db.table = "image_tag", db.operation = "select", db.record_id = image_id))]
    pub async fn tags_for(&self, image_id: i64) -> Result<Vec<Tag>, AppError> {
        let tags = sqlx::query_as::<Sqlite, Tag>(
            r#"
            SELECT t.id, t.name
            FROM tag t
            JOIN image_tag it ON it.tag_id = t.id
            WHERE it.image_id = ?
            ORDER BY t.name
            "#,
        )
        .bind(image_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    /// Attach a tag to a record. Returns `false` when the pair already existed.
    pub async fn attach(&self, tag_id: i64, image_id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        let attached = self.attach_tx(&mut tx, tag_id, image_id).await?;
        tx.commit().await?;
        Ok(attached)
    }

    /// [`attach`](Self::attach) inside the caller's transaction.
    #[tracing::instrument(skip(self, tx), fields(db.table = "image_tag", db.operation = "insert"))]
    pub async fn attach_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        tag_id: i64,
        image_id: i64,
    ) -> Result<bool, AppError> {
        let image_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM image WHERE id = ?)")
                .bind(image_id)
                .fetch_one(&mut **tx)
                .await?;
        if !image_exists {
            return Err(AppError::NotFound(format!(
                "Media id {} does not exist",
                image_id
            )));
        }

        let tag_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tag WHERE id = ?)")
            .bind(tag_id)
            .fetch_one(&mut **tx)
            .await?;
        if !tag_exists {
            return Err(AppError::NotFound(format!("Tag id {} does not exist", tag_id)));
        }

        let result = sqlx::query("INSERT OR IGNORE INTO image_tag (image_id, tag_id) VALUES (?, ?)")
            .bind(image_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Remove the given tags from a record. Tags that are not attached are
    /// ignored. Returns how many associations were removed.
    #[tracing::instrument(skip(self), fields(db.table = "image_tag", db.operation = "delete", db.record_id = image_id))]
    pub async fn detach(&self, tag_ids: &[i64], image_id: i64) -> Result<u64, AppError> {
        let image_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM image WHERE id = ?)")
                .bind(image_id)
                .fetch_one(&self.pool)
                .await?;
        if !image_exists {
            return Err(AppError::NotFound(format!(
                "Media id {} does not exist",
                image_id
            )));
        }

        let ids = dedup_ids(tag_ids);
        if ids.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::<Sqlite>::new("DELETE FROM image_tag WHERE image_id = ");
        query.push_bind(image_id);
        query.push(" AND tag_id IN ");
        push_id_list(&mut query, &ids);

        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Delete tags and every association that uses them.
    ///
    /// All ids are checked first; if any is unknown nothing is deleted and
    /// `NotFound` names the missing ids.
    #[tracing::instrument(skip(self), fields(db.table = "tag", db.operation = "delete"))]
    pub async fn delete_many(&self, tag_ids: &[i64]) -> Result<u64, AppError> {
        let ids = dedup_ids(tag_ids);
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        let mut query = QueryBuilder::<Sqlite>::new("SELECT id FROM tag WHERE id IN ");
        push_id_list(&mut query, &ids);
        let found: Vec<i64> = query
            .build_query_scalar::<i64>()
            .fetch_all(&mut *tx)
            .await?;

        if found.len() != ids.len() {
            let missing: Vec<String> = ids
                .iter()
                .filter(|id| !found.contains(id))
                .map(|id| id.to_string())
                .collect();
            return Err(AppError::NotFound(format!(
                "Tag ids {} do not exist",
                missing.join(", ")
            )));
        }

        let mut query = QueryBuilder::<Sqlite>::new("DELETE FROM image_tag WHERE tag_id IN ");
        push_id_list(&mut query, &ids);
        query.build().execute(&mut *tx).await?;

        let mut query = QueryBuilder::<Sqlite>::new("DELETE FROM tag WHERE id IN ");
        push_id_list(&mut query, &ids);
        let result = query.build().execute(&mut *tx).await?;

        tx.commit().await?;

        tracing::info!(deleted = result.rows_affected(), "Tags deleted");
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support;

    async fn image(pool: &SqlitePool, n: u8) -> i64 {
        sqlx::query_scalar("INSERT INTO image (filename, is_video) VALUES (?, 0) RETURNING id")
            .bind(format!("{}.jpg", format!("{:02x}", n).repeat(32)))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[test]
    fn test_like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("ca"), "ca%");
        assert_eq!(like_prefix("50%_off"), "50\\%\\_off%");
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name() {
        let (_dir, pool) = test_support::pool().await;
        let repo = TagRepository::new(pool);

        let tag = repo.create("cat").await.unwrap();
        assert_eq!(tag.name, "cat");
        assert!(repo.create("cat").await.unwrap_err().is_already_exists());

        // Names are case-sensitive as stored.
        repo.create("Cat").await.unwrap();
        assert_eq!(repo.get_by_name("cat").await.unwrap(), Some(tag));
    }

    #[tokio::test]
    async fn test_search_by_prefix_is_case_insensitive_and_limited() {
        let (_dir, pool) = test_support::pool().await;
        let repo = TagRepository::new(pool);

        for name in ["Cat", "catalog", "dog", "ca_t"] {
            repo.create(name).await.unwrap();
        }
        for i in 0..12 {
            repo.create(&format!("z{:02}", i)).await.unwrap();
        }

        let names: Vec<String> = repo
            .search_by_prefix(Some("CA"))
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Cat", "ca_t", "catalog"]);

        let names: Vec<String> = repo
            .search_by_prefix(Some("ca_"))
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["ca_t"]);

        assert_eq!(repo.search_by_prefix(Some("z")).await.unwrap().len(), 10);
        assert_eq!(repo.search_by_prefix(None).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_attach_is_idempotent() {
        let (_dir, pool) = test_support::pool().await;
        let repo = TagRepository::new(pool.clone());
        let image_id = image(&pool, 1).await;
        let tag = repo.create("bw").await.unwrap();

        assert!(repo.attach(tag.id, image_id).await.unwrap());
        assert!(!repo.attach(tag.id, image_id).await.unwrap());
        assert_eq!(repo.tags_for(image_id).await.unwrap(), vec![tag]);
    }

    #[tokio::test]
    async fn test_attach_unknown_ids_not_found() {
        let (_dir, pool) = test_support::pool().await;
        let repo = TagRepository::new(pool.clone());
        let image_id = image(&pool, 1).await;
        let tag = repo.create("bw").await.unwrap();

        let err = repo.attach(tag.id, image_id + 100).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = repo.attach(tag.id + 100, image_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_detach_ignores_unattached_tags() {
        let (_dir, pool) = test_support::pool().await;
        let repo = TagRepository::new(pool.clone());
        let image_id = image(&pool, 1).await;
        let keep = repo.create("keep").await.unwrap();
        let gone = repo.create("gone").await.unwrap();
        let other = repo.create("other").await.unwrap();
        repo.attach(keep.id, image_id).await.unwrap();
        repo.attach(gone.id, image_id).await.unwrap();

        let removed = repo
            .detach(&[gone.id, other.id, 9999], image_id)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(repo.tags_for(image_id).await.unwrap(), vec![keep.clone()]);

        assert_eq!(repo.detach(&[other.id], image_id).await.unwrap(), 0);
        assert!(repo.detach(&[keep.id], image_id + 1).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_many_is_all_or_nothing() {
        let (_dir, pool) = test_support::pool().await;
        let repo = TagRepository::new(pool.clone());
        let image_id = image(&pool, 1).await;
        let a = repo.create("a").await.unwrap();
        let b = repo.create("b").await.unwrap();
        repo.attach(a.id, image_id).await.unwrap();
        repo.attach(b.id, image_id).await.unwrap();

        let err = repo.delete_many(&[a.id, 4242]).await.unwrap_err();
        assert_eq!(err.to_string(), "Not found: Tag ids 4242 do not exist");
        assert_eq!(repo.tags_for(image_id).await.unwrap().len(), 2);

        assert_eq!(repo.delete_many(&[a.id]).await.unwrap(), 1);
        assert_eq!(repo.tags_for(image_id).await.unwrap(), vec![b]);
        assert_eq!(repo.get_by_id(a.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_by_names_skips_unknown() {
        let (_dir, pool) = test_support::pool().await;
        let repo = TagRepository::new(pool);
        let cat = repo.create("cat").await.unwrap();

        let tags = repo
            .get_by_names(&["cat".to_string(), "dog".to_string()])
            .await
            .unwrap();
        assert_eq!(tags, vec![cat]);
        assert!(repo.get_by_names(&[]).await.unwrap().is_empty());
    }
}
