use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{FileRecord, FileStore, NewFile, NewUser, RepoError, RepoResult, User, UserRef};

const UNIQUE_VIOLATION: &str = "23505";

/// Relational adapter: `users` plus a `files` table keyed by `user_id`.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FileStore for PgStore {
    async fn find_user(&self, key: &UserRef) -> RepoResult<Option<User>> {
        let query = match key {
            UserRef::ById(id) => sqlx::query_as::<_, User>(
                r#"
                SELECT id, username, email, password_hash, created_at, updated_at
                  FROM users
                 WHERE id = $1
                "#,
            )
            .bind(*id),
            UserRef::ByUsername(name) => sqlx::query_as::<_, User>(
                r#"
                SELECT id, username, email, password_hash, created_at, updated_at
                  FROM users
                 WHERE lower(username) = lower($1)
                 ORDER BY created_at ASC
                 LIMIT 1
                "#,
            )
            .bind(name.clone()),
            UserRef::ByEmail(email) => sqlx::query_as::<_, User>(
                r#"
                SELECT id, username, email, password_hash, created_at, updated_at
                  FROM users
                 WHERE email = $1
                "#,
            )
            .bind(email.clone()),
        };

        let user = query
            .fetch_optional(&self.db)
            .await
            .context("find user")?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            let unique = e
                .as_database_error()
                .and_then(|d| d.code())
                .is_some_and(|code| code == UNIQUE_VIOLATION);
            if unique {
                RepoError::EmailTaken
            } else {
                RepoError::Backend(anyhow::Error::new(e).context("insert user"))
            }
        })?;
        Ok(created)
    }

    async fn list_files(&self, user_id: Uuid) -> RepoResult<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT id, user_id, filename, file_url, file_type, file_size, uploaded_at
              FROM files
             WHERE user_id = $1
             ORDER BY uploaded_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list files by user")?;
        Ok(rows)
    }

    async fn add_file(&self, user_id: Uuid, file: NewFile) -> RepoResult<FileRecord> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let row = sqlx::query_as::<_, FileRecord>(
            r#"
            INSERT INTO files (id, user_id, filename, file_url, file_type, file_size, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, filename, file_url, file_type, file_size, uploaded_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&file.filename)
        .bind(&file.file_url)
        .bind(&file.file_type)
        .bind(file.file_size)
        .bind(file.uploaded_at)
        .fetch_one(&mut *tx)
        .await
        .context("insert file")?;

        sqlx::query("UPDATE users SET updated_at = now() WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("touch user")?;

        tx.commit().await.context("commit tx")?;
        Ok(row)
    }

    async fn delete_file(&self, user_id: Uuid, file_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1 AND user_id = $2")
            .bind(file_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete file")?;
        Ok(result.rows_affected() > 0)
    }
}
