mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::FromRow;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Key a user can be looked up by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    ById(Uuid),
    /// Matched case-insensitively.
    ByUsername(String),
    /// Matched exactly against the stored (lowercased) email.
    ByEmail(String),
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub filename: String,
    pub file_url: String,
    pub file_type: String,
    pub file_size: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewFile {
    pub filename: String,
    pub file_url: String,
    pub file_type: String,
    pub file_size: i64,
    pub uploaded_at: OffsetDateTime,
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("email already registered")]
    EmailTaken,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence seam for users and their file records.
///
/// `list_files` returns newest-first by `uploaded_at`. `delete_file` only
/// removes a file owned by `user_id` and reports whether anything was removed.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn find_user(&self, key: &UserRef) -> RepoResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn list_files(&self, user_id: Uuid) -> RepoResult<Vec<FileRecord>>;
    async fn add_file(&self, user_id: Uuid, file: NewFile) -> RepoResult<FileRecord>;
    async fn delete_file(&self, user_id: Uuid, file_id: Uuid) -> RepoResult<bool>;
}
