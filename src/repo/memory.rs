use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{FileRecord, FileStore, NewFile, NewUser, RepoError, RepoResult, User, UserRef};

#[derive(Default)]
struct Inner {
    // insertion order, so username lookups return the oldest match
    users: Vec<User>,
    files: Vec<FileRecord>,
}

/// Process-local adapter used by tests and database-less runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn find_user(&self, key: &UserRef) -> RepoResult<Option<User>> {
        let inner = self.inner.read().await;
        let found = inner.users.iter().find(|u| match key {
            UserRef::ById(id) => u.id == *id,
            UserRef::ByUsername(name) => u.username.to_lowercase() == name.to_lowercase(),
            UserRef::ByEmail(email) => u.email == *email,
        });
        Ok(found.cloned())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(RepoError::EmailTaken);
        }
        let now = OffsetDateTime::now_utc();
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(created.clone());
        Ok(created)
    }

    async fn list_files(&self, user_id: Uuid) -> RepoResult<Vec<FileRecord>> {
        let inner = self.inner.read().await;
        let mut files: Vec<FileRecord> = inner
            .files
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(files)
    }

    async fn add_file(&self, user_id: Uuid, file: NewFile) -> RepoResult<FileRecord> {
        let mut inner = self.inner.write().await;
        let Some(owner) = inner.users.iter_mut().find(|u| u.id == user_id) else {
            return Err(RepoError::Backend(anyhow::anyhow!(
                "user {} does not exist",
                user_id
            )));
        };
        owner.updated_at = OffsetDateTime::now_utc();

        let record = FileRecord {
            id: Uuid::new_v4(),
            user_id,
            filename: file.filename,
            file_url: file.file_url,
            file_type: file.file_type,
            file_size: file.file_size,
            uploaded_at: file.uploaded_at,
        };
        inner.files.push(record.clone());
        Ok(record)
    }

    async fn delete_file(&self, user_id: Uuid, file_id: Uuid) -> RepoResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.files.len();
        inner
            .files
            .retain(|f| !(f.id == file_id && f.user_id == user_id));
        Ok(inner.files.len() != before)
    }
}
