use std::collections::BTreeMap;

use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{FileStats, RegisterFileRequest, RegisteredFile};
use crate::config::MAX_FILE_SIZE;
use crate::error::ApiError;
use crate::repo::{FileRecord, FileStore, NewFile};
use crate::state::AppState;
use crate::users::services::{require_user, resolve_or_provision, user_profile};

pub const DEFAULT_FILE_TYPE: &str = "unknown";
const RECENT_FILES: usize = 5;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

fn validate(req: &RegisterFileRequest) -> Result<NewFile, ApiError> {
    let filename = req.filename.trim();
    let file_url = req.file_url.trim();
    if req.user_id.trim().is_empty() || filename.is_empty() || file_url.is_empty() {
        return Err(ApiError::bad_request(
            "userId, fileUrl, and filename are required",
        ));
    }

    let file_size = req.file_size.unwrap_or(0);
    if file_size > MAX_FILE_SIZE {
        return Err(ApiError::bad_request("File size exceeds 100MB limit"));
    }
    if file_size < 0 {
        return Err(ApiError::bad_request("fileSize must not be negative"));
    }

    let file_type = req
        .file_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_FILE_TYPE);

    Ok(NewFile {
        filename: filename.to_string(),
        file_url: file_url.to_string(),
        file_type: file_type.to_string(),
        file_size,
        uploaded_at: OffsetDateTime::now_utc(),
    })
}

/// Attaches an already-uploaded object to its owner, creating the owner if
/// needed. Nothing is written when validation fails.
pub async fn register_file(
    state: &AppState,
    req: RegisterFileRequest,
) -> Result<RegisteredFile, ApiError> {
    let new_file = validate(&req)?;

    let user = resolve_or_provision(
        state,
        &req.user_id,
        req.username.as_deref(),
        req.email.as_deref(),
    )
    .await?;

    let file = state
        .store
        .add_file(user.id, new_file)
        .await
        .map_err(ApiError::internal("Error saving file URL"))?;
    info!(user_id = %user.id, file_id = %file.id, size = file.file_size, "file registered");

    let user = user_profile(state.store.as_ref(), user).await?;
    Ok(RegisteredFile { user, file })
}

pub async fn list_files(store: &dyn FileStore, raw_user: &str) -> Result<Vec<FileRecord>, ApiError> {
    let user = require_user(store, raw_user).await?;
    store
        .list_files(user.id)
        .await
        .map_err(ApiError::internal("Error fetching user files"))
}

pub async fn search_files(
    store: &dyn FileStore,
    raw_user: &str,
    query: Option<&str>,
) -> Result<Vec<FileRecord>, ApiError> {
    let user = require_user(store, raw_user).await?;
    let files = store
        .list_files(user.id)
        .await
        .map_err(ApiError::internal("Error searching files"))?;
    Ok(filter_by_name(files, query.unwrap_or_default()))
}

/// Case-insensitive substring match on the filename; keeps input order.
/// The query is used verbatim, surrounding whitespace included.
pub fn filter_by_name(files: Vec<FileRecord>, query: &str) -> Vec<FileRecord> {
    let needle = query.to_lowercase();
    files
        .into_iter()
        .filter(|f| f.filename.to_lowercase().contains(&needle))
        .collect()
}

pub async fn file_stats(store: &dyn FileStore, raw_user: &str) -> Result<FileStats, ApiError> {
    let user = require_user(store, raw_user).await?;
    let files = store
        .list_files(user.id)
        .await
        .map_err(ApiError::internal("Error fetching file stats"))?;
    Ok(summarize(files))
}

/// Aggregates a newest-first file list.
pub fn summarize(files: Vec<FileRecord>) -> FileStats {
    let total_size: i64 = files.iter().map(|f| f.file_size).sum();

    let mut file_types = BTreeMap::new();
    for f in &files {
        let kind = if f.file_type.is_empty() {
            DEFAULT_FILE_TYPE
        } else {
            f.file_type.as_str()
        };
        *file_types.entry(kind.to_string()).or_insert(0) += 1;
    }

    FileStats {
        total_files: files.len(),
        total_size,
        total_size_mb: format!("{:.2}", total_size as f64 / BYTES_PER_MB),
        file_types,
        recent_files: files.into_iter().take(RECENT_FILES).collect(),
    }
}

/// Deletes one of the user's files and returns what is left, newest-first.
pub async fn delete_file(
    store: &dyn FileStore,
    raw_user: &str,
    raw_file: &str,
) -> Result<Vec<FileRecord>, ApiError> {
    let user = require_user(store, raw_user).await?;
    let not_found = || ApiError::not_found("File not found");

    let file_id = Uuid::parse_str(raw_file.trim()).map_err(|_| not_found())?;
    let removed = store
        .delete_file(user.id, file_id)
        .await
        .map_err(ApiError::internal("Error deleting file"))?;
    if !removed {
        warn!(user_id = %user.id, %file_id, "delete of missing or foreign file");
        return Err(not_found());
    }
    info!(user_id = %user.id, %file_id, "file deleted");

    store
        .list_files(user.id)
        .await
        .map_err(ApiError::internal("Error deleting file"))
}
