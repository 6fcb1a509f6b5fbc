use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{FileStats, RegisterFileRequest, RegisteredFile, SearchQuery};
use super::services;
use crate::{
    error::ApiError,
    repo::FileRecord,
    response::{ApiResponse, Reply},
    state::AppState,
};

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/files/upload-url", post(register_file_url))
        .route("/files/user/:user_id/files/:file_id", delete(delete_user_file))
}

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/files/user/:user_id/files", get(list_user_files))
        .route("/files/user/:user_id/search", get(search_user_files))
        .route("/files/user/:user_id/stats", get(file_stats))
}

#[instrument(skip(state, payload))]
pub async fn register_file_url(
    State(state): State<AppState>,
    payload: Result<Json<RegisterFileRequest>, JsonRejection>,
) -> Result<Reply<RegisteredFile>, ApiError> {
    let Json(payload) = payload?;
    let registered = services::register_file(&state, payload).await?;
    Ok(Reply(
        StatusCode::CREATED,
        ApiResponse::ok("File URL saved successfully", registered),
    ))
}

#[instrument(skip(state))]
pub async fn list_user_files(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Reply<Vec<FileRecord>>, ApiError> {
    let files = services::list_files(state.store.as_ref(), &user_id).await?;
    let count = files.len();
    Ok(Reply(
        StatusCode::OK,
        ApiResponse::ok("Files retrieved successfully", files).with_count(count),
    ))
}

#[instrument(skip(state))]
pub async fn search_user_files(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Reply<Vec<FileRecord>>, ApiError> {
    let Query(query) = query?;
    let files =
        services::search_files(state.store.as_ref(), &user_id, query.query.as_deref()).await?;
    let count = files.len();
    Ok(Reply(
        StatusCode::OK,
        ApiResponse::ok("Search completed successfully", files).with_count(count),
    ))
}

#[instrument(skip(state))]
pub async fn file_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Reply<FileStats>, ApiError> {
    let stats = services::file_stats(state.store.as_ref(), &user_id).await?;
    Ok(Reply(
        StatusCode::OK,
        ApiResponse::ok("File statistics retrieved successfully", stats),
    ))
}

#[instrument(skip(state))]
pub async fn delete_user_file(
    State(state): State<AppState>,
    Path((user_id, file_id)): Path<(String, String)>,
) -> Result<Reply<Vec<FileRecord>>, ApiError> {
    let files = services::delete_file(state.store.as_ref(), &user_id, &file_id).await?;
    let count = files.len();
    Ok(Reply(
        StatusCode::OK,
        ApiResponse::ok("File deleted successfully", files).with_count(count),
    ))
}
