use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{CreateUserRequest, PublicUser, UserProfile};
use super::services;
use crate::{
    error::ApiError,
    response::{ApiResponse, Reply},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/create", post(create_user))
        .route("/users/:user_id", get(get_user))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Reply<PublicUser>, ApiError> {
    let Json(payload) = payload?;
    let user = services::create_user(state.store.as_ref(), payload).await?;

    Ok(Reply(
        StatusCode::CREATED,
        ApiResponse::ok(
            "User created successfully",
            PublicUser {
                id: user.id,
                username: user.username,
                email: user.email,
            },
        ),
    ))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Reply<UserProfile>, ApiError> {
    let user = services::require_user(state.store.as_ref(), &user_id).await?;
    let profile = services::user_profile(state.store.as_ref(), user).await?;
    Ok(Reply(
        StatusCode::OK,
        ApiResponse::ok("User retrieved successfully", profile),
    ))
}
