use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dto::{CreateUserRequest, UserProfile};
use super::password::{hash_password, placeholder_password};
use crate::error::ApiError;
use crate::repo::{FileStore, NewUser, RepoError, RepoResult, User, UserRef};
use crate::state::AppState;

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Lookup keys for a caller-supplied identifier, in the order they are tried.
pub fn user_refs(raw: &str) -> Vec<UserRef> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    match Uuid::parse_str(raw) {
        Ok(id) => vec![UserRef::ById(id)],
        Err(_) => vec![
            UserRef::ByUsername(raw.to_string()),
            UserRef::ByEmail(raw.to_lowercase()),
        ],
    }
}

pub async fn resolve_user(store: &dyn FileStore, raw: &str) -> RepoResult<Option<User>> {
    for key in user_refs(raw) {
        if let Some(user) = store.find_user(&key).await? {
            debug!(user_id = %user.id, ?key, "user resolved");
            return Ok(Some(user));
        }
    }
    Ok(None)
}

/// Read-path resolution: an unknown identifier is a 404.
pub async fn require_user(store: &dyn FileStore, raw: &str) -> Result<User, ApiError> {
    resolve_user(store, raw)
        .await
        .map_err(ApiError::internal("Error resolving user"))?
        .ok_or_else(ApiError::user_not_found)
}

/// Write-path resolution: falls back to the supplied email, then creates the
/// user when auto-provisioning is enabled.
pub async fn resolve_or_provision(
    state: &AppState,
    raw: &str,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<User, ApiError> {
    let store = state.store.as_ref();
    let email = email.map(str::trim).filter(|e| !e.is_empty()).map(str::to_lowercase);

    let mut found = resolve_user(store, raw)
        .await
        .map_err(ApiError::internal("Error resolving user"))?;
    if found.is_none() {
        if let Some(email) = &email {
            found = store
                .find_user(&UserRef::ByEmail(email.clone()))
                .await
                .map_err(ApiError::internal("Error resolving user"))?;
        }
    }
    if let Some(user) = found {
        return Ok(user);
    }

    if !state.config.auto_provision_users {
        warn!(identifier = %raw, "unknown user and auto-provisioning is off");
        return Err(ApiError::user_not_found());
    }

    let raw = raw.trim();
    // placeholders must stay unique under concurrent provisioning
    let placeholder = Uuid::new_v4().simple().to_string();
    let username = if Uuid::parse_str(raw).is_err() {
        raw.to_string()
    } else {
        username
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("user_{}", placeholder))
    };
    let email = email.unwrap_or_else(|| format!("{}@app.local", placeholder));

    let password_hash = hash_password(&placeholder_password())
        .map_err(ApiError::internal("Error creating user"))?;

    let user = store
        .create_user(NewUser {
            username,
            email,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            RepoError::EmailTaken => {
                ApiError::Conflict("User with this email already exists".into())
            }
            other => ApiError::internal("Error creating user")(other),
        })?;

    info!(user_id = %user.id, username = %user.username, "user auto-provisioned");
    Ok(user)
}

pub async fn create_user(store: &dyn FileStore, req: CreateUserRequest) -> Result<User, ApiError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request(
            "username, email, and password are required",
        ));
    }
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Username must be at least {} characters",
            MIN_USERNAME_LEN
        )));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::bad_request("Invalid email"));
    }

    let taken = ApiError::Conflict("User with this email already exists".into());
    if store
        .find_user(&UserRef::ByEmail(email.clone()))
        .await
        .map_err(ApiError::internal("Error creating user"))?
        .is_some()
    {
        warn!(email = %email, "email already registered");
        return Err(taken);
    }

    let password_hash =
        hash_password(&req.password).map_err(ApiError::internal("Error creating user"))?;

    let user = store
        .create_user(NewUser {
            username,
            email,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            RepoError::EmailTaken => taken,
            other => ApiError::internal("Error creating user")(other),
        })?;

    info!(user_id = %user.id, email = %user.email, "user created");
    Ok(user)
}

pub async fn user_profile(store: &dyn FileStore, user: User) -> Result<UserProfile, ApiError> {
    let files = store
        .list_files(user.id)
        .await
        .map_err(ApiError::internal("Error fetching user"))?;
    Ok(UserProfile {
        id: user.id,
        username: user.username,
        email: user.email,
        files_count: files.len(),
        files,
        created_at: user.created_at,
        updated_at: user.updated_at,
    })
}
