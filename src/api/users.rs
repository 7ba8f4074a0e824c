//! User management endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{CreateUser, User},
};

use super::{AuthenticatedUser, IdPath};

/// Create a new user
#[utoipa::path(
    post,
    path = "/users/create",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 403, description = "Missing manage-users permission"),
        (status = 422, description = "Invalid input or username taken")
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(user): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let created = state.services.auth.create_user(&claims, user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Delete a user; copies they borrowed keep no borrower
#[utoipa::path(
    post,
    path = "/users/{id}/delete",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Cannot delete own account"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    IdPath(id): IdPath<i32>,
) -> AppResult<StatusCode> {
    state.services.auth.delete_user(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
