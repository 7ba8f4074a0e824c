//! Genre endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{Genre, GenreForm},
};

use super::{AuthenticatedUser, IdPath};

/// List all genres
#[utoipa::path(
    get,
    path = "/genres/",
    tag = "genres",
    responses(
        (status = 200, description = "Genres ordered by name", body = Vec<Genre>)
    )
)]
pub async fn list_genres(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Genre>>> {
    let genres = state.services.catalog.list_genres().await?;
    Ok(Json(genres))
}

/// Create a genre
#[utoipa::path(
    post,
    path = "/genres/create",
    tag = "genres",
    security(("bearer_auth" = [])),
    request_body = GenreForm,
    responses(
        (status = 201, description = "Genre created", body = Genre),
        (status = 403, description = "Missing manage-catalog permission"),
        (status = 422, description = "Invalid input")
    )
)]
pub async fn create_genre(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(form): Json<GenreForm>,
) -> AppResult<(StatusCode, Json<Genre>)> {
    let genre = state.services.inventory.create_genre(&claims, form).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

/// Rename a genre
#[utoipa::path(
    post,
    path = "/genres/{id}/update",
    tag = "genres",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Genre ID")),
    request_body = GenreForm,
    responses(
        (status = 200, description = "Genre updated", body = Genre),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn update_genre(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    IdPath(id): IdPath<i32>,
    Json(form): Json<GenreForm>,
) -> AppResult<Json<Genre>> {
    let genre = state.services.inventory.update_genre(&claims, id, form).await?;
    Ok(Json(genre))
}

/// Delete a genre; books lose the genre but are kept
#[utoipa::path(
    post,
    path = "/genres/{id}/delete",
    tag = "genres",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Genre ID")),
    responses(
        (status = 204, description = "Genre deleted"),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn delete_genre(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    IdPath(id): IdPath<i32>,
) -> AppResult<StatusCode> {
    state.services.inventory.delete_genre(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
