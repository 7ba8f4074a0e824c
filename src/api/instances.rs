//! Book instance (copy) endpoints, all restricted to `manage-catalog`

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{page::InstancePage, BookInstance, BookInstanceForm, InstanceQuery},
};

use super::{AuthenticatedUser, IdPath};

/// List copies in due-back order, optionally filtered by status
#[utoipa::path(
    get,
    path = "/instances/",
    tag = "instances",
    security(("bearer_auth" = [])),
    params(InstanceQuery),
    responses(
        (status = 200, description = "Page of copies", body = InstancePage),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing manage-catalog permission")
    )
)]
pub async fn list_instances(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<InstanceQuery>,
) -> AppResult<Json<InstancePage>> {
    let page = state.services.catalog.list_instances(&claims, &query).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/instances/{id}",
    tag = "instances",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Copy ID")),
    responses(
        (status = 200, description = "Copy details", body = BookInstance),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn get_instance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    IdPath(id): IdPath<Uuid>,
) -> AppResult<Json<BookInstance>> {
    let instance = state.services.catalog.get_instance(&claims, id).await?;
    Ok(Json(instance))
}

/// Register a copy; the id is generated unless supplied
#[utoipa::path(
    post,
    path = "/instances/create",
    tag = "instances",
    security(("bearer_auth" = [])),
    request_body = BookInstanceForm,
    responses(
        (status = 201, description = "Copy created", body = BookInstance),
        (status = 422, description = "Invalid input or unknown book")
    )
)]
pub async fn create_instance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(form): Json<BookInstanceForm>,
) -> AppResult<(StatusCode, Json<BookInstance>)> {
    let instance = state.services.inventory.create_instance(&claims, form).await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

#[utoipa::path(
    post,
    path = "/instances/{id}/update",
    tag = "instances",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Copy ID")),
    request_body = BookInstanceForm,
    responses(
        (status = 200, description = "Copy updated", body = BookInstance),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn update_instance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    IdPath(id): IdPath<Uuid>,
    Json(form): Json<BookInstanceForm>,
) -> AppResult<Json<BookInstance>> {
    let instance = state.services.inventory.update_instance(&claims, id, form).await?;
    Ok(Json(instance))
}

#[utoipa::path(
    post,
    path = "/instances/{id}/delete",
    tag = "instances",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Copy ID")),
    responses(
        (status = 204, description = "Copy deleted"),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn delete_instance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    IdPath(id): IdPath<Uuid>,
) -> AppResult<StatusCode> {
    state.services.inventory.delete_instance(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
