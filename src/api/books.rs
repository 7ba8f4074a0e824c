//! Book endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{page::BookPage, Book, BookDetails, BookForm, PageQuery},
};

use super::{AuthenticatedUser, IdPath};

/// List books ordered by title
#[utoipa::path(
    get,
    path = "/books/",
    tag = "books",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of books", body = BookPage),
        (status = 422, description = "Invalid page parameters")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<BookPage>> {
    let page = state.services.catalog.list_books(query).await?;
    Ok(Json(page))
}

/// Book details with genres and copies
#[utoipa::path(
    get,
    path = "/book/{id}",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookDetails),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    IdPath(id): IdPath<i32>,
) -> AppResult<Json<BookDetails>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Create a book
#[utoipa::path(
    post,
    path = "/books/create",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = BookForm,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 403, description = "Missing manage-catalog permission"),
        (status = 422, description = "Invalid input or duplicate ISBN")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(form): Json<BookForm>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let book = state.services.inventory.create_book(&claims, form).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Update a book and replace its genres
#[utoipa::path(
    post,
    path = "/books/{id}/update",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = BookForm,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Invalid input or duplicate ISBN")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    IdPath(id): IdPath<i32>,
    Json(form): Json<BookForm>,
) -> AppResult<Json<Book>> {
    let book = state.services.inventory.update_book(&claims, id, form).await?;
    Ok(Json(book))
}

/// Delete a book that has no copies
#[utoipa::path(
    post,
    path = "/books/{id}/delete",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Copies of the book still exist")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    IdPath(id): IdPath<i32>,
) -> AppResult<StatusCode> {
    state.services.inventory.delete_book(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
