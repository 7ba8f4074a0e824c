//! API handlers for the Local Library endpoints

pub mod auth;
pub mod authors;
pub mod books;
pub mod dashboard;
pub mod genres;
pub mod health;
pub mod instances;
pub mod loans;
pub mod openapi;
pub mod users;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
    routing::{get, post},
    Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use serde::de::DeserializeOwned;

use crate::{error::AppError, models::UserClaims, AppState};

/// Path parameter extractor; an id that does not parse names no resource, so
/// it is reported as 404 with the usual error body
pub struct IdPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for IdPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::NotFound(e.body_text()))?;
        Ok(IdPath(value))
    }
}

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Authentication("Missing or malformed bearer token".to_string()))?;

        let claims = state.services.auth.verify_token(bearer.token())?;
        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Home
        .route("/", get(dashboard::index))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Books
        .route("/books/", get(books::list_books))
        .route("/book/:id", get(books::get_book))
        .route("/books/create", post(books::create_book))
        .route("/books/:id/update", post(books::update_book))
        .route("/books/:id/delete", post(books::delete_book))
        // Authors
        .route("/authors/", get(authors::list_authors))
        .route("/authors/:id", get(authors::get_author))
        .route("/authors/create", post(authors::create_author))
        .route("/authors/:id/update", post(authors::update_author))
        .route("/authors/:id/delete", post(authors::delete_author))
        // Genres
        .route("/genres/", get(genres::list_genres))
        .route("/genres/create", post(genres::create_genre))
        .route("/genres/:id/update", post(genres::update_genre))
        .route("/genres/:id/delete", post(genres::delete_genre))
        // Copies
        .route("/instances/", get(instances::list_instances))
        .route("/instances/:id", get(instances::get_instance))
        .route("/instances/create", post(instances::create_instance))
        .route("/instances/:id/update", post(instances::update_instance))
        .route("/instances/:id/delete", post(instances::delete_instance))
        // Loans
        .route("/mybooks/", get(loans::my_books))
        .route("/allbooks/", get(loans::all_borrowed))
        .route(
            "/book/:id/renew/",
            get(loans::renewal_form).post(loans::renew_book),
        )
        // Users
        .route("/users/create", post(users::create_user))
        .route("/users/:id/delete", post(users::delete_user))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
