//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, authors, books, dashboard, genres, health, instances, loans, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Local Library API",
        version = "1.0.0",
        description = "Catalog and loan management for a small library"
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Home
        dashboard::index,
        // Auth
        auth::login,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        // Genres
        genres::list_genres,
        genres::create_genre,
        genres::update_genre,
        genres::delete_genre,
        // Copies
        instances::list_instances,
        instances::get_instance,
        instances::create_instance,
        instances::update_instance,
        instances::delete_instance,
        // Loans
        loans::my_books,
        loans::all_borrowed,
        loans::renewal_form,
        loans::renew_book,
        // Users
        users::create_user,
        users::delete_user,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            // Catalog
            crate::services::catalog::Dashboard,
            crate::models::Genre,
            crate::models::GenreForm,
            crate::models::Author,
            crate::models::AuthorDetails,
            crate::models::AuthorForm,
            crate::models::Book,
            crate::models::BookDetails,
            crate::models::BookForm,
            crate::models::BookInstance,
            crate::models::BookInstanceForm,
            crate::models::LoanStatus,
            crate::models::page::BookPage,
            crate::models::page::AuthorPage,
            crate::models::page::InstancePage,
            // Loans
            loans::RenewRequest,
            loans::RenewalForm,
            // Users
            crate::models::User,
            crate::models::CreateUser,
            crate::models::Capability,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "catalog", description = "Home page counters"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "books", description = "Books"),
        (name = "authors", description = "Authors"),
        (name = "genres", description = "Genres"),
        (name = "instances", description = "Physical copies"),
        (name = "loans", description = "Borrowed copies and renewals"),
        (name = "users", description = "User management")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
