//! API integration tests
//!
//! Each test drives the full router over an in-memory store.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use locallibrary_server::{
    api::create_router,
    config::{AppConfig, BootstrapAdmin},
    models::{Capability, CreateUser},
    repository::Repository,
    AppState,
};

struct TestApp {
    router: Router,
    state: AppState,
    admin_token: String,
}

impl TestApp {
    async fn new() -> Self {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "integration-secret".to_string();

        let state = AppState::new(config, Repository::in_memory());
        state
            .services
            .auth
            .ensure_bootstrap_admin(&BootstrapAdmin {
                username: "admin".to_string(),
                password: "admin".to_string(),
            })
            .await
            .unwrap();
        let (admin_token, _) = state.services.auth.login("admin", "admin").await.unwrap();

        Self {
            router: create_router(state.clone()),
            state,
            admin_token,
        }
    }

    /// Create an account and return a token for it
    async fn user_token(&self, username: &str, capabilities: Vec<Capability>) -> String {
        let admin = self.state.services.auth.verify_token(&self.admin_token).unwrap();
        self.state
            .services
            .auth
            .create_user(
                &admin,
                CreateUser {
                    username: username.to_string(),
                    password: "password".to_string(),
                    first_name: String::new(),
                    last_name: String::new(),
                    capabilities,
                },
            )
            .await
            .unwrap();
        let (token, _) = self.state.services.auth.login(username, "password").await.unwrap();
        token
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Option<String>, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, location, body)
    }

    async fn admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, _, body) = self.send(method, uri, Some(&self.admin_token), body).await;
        (status, body)
    }

    async fn create_book(&self, title: &str, isbn: &str, author_id: Option<i64>) -> i64 {
        let (status, body) = self
            .admin(
                "POST",
                "/books/create",
                Some(json!({ "title": title, "isbn": isbn, "author_id": author_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }

    async fn create_copy(&self, book_id: i64, status: &str, due_back: Option<String>) -> String {
        let (code, body) = self
            .admin(
                "POST",
                "/instances/create",
                Some(json!({
                    "book_id": book_id,
                    "imprint": "First edition",
                    "status": status,
                    "due_back": due_back,
                })),
            )
            .await;
        assert_eq!(code, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }
}

fn days_from_today(days: i64) -> String {
    (Utc::now().date_naive() + Duration::days(days)).to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;
    let (status, _, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _, body) = app.send("GET", "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_login_and_me() {
    let app = TestApp::new().await;

    let (status, _, body) = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _, body) = app.send("GET", "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "admin");

    let (status, _, _) = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_borrowed_lists_require_login_and_permission() {
    let app = TestApp::new().await;
    let reader = app.user_token("reader", vec![]).await;

    let (status, _, _) = app.send("GET", "/mybooks/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = app.send("GET", "/mybooks/", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = app.send("GET", "/mybooks/", Some(&reader), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);

    let (status, _, _) = app.send("GET", "/allbooks/", Some(&reader), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_dashboard_counts() {
    let app = TestApp::new().await;
    let book = app.create_book("A Skull in Shadows", "9780000000001", None).await;
    app.create_book("Dune", "9780000000002", None).await;
    app.create_copy(book, "available", None).await;
    app.create_copy(book, "maintenance", None).await;
    app.admin("POST", "/genres/create", Some(json!({ "name": "Science Fiction" })))
        .await;

    let (status, _, body) = app.send("GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["num_books"], 2);
    assert_eq!(body["num_instances"], 2);
    assert_eq!(body["num_instances_available"], 1);
    assert_eq!(body["num_authors"], 0);
    assert_eq!(body["num_books_matching_title"], 1);
    assert_eq!(body["num_genres_matching"], 1);
}

#[tokio::test]
async fn test_renewal_flow() {
    let app = TestApp::new().await;
    let book = app.create_book("Dune", "9780441013593", None).await;
    let copy = app
        .create_copy(book, "on_loan", Some(days_from_today(1)))
        .await;
    let renew_uri = format!("/book/{}/renew/", copy);

    let (status, body) = app.admin("GET", &renew_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["renewal_date"], days_from_today(21));

    let past = days_from_today(-1);
    let (status, body) = app
        .admin("POST", &renew_uri, Some(json!({ "renewal_date": past })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["renewal_date"], past);
    assert!(body["error"].as_str().unwrap().contains("past"));

    let (status, body) = app
        .admin(
            "POST",
            &renew_uri,
            Some(json!({ "renewal_date": days_from_today(29) })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let (status, location, _) = app
        .send(
            "POST",
            &renew_uri,
            Some(&app.admin_token),
            Some(json!({ "renewal_date": days_from_today(14) })),
        )
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/allbooks/"));

    let (status, body) = app.admin("GET", "/allbooks/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["due_back"], days_from_today(14));
    assert_eq!(body["items"][0]["status"], "on_loan");
}

#[tokio::test]
async fn test_renewal_is_refused_without_permission() {
    let app = TestApp::new().await;
    let reader = app.user_token("reader", vec![]).await;
    let book = app.create_book("Dune", "9780441013593", None).await;
    let copy = app
        .create_copy(book, "on_loan", Some(days_from_today(1)))
        .await;

    let (status, _, _) = app
        .send(
            "POST",
            &format!("/book/{}/renew/", copy),
            Some(&reader),
            Some(json!({ "renewal_date": days_from_today(7) })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app.admin("GET", &format!("/instances/{}", copy), None).await;
    assert_eq!(body["due_back"], days_from_today(1));
}

#[tokio::test]
async fn test_book_with_copies_cannot_be_deleted() {
    let app = TestApp::new().await;
    let book = app.create_book("Dune", "9780441013593", None).await;
    app.create_copy(book, "available", None).await;

    let (status, body) = app
        .admin("POST", &format!("/books/{}/delete", book), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].is_string());

    let (status, _, _) = app.send("GET", &format!("/book/{}", book), None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_deleting_author_keeps_books() {
    let app = TestApp::new().await;
    let (status, author) = app
        .admin(
            "POST",
            "/authors/create",
            Some(json!({ "first_name": "Frank", "last_name": "Herbert" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let author_id = author["id"].as_i64().unwrap();
    let book = app.create_book("Dune", "9780441013593", Some(author_id)).await;

    let (_, _, details) = app
        .send("GET", &format!("/authors/{}", author_id), None, None)
        .await;
    assert_eq!(details["display_name"], "Herbert, Frank");
    assert_eq!(details["books"][0]["id"], book);

    let (status, _) = app
        .admin("POST", &format!("/authors/{}/delete", author_id), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, body) = app.send("GET", &format!("/book/{}", book), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["author_id"].is_null());
}

#[tokio::test]
async fn test_catalog_writes_require_permission() {
    let app = TestApp::new().await;
    let librarian = app.user_token("librarian", vec![Capability::MarkReturned]).await;

    let (status, _, _) = app
        .send(
            "POST",
            "/genres/create",
            Some(&librarian),
            Some(json!({ "name": "Poetry" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, _, genres) = app.send("GET", "/genres/", None, None).await;
    assert_eq!(genres, json!([]));
}

#[tokio::test]
async fn test_book_list_pagination() {
    let app = TestApp::new().await;
    for (i, title) in ["C", "A", "B"].iter().enumerate() {
        app.create_book(title, &format!("978000000001{}", i), None).await;
    }

    let (status, _, body) = app.send("GET", "/books/?page=2&per_page=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["items"][0]["title"], "C");

    let (status, _, _) = app.send("GET", "/books/?page=0", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_page_far_past_the_end_is_empty() {
    let app = TestApp::new().await;
    app.create_book("Dune", "9780441013593", None).await;

    let (status, _, body) = app
        .send("GET", &format!("/books/?page={}", i64::MAX), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"], json!([]));
}

#[tokio::test]
async fn test_renewal_without_body_uses_proposed_date() {
    let app = TestApp::new().await;
    let book = app.create_book("Dune", "9780441013593", None).await;
    let copy = app
        .create_copy(book, "on_loan", Some(days_from_today(1)))
        .await;

    let (status, location, _) = app
        .send(
            "POST",
            &format!("/book/{}/renew/", copy),
            Some(&app.admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/allbooks/"));

    let (_, body) = app.admin("GET", "/allbooks/", None).await;
    assert_eq!(body["items"][0]["due_back"], days_from_today(21));
}

#[tokio::test]
async fn test_malformed_ids_are_not_found() {
    let app = TestApp::new().await;

    let (status, _, body) = app.send("GET", "/book/abc", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].is_string());

    let (status, _) = app.admin("GET", "/book/not-a-uuid/renew/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.admin("POST", "/book/not-a-uuid/renew/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
