//! Loan endpoints: borrowed lists and due-date renewal

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{book_instance::today, page::InstancePage, BookInstance, PageQuery},
};

use super::{AuthenticatedUser, IdPath};

/// Where a successful renewal sends the librarian
pub const RENEW_REDIRECT: &str = "/allbooks/";

/// Renewal request body
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RenewRequest {
    /// New due date; three weeks from today when omitted
    #[serde(default)]
    pub renewal_date: Option<NaiveDate>,
}

/// Renewal form state: the copy, the date to show and any rejection reason
#[derive(Debug, Serialize, ToSchema)]
pub struct RenewalForm {
    pub instance: BookInstance,
    pub renewal_date: NaiveDate,
    /// Latest date that will be accepted
    pub latest_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Copies on loan to the current user
#[utoipa::path(
    get,
    path = "/mybooks/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Borrowed copies, soonest due first", body = InstancePage),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<InstancePage>> {
    let page = state.services.catalog.list_loans_for_user(&claims, query).await?;
    Ok(Json(page))
}

/// Every copy currently on loan
#[utoipa::path(
    get,
    path = "/allbooks/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "All borrowed copies, soonest due first", body = InstancePage),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing mark-returned permission")
    )
)]
pub async fn all_borrowed(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<InstancePage>> {
    let page = state.services.catalog.list_all_active_loans(&claims, query).await?;
    Ok(Json(page))
}

/// Renewal form with the proposed date
#[utoipa::path(
    get,
    path = "/book/{id}/renew/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Copy ID")),
    responses(
        (status = 200, description = "Renewal form", body = RenewalForm),
        (status = 403, description = "Missing mark-returned permission"),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn renewal_form(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    IdPath(id): IdPath<Uuid>,
) -> AppResult<Json<RenewalForm>> {
    let (instance, renewal_date) = state.services.loans.renewal_form(&claims, id).await?;
    Ok(Json(RenewalForm {
        instance,
        renewal_date,
        latest_date: state.services.loans.policy().latest_date(today()),
        error: None,
    }))
}

/// Submit a renewal; redirects to the all-borrowed list on success
#[utoipa::path(
    post,
    path = "/book/{id}/renew/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Copy ID")),
    request_body(content = RenewRequest, description = "Optional; an empty body renews for three weeks"),
    responses(
        (status = 303, description = "Renewed; redirect to /allbooks/"),
        (status = 400, description = "Malformed body"),
        (status = 403, description = "Missing mark-returned permission"),
        (status = 404, description = "Copy not found"),
        (status = 422, description = "Date rejected; form returned with the reason", body = RenewalForm)
    )
)]
pub async fn renew_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    IdPath(id): IdPath<Uuid>,
    body: Result<Json<RenewRequest>, JsonRejection>,
) -> AppResult<Response> {
    // A bare POST carries no content type and means "use the proposed date"
    let request = match body {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => RenewRequest::default(),
        Err(e) => return Err(AppError::BadRequest(e.body_text())),
    };
    let loans = &state.services.loans;

    match loans.renew(&claims, id, request.renewal_date).await {
        Ok(_) => Ok(Redirect::to(RENEW_REDIRECT).into_response()),
        Err(AppError::Validation(reason)) => {
            let (instance, proposed) = loans.renewal_form(&claims, id).await?;
            let form = RenewalForm {
                instance,
                renewal_date: request.renewal_date.unwrap_or(proposed),
                latest_date: loans.policy().latest_date(today()),
                error: Some(reason),
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(form)).into_response())
        }
        Err(e) => Err(e),
    }
}
