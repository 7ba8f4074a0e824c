//! Home page endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, services::catalog::Dashboard};

/// Catalog counters shown on the home page
#[utoipa::path(
    get,
    path = "/",
    tag = "catalog",
    responses(
        (status = 200, description = "Catalog counters", body = Dashboard)
    )
)]
pub async fn index(State(state): State<crate::AppState>) -> AppResult<Json<Dashboard>> {
    let dashboard = state.services.catalog.dashboard().await?;
    Ok(Json(dashboard))
}
