// src/handlers/dashboard.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::dashboard::{DashboardQuery, DashboardView},
    services::inflight::DASHBOARD_SLOT,
};

// GET /api/dashboard
#[utoipa::path(
    get,
    path = "/api/dashboard",
    tag = "Dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Indicadores, séries e rankings do período", body = DashboardView),
        (status = 400, description = "Período personalizado sem datas válidas"),
        (status = 401, description = "Sem sessão")
    )
)]
pub async fn get_dashboard(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let now = chrono::Local::now().naive_local();

    let view = app_state
        .slots
        .run_latest(
            DASHBOARD_SLOT,
            std::time::Duration::ZERO,
            app_state.dashboard_service.get_dashboard(&query, now),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(view)))
}
