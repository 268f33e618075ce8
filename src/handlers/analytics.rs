// src/handlers/analytics.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::analytics::{CategorySpend, DepartmentSpend, FlagSummary, GlCodingEntry, MonthlySpend},
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct AnalyticsFilter {
    /// Sem valor, agrega todos os departamentos
    pub department_id: Option<Uuid>,
    /// Só para a tendência mensal (padrão 6, máximo 24)
    pub months: Option<i32>,
}

// GET /api/analytics/categories
#[utoipa::path(
    get,
    path = "/api/analytics/categories",
    tag = "Analytics",
    params(AnalyticsFilter),
    responses(
        (status = 200, description = "Gasto por categoria (sem rejeitados)", body = Vec<CategorySpend>)
    )
)]
pub async fn spend_by_category(
    State(app_state): State<AppState>,
    Query(filter): Query<AnalyticsFilter>,
) -> Result<impl IntoResponse, AppError> {
    let data = app_state
        .analytics_service
        .spend_by_category(filter.department_id)
        .await?;
    Ok((StatusCode::OK, Json(data)))
}

// GET /api/analytics/monthly
#[utoipa::path(
    get,
    path = "/api/analytics/monthly",
    tag = "Analytics",
    params(AnalyticsFilter),
    responses(
        (status = 200, description = "Gasto mensal dos últimos N meses", body = Vec<MonthlySpend>)
    )
)]
pub async fn monthly_trend(
    State(app_state): State<AppState>,
    Query(filter): Query<AnalyticsFilter>,
) -> Result<impl IntoResponse, AppError> {
    let data = app_state
        .analytics_service
        .monthly_trend(filter.department_id, filter.months)
        .await?;
    Ok((StatusCode::OK, Json(data)))
}

// GET /api/analytics/departments
#[utoipa::path(
    get,
    path = "/api/analytics/departments",
    tag = "Analytics",
    responses(
        (status = 200, description = "Pago e em andamento por departamento", body = Vec<DepartmentSpend>)
    )
)]
pub async fn spend_by_department(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let data = app_state.analytics_service.spend_by_department().await?;
    Ok((StatusCode::OK, Json(data)))
}

// GET /api/analytics/flags
#[utoipa::path(
    get,
    path = "/api/analytics/flags",
    tag = "Analytics",
    params(AnalyticsFilter),
    responses(
        (status = 200, description = "Recibos com flags e confiança média da IA", body = FlagSummary)
    )
)]
pub async fn flag_summary(
    State(app_state): State<AppState>,
    Query(filter): Query<AnalyticsFilter>,
) -> Result<impl IntoResponse, AppError> {
    let data = app_state.analytics_service.flag_summary(filter.department_id).await?;
    Ok((StatusCode::OK, Json(data)))
}

// GET /api/batches/{id}/gl-coding
#[utoipa::path(
    get,
    path = "/api/batches/{id}/gl-coding",
    tag = "Analytics",
    params(("id" = Uuid, Path, description = "ID do lote")),
    responses(
        (status = 200, description = "Itens pagos do lote agrupados por categoria", body = Vec<GlCodingEntry>)
    )
)]
pub async fn batch_gl_coding(
    State(app_state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = app_state.analytics_service.gl_coding_for_batch(batch_id).await?;
    Ok((StatusCode::OK, Json(data)))
}
