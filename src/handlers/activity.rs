// src/handlers/activity.rs

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
    models::activity::{ActivityLog, EntityType},
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Page {
    /// Padrão 50, máximo 200
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// GET /api/departments/{id}/activity
#[utoipa::path(
    get,
    path = "/api/departments/{id}/activity",
    tag = "Activity",
    params(
        ("id" = Uuid, Path, description = "ID do departamento"),
        Page
    ),
    responses(
        (status = 200, description = "Histórico do departamento, mais recente primeiro", body = Vec<ActivityLog>)
    )
)]
pub async fn list_department_activity(
    State(app_state): State<AppState>,
    Path(department_id): Path<Uuid>,
    Query(page): Query<Page>,
) -> Result<impl IntoResponse, AppError> {
    let entries = app_state
        .activity_service
        .list_by_department(department_id, page.limit, page.offset)
        .await?;

    Ok((StatusCode::OK, Json(entries)))
}

// GET /api/activity/{entity_type}/{id}
#[utoipa::path(
    get,
    path = "/api/activity/{entity_type}/{id}",
    tag = "Activity",
    params(
        ("entity_type" = EntityType, Path, description = "receipt, batch ou department"),
        ("id" = Uuid, Path, description = "ID da entidade")
    ),
    responses(
        (status = 200, description = "Histórico da entidade em ordem cronológica", body = Vec<ActivityLog>)
    )
)]
pub async fn list_entity_activity(
    State(app_state): State<AppState>,
    Path((entity_type, entity_id)): Path<(EntityType, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let entries = app_state
        .activity_service
        .list_by_entity(entity_type, entity_id)
        .await?;

    Ok((StatusCode::OK, Json(entries)))
}
