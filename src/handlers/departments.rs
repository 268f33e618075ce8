// src/handlers/departments.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::actor::ActorContext,
    models::{
        activity::ActorRole,
        department::{Department, DepartmentWithFloat, FloatSummary, Staff},
    },
};

// =============================================================================
//  DEPARTAMENTOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepartmentPayload {
    #[validate(length(min = 2, max = 100, message = "O nome deve ter entre 2 e 100 caracteres"))]
    #[schema(example = "Operations")]
    pub name: String,

    /// Sem valor, usa o float padrão configurado.
    #[schema(example = "3500.00")]
    pub float_amount: Option<Decimal>,
}

// POST /api/departments
#[utoipa::path(
    post,
    path = "/api/departments",
    tag = "Departments",
    request_body = CreateDepartmentPayload,
    responses(
        (status = 201, description = "Departamento criado", body = Department),
        (status = 400, description = "Dados inválidos ou nome repetido")
    )
)]
pub async fn create_department(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateDepartmentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let department = app_state
        .department_service
        .create(&payload.name, payload.float_amount)
        .await?;

    Ok((StatusCode::CREATED, Json(department)))
}

// GET /api/departments
#[utoipa::path(
    get,
    path = "/api/departments",
    tag = "Departments",
    responses(
        (status = 200, description = "Departamentos com o float de cada um", body = Vec<DepartmentWithFloat>)
    )
)]
pub async fn list_departments(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let departments = app_state.department_service.list_with_float().await?;
    Ok((StatusCode::OK, Json(departments)))
}

// GET /api/departments/{id}
#[utoipa::path(
    get,
    path = "/api/departments/{id}",
    tag = "Departments",
    params(("id" = Uuid, Path, description = "ID do departamento")),
    responses(
        (status = 200, body = Department),
        (status = 404, description = "Departamento não encontrado")
    )
)]
pub async fn get_department(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let department = app_state.department_service.find(id).await?;
    Ok((StatusCode::OK, Json(department)))
}

// GET /api/departments/{id}/float
#[utoipa::path(
    get,
    path = "/api/departments/{id}/float",
    tag = "Float",
    params(("id" = Uuid, Path, description = "ID do departamento")),
    responses(
        (status = 200, description = "Float total, usado e restante", body = FloatSummary),
        (status = 404, description = "Departamento não encontrado")
    )
)]
pub async fn get_float(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state.department_service.get_float(id).await?;
    Ok((StatusCode::OK, Json(summary)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFloatPayload {
    #[schema(example = "5000.00")]
    pub float_amount: Decimal,
}

// PUT /api/departments/{id}/float
#[utoipa::path(
    put,
    path = "/api/departments/{id}/float",
    tag = "Float",
    request_body = UpdateFloatPayload,
    params(
        ("id" = Uuid, Path, description = "ID do departamento"),
        ("x-actor-role" = Option<String>, Header, description = "Papel de quem age (padrão: admin)"),
        ("x-actor-name" = Option<String>, Header, description = "Nome de quem age")
    ),
    responses(
        (status = 200, description = "Float reconfigurado", body = Department),
        (status = 400, description = "Valor negativo"),
        (status = 404, description = "Departamento não encontrado")
    )
)]
pub async fn update_float(
    State(app_state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFloatPayload>,
) -> Result<impl IntoResponse, AppError> {
    let department = app_state
        .department_service
        .update_float(id, payload.float_amount, &actor.or_role(ActorRole::Admin))
        .await?;

    Ok((StatusCode::OK, Json(department)))
}

// =============================================================================
//  STAFF
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStaffPayload {
    #[validate(length(min = 1, max = 120, message = "O nome é obrigatório"))]
    #[schema(example = "Tan Wei Ming")]
    pub name: String,
}

// POST /api/departments/{id}/staff
#[utoipa::path(
    post,
    path = "/api/departments/{id}/staff",
    tag = "Staff",
    request_body = RegisterStaffPayload,
    params(("id" = Uuid, Path, description = "ID do departamento")),
    responses(
        (status = 200, description = "Funcionário existente ou recém-criado", body = Staff),
        (status = 404, description = "Departamento não encontrado")
    )
)]
pub async fn register_staff(
    State(app_state): State<AppState>,
    Path(department_id): Path<Uuid>,
    Json(payload): Json<RegisterStaffPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let staff = app_state
        .department_service
        .get_or_create_staff_checked(&payload.name, department_id)
        .await?;

    Ok((StatusCode::OK, Json(staff)))
}

// GET /api/departments/{id}/staff
#[utoipa::path(
    get,
    path = "/api/departments/{id}/staff",
    tag = "Staff",
    params(("id" = Uuid, Path, description = "ID do departamento")),
    responses(
        (status = 200, body = Vec<Staff>)
    )
)]
pub async fn list_staff(
    State(app_state): State<AppState>,
    Path(department_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let staff = app_state.department_service.list_staff(department_id).await?;
    Ok((StatusCode::OK, Json(staff)))
}
