// src/handlers/receipts.rs

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::actor::ActorContext,
    models::{
        activity::ActorRole,
        extraction::LineItem,
        receipt::{ExpenseCategory, Receipt, ReceiptCorrections, ReceiptStatus},
    },
    services::receipt_service::{ReceiptSubmission, UploadedReceipt},
};

fn parse_category(label: Option<&str>) -> Result<Option<ExpenseCategory>, AppError> {
    match label.map(str::trim).filter(|l| !l.is_empty()) {
        Some(label) => ExpenseCategory::from_label(label)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Categoria desconhecida: '{}'", label))),
        None => Ok(None),
    }
}

// =============================================================================
//  ÁREA 1: UPLOAD + EXTRAÇÃO
// =============================================================================

// Só para a documentação do multipart
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadReceiptForm {
    department_id: Uuid,
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

// POST /api/receipts/upload
#[utoipa::path(
    post,
    path = "/api/receipts/upload",
    tag = "Receipts",
    request_body(content_type = "multipart/form-data", content = UploadReceiptForm),
    responses(
        (status = 200, description = "Imagem guardada e leitura da IA para conferência", body = UploadedReceipt),
        (status = 400, description = "Arquivo ausente, vazio ou de tipo não suportado"),
        (status = 502, description = "Falha no armazenamento da imagem")
    )
)]
pub async fn upload_receipt(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut department_id: Option<Uuid> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("departmentId") => {
                let text = field.text().await.map_err(|e| AppError::Validation(e.body_text()))?;
                let id = Uuid::parse_str(text.trim())
                    .map_err(|_| AppError::Validation("departmentId inválido (não é um UUID).".into()))?;
                department_id = Some(id);
            }
            Some("file") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(|e| AppError::Validation(e.body_text()))?;
                file = Some((content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let department_id =
        department_id.ok_or_else(|| AppError::Validation("O campo departmentId é obrigatório.".into()))?;
    let (content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("O campo file é obrigatório.".into()))?;

    let uploaded = app_state
        .receipt_service
        .upload_and_extract(department_id, &content_type, bytes)
        .await?;

    Ok((StatusCode::OK, Json(uploaded)))
}

// =============================================================================
//  ÁREA 2: ENVIO E CORREÇÃO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceiptPayload {
    #[validate(length(min = 1, message = "required"))]
    pub image_url: String,

    #[validate(length(min = 1, message = "required"))]
    pub image_key: String,

    #[validate(length(min = 1, max = 120, message = "O nome do funcionário é obrigatório"))]
    #[schema(example = "Tan Wei Ming")]
    pub staff_name: String,

    pub department_id: Uuid,

    #[schema(example = "Grab")]
    pub merchant_name: Option<String>,

    #[schema(value_type = Option<String>, format = Date, example = "2026-10-06")]
    pub transaction_date: Option<NaiveDate>,

    #[schema(example = "45.00")]
    pub amount_total: Option<Decimal>,

    #[schema(example = "3.72")]
    pub amount_gst: Option<Decimal>,

    #[schema(example = "Transport and Vehicle")]
    pub category: Option<String>,

    pub project_code: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0, max = 100, message = "A confiança vai de 0 a 100"))]
    pub ai_confidence: i32,

    pub ai_reasoning: Option<String>,

    #[serde(default)]
    pub ai_flags: Vec<String>,

    #[serde(default)]
    pub ai_line_items: Vec<LineItem>,
}

// POST /api/receipts
#[utoipa::path(
    post,
    path = "/api/receipts",
    tag = "Receipts",
    request_body = CreateReceiptPayload,
    params(
        ("x-actor-role" = Option<String>, Header, description = "Papel de quem age (padrão: staff)"),
        ("x-actor-name" = Option<String>, Header, description = "Nome de quem age (padrão: o staff do recibo)")
    ),
    responses(
        (status = 201, description = "Recibo enviado (status submitted)", body = Receipt),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Departamento não encontrado")
    )
)]
pub async fn create_receipt(
    State(app_state): State<AppState>,
    actor: ActorContext,
    Json(payload): Json<CreateReceiptPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let category = parse_category(payload.category.as_deref())?;
    let mut actor = actor.or_role(ActorRole::Staff);
    if actor.name.is_none() {
        actor.name = Some(payload.staff_name.trim().to_string());
    }

    let submission = ReceiptSubmission {
        image_url: payload.image_url,
        image_key: payload.image_key,
        staff_name: payload.staff_name,
        department_id: payload.department_id,
        merchant_name: payload.merchant_name,
        transaction_date: payload.transaction_date,
        amount_total: payload.amount_total,
        amount_gst: payload.amount_gst,
        category,
        project_code: payload.project_code,
        ai_confidence: payload.ai_confidence,
        ai_reasoning: payload.ai_reasoning,
        ai_flags: payload.ai_flags,
        ai_line_items: payload.ai_line_items,
    };

    let receipt = app_state.receipt_service.create(submission, &actor).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReceiptPayload {
    pub merchant_name: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub transaction_date: Option<NaiveDate>,
    pub amount_total: Option<Decimal>,
    pub amount_gst: Option<Decimal>,
    #[schema(example = "Meals and Entertainment")]
    pub category: Option<String>,
    pub project_code: Option<String>,
}

// PATCH /api/receipts/{id}
#[utoipa::path(
    patch,
    path = "/api/receipts/{id}",
    tag = "Receipts",
    request_body = UpdateReceiptPayload,
    params(
        ("id" = Uuid, Path, description = "ID do recibo"),
        ("x-actor-role" = Option<String>, Header, description = "Papel de quem age (padrão: staff)"),
        ("x-actor-name" = Option<String>, Header, description = "Nome de quem age")
    ),
    responses(
        (status = 200, body = Receipt),
        (status = 404, description = "Recibo não encontrado"),
        (status = 409, description = "Recibo já saiu de submitted")
    )
)]
pub async fn update_receipt(
    State(app_state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateReceiptPayload>,
) -> Result<impl IntoResponse, AppError> {
    let corrections = ReceiptCorrections {
        category: parse_category(payload.category.as_deref())?,
        merchant_name: payload.merchant_name,
        transaction_date: payload.transaction_date,
        amount_total: payload.amount_total,
        amount_gst: payload.amount_gst,
        project_code: payload.project_code,
    };

    let receipt = app_state
        .receipt_service
        .update(id, corrections, &actor.or_role(ActorRole::Staff))
        .await?;

    Ok((StatusCode::OK, Json(receipt)))
}

// =============================================================================
//  ÁREA 3: TRANSIÇÕES
// =============================================================================

// POST /api/receipts/{id}/approve
#[utoipa::path(
    post,
    path = "/api/receipts/{id}/approve",
    tag = "Receipts",
    params(
        ("id" = Uuid, Path, description = "ID do recibo"),
        ("x-actor-role" = Option<String>, Header, description = "Papel de quem age (padrão: admin)"),
        ("x-actor-name" = Option<String>, Header, description = "Nome de quem age")
    ),
    responses(
        (status = 200, description = "Recibo admin_approved", body = Receipt),
        (status = 404, description = "Recibo não encontrado"),
        (status = 409, description = "Recibo não está em submitted")
    )
)]
pub async fn approve_receipt(
    State(app_state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = app_state
        .receipt_service
        .admin_approve(id, &actor.or_role(ActorRole::Admin))
        .await?;

    Ok((StatusCode::OK, Json(receipt)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectPayload {
    #[validate(length(min = 1, max = 500, message = "O motivo da rejeição é obrigatório"))]
    #[schema(example = "Receipt is not legible")]
    pub reason: String,
}

// POST /api/receipts/{id}/reject
#[utoipa::path(
    post,
    path = "/api/receipts/{id}/reject",
    tag = "Receipts",
    request_body = RejectPayload,
    params(
        ("id" = Uuid, Path, description = "ID do recibo"),
        ("x-actor-role" = Option<String>, Header, description = "Papel de quem age (padrão: admin)"),
        ("x-actor-name" = Option<String>, Header, description = "Nome de quem age")
    ),
    responses(
        (status = 200, description = "Recibo rejeitado e fora de qualquer lote", body = Receipt),
        (status = 400, description = "Motivo ausente"),
        (status = 404, description = "Recibo não encontrado"),
        (status = 409, description = "Recibo já está em estado terminal")
    )
)]
pub async fn reject_receipt(
    State(app_state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let receipt = app_state
        .receipt_service
        .reject(id, &actor.or_role(ActorRole::Admin), &payload.reason)
        .await?;

    Ok((StatusCode::OK, Json(receipt)))
}

// =============================================================================
//  ÁREA 4: LEITURA
// =============================================================================

// GET /api/receipts/{id}
#[utoipa::path(
    get,
    path = "/api/receipts/{id}",
    tag = "Receipts",
    params(("id" = Uuid, Path, description = "ID do recibo")),
    responses(
        (status = 200, body = Receipt),
        (status = 404, description = "Recibo não encontrado")
    )
)]
pub async fn get_receipt(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = app_state.receipt_service.get(id).await?;
    Ok((StatusCode::OK, Json(receipt)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReceiptFilter {
    /// Filtra por status (submitted, admin_approved, hod_approved, paid, rejected)
    pub status: Option<ReceiptStatus>,
}

// GET /api/departments/{id}/receipts
#[utoipa::path(
    get,
    path = "/api/departments/{id}/receipts",
    tag = "Receipts",
    params(
        ("id" = Uuid, Path, description = "ID do departamento"),
        ReceiptFilter
    ),
    responses(
        (status = 200, description = "Recibos do departamento, mais recentes primeiro", body = Vec<Receipt>)
    )
)]
pub async fn list_department_receipts(
    State(app_state): State<AppState>,
    Path(department_id): Path<Uuid>,
    Query(filter): Query<ReceiptFilter>,
) -> Result<impl IntoResponse, AppError> {
    let receipts = app_state
        .receipt_service
        .list_by_department(department_id, filter.status)
        .await?;

    Ok((StatusCode::OK, Json(receipts)))
}

// GET /api/staff/{id}/receipts
#[utoipa::path(
    get,
    path = "/api/staff/{id}/receipts",
    tag = "Receipts",
    params(("id" = Uuid, Path, description = "ID do funcionário")),
    responses(
        (status = 200, body = Vec<Receipt>)
    )
)]
pub async fn list_staff_receipts(
    State(app_state): State<AppState>,
    Path(staff_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let receipts = app_state.receipt_service.list_by_staff(staff_id).await?;
    Ok((StatusCode::OK, Json(receipts)))
}

// GET /api/batches/{id}/receipts
#[utoipa::path(
    get,
    path = "/api/batches/{id}/receipts",
    tag = "Receipts",
    params(("id" = Uuid, Path, description = "ID do lote")),
    responses(
        (status = 200, body = Vec<Receipt>)
    )
)]
pub async fn list_batch_receipts(
    State(app_state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let receipts = app_state.receipt_service.list_by_batch(batch_id).await?;
    Ok((StatusCode::OK, Json(receipts)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_parse_case_insensitively() {
        assert_eq!(
            parse_category(Some("transport and vehicle")).unwrap(),
            Some(ExpenseCategory::TransportAndVehicle)
        );
        assert_eq!(parse_category(Some("  ")).unwrap(), None);
        assert_eq!(parse_category(None).unwrap(), None);
    }

    #[test]
    fn unknown_category_is_a_validation_error() {
        let err = parse_category(Some("Groceries")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
