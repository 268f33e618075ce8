// src/handlers/batches.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::receipts::RejectPayload,
    middleware::actor::ActorContext,
    models::{
        activity::ActorRole,
        batch::{Batch, BatchDetail, BatchStatus},
    },
};

// =============================================================================
//  ÁREA 1: CRIAÇÃO (admin)
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchPayload {
    pub department_id: Uuid,

    #[validate(length(min = 1, message = "Informe ao menos um recibo"))]
    pub receipt_ids: Vec<Uuid>,
}

// POST /api/batches
#[utoipa::path(
    post,
    path = "/api/batches",
    tag = "Batches",
    request_body = CreateBatchPayload,
    params(
        ("x-actor-role" = Option<String>, Header, description = "Papel de quem age (padrão: admin)"),
        ("x-actor-name" = Option<String>, Header, description = "Nome de quem age")
    ),
    responses(
        (status = 201, description = "Lote criado em pending_hod", body = BatchDetail),
        (status = 400, description = "Lista vazia ou recibo de outro departamento"),
        (status = 404, description = "Departamento ou recibo não encontrado"),
        (status = 409, description = "Recibo já em lote ou em estado que não permite")
    )
)]
pub async fn create_batch(
    State(app_state): State<AppState>,
    actor: ActorContext,
    Json(payload): Json<CreateBatchPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let batch = app_state
        .batch_service
        .create(payload.department_id, &payload.receipt_ids, &actor.or_role(ActorRole::Admin))
        .await?;

    Ok((StatusCode::CREATED, Json(batch)))
}

// POST /api/batches/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/batches/{id}/cancel",
    tag = "Batches",
    params(
        ("id" = Uuid, Path, description = "ID do lote"),
        ("x-actor-role" = Option<String>, Header, description = "Papel de quem age (padrão: admin)"),
        ("x-actor-name" = Option<String>, Header, description = "Nome de quem age")
    ),
    responses(
        (status = 200, description = "Lote retirado; recibos continuam admin_approved", body = BatchDetail),
        (status = 404, description = "Lote não encontrado"),
        (status = 409, description = "Lote já saiu de pending_hod")
    )
)]
pub async fn cancel_batch(
    State(app_state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let batch = app_state
        .batch_service
        .cancel(id, &actor.or_role(ActorRole::Admin))
        .await?;

    Ok((StatusCode::OK, Json(batch)))
}

// =============================================================================
//  ÁREA 2: APROVAÇÕES
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineRejection {
    pub receipt_id: Uuid,
    /// Sem motivo, usa "rejected during batch approval".
    #[schema(example = "Personal expense")]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HodApprovalPayload {
    /// Itens excluídos; o restante do lote é aprovado.
    #[serde(default)]
    pub rejections: Vec<LineRejection>,
}

impl HodApprovalPayload {
    fn split(self) -> (Vec<Uuid>, HashMap<Uuid, String>) {
        let mut ids = Vec::with_capacity(self.rejections.len());
        let mut reasons = HashMap::new();
        for line in self.rejections {
            ids.push(line.receipt_id);
            if let Some(reason) = line.reason {
                reasons.entry(line.receipt_id).or_insert(reason);
            }
        }
        (ids, reasons)
    }
}

// POST /api/batches/{id}/hod-approve
#[utoipa::path(
    post,
    path = "/api/batches/{id}/hod-approve",
    tag = "Batches",
    request_body = HodApprovalPayload,
    params(
        ("id" = Uuid, Path, description = "ID do lote"),
        ("x-actor-role" = Option<String>, Header, description = "Papel de quem age (padrão: hod)"),
        ("x-actor-name" = Option<String>, Header, description = "Nome de quem age")
    ),
    responses(
        (status = 200, description = "Lote em pending_finance com totais recalculados", body = BatchDetail),
        (status = 400, description = "Recibo excluído não pertence ao lote"),
        (status = 404, description = "Lote não encontrado"),
        (status = 409, description = "Lote não está em pending_hod")
    )
)]
pub async fn hod_approve_batch(
    State(app_state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
    payload: Option<Json<HodApprovalPayload>>,
) -> Result<impl IntoResponse, AppError> {
    let (rejected_ids, reasons) = payload.map(|Json(p)| p).unwrap_or_default().split();

    let batch = app_state
        .batch_service
        .hod_approve(id, &rejected_ids, &reasons, &actor.or_role(ActorRole::Hod))
        .await?;

    Ok((StatusCode::OK, Json(batch)))
}

// POST /api/batches/{id}/finance-approve
#[utoipa::path(
    post,
    path = "/api/batches/{id}/finance-approve",
    tag = "Batches",
    params(
        ("id" = Uuid, Path, description = "ID do lote"),
        ("x-actor-role" = Option<String>, Header, description = "Papel de quem age (padrão: finance)"),
        ("x-actor-name" = Option<String>, Header, description = "Nome de quem age")
    ),
    responses(
        (status = 200, description = "Lote e recibos pagos; float restaurado", body = BatchDetail),
        (status = 404, description = "Lote não encontrado"),
        (status = 409, description = "Lote não está em pending_finance")
    )
)]
pub async fn finance_approve_batch(
    State(app_state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let batch = app_state
        .batch_service
        .finance_approve(id, &actor.or_role(ActorRole::Finance))
        .await?;

    Ok((StatusCode::OK, Json(batch)))
}

// POST /api/batches/{id}/reject
#[utoipa::path(
    post,
    path = "/api/batches/{id}/reject",
    tag = "Batches",
    request_body = RejectPayload,
    params(
        ("id" = Uuid, Path, description = "ID do lote"),
        ("x-actor-role" = Option<String>, Header, description = "Papel de quem age (padrão: hod)"),
        ("x-actor-name" = Option<String>, Header, description = "Nome de quem age")
    ),
    responses(
        (status = 200, description = "Lote rejeitado; todos os recibos rejeitados", body = BatchDetail),
        (status = 400, description = "Motivo ausente"),
        (status = 404, description = "Lote não encontrado"),
        (status = 409, description = "Lote já fechado")
    )
)]
pub async fn reject_batch(
    State(app_state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let batch = app_state
        .batch_service
        .reject(id, &actor.or_role(ActorRole::Hod), &payload.reason)
        .await?;

    Ok((StatusCode::OK, Json(batch)))
}

// =============================================================================
//  ÁREA 3: LEITURA
// =============================================================================

// GET /api/batches/{id}
#[utoipa::path(
    get,
    path = "/api/batches/{id}",
    tag = "Batches",
    params(("id" = Uuid, Path, description = "ID do lote")),
    responses(
        (status = 200, description = "Lote com seus recibos", body = BatchDetail),
        (status = 404, description = "Lote não encontrado")
    )
)]
pub async fn get_batch(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let batch = app_state.batch_service.get(id).await?;
    Ok((StatusCode::OK, Json(batch)))
}

// GET /api/departments/{id}/batches/pending-hod
#[utoipa::path(
    get,
    path = "/api/departments/{id}/batches/pending-hod",
    tag = "Batches",
    params(("id" = Uuid, Path, description = "ID do departamento")),
    responses(
        (status = 200, description = "Fila do HOD", body = Vec<Batch>)
    )
)]
pub async fn list_pending_hod(
    State(app_state): State<AppState>,
    Path(department_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let batches = app_state.batch_service.list_pending_hod(department_id).await?;
    Ok((StatusCode::OK, Json(batches)))
}

// GET /api/batches/pending-finance
#[utoipa::path(
    get,
    path = "/api/batches/pending-finance",
    tag = "Batches",
    responses(
        (status = 200, description = "Fila do financeiro (todos os departamentos)", body = Vec<Batch>)
    )
)]
pub async fn list_pending_finance(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let batches = app_state.batch_service.list_pending_finance().await?;
    Ok((StatusCode::OK, Json(batches)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BatchFilter {
    /// pending_hod, pending_finance, paid, rejected ou cancelled
    pub status: Option<BatchStatus>,
}

// GET /api/departments/{id}/batches
#[utoipa::path(
    get,
    path = "/api/departments/{id}/batches",
    tag = "Batches",
    params(
        ("id" = Uuid, Path, description = "ID do departamento"),
        BatchFilter
    ),
    responses(
        (status = 200, body = Vec<Batch>)
    )
)]
pub async fn list_department_batches(
    State(app_state): State<AppState>,
    Path(department_id): Path<Uuid>,
    Query(filter): Query<BatchFilter>,
) -> Result<impl IntoResponse, AppError> {
    let batches = app_state
        .batch_service
        .list_by_department(department_id, filter.status)
        .await?;

    Ok((StatusCode::OK, Json(batches)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hod_payload_splits_ids_and_keeps_first_reason() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let payload: HodApprovalPayload = serde_json::from_value(serde_json::json!({
            "rejections": [
                { "receiptId": a, "reason": "Personal expense" },
                { "receiptId": b },
                { "receiptId": a, "reason": "ignored" }
            ]
        }))
        .unwrap();

        let (ids, reasons) = payload.split();
        assert_eq!(ids, vec![a, b, a]);
        assert_eq!(reasons.get(&a).map(String::as_str), Some("Personal expense"));
        assert!(!reasons.contains_key(&b));
    }

    #[test]
    fn empty_hod_payload_approves_everything() {
        let (ids, reasons) = HodApprovalPayload::default().split();
        assert!(ids.is_empty());
        assert!(reasons.is_empty());
    }
}
