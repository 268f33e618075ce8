// src/models/analytics.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::receipt::ExpenseCategory;

// 1. Gasto por categoria
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategorySpend {
    pub category: Option<ExpenseCategory>,
    pub receipt_count: i64,
    pub total_amount: Decimal,
    pub total_gst: Decimal,
}

// 2. Tendência mensal
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySpend {
    #[schema(example = "2026-09")]
    pub month: String,
    pub receipt_count: i64,
    pub total_amount: Decimal,
}

// 3. Comparativo entre departamentos
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSpend {
    pub department_id: Uuid,
    pub department_name: String,
    pub receipt_count: i64,
    pub total_amount: Decimal,
    pub pending_amount: Decimal,
}

// 4. Codificação contábil (GL) de um lote pago
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GlCodingEntry {
    pub category: Option<ExpenseCategory>,
    pub line_count: i64,
    pub net_amount: Decimal,
    pub gst_amount: Decimal,
    pub gross_amount: Decimal,
}

// 5. Qualidade da extração
#[derive(Debug, Default, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlagSummary {
    pub total_receipts: i64,
    pub flagged_receipts: i64,
    pub low_confidence_receipts: i64,
    pub average_confidence: Option<Decimal>,
}
