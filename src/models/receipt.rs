// src/models/receipt.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

// --- Enums (Mapeando o Postgres) ---

/// As 8 categorias de despesa aceitas. Qualquer outro valor falha na desserialização.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "expense_category")]
pub enum ExpenseCategory {
    #[serde(rename = "Meals and Entertainment")]
    #[sqlx(rename = "Meals and Entertainment")]
    MealsAndEntertainment,
    #[serde(rename = "Transport and Vehicle")]
    #[sqlx(rename = "Transport and Vehicle")]
    TransportAndVehicle,
    #[serde(rename = "Office Supplies")]
    #[sqlx(rename = "Office Supplies")]
    OfficeSupplies,
    #[serde(rename = "Travel and Accommodation")]
    #[sqlx(rename = "Travel and Accommodation")]
    TravelAndAccommodation,
    #[serde(rename = "Utilities and Telecommunications")]
    #[sqlx(rename = "Utilities and Telecommunications")]
    UtilitiesAndTelecommunications,
    #[serde(rename = "Training and Development")]
    #[sqlx(rename = "Training and Development")]
    TrainingAndDevelopment,
    #[serde(rename = "Repairs and Maintenance")]
    #[sqlx(rename = "Repairs and Maintenance")]
    RepairsAndMaintenance,
    #[serde(rename = "Other")]
    #[sqlx(rename = "Other")]
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 8] = [
        ExpenseCategory::MealsAndEntertainment,
        ExpenseCategory::TransportAndVehicle,
        ExpenseCategory::OfficeSupplies,
        ExpenseCategory::TravelAndAccommodation,
        ExpenseCategory::UtilitiesAndTelecommunications,
        ExpenseCategory::TrainingAndDevelopment,
        ExpenseCategory::RepairsAndMaintenance,
        ExpenseCategory::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ExpenseCategory::MealsAndEntertainment => "Meals and Entertainment",
            ExpenseCategory::TransportAndVehicle => "Transport and Vehicle",
            ExpenseCategory::OfficeSupplies => "Office Supplies",
            ExpenseCategory::TravelAndAccommodation => "Travel and Accommodation",
            ExpenseCategory::UtilitiesAndTelecommunications => "Utilities and Telecommunications",
            ExpenseCategory::TrainingAndDevelopment => "Training and Development",
            ExpenseCategory::RepairsAndMaintenance => "Repairs and Maintenance",
            ExpenseCategory::Other => "Other",
        }
    }

    /// Aceita o rótulo exato, ignorando maiúsculas e espaços extras.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "receipt_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Submitted,
    AdminApproved,
    HodApproved,
    Paid,
    Rejected,
}

/// Ações que movem um recibo na máquina de estados.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptTransition {
    AdminApprove,
    HodApprove,
    Disburse,
    Reject,
    Edit,
}

impl ReceiptTransition {
    pub fn verb(self) -> &'static str {
        match self {
            ReceiptTransition::AdminApprove => "admin_approve",
            ReceiptTransition::HodApprove => "hod_approve",
            ReceiptTransition::Disburse => "disburse",
            ReceiptTransition::Reject => "reject",
            ReceiptTransition::Edit => "edit",
        }
    }
}

impl ReceiptStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReceiptStatus::Submitted => "submitted",
            ReceiptStatus::AdminApproved => "admin_approved",
            ReceiptStatus::HodApproved => "hod_approved",
            ReceiptStatus::Paid => "paid",
            ReceiptStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReceiptStatus::Paid | ReceiptStatus::Rejected)
    }

    /// Dinheiro já "prometido" e ainda não reposto pelo financeiro.
    pub fn commits_float(self) -> bool {
        matches!(self, ReceiptStatus::AdminApproved | ReceiptStatus::HodApproved)
    }

    /// Tabela de transições. Retorna o estado destino ou `None` se a ação não se aplica.
    pub fn next(self, transition: ReceiptTransition) -> Option<ReceiptStatus> {
        use ReceiptStatus::*;
        use ReceiptTransition::*;

        match (self, transition) {
            (Submitted, AdminApprove) => Some(AdminApproved),
            (AdminApproved, HodApprove) => Some(HodApproved),
            (HodApproved, Disburse) => Some(Paid),
            (Submitted | AdminApproved | HodApproved, Reject) => Some(Rejected),
            (Submitted, Edit) => Some(Submitted),
            (Submitted, HodApprove | Disburse)
            | (AdminApproved, AdminApprove | Disburse | Edit)
            | (HodApproved, AdminApprove | HodApprove | Edit)
            | (Paid | Rejected, _) => None,
        }
    }

    pub fn apply(self, id: Uuid, transition: ReceiptTransition) -> Result<ReceiptStatus, AppError> {
        self.next(transition)
            .ok_or_else(|| AppError::invalid_transition("receipt", id, self, transition.verb()))
    }
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: Uuid,

    #[schema(example = "https://files.example.com/receipts/abc.jpg")]
    pub image_url: String,
    pub image_key: String,

    // Desnormalizados no momento do envio
    pub staff_id: Uuid,
    #[schema(example = "Tan Wei Ming")]
    pub staff_name: String,
    pub department_id: Uuid,
    #[schema(example = "Operations")]
    pub department_name: String,

    // Campos extraídos (ou corrigidos manualmente)
    #[schema(example = "Grab")]
    pub merchant_name: Option<String>,
    #[schema(value_type = Option<String>, format = Date, example = "2026-10-01")]
    pub transaction_date: Option<NaiveDate>,
    #[schema(example = "45.00")]
    pub amount_total: Option<Decimal>,
    #[schema(example = "3.93")]
    pub amount_gst: Option<Decimal>,
    pub category: Option<ExpenseCategory>,
    #[schema(example = "PRJ-2041")]
    pub project_code: Option<String>,

    // Anotações da IA
    #[schema(example = 92)]
    pub ai_confidence: i32,
    pub ai_reasoning: Option<String>,
    #[schema(example = json!(["Receipt too old"]))]
    pub ai_flags: Vec<String>,
    #[schema(value_type = Object)]
    pub ai_line_items: Value,

    pub status: ReceiptStatus,
    pub batch_id: Option<Uuid>,

    #[schema(example = "hod")]
    pub rejected_by: Option<String>,
    pub rejection_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub admin_approved_at: Option<DateTime<Utc>>,
    pub hod_approved_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Dados para inserir um recibo; sempre entra como `submitted`.
#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub image_url: String,
    pub image_key: String,
    pub staff_id: Uuid,
    pub staff_name: String,
    pub department_id: Uuid,
    pub department_name: String,
    pub merchant_name: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    pub amount_total: Option<Decimal>,
    pub amount_gst: Option<Decimal>,
    pub category: Option<ExpenseCategory>,
    pub project_code: Option<String>,
    pub ai_confidence: i32,
    pub ai_reasoning: Option<String>,
    pub ai_flags: Vec<String>,
    pub ai_line_items: Value,
}

/// Correções manuais permitidas enquanto o recibo está `submitted`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptCorrections {
    pub merchant_name: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub transaction_date: Option<NaiveDate>,
    pub amount_total: Option<Decimal>,
    pub amount_gst: Option<Decimal>,
    pub category: Option<ExpenseCategory>,
    pub project_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReceiptStatus::*;
    use ReceiptTransition::*;

    const ALL_STATUSES: [ReceiptStatus; 5] = [Submitted, AdminApproved, HodApproved, Paid, Rejected];
    const ALL_TRANSITIONS: [ReceiptTransition; 5] = [AdminApprove, HodApprove, Disburse, Reject, Edit];

    #[test]
    fn happy_path_reaches_paid() {
        let id = Uuid::new_v4();
        let status = Submitted
            .apply(id, AdminApprove)
            .and_then(|s| s.apply(id, HodApprove))
            .and_then(|s| s.apply(id, Disburse))
            .unwrap();
        assert_eq!(status, Paid);
    }

    #[test]
    fn every_pre_paid_state_can_be_rejected() {
        for status in [Submitted, AdminApproved, HodApproved] {
            assert_eq!(status.next(Reject), Some(Rejected));
        }
    }

    #[test]
    fn terminal_states_are_sticky() {
        for status in [Paid, Rejected] {
            assert!(status.is_terminal());
            for transition in ALL_TRANSITIONS {
                assert_eq!(status.next(transition), None, "{status} -> {transition:?}");
            }
        }
    }

    #[test]
    fn double_admin_approval_is_rejected() {
        let id = Uuid::new_v4();
        let err = AdminApproved.apply(id, AdminApprove).unwrap_err();
        match err {
            AppError::InvalidStateTransition { from, action, .. } => {
                assert_eq!(from, "admin_approved");
                assert_eq!(action, "admin_approve");
            }
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn only_submitted_receipts_are_editable() {
        for status in ALL_STATUSES {
            assert_eq!(status.next(Edit).is_some(), status == Submitted);
        }
    }

    #[test]
    fn float_window_is_admin_and_hod_approved() {
        let committed: Vec<_> = ALL_STATUSES.into_iter().filter(|s| s.commits_float()).collect();
        assert_eq!(committed, vec![AdminApproved, HodApproved]);
    }

    #[test]
    fn category_labels_round_trip_through_serde() {
        let json = serde_json::to_string(&ExpenseCategory::TransportAndVehicle).unwrap();
        assert_eq!(json, "\"Transport and Vehicle\"");
        assert!(serde_json::from_str::<ExpenseCategory>("\"Groceries\"").is_err());
        assert_eq!(
            ExpenseCategory::from_label(" office supplies "),
            Some(ExpenseCategory::OfficeSupplies)
        );
    }
}
