// src/models/batch.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{error::AppError, money::sum_amounts},
    models::receipt::{Receipt, ReceiptStatus, ReceiptTransition},
};

pub const DEFAULT_BATCH_REJECTION_REASON: &str = "rejected during batch approval";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "batch_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    PendingHod,
    PendingFinance,
    Paid,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchTransition {
    HodApprove,
    Disburse,
    Reject,
    Cancel,
}

impl BatchTransition {
    pub fn verb(self) -> &'static str {
        match self {
            BatchTransition::HodApprove => "hod_approve",
            BatchTransition::Disburse => "disburse",
            BatchTransition::Reject => "reject",
            BatchTransition::Cancel => "cancel",
        }
    }
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::PendingHod => "pending_hod",
            BatchStatus::PendingFinance => "pending_finance",
            BatchStatus::Paid => "paid",
            BatchStatus::Rejected => "rejected",
            BatchStatus::Cancelled => "cancelled",
        }
    }

    pub fn next(self, transition: BatchTransition) -> Option<BatchStatus> {
        use BatchStatus::*;
        use BatchTransition::*;

        match (self, transition) {
            (PendingHod, HodApprove) => Some(PendingFinance),
            (PendingFinance, Disburse) => Some(Paid),
            (PendingHod | PendingFinance, Reject) => Some(Rejected),
            (PendingHod, Cancel) => Some(Cancelled),
            (PendingHod, Disburse)
            | (PendingFinance, HodApprove | Cancel)
            | (Paid | Rejected | Cancelled, _) => None,
        }
    }

    pub fn apply(self, id: Uuid, transition: BatchTransition) -> Result<BatchStatus, AppError> {
        self.next(transition)
            .ok_or_else(|| AppError::invalid_transition("batch", id, self, transition.verb()))
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: Uuid,
    pub department_id: Uuid,

    // Derivados: sempre recalculados a partir dos recibos
    #[schema(example = "100.00")]
    pub total_amount: Decimal,
    #[schema(example = "8.26")]
    pub total_gst: Decimal,

    pub status: BatchStatus,
    #[schema(example = "Admin Operations")]
    pub created_by: Option<String>,

    pub created_at: DateTime<Utc>,
    pub hod_approved_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchDetail {
    #[serde(flatten)]
    pub header: Batch,
    pub receipts: Vec<Receipt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchTotals {
    pub total_amount: Decimal,
    pub total_gst: Decimal,
}

impl BatchTotals {
    /// Soma completa (não incremental) sobre os membros não rejeitados.
    pub fn from_members<'a, I>(members: I) -> Self
    where
        I: IntoIterator<Item = &'a Receipt>,
    {
        let live: Vec<&Receipt> = members
            .into_iter()
            .filter(|r| r.status != ReceiptStatus::Rejected)
            .collect();

        BatchTotals {
            total_amount: sum_amounts(live.iter().map(|r| r.amount_total)),
            total_gst: sum_amounts(live.iter().map(|r| r.amount_gst)),
        }
    }
}

/// O que uma aprovação do HOD vai fazer com cada membro do lote.
#[derive(Debug, Clone, PartialEq)]
pub struct HodApprovalPlan {
    pub rejections: Vec<(Uuid, String)>,
    pub approvals: Vec<Uuid>,
    pub totals: BatchTotals,
}

impl HodApprovalPlan {
    /// Valida os ids excluídos e separa rejeições de aprovações.
    ///
    /// Os totais consideram apenas os membros `admin_approved` que sobram,
    /// ou seja, o lote depois das rejeições.
    pub fn build(
        batch_id: Uuid,
        members: &[Receipt],
        rejected_ids: &[Uuid],
        reasons: &HashMap<Uuid, String>,
    ) -> Result<Self, AppError> {
        let by_id: HashMap<Uuid, &Receipt> = members.iter().map(|r| (r.id, r)).collect();

        let mut seen = HashSet::new();
        let mut rejections = Vec::new();
        for id in rejected_ids {
            if !seen.insert(*id) {
                continue;
            }
            let receipt = by_id.get(id).ok_or_else(|| {
                AppError::Validation(format!("Recibo {} não pertence ao lote {}", id, batch_id))
            })?;
            receipt.status.apply(receipt.id, ReceiptTransition::Reject)?;

            let reason = reasons
                .get(id)
                .map(|r| r.trim())
                .filter(|r| !r.is_empty())
                .unwrap_or(DEFAULT_BATCH_REJECTION_REASON)
                .to_string();
            rejections.push((*id, reason));
        }

        let remaining: Vec<&Receipt> = members
            .iter()
            .filter(|r| !seen.contains(&r.id) && r.status.next(ReceiptTransition::HodApprove).is_some())
            .collect();

        Ok(HodApprovalPlan {
            rejections,
            approvals: remaining.iter().map(|r| r.id).collect(),
            totals: BatchTotals::from_members(remaining.iter().copied()),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use std::str::FromStr;

    pub(crate) fn receipt(amount: &str, gst: &str, status: ReceiptStatus) -> Receipt {
        let now = Utc::now();
        Receipt {
            id: Uuid::new_v4(),
            image_url: "https://files.test/r.jpg".into(),
            image_key: "receipts/r.jpg".into(),
            staff_id: Uuid::new_v4(),
            staff_name: "Staff".into(),
            department_id: Uuid::nil(),
            department_name: "Operations".into(),
            merchant_name: Some("Merchant".into()),
            transaction_date: Some(now.date_naive()),
            amount_total: Some(Decimal::from_str(amount).unwrap()),
            amount_gst: Some(Decimal::from_str(gst).unwrap()),
            category: None,
            project_code: None,
            ai_confidence: 90,
            ai_reasoning: None,
            ai_flags: vec![],
            ai_line_items: json!([]),
            status,
            batch_id: None,
            rejected_by: None,
            rejection_reason: None,
            created_at: now,
            admin_approved_at: None,
            hod_approved_at: None,
            paid_at: None,
            rejected_at: None,
            updated_at: now,
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn hod_rejecting_one_line_recomputes_totals() {
        let members = vec![
            receipt("50.00", "4.13", ReceiptStatus::AdminApproved),
            receipt("30.00", "2.48", ReceiptStatus::AdminApproved),
            receipt("20.00", "1.65", ReceiptStatus::AdminApproved),
        ];
        let rejected = members[1].id;

        let plan = HodApprovalPlan::build(Uuid::new_v4(), &members, &[rejected], &HashMap::new()).unwrap();

        assert_eq!(plan.rejections, vec![(rejected, DEFAULT_BATCH_REJECTION_REASON.to_string())]);
        assert_eq!(plan.approvals, vec![members[0].id, members[2].id]);
        assert_eq!(plan.totals.total_amount, dec("70.00"));
        assert_eq!(plan.totals.total_gst, dec("5.78"));
    }

    #[test]
    fn rejecting_everything_leaves_a_zero_batch() {
        let members = vec![receipt("12.50", "1.03", ReceiptStatus::AdminApproved)];
        let plan = HodApprovalPlan::build(Uuid::new_v4(), &members, &[members[0].id], &HashMap::new()).unwrap();
        assert!(plan.approvals.is_empty());
        assert_eq!(plan.totals, BatchTotals::default());
    }

    #[test]
    fn supplied_reason_wins_and_duplicates_are_ignored() {
        let members = vec![receipt("10.00", "0.83", ReceiptStatus::AdminApproved)];
        let id = members[0].id;
        let reasons = HashMap::from([(id, "  no itemised receipt ".to_string())]);

        let plan = HodApprovalPlan::build(Uuid::new_v4(), &members, &[id, id], &reasons).unwrap();
        assert_eq!(plan.rejections, vec![(id, "no itemised receipt".to_string())]);
    }

    #[test]
    fn foreign_receipt_cannot_be_excluded() {
        let members = vec![receipt("10.00", "0.83", ReceiptStatus::AdminApproved)];
        let err = HodApprovalPlan::build(Uuid::new_v4(), &members, &[Uuid::new_v4()], &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn totals_skip_rejected_and_missing_amounts() {
        let mut missing = receipt("0", "0", ReceiptStatus::AdminApproved);
        missing.amount_total = None;
        missing.amount_gst = None;
        let members = vec![
            receipt("45.00", "3.93", ReceiptStatus::HodApproved),
            receipt("99.00", "8.17", ReceiptStatus::Rejected),
            missing,
        ];
        let totals = BatchTotals::from_members(&members);
        assert_eq!(totals.total_amount, dec("45.00"));
        assert_eq!(totals.total_gst, dec("3.93"));
        // Recalcular de novo sem mudanças dá o mesmo resultado
        assert_eq!(BatchTotals::from_members(&members), totals);
    }

    #[test]
    fn batch_state_machine() {
        let id = Uuid::new_v4();
        assert_eq!(BatchStatus::PendingHod.apply(id, BatchTransition::HodApprove).unwrap(), BatchStatus::PendingFinance);
        assert_eq!(BatchStatus::PendingFinance.apply(id, BatchTransition::Disburse).unwrap(), BatchStatus::Paid);
        assert!(BatchStatus::PendingHod.apply(id, BatchTransition::Disburse).is_err());
        assert!(BatchStatus::PendingFinance.apply(id, BatchTransition::Cancel).is_err());
        for terminal in [BatchStatus::Paid, BatchStatus::Rejected, BatchStatus::Cancelled] {
            for transition in [BatchTransition::HodApprove, BatchTransition::Disburse, BatchTransition::Reject, BatchTransition::Cancel] {
                assert!(terminal.apply(id, transition).is_err());
            }
        }
    }
}
