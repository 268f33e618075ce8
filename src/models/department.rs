// src/models/department.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::money::round_money;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: Uuid,
    #[schema(example = "Operations")]
    pub name: String,
    /// Teto nominal de caixa; configuração, nunca mexido pelo fluxo.
    #[schema(example = "3500.00")]
    pub float_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: Uuid,
    #[schema(example = "Tan Wei Ming")]
    pub name: String,
    pub department_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Saldo do float. Nunca armazenado: sempre derivado dos recibos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FloatSummary {
    #[schema(example = "3500.00")]
    pub total_float: Decimal,
    #[schema(example = "45.00")]
    pub used_float: Decimal,
    /// Pode ficar negativo se o admin aprovar além do teto.
    #[schema(example = "3455.00")]
    pub remaining_float: Decimal,
}

impl FloatSummary {
    pub fn new(total_float: Decimal, used_float: Decimal) -> Self {
        let total_float = round_money(total_float);
        let used_float = round_money(used_float);
        FloatSummary {
            total_float,
            used_float,
            remaining_float: total_float - used_float,
        }
    }

    pub fn is_over_committed(&self) -> bool {
        self.remaining_float < Decimal::ZERO
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentWithFloat {
    #[serde(flatten)]
    pub department: Department,
    pub float: FloatSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn remaining_is_rounded_to_cents() {
        let summary = FloatSummary::new(dec("3500"), dec("65.004"));
        assert_eq!(summary.used_float, dec("65.00"));
        assert_eq!(summary.remaining_float, dec("3435.00"));
        assert!(!summary.is_over_committed());
    }

    #[test]
    fn over_approval_goes_negative_without_error() {
        let summary = FloatSummary::new(dec("3500.00"), dec("4000.00"));
        assert_eq!(summary.remaining_float, dec("-500.00"));
        assert!(summary.is_over_committed());
    }

    #[quickcheck]
    fn remaining_is_total_minus_used(total_cents: u32, used_cents: u32) -> bool {
        let total = Decimal::new(i64::from(total_cents), 2);
        let used = Decimal::new(i64::from(used_cents), 2);
        let summary = FloatSummary::new(total, used);
        summary.remaining_float == total - used && summary.is_over_committed() == (used > total)
    }
}
