// src/models/extraction.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::{
    common::{error::AppError, money::round_money},
    models::receipt::ExpenseCategory,
};

pub const EXTRACTION_FAILED_FLAG: &str = "AI extraction failed";
pub const RECEIPT_TOO_OLD_FLAG: &str = "Receipt too old";
pub const MAX_RECEIPT_AGE_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[schema(example = "Taxi fare")]
    pub description: String,
    pub amount: Option<Decimal>,
}

/// Resultado do serviço de IA, já normalizado.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub merchant_name: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub transaction_date: Option<NaiveDate>,
    pub amount_total: Option<Decimal>,
    pub amount_gst: Option<Decimal>,
    pub category: ExpenseCategory,
    #[schema(example = 88)]
    pub confidence: i32,
    pub reasoning: String,
    pub flags: Vec<String>,
    pub line_items: Vec<LineItem>,
}

impl ExtractionResult {
    /// Substituto quando a IA falha: tudo nulo, staff preenche à mão.
    pub fn failed(cause: &str) -> Self {
        ExtractionResult {
            merchant_name: None,
            transaction_date: None,
            amount_total: None,
            amount_gst: None,
            category: ExpenseCategory::Other,
            confidence: 0,
            reasoning: format!(
                "Automatic extraction was unavailable ({}). Please enter the receipt details manually.",
                cause
            ),
            flags: vec![EXTRACTION_FAILED_FLAG.to_string()],
            line_items: Vec::new(),
        }
    }

    /// Interpreta o JSON devolvido pelo modelo. Campos ausentes ou malformados
    /// viram `None`; só um documento que não é objeto conta como falha.
    pub fn from_model_output(content: &str) -> Result<Self, AppError> {
        let raw: Value = serde_json::from_str(strip_code_fence(content))
            .map_err(|e| AppError::ExternalService(format!("resposta não é JSON: {}", e)))?;
        let obj = raw
            .as_object()
            .ok_or_else(|| AppError::ExternalService("resposta JSON não é um objeto".into()))?;

        let category = obj
            .get("category")
            .and_then(Value::as_str)
            .and_then(ExpenseCategory::from_label)
            .unwrap_or(ExpenseCategory::Other);

        let confidence = obj
            .get("confidence")
            .and_then(Value::as_f64)
            .map(|c| c.round().clamp(0.0, 100.0) as i32)
            .unwrap_or(0);

        let flags = obj
            .get("flags")
            .and_then(Value::as_array)
            .map(|flags| {
                flags
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let line_items = obj
            .get("lineItems")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let description = item.get("description").and_then(Value::as_str)?;
                        Some(LineItem {
                            description: description.to_string(),
                            amount: item.get("amount").and_then(decimal_from_value),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ExtractionResult {
            merchant_name: obj
                .get("merchantName")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from),
            transaction_date: obj
                .get("transactionDate")
                .and_then(Value::as_str)
                .and_then(parse_date),
            amount_total: obj.get("amountTotal").and_then(decimal_from_value),
            amount_gst: obj.get("amountGst").and_then(decimal_from_value),
            category,
            confidence,
            reasoning: obj
                .get("reasoning")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            flags,
            line_items,
        })
    }

    pub fn apply_age_flag(&mut self, today: NaiveDate) {
        apply_age_flag(&mut self.flags, self.transaction_date, today);
    }
}

/// Recalcula "Receipt too old" a partir da data efetiva: presente só quando
/// passaram mais de 30 dias. Sem data, ou com data futura, a flag sai.
pub fn apply_age_flag(flags: &mut Vec<String>, transaction_date: Option<NaiveDate>, today: NaiveDate) {
    let too_old = transaction_date.is_some_and(|date| (today - date).num_days() > MAX_RECEIPT_AGE_DAYS);

    flags.retain(|f| f != RECEIPT_TOO_OLD_FLAG);
    if too_old {
        flags.push(RECEIPT_TOO_OLD_FLAG.to_string());
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

fn decimal_from_value(value: &Value) -> Option<Decimal> {
    let parsed = match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => {
            let cleaned: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-').collect();
            Decimal::from_str(&cleaned).ok()
        }
        _ => None,
    }?;
    Some(round_money(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn flags_for(days_ago: i64) -> Vec<String> {
        let mut flags = Vec::new();
        apply_age_flag(&mut flags, Some(today() - Duration::days(days_ago)), today());
        flags
    }

    #[test]
    fn ten_day_old_receipt_is_not_flagged() {
        assert!(flags_for(10).is_empty());
    }

    #[test]
    fn forty_five_day_old_receipt_is_flagged() {
        assert_eq!(flags_for(45), vec![RECEIPT_TOO_OLD_FLAG.to_string()]);
    }

    #[test]
    fn boundary_is_strictly_more_than_thirty_days() {
        assert!(flags_for(30).is_empty());
        assert_eq!(flags_for(31).len(), 1);
    }

    #[test]
    fn future_dated_receipt_is_not_flagged_too_old() {
        assert!(flags_for(-20).is_empty());
    }

    #[test]
    fn age_flag_is_not_duplicated() {
        let mut flags = vec![RECEIPT_TOO_OLD_FLAG.to_string()];
        apply_age_flag(&mut flags, Some(today() - Duration::days(90)), today());
        assert_eq!(flags.len(), 1);
    }

    #[test]
    fn correcting_the_date_to_recent_clears_the_flag() {
        let mut flags = vec!["Alcohol purchase".to_string()];
        apply_age_flag(&mut flags, Some(today() - Duration::days(45)), today());
        assert!(flags.contains(&RECEIPT_TOO_OLD_FLAG.to_string()));

        apply_age_flag(&mut flags, Some(today() - Duration::days(10)), today());
        assert_eq!(flags, vec!["Alcohol purchase".to_string()]);
    }

    #[test]
    fn correcting_the_date_to_old_adds_the_flag() {
        let mut flags = flags_for(10);
        assert!(flags.is_empty());

        apply_age_flag(&mut flags, Some(today() - Duration::days(45)), today());
        assert_eq!(flags, vec![RECEIPT_TOO_OLD_FLAG.to_string()]);
    }

    #[test]
    fn missing_date_drops_a_stale_flag() {
        let mut flags = vec![RECEIPT_TOO_OLD_FLAG.to_string()];
        apply_age_flag(&mut flags, None, today());
        assert!(flags.is_empty());
    }

    #[test]
    fn parses_fenced_model_output() {
        let content = r#"```json
        {
            "merchantName": "ComfortDelGro",
            "transactionDate": "2026-10-10",
            "amountTotal": 45,
            "amountGst": "S$3.93",
            "category": "Transport and Vehicle",
            "confidence": 87.6,
            "reasoning": "Taxi receipt",
            "flags": ["Handwritten amount", ""],
            "lineItems": [{"description": "Fare", "amount": 45.0}, {"amount": 1}]
        }
        ```"#;

        let result = ExtractionResult::from_model_output(content).unwrap();
        assert_eq!(result.merchant_name.as_deref(), Some("ComfortDelGro"));
        assert_eq!(result.transaction_date, NaiveDate::from_ymd_opt(2026, 10, 10));
        assert_eq!(result.amount_total, Some(Decimal::from_str("45.00").unwrap()));
        assert_eq!(result.amount_gst, Some(Decimal::from_str("3.93").unwrap()));
        assert_eq!(result.category, ExpenseCategory::TransportAndVehicle);
        assert_eq!(result.confidence, 88);
        assert_eq!(result.flags, vec!["Handwritten amount".to_string()]);
        assert_eq!(result.line_items.len(), 1);
    }

    #[test]
    fn unknown_category_falls_back_to_other() {
        let result = ExtractionResult::from_model_output(r#"{"category": "Groceries", "confidence": 140}"#).unwrap();
        assert_eq!(result.category, ExpenseCategory::Other);
        assert_eq!(result.confidence, 100);
        assert!(result.amount_total.is_none());
    }

    #[test]
    fn malformed_output_is_an_external_failure() {
        let err = ExtractionResult::from_model_output("I could not read this receipt").unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
    }

    #[test]
    fn failed_result_is_all_null_and_flagged() {
        let result = ExtractionResult::failed("timeout");
        assert!(result.merchant_name.is_none() && result.amount_total.is_none());
        assert_eq!(result.category, ExpenseCategory::Other);
        assert_eq!(result.confidence, 0);
        assert_eq!(result.flags, vec![EXTRACTION_FAILED_FLAG.to_string()]);
        assert!(result.reasoning.contains("timeout"));
    }
}
