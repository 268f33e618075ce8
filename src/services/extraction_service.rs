// src/services/extraction_service.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::{
    common::error::AppError,
    config::ExtractionSettings,
    models::{extraction::ExtractionResult, receipt::ExpenseCategory},
};

/// Serviço externo de leitura de recibos.
#[async_trait]
pub trait ReceiptExtractor: Send + Sync {
    async fn extract(&self, image_url: &str) -> Result<ExtractionResult, AppError>;
}

/// Nunca falha: qualquer erro vira o resultado padrão de preenchimento manual.
/// A regra de "Receipt too old" roda depois, independente da IA.
pub async fn extract_or_default(
    extractor: &dyn ReceiptExtractor,
    image_url: &str,
    today: NaiveDate,
) -> ExtractionResult {
    let mut result = match extractor.extract(image_url).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("Extração por IA falhou para {}: {}", image_url, e);
            ExtractionResult::failed(&e.to_string())
        }
    };
    result.apply_age_flag(today);
    result
}

// =========================================================================
//  CLIENTE OPENAI-COMPATÍVEL
// =========================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub struct OpenAiExtractor {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiExtractor {
    pub fn new(settings: &ExtractionSettings, api_key: String) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| AppError::ExternalService(format!("cliente HTTP: {}", e)))?;

        Ok(Self {
            client,
            api_url: settings.api_url.clone(),
            api_key,
            model: settings.model.clone(),
        })
    }

    fn prompt() -> String {
        let categories: Vec<&str> = ExpenseCategory::ALL.iter().map(|c| c.label()).collect();
        format!(
            "You read photographed expense receipts for a petty-cash claim system. \
             Reply with a single JSON object with the keys merchantName, transactionDate (YYYY-MM-DD), \
             amountTotal, amountGst, category, confidence (0-100), reasoning, flags (array of policy \
             concerns such as alcohol, missing GST number or illegible totals) and lineItems \
             (array of {{description, amount}}). category must be one of: {}. Use null for anything \
             you cannot read.",
            categories.join(", ")
        )
    }
}

#[async_trait]
impl ReceiptExtractor for OpenAiExtractor {
    async fn extract(&self, image_url: &str) -> Result<ExtractionResult, AppError> {
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": Self::prompt() },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": "Extract the receipt fields." },
                        { "type": "image_url", "image_url": { "url": image_url } }
                    ]
                }
            ]
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("requisição falhou: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ExternalService(format!("status HTTP {}", status)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("resposta malformada: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::ExternalService("resposta sem choices".into()))?;

        ExtractionResult::from_model_output(&content)
    }
}

/// Usado quando não há chave de API configurada.
pub struct DisabledExtractor;

#[async_trait]
impl ReceiptExtractor for DisabledExtractor {
    async fn extract(&self, _image_url: &str) -> Result<ExtractionResult, AppError> {
        Err(AppError::ExternalService("extração por IA não configurada".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::extraction::{EXTRACTION_FAILED_FLAG, RECEIPT_TOO_OLD_FLAG};
    use chrono::Duration as Days;

    struct FixedExtractor(ExtractionResult);

    #[async_trait]
    impl ReceiptExtractor for FixedExtractor {
        async fn extract(&self, _image_url: &str) -> Result<ExtractionResult, AppError> {
            Ok(self.0.clone())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[tokio::test]
    async fn failure_degrades_to_manual_entry() {
        let result = extract_or_default(&DisabledExtractor, "http://img", today()).await;
        assert_eq!(result.confidence, 0);
        assert_eq!(result.category, ExpenseCategory::Other);
        assert_eq!(result.flags, vec![EXTRACTION_FAILED_FLAG.to_string()]);
    }

    #[tokio::test]
    async fn old_receipts_are_flagged_after_extraction() {
        let mut extracted = ExtractionResult::from_model_output(r#"{"confidence": 90}"#).unwrap();
        extracted.transaction_date = Some(today() - Days::days(45));

        let result = extract_or_default(&FixedExtractor(extracted), "http://img", today()).await;
        assert_eq!(result.flags, vec![RECEIPT_TOO_OLD_FLAG.to_string()]);
    }

    #[test]
    fn malformed_chat_response_has_no_choices() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"error": "overloaded"}"#).unwrap();
        assert!(parsed.choices.is_empty());
    }
}
