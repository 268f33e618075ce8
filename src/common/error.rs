use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Regras de negócio que não passam pelo `validator` (ex: motivo vazio)
    #[error("{0}")]
    Validation(String),

    #[error("Transição inválida: {entity} {id} está em '{from}', não é possível '{action}'")]
    InvalidStateTransition {
        entity: &'static str,
        id: Uuid,
        from: String,
        action: &'static str,
    },

    #[error("{0} não encontrado")]
    NotFound(String),

    // Nunca chega ao cliente no envio de recibos: vira o resultado padrão de extração
    #[error("Falha no serviço externo: {0}")]
    ExternalService(String),

    #[error("Falha no armazenamento de imagens: {0}")]
    ObjectStorage(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid_transition(
        entity: &'static str,
        id: Uuid,
        from: impl ToString,
        action: &'static str,
    ) -> Self {
        AppError::InvalidStateTransition {
            entity,
            id,
            from: from.to_string(),
            action,
        }
    }

    /// Banco fora do ar (pool esgotado, conexão recusada) em vez de erro de query.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(
            self,
            AppError::DatabaseError(
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            )
        )
    }
}

/// Leituras de painel: banco fora do ar vira lista vazia em vez de erro.
pub fn degrade_read<T: Default>(result: Result<T, AppError>, what: &str) -> Result<T, AppError> {
    match result {
        Err(e) if e.is_storage_unavailable() => {
            tracing::warn!("Leitura de {} degradada para vazio: {:?}", what, e);
            Ok(T::default())
        }
        other => other,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::Validation(ref message) => (StatusCode::BAD_REQUEST, message.clone()),
            ref e @ AppError::InvalidStateTransition { .. } => (StatusCode::CONFLICT, e.to_string()),
            ref e @ AppError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
            ref e @ (AppError::ExternalService(_) | AppError::ObjectStorage(_)) => {
                tracing::error!("Falha em dependência externa: {}", e);
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            ref e if e.is_storage_unavailable() => {
                tracing::error!("Banco de dados indisponível: {:?}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Banco de dados indisponível, tente novamente.".to_string(),
                )
            }
            ref e => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_workflow_errors_to_distinct_statuses() {
        let id = Uuid::new_v4();
        let conflict = AppError::invalid_transition("receipt", id, "paid", "reject").into_response();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let missing = AppError::NotFound(format!("Recibo {}", id)).into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let invalid = AppError::Validation("motivo obrigatório".into()).into_response();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unavailable_reads_degrade_to_empty() {
        let degraded: Vec<u32> =
            degrade_read(Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut)), "recibos").unwrap();
        assert!(degraded.is_empty());

        let kept = degrade_read::<Vec<u32>>(Err(AppError::NotFound("Lote".into())), "lotes");
        assert!(matches!(kept, Err(AppError::NotFound(_))));
    }

    #[test]
    fn pool_timeout_is_reported_as_unavailable() {
        let err = AppError::DatabaseError(sqlx::Error::PoolTimedOut);
        assert!(err.is_storage_unavailable());
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

        let row = AppError::DatabaseError(sqlx::Error::RowNotFound);
        assert!(!row.is_storage_unavailable());
    }
}
