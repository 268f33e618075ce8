// src/middleware/actor.rs

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::AppError,
    models::activity::{Actor, ActorRole},
};

const ACTOR_ROLE_HEADER: &str = "x-actor-role";
const ACTOR_NAME_HEADER: &str = "x-actor-name";

// Sem autenticação: quem age é declarado nos cabeçalhos e só serve para
// o activity log. Nenhuma checagem de permissão acontece aqui.
#[derive(Debug, Clone, Default)]
pub struct ActorContext {
    pub role: Option<ActorRole>,
    pub name: Option<String>,
}

impl ActorContext {
    /// Papel do cabeçalho ou, sem ele, o papel implícito do endpoint.
    pub fn or_role(&self, fallback: ActorRole) -> Actor {
        Actor::new(self.role.unwrap_or(fallback), self.name.clone())
    }
}

impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let role = match header_text(parts, ACTOR_ROLE_HEADER) {
            Some(value) => Some(ActorRole::parse(&value).ok_or_else(|| {
                AppError::Validation(format!("Cabeçalho {} inválido: '{}'", ACTOR_ROLE_HEADER, value))
            })?),
            None => None,
        };
        let name = header_text(parts, ACTOR_NAME_HEADER);

        Ok(ActorContext { role, name })
    }
}

// Nomes chegam em UTF-8 cru ("José"); bytes inválidos viram U+FFFD em vez de 400.
fn header_text(parts: &Parts, header: &str) -> Option<String> {
    let value = parts.headers.get(header)?;
    let text = String::from_utf8_lossy(value.as_bytes());
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    async fn extract(headers: &[(&str, &str)]) -> Result<ActorContext, AppError> {
        let mut builder = Request::builder().uri("/");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        ActorContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn missing_headers_fall_back_to_endpoint_role() {
        let ctx = extract(&[]).await.unwrap();
        let actor = ctx.or_role(ActorRole::Hod);
        assert_eq!(actor.role, ActorRole::Hod);
        assert_eq!(actor.name, None);
    }

    #[tokio::test]
    async fn headers_override_the_fallback() {
        let ctx = extract(&[("x-actor-role", "finance"), ("x-actor-name", " Priya ")]).await.unwrap();
        let actor = ctx.or_role(ActorRole::Hod);
        assert_eq!(actor.role, ActorRole::Finance);
        assert_eq!(actor.name.as_deref(), Some("Priya"));
    }

    #[tokio::test]
    async fn non_ascii_names_are_kept() {
        let (mut parts, _) = Request::builder()
            .uri("/")
            .header("x-actor-name", HeaderValue::from_bytes("José Müller".as_bytes()).unwrap())
            .body(())
            .unwrap()
            .into_parts();
        let ctx = ActorContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.or_role(ActorRole::Admin).name.as_deref(), Some("José Müller"));
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let err = extract(&[("x-actor-role", "ceo")]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
