// src/models/activity.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "activity_entity_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Receipt,
    Batch,
    Department,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "actor_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Staff,
    Admin,
    Hod,
    Finance,
    System,
}

impl ActorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ActorRole::Staff => "staff",
            ActorRole::Admin => "admin",
            ActorRole::Hod => "hod",
            ActorRole::Finance => "finance",
            ActorRole::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "staff" => Some(ActorRole::Staff),
            "admin" => Some(ActorRole::Admin),
            "hod" => Some(ActorRole::Hod),
            "finance" => Some(ActorRole::Finance),
            "system" => Some(ActorRole::System),
            _ => None,
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "activity_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    AdminApproved,
    Rejected,
    BatchCreated,
    HodApproved,
    Paid,
    BatchRejected,
    BatchCancelled,
    FloatUpdated,
}

/// Quem está agindo. Sem autenticação: papel e nome chegam explícitos em cada chamada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub role: ActorRole,
    pub name: Option<String>,
}

impl Actor {
    pub fn new(role: ActorRole, name: Option<String>) -> Self {
        let name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        Actor { role, name }
    }

    /// Rótulo gravado em `rejected_by` e nas descrições.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({})", name, self.role),
            None => self.role.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub actor_role: ActorRole,
    pub actor_name: Option<String>,
    pub action: ActivityAction,
    #[schema(example = "Receipt approved by admin")]
    pub description: String,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
    pub department_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Uma entrada a ser anexada ao log (append-only).
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub department_id: Option<Uuid>,
    pub action: ActivityAction,
    pub actor: Actor,
    pub description: String,
    pub metadata: Option<Value>,
}

impl NewActivity {
    pub fn receipt(receipt_id: Uuid, department_id: Uuid, action: ActivityAction, actor: &Actor, description: impl Into<String>) -> Self {
        NewActivity {
            entity_type: EntityType::Receipt,
            entity_id: receipt_id,
            department_id: Some(department_id),
            action,
            actor: actor.clone(),
            description: description.into(),
            metadata: None,
        }
    }

    pub fn batch(batch_id: Uuid, department_id: Uuid, action: ActivityAction, actor: &Actor, description: impl Into<String>) -> Self {
        NewActivity {
            entity_type: EntityType::Batch,
            entity_id: batch_id,
            department_id: Some(department_id),
            action,
            actor: actor.clone(),
            description: description.into(),
            metadata: None,
        }
    }

    pub fn department(department_id: Uuid, action: ActivityAction, actor: &Actor, description: impl Into<String>) -> Self {
        NewActivity {
            entity_type: EntityType::Department,
            entity_id: department_id,
            department_id: Some(department_id),
            action,
            actor: actor.clone(),
            description: description.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_label_includes_role() {
        let hod = Actor::new(ActorRole::Hod, Some("  Lim Mei Ling ".into()));
        assert_eq!(hod.label(), "Lim Mei Ling (hod)");
        assert_eq!(Actor::new(ActorRole::Finance, Some("   ".into())).label(), "finance");
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!(ActorRole::parse("HOD"), Some(ActorRole::Hod));
        assert_eq!(ActorRole::parse("auditor"), None);
    }
}
