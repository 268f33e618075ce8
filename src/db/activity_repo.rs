// src/db/activity_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::activity::{ActivityLog, EntityType, NewActivity},
};

// Append-only: não existe UPDATE nem DELETE aqui.
#[derive(Clone, Default)]
pub struct ActivityRepository;

impl ActivityRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert<'e, E>(&self, executor: E, entry: &NewActivity) -> Result<ActivityLog, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let log = sqlx::query_as::<_, ActivityLog>(
            r#"
            INSERT INTO activity_logs (
                entity_type, entity_id, actor_role, actor_name,
                action, description, metadata, department_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.actor.role)
        .bind(&entry.actor.name)
        .bind(entry.action)
        .bind(&entry.description)
        .bind(&entry.metadata)
        .bind(entry.department_id)
        .fetch_one(executor)
        .await?;

        Ok(log)
    }

    pub async fn list_by_department<'e, E>(
        &self,
        executor: E,
        department_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActivityLog>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let logs = sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT * FROM activity_logs
            WHERE department_id = $1
            ORDER BY created_at DESC, seq DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(department_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

        Ok(logs)
    }

    pub async fn list_by_entity<'e, E>(
        &self,
        executor: E,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<Vec<ActivityLog>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let logs = sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT * FROM activity_logs
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at DESC, seq DESC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(executor)
        .await?;

        Ok(logs)
    }
}
