// src/services/activity_service.rs

use sqlx::{Connection, PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::{degrade_read, AppError},
    db::ActivityRepository,
    models::activity::{ActivityLog, EntityType, NewActivity},
};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

#[derive(Clone)]
pub struct ActivityService {
    pool: PgPool,
    repo: ActivityRepository,
}

impl ActivityService {
    pub fn new(pool: PgPool, repo: ActivityRepository) -> Self {
        Self { pool, repo }
    }

    /// Grava a entrada dentro de um SAVEPOINT da transação do chamador.
    ///
    /// Uma falha aqui desfaz só o savepoint e é registrada em log: a transição
    /// principal segue normalmente.
    pub async fn record(&self, conn: &mut PgConnection, entry: NewActivity) {
        let result: Result<(), AppError> = async {
            let mut savepoint = conn.begin().await?;
            self.repo.insert(&mut *savepoint, &entry).await?;
            savepoint.commit().await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            tracing::error!(
                entity_type = ?entry.entity_type,
                entity_id = %entry.entity_id,
                action = ?entry.action,
                "Falha ao gravar activity log (transição segue): {:?}",
                e
            );
        }
    }

    pub async fn list_by_department(
        &self,
        department_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ActivityLog>, AppError> {
        let (limit, offset) = page_bounds(limit, offset);
        degrade_read(
            self.repo
                .list_by_department(&self.pool, department_id, limit, offset)
                .await,
            "activity log",
        )
    }

    pub async fn list_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<Vec<ActivityLog>, AppError> {
        degrade_read(
            self.repo.list_by_entity(&self.pool, entity_type, entity_id).await,
            "activity log",
        )
    }
}

fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_are_clamped() {
        assert_eq!(page_bounds(None, None), (DEFAULT_PAGE_SIZE, 0));
        assert_eq!(page_bounds(Some(10_000), Some(-5)), (MAX_PAGE_SIZE, 0));
        assert_eq!(page_bounds(Some(0), Some(20)), (1, 20));
    }
}
