// src/db/batch_repo.rs

use sqlx::{Executor, FromRow, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::batch::{Batch, BatchStatus, BatchTotals},
};

#[derive(FromRow)]
struct TotalsRow {
    total_amount: rust_decimal::Decimal,
    total_gst: rust_decimal::Decimal,
}

#[derive(Clone, Default)]
pub struct BatchRepository;

impl BatchRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        department_id: Uuid,
        created_by: Option<&str>,
    ) -> Result<Batch, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let batch = sqlx::query_as::<_, Batch>(
            r#"
            INSERT INTO batches (department_id, status, created_by)
            VALUES ($1, 'pending_hod', $2)
            RETURNING *
            "#,
        )
        .bind(department_id)
        .bind(created_by)
        .fetch_one(executor)
        .await?;

        Ok(batch)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Batch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let batch = sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(batch)
    }

    /// Exclusão mútua por lote: duas aprovações simultâneas não se intercalam.
    pub async fn lock_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Batch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let batch = sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(batch)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        department_id: Option<Uuid>,
        status: Option<BatchStatus>,
    ) -> Result<Vec<Batch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let batches = sqlx::query_as::<_, Batch>(
            r#"
            SELECT * FROM batches
            WHERE ($1::uuid IS NULL OR department_id = $1)
              AND ($2::batch_status IS NULL OR status = $2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(department_id)
        .bind(status)
        .fetch_all(executor)
        .await?;

        Ok(batches)
    }

    // Recalcula e atualiza em UMA query. Soma completa, nunca incremental.
    pub async fn recalculate_totals<'e, E>(&self, executor: E, id: Uuid) -> Result<BatchTotals, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, TotalsRow>(
            r#"
            UPDATE batches
            SET total_amount = (
                    SELECT COALESCE(SUM(amount_total), 0)
                    FROM receipts
                    WHERE receipts.batch_id = batches.id AND receipts.status <> 'rejected'
                ),
                total_gst = (
                    SELECT COALESCE(SUM(amount_gst), 0)
                    FROM receipts
                    WHERE receipts.batch_id = batches.id AND receipts.status <> 'rejected'
                ),
                updated_at = NOW()
            WHERE id = $1
            RETURNING total_amount, total_gst
            "#,
        )
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(BatchTotals {
            total_amount: row.total_amount,
            total_gst: row.total_gst,
        })
    }

    pub async fn mark_hod_approved<'e, E>(&self, executor: E, id: Uuid) -> Result<Batch, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let batch = sqlx::query_as::<_, Batch>(
            r#"
            UPDATE batches
            SET status = 'pending_finance', hod_approved_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(batch)
    }

    pub async fn mark_paid<'e, E>(&self, executor: E, id: Uuid) -> Result<Batch, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let batch = sqlx::query_as::<_, Batch>(
            r#"
            UPDATE batches
            SET status = 'paid', paid_at = NOW(), closed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(batch)
    }

    // Encerramento sem pagamento (rejected / cancelled)
    pub async fn mark_closed<'e, E>(&self, executor: E, id: Uuid, status: BatchStatus) -> Result<Batch, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let batch = sqlx::query_as::<_, Batch>(
            r#"
            UPDATE batches
            SET status = $2, closed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(executor)
        .await?;

        Ok(batch)
    }
}
