// src/db/receipt_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::receipt::{NewReceipt, Receipt, ReceiptCorrections, ReceiptStatus},
};

#[derive(Clone, Default)]
pub struct ReceiptRepository;

impl ReceiptRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Receipt>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let receipt = sqlx::query_as::<_, Receipt>("SELECT * FROM receipts WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(receipt)
    }

    /// Trava a linha até o fim da transação.
    pub async fn lock_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Receipt>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let receipt = sqlx::query_as::<_, Receipt>("SELECT * FROM receipts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(receipt)
    }

    // Ordem por id para travar sempre na mesma sequência
    pub async fn lock_by_ids<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<Receipt>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let receipts = sqlx::query_as::<_, Receipt>(
            "SELECT * FROM receipts WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(ids)
        .fetch_all(executor)
        .await?;

        Ok(receipts)
    }

    pub async fn lock_batch_members<'e, E>(&self, executor: E, batch_id: Uuid) -> Result<Vec<Receipt>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let receipts = sqlx::query_as::<_, Receipt>(
            "SELECT * FROM receipts WHERE batch_id = $1 ORDER BY id FOR UPDATE",
        )
        .bind(batch_id)
        .fetch_all(executor)
        .await?;

        Ok(receipts)
    }

    pub async fn list_by_department<'e, E>(
        &self,
        executor: E,
        department_id: Uuid,
        status: Option<ReceiptStatus>,
    ) -> Result<Vec<Receipt>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let receipts = sqlx::query_as::<_, Receipt>(
            r#"
            SELECT * FROM receipts
            WHERE department_id = $1
              AND ($2::receipt_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(department_id)
        .bind(status)
        .fetch_all(executor)
        .await?;

        Ok(receipts)
    }

    pub async fn list_by_batch<'e, E>(&self, executor: E, batch_id: Uuid) -> Result<Vec<Receipt>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let receipts = sqlx::query_as::<_, Receipt>(
            "SELECT * FROM receipts WHERE batch_id = $1 ORDER BY created_at ASC",
        )
        .bind(batch_id)
        .fetch_all(executor)
        .await?;

        Ok(receipts)
    }

    pub async fn list_by_staff<'e, E>(&self, executor: E, staff_id: Uuid) -> Result<Vec<Receipt>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let receipts = sqlx::query_as::<_, Receipt>(
            "SELECT * FROM receipts WHERE staff_id = $1 ORDER BY created_at DESC",
        )
        .bind(staff_id)
        .fetch_all(executor)
        .await?;

        Ok(receipts)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn insert<'e, E>(&self, executor: E, new: &NewReceipt) -> Result<Receipt, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let receipt = sqlx::query_as::<_, Receipt>(
            r#"
            INSERT INTO receipts (
                image_url, image_key,
                staff_id, staff_name, department_id, department_name,
                merchant_name, transaction_date, amount_total, amount_gst,
                category, project_code,
                ai_confidence, ai_reasoning, ai_flags, ai_line_items
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(&new.image_url)
        .bind(&new.image_key)
        .bind(new.staff_id)
        .bind(&new.staff_name)
        .bind(new.department_id)
        .bind(&new.department_name)
        .bind(&new.merchant_name)
        .bind(new.transaction_date)
        .bind(new.amount_total)
        .bind(new.amount_gst)
        .bind(new.category)
        .bind(&new.project_code)
        .bind(new.ai_confidence)
        .bind(&new.ai_reasoning)
        .bind(&new.ai_flags)
        .bind(&new.ai_line_items)
        .fetch_one(executor)
        .await?;

        Ok(receipt)
    }

    // Campos omitidos mantêm o valor atual
    pub async fn apply_corrections<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        corrections: &ReceiptCorrections,
        flags: &[String],
    ) -> Result<Receipt, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let receipt = sqlx::query_as::<_, Receipt>(
            r#"
            UPDATE receipts
            SET merchant_name    = COALESCE($2, merchant_name),
                transaction_date = COALESCE($3, transaction_date),
                amount_total     = COALESCE($4, amount_total),
                amount_gst       = COALESCE($5, amount_gst),
                category         = COALESCE($6, category),
                project_code     = COALESCE($7, project_code),
                ai_flags         = $8,
                updated_at       = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&corrections.merchant_name)
        .bind(corrections.transaction_date)
        .bind(corrections.amount_total)
        .bind(corrections.amount_gst)
        .bind(corrections.category)
        .bind(&corrections.project_code)
        .bind(flags)
        .fetch_one(executor)
        .await?;

        Ok(receipt)
    }

    pub async fn mark_admin_approved<'e, E>(&self, executor: E, id: Uuid) -> Result<Receipt, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let receipt = sqlx::query_as::<_, Receipt>(
            r#"
            UPDATE receipts
            SET status = 'admin_approved', admin_approved_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'submitted'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(receipt)
    }

    /// Rejeição sempre desvincula do lote.
    pub async fn mark_rejected<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        rejected_by: &str,
        reason: &str,
    ) -> Result<Receipt, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let receipt = sqlx::query_as::<_, Receipt>(
            r#"
            UPDATE receipts
            SET status = 'rejected',
                batch_id = NULL,
                rejected_by = $2,
                rejection_reason = $3,
                rejected_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status IN ('submitted', 'admin_approved', 'hod_approved')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(rejected_by)
        .bind(reason)
        .fetch_one(executor)
        .await?;

        Ok(receipt)
    }

    pub async fn assign_batch<'e, E>(&self, executor: E, ids: &[Uuid], batch_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE receipts
            SET batch_id = $2, updated_at = NOW()
            WHERE id = ANY($1) AND status = 'admin_approved' AND batch_id IS NULL
            "#,
        )
        .bind(ids)
        .bind(batch_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn mark_hod_approved<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE receipts
            SET status = 'hod_approved', hod_approved_at = NOW(), updated_at = NOW()
            WHERE id = ANY($1) AND status = 'admin_approved'
            "#,
        )
        .bind(ids)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn mark_batch_paid<'e, E>(&self, executor: E, batch_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE receipts
            SET status = 'paid', paid_at = NOW(), updated_at = NOW()
            WHERE batch_id = $1 AND status = 'hod_approved'
            "#,
        )
        .bind(batch_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    // Usado quando o admin retira o lote: recibos continuam admin_approved
    pub async fn detach_batch<'e, E>(&self, executor: E, batch_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE receipts SET batch_id = NULL, updated_at = NOW() WHERE batch_id = $1",
        )
        .bind(batch_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
