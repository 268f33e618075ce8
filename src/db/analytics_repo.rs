// src/db/analytics_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::analytics::{CategorySpend, DepartmentSpend, FlagSummary, GlCodingEntry, MonthlySpend},
};

// Somente leitura. Recibos rejeitados ficam fora de todos os agregados.
#[derive(Clone, Default)]
pub struct AnalyticsRepository;

impl AnalyticsRepository {
    pub fn new() -> Self {
        Self
    }

    // 1. Gasto por categoria (pagos + em andamento)
    pub async fn spend_by_category<'e, E>(
        &self,
        executor: E,
        department_id: Option<Uuid>,
    ) -> Result<Vec<CategorySpend>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let data = sqlx::query_as::<_, CategorySpend>(
            r#"
            SELECT
                category,
                COUNT(*) AS receipt_count,
                COALESCE(SUM(amount_total), 0) AS total_amount,
                COALESCE(SUM(amount_gst), 0) AS total_gst
            FROM receipts
            WHERE status <> 'rejected'
              AND ($1::uuid IS NULL OR department_id = $1)
            GROUP BY category
            ORDER BY total_amount DESC
            "#,
        )
        .bind(department_id)
        .fetch_all(executor)
        .await?;

        Ok(data)
    }

    // 2. Tendência mensal (últimos N meses, pela data de envio)
    pub async fn monthly_trend<'e, E>(
        &self,
        executor: E,
        department_id: Option<Uuid>,
        months: i32,
    ) -> Result<Vec<MonthlySpend>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let data = sqlx::query_as::<_, MonthlySpend>(
            r#"
            SELECT
                to_char(date_trunc('month', created_at), 'YYYY-MM') AS month,
                COUNT(*) AS receipt_count,
                COALESCE(SUM(amount_total), 0) AS total_amount
            FROM receipts
            WHERE status <> 'rejected'
              AND ($1::uuid IS NULL OR department_id = $1)
              AND created_at >= date_trunc('month', NOW()) - make_interval(months => $2 - 1)
            GROUP BY 1
            ORDER BY 1 ASC
            "#,
        )
        .bind(department_id)
        .bind(months)
        .fetch_all(executor)
        .await?;

        Ok(data)
    }

    // 3. Comparativo entre departamentos
    pub async fn spend_by_department<'e, E>(&self, executor: E) -> Result<Vec<DepartmentSpend>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let data = sqlx::query_as::<_, DepartmentSpend>(
            r#"
            SELECT
                d.id AS department_id,
                d.name AS department_name,
                COUNT(r.id) AS receipt_count,
                COALESCE(SUM(r.amount_total) FILTER (WHERE r.status = 'paid'), 0) AS total_amount,
                COALESCE(SUM(r.amount_total) FILTER (WHERE r.status IN ('submitted', 'admin_approved', 'hod_approved')), 0) AS pending_amount
            FROM departments d
            LEFT JOIN receipts r ON r.department_id = d.id AND r.status <> 'rejected'
            GROUP BY d.id, d.name
            ORDER BY d.name ASC
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(data)
    }

    // 4. GL coding de um lote: itens pagos agrupados por categoria
    pub async fn gl_coding_for_batch<'e, E>(
        &self,
        executor: E,
        batch_id: Uuid,
    ) -> Result<Vec<GlCodingEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let data = sqlx::query_as::<_, GlCodingEntry>(
            r#"
            SELECT
                category,
                COUNT(*) AS line_count,
                COALESCE(SUM(amount_total - COALESCE(amount_gst, 0)), 0) AS net_amount,
                COALESCE(SUM(amount_gst), 0) AS gst_amount,
                COALESCE(SUM(amount_total), 0) AS gross_amount
            FROM receipts
            WHERE batch_id = $1 AND status = 'paid'
            GROUP BY category
            ORDER BY category
            "#,
        )
        .bind(batch_id)
        .fetch_all(executor)
        .await?;

        Ok(data)
    }

    // 5. Qualidade da extração (flags + confiança)
    pub async fn flag_summary<'e, E>(
        &self,
        executor: E,
        department_id: Option<Uuid>,
        low_confidence_threshold: i32,
    ) -> Result<FlagSummary, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let summary = sqlx::query_as::<_, FlagSummary>(
            r#"
            SELECT
                COUNT(*) AS total_receipts,
                COUNT(*) FILTER (WHERE cardinality(ai_flags) > 0) AS flagged_receipts,
                COUNT(*) FILTER (WHERE ai_confidence < $2) AS low_confidence_receipts,
                ROUND(AVG(ai_confidence), 1) AS average_confidence
            FROM receipts
            WHERE status <> 'rejected'
              AND ($1::uuid IS NULL OR department_id = $1)
            "#,
        )
        .bind(department_id)
        .bind(low_confidence_threshold)
        .fetch_one(executor)
        .await?;

        Ok(summary)
    }
}
