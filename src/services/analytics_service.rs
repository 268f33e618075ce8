// src/services/analytics_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::{degrade_read, AppError},
    db::AnalyticsRepository,
    models::analytics::{CategorySpend, DepartmentSpend, FlagSummary, GlCodingEntry, MonthlySpend},
};

pub const DEFAULT_TREND_MONTHS: i32 = 6;
pub const MAX_TREND_MONTHS: i32 = 24;
pub const LOW_CONFIDENCE_THRESHOLD: i32 = 70;

#[derive(Clone)]
pub struct AnalyticsService {
    pool: PgPool,
    repo: AnalyticsRepository,
}

impl AnalyticsService {
    pub fn new(pool: PgPool, repo: AnalyticsRepository) -> Self {
        Self { pool, repo }
    }

    pub async fn spend_by_category(&self, department_id: Option<Uuid>) -> Result<Vec<CategorySpend>, AppError> {
        degrade_read(
            self.repo.spend_by_category(&self.pool, department_id).await,
            "gasto por categoria",
        )
    }

    pub async fn monthly_trend(
        &self,
        department_id: Option<Uuid>,
        months: Option<i32>,
    ) -> Result<Vec<MonthlySpend>, AppError> {
        degrade_read(
            self.repo
                .monthly_trend(&self.pool, department_id, trend_window(months))
                .await,
            "tendência mensal",
        )
    }

    pub async fn spend_by_department(&self) -> Result<Vec<DepartmentSpend>, AppError> {
        degrade_read(
            self.repo.spend_by_department(&self.pool).await,
            "gasto por departamento",
        )
    }

    /// Só itens pagos: lote ainda em andamento devolve lista vazia.
    pub async fn gl_coding_for_batch(&self, batch_id: Uuid) -> Result<Vec<GlCodingEntry>, AppError> {
        degrade_read(
            self.repo.gl_coding_for_batch(&self.pool, batch_id).await,
            "GL coding",
        )
    }

    pub async fn flag_summary(&self, department_id: Option<Uuid>) -> Result<FlagSummary, AppError> {
        degrade_read(
            self.repo
                .flag_summary(&self.pool, department_id, LOW_CONFIDENCE_THRESHOLD)
                .await,
            "resumo de flags",
        )
    }
}

fn trend_window(months: Option<i32>) -> i32 {
    months.unwrap_or(DEFAULT_TREND_MONTHS).clamp(1, MAX_TREND_MONTHS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_window_defaults_and_clamps() {
        assert_eq!(trend_window(None), 6);
        assert_eq!(trend_window(Some(0)), 1);
        assert_eq!(trend_window(Some(12)), 12);
        assert_eq!(trend_window(Some(120)), 24);
    }
}
