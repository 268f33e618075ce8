// src/services/department_service.rs

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{Executor, PgPool, Postgres};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    common::{
        error::{degrade_read, AppError},
        money::round_money,
    },
    db::DepartmentRepository,
    models::{
        activity::{ActivityAction, Actor, NewActivity},
        department::{Department, DepartmentWithFloat, FloatSummary, Staff},
    },
    services::activity_service::ActivityService,
};

#[derive(Clone)]
pub struct DepartmentService {
    pool: PgPool,
    repo: DepartmentRepository,
    activity: ActivityService,
    default_float_amount: Decimal,
}

impl DepartmentService {
    pub fn new(
        pool: PgPool,
        repo: DepartmentRepository,
        activity: ActivityService,
        default_float_amount: Decimal,
    ) -> Self {
        Self {
            pool,
            repo,
            activity,
            default_float_amount,
        }
    }

    // --- DEPARTAMENTOS ---

    pub async fn list(&self) -> Result<Vec<Department>, AppError> {
        degrade_read(self.repo.list(&self.pool).await, "departamentos")
    }

    /// Lista com o float de cada departamento (duas leituras, sem trava).
    pub async fn list_with_float(&self) -> Result<Vec<DepartmentWithFloat>, AppError> {
        let departments = self.list().await?;
        let used: HashMap<Uuid, Decimal> = degrade_read(
            self.repo.committed_float_by_department(&self.pool).await,
            "float por departamento",
        )?
        .into_iter()
        .collect();

        Ok(departments
            .into_iter()
            .map(|department| {
                let used_float = used.get(&department.id).copied().unwrap_or(Decimal::ZERO);
                DepartmentWithFloat {
                    float: FloatSummary::new(department.float_amount, used_float),
                    department,
                }
            })
            .collect())
    }

    pub async fn get<'e, E>(&self, executor: E, id: Uuid) -> Result<Department, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .find_by_id(executor, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Departamento {}", id)))
    }

    pub async fn find(&self, id: Uuid) -> Result<Department, AppError> {
        self.get(&self.pool, id).await
    }

    pub async fn create(&self, name: &str, float_amount: Option<Decimal>) -> Result<Department, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("O nome do departamento é obrigatório.".into()));
        }
        let float_amount = validate_float(float_amount.unwrap_or(self.default_float_amount))?;

        let department = self.repo.create(&self.pool, name, float_amount).await?;
        tracing::info!("Departamento criado: {} (float {})", department.name, department.float_amount);
        Ok(department)
    }

    /// Reconfigura o teto. Não altera recibos: o saldo continua derivado.
    pub async fn update_float(&self, id: Uuid, float_amount: Decimal, actor: &Actor) -> Result<Department, AppError> {
        let float_amount = validate_float(float_amount)?;
        let mut tx = self.pool.begin().await?;

        let previous = self.get(&mut *tx, id).await?;
        let department = self
            .repo
            .update_float_amount(&mut *tx, id, float_amount)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Departamento {}", id)))?;

        self.activity
            .record(
                &mut *tx,
                NewActivity::department(
                    id,
                    ActivityAction::FloatUpdated,
                    actor,
                    format!(
                        "Float changed from {} to {} by {}",
                        previous.float_amount,
                        department.float_amount,
                        actor.label()
                    ),
                )
                .with_metadata(json!({
                    "previous": previous.float_amount,
                    "current": department.float_amount,
                })),
            )
            .await;

        tx.commit().await?;
        tracing::info!("Float do departamento {} agora é {}", department.name, department.float_amount);
        Ok(department)
    }

    // --- FLOAT LEDGER ---

    /// `remaining = floatAmount - Σ amountTotal (admin_approved + hod_approved)`.
    pub async fn get_float(&self, id: Uuid) -> Result<FloatSummary, AppError> {
        let department = self.find(id).await?;
        let used = self.repo.committed_float(&self.pool, id).await?;
        let summary = FloatSummary::new(department.float_amount, used);

        if summary.is_over_committed() {
            tracing::warn!(
                "Departamento {} aprovou além do float: restante {}",
                department.name,
                summary.remaining_float
            );
        }
        Ok(summary)
    }

    // --- STAFF ---

    pub async fn get_or_create_staff<'e, E>(
        &self,
        executor: E,
        name: &str,
        department_id: Uuid,
    ) -> Result<Staff, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("O nome do funcionário é obrigatório.".into()));
        }
        self.repo.get_or_create_staff(executor, name, department_id).await
    }

    pub async fn get_or_create_staff_checked(&self, name: &str, department_id: Uuid) -> Result<Staff, AppError> {
        let mut tx = self.pool.begin().await?;
        self.get(&mut *tx, department_id).await?;
        let staff = self.get_or_create_staff(&mut *tx, name, department_id).await?;
        tx.commit().await?;
        Ok(staff)
    }

    pub async fn list_staff(&self, department_id: Uuid) -> Result<Vec<Staff>, AppError> {
        degrade_read(self.repo.list_staff(&self.pool, department_id).await, "staff")
    }
}

fn validate_float(amount: Decimal) -> Result<Decimal, AppError> {
    if amount < Decimal::ZERO {
        return Err(AppError::Validation("O float não pode ser negativo.".into()));
    }
    Ok(round_money(amount))
}
