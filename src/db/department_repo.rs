// src/db/department_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::department::{Department, Staff},
};

// Departamentos + staff (tabelas de referência)
#[derive(Clone, Default)]
pub struct DepartmentRepository;

impl DepartmentRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  DEPARTAMENTOS
    // =========================================================================

    pub async fn list<'e, E>(&self, executor: E) -> Result<Vec<Department>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let departments = sqlx::query_as::<_, Department>("SELECT * FROM departments ORDER BY name ASC")
            .fetch_all(executor)
            .await?;

        Ok(departments)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Department>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let department = sqlx::query_as::<_, Department>("SELECT * FROM departments WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(department)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        name: &str,
        float_amount: Decimal,
    ) -> Result<Department, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Department>(
            "INSERT INTO departments (name, float_amount) VALUES ($1, $2) RETURNING *",
        )
        .bind(name)
        .bind(float_amount)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::Validation(format!("Departamento '{}' já existe", name));
                }
            }
            AppError::DatabaseError(e)
        })
    }

    pub async fn update_float_amount<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        float_amount: Decimal,
    ) -> Result<Option<Department>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let department = sqlx::query_as::<_, Department>(
            r#"
            UPDATE departments
            SET float_amount = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(float_amount)
        .fetch_optional(executor)
        .await?;

        Ok(department)
    }

    // =========================================================================
    //  LEDGER (float usado = admin_approved + hod_approved)
    // =========================================================================

    pub async fn committed_float<'e, E>(&self, executor: E, department_id: Uuid) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let used = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(amount_total), 0)
            FROM receipts
            WHERE department_id = $1
              AND status IN ('admin_approved', 'hod_approved')
            "#,
        )
        .bind(department_id)
        .fetch_one(executor)
        .await?;

        Ok(used)
    }

    pub async fn committed_float_by_department<'e, E>(
        &self,
        executor: E,
    ) -> Result<Vec<(Uuid, Decimal)>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, (Uuid, Decimal)>(
            r#"
            SELECT d.id, COALESCE(SUM(r.amount_total), 0)
            FROM departments d
            LEFT JOIN receipts r
                   ON r.department_id = d.id
                  AND r.status IN ('admin_approved', 'hod_approved')
            GROUP BY d.id
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    // =========================================================================
    //  STAFF
    // =========================================================================

    // "Get or create" num único comando: o ON CONFLICT devolve a linha existente.
    pub async fn get_or_create_staff<'e, E>(
        &self,
        executor: E,
        name: &str,
        department_id: Uuid,
    ) -> Result<Staff, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let staff = sqlx::query_as::<_, Staff>(
            r#"
            INSERT INTO staff (name, department_id)
            VALUES ($1, $2)
            ON CONFLICT (name, department_id) DO UPDATE SET name = EXCLUDED.name
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(department_id)
        .fetch_one(executor)
        .await?;

        Ok(staff)
    }

    pub async fn list_staff<'e, E>(&self, executor: E, department_id: Uuid) -> Result<Vec<Staff>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let staff = sqlx::query_as::<_, Staff>(
            "SELECT * FROM staff WHERE department_id = $1 ORDER BY name ASC",
        )
        .bind(department_id)
        .fetch_all(executor)
        .await?;

        Ok(staff)
    }
}
