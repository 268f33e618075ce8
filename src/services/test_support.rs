// src/services/test_support.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use std::{str::FromStr, sync::Arc};
use uuid::Uuid;

use crate::{
    db::{ActivityRepository, BatchRepository, DepartmentRepository, ReceiptRepository},
    models::{
        activity::{Actor, ActorRole},
        receipt::{ExpenseCategory, Receipt},
    },
    services::{
        activity_service::ActivityService,
        batch_service::BatchService,
        department_service::DepartmentService,
        extraction_service::DisabledExtractor,
        receipt_service::{ReceiptService, ReceiptSubmission},
        storage_service::LocalObjectStore,
    },
};

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn actor(role: ActorRole, name: &str) -> Actor {
    Actor::new(role, Some(name.to_string()))
}

/// Serviços montados como no `AppState`, sobre o banco de teste.
pub struct Workflow {
    pub pool: PgPool,
    pub departments: DepartmentService,
    pub receipts: ReceiptService,
    pub batches: BatchService,
    pub activity: ActivityService,
    pub department_id: Uuid,
    _files: tempfile::TempDir,
}

impl Workflow {
    pub async fn new(pool: PgPool) -> Self {
        let files = tempfile::tempdir().unwrap();
        let activity = ActivityService::new(pool.clone(), ActivityRepository::new());
        let departments = DepartmentService::new(
            pool.clone(),
            DepartmentRepository::new(),
            activity.clone(),
            dec("3500.00"),
        );
        let receipts = ReceiptService::new(
            pool.clone(),
            ReceiptRepository::new(),
            BatchRepository::new(),
            departments.clone(),
            activity.clone(),
            Arc::new(DisabledExtractor),
            Arc::new(LocalObjectStore::new(
                files.path().to_path_buf(),
                "http://localhost:3000/files".into(),
            )),
        );
        let batches = BatchService::new(
            pool.clone(),
            BatchRepository::new(),
            ReceiptRepository::new(),
            departments.clone(),
            activity.clone(),
        );
        let department_id = departments.create("Field Services", None).await.unwrap().id;

        Workflow {
            pool,
            departments,
            receipts,
            batches,
            activity,
            department_id,
            _files: files,
        }
    }

    pub fn submission(&self, total: &str, gst: &str) -> ReceiptSubmission {
        ReceiptSubmission {
            image_url: "http://localhost:3000/files/receipts/r.jpg".into(),
            image_key: "receipts/r.jpg".into(),
            staff_name: "Ana Lima".into(),
            department_id: self.department_id,
            merchant_name: Some("Grab".into()),
            transaction_date: Some(chrono::Utc::now().date_naive()),
            amount_total: Some(dec(total)),
            amount_gst: Some(dec(gst)),
            category: Some(ExpenseCategory::TransportAndVehicle),
            project_code: None,
            ai_confidence: 92,
            ai_reasoning: None,
            ai_flags: Vec::new(),
            ai_line_items: Vec::new(),
        }
    }

    pub async fn submit(&self, total: &str, gst: &str) -> Receipt {
        self.receipts
            .create(self.submission(total, gst), &actor(ActorRole::Staff, "Ana Lima"))
            .await
            .unwrap()
    }

    pub async fn used_float(&self) -> Decimal {
        self.departments.get_float(self.department_id).await.unwrap().used_float
    }
}
