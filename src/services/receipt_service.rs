// src/services/receipt_service.rs

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{
        error::{degrade_read, AppError},
        money::round_money,
    },
    db::{BatchRepository, ReceiptRepository},
    models::{
        activity::{ActivityAction, Actor, NewActivity},
        extraction::{apply_age_flag, ExtractionResult, LineItem},
        receipt::{ExpenseCategory, NewReceipt, Receipt, ReceiptCorrections, ReceiptStatus, ReceiptTransition},
    },
    services::{
        activity_service::ActivityService,
        department_service::DepartmentService,
        extraction_service::{extract_or_default, ReceiptExtractor},
        storage_service::{receipt_image_key, ObjectStore},
    },
};

const ACCEPTED_CONTENT_TYPES: [&str; 5] = ["image/jpeg", "image/png", "image/webp", "image/heic", "application/pdf"];

/// Tudo o que o staff envia: referência da imagem, identidade e os campos
/// extraídos (já corrigidos por ele, se quis).
#[derive(Debug, Clone)]
pub struct ReceiptSubmission {
    pub image_url: String,
    pub image_key: String,
    pub staff_name: String,
    pub department_id: Uuid,
    pub merchant_name: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    pub amount_total: Option<Decimal>,
    pub amount_gst: Option<Decimal>,
    pub category: Option<ExpenseCategory>,
    pub project_code: Option<String>,
    pub ai_confidence: i32,
    pub ai_reasoning: Option<String>,
    pub ai_flags: Vec<String>,
    pub ai_line_items: Vec<LineItem>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadedReceipt {
    pub image_url: String,
    pub image_key: String,
    pub extraction: ExtractionResult,
}

#[derive(Clone)]
pub struct ReceiptService {
    pool: PgPool,
    repo: ReceiptRepository,
    batch_repo: BatchRepository,
    departments: DepartmentService,
    activity: ActivityService,
    extractor: Arc<dyn ReceiptExtractor>,
    object_store: Arc<dyn ObjectStore>,
}

impl ReceiptService {
    pub fn new(
        pool: PgPool,
        repo: ReceiptRepository,
        batch_repo: BatchRepository,
        departments: DepartmentService,
        activity: ActivityService,
        extractor: Arc<dyn ReceiptExtractor>,
        object_store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            pool,
            repo,
            batch_repo,
            departments,
            activity,
            extractor,
            object_store,
        }
    }

    // =========================================================================
    //  UPLOAD + EXTRAÇÃO
    // =========================================================================

    /// Guarda a foto e devolve a leitura da IA para o staff conferir.
    /// A falha da IA nunca interrompe o envio.
    pub async fn upload_and_extract(
        &self,
        department_id: Uuid,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedReceipt, AppError> {
        if bytes.is_empty() {
            return Err(AppError::Validation("A imagem do recibo está vazia.".into()));
        }
        if !ACCEPTED_CONTENT_TYPES.contains(&content_type) {
            return Err(AppError::Validation(format!("Tipo de arquivo não suportado: {}", content_type)));
        }
        self.departments.find(department_id).await?;

        let image_key = receipt_image_key(department_id, content_type);
        let image_url = self.object_store.put(&image_key, bytes, content_type).await?;

        let extraction = extract_or_default(self.extractor.as_ref(), &image_url, Utc::now().date_naive()).await;
        tracing::info!(
            "Recibo enviado: key={}, confiança={}, flags={:?}",
            image_key,
            extraction.confidence,
            extraction.flags
        );

        Ok(UploadedReceipt {
            image_url,
            image_key,
            extraction,
        })
    }

    // =========================================================================
    //  CRIAÇÃO (staff)
    // =========================================================================

    pub async fn create(&self, submission: ReceiptSubmission, actor: &Actor) -> Result<Receipt, AppError> {
        let (amount_total, amount_gst) = validate_amounts(submission.amount_total, submission.amount_gst)?;
        if submission.image_url.trim().is_empty() || submission.image_key.trim().is_empty() {
            return Err(AppError::Validation("A referência da imagem é obrigatória.".into()));
        }

        let mut flags = dedupe_flags(submission.ai_flags);
        apply_age_flag(&mut flags, submission.transaction_date, Utc::now().date_naive());

        let mut tx = self.pool.begin().await?;

        let department = self.departments.get(&mut *tx, submission.department_id).await?;
        let staff = self
            .departments
            .get_or_create_staff(&mut *tx, &submission.staff_name, department.id)
            .await?;

        let new = NewReceipt {
            image_url: submission.image_url,
            image_key: submission.image_key,
            staff_id: staff.id,
            staff_name: staff.name.clone(),
            department_id: department.id,
            department_name: department.name.clone(),
            merchant_name: clean_text(submission.merchant_name),
            transaction_date: submission.transaction_date,
            amount_total,
            amount_gst,
            category: submission.category,
            project_code: clean_text(submission.project_code),
            ai_confidence: submission.ai_confidence.clamp(0, 100),
            ai_reasoning: clean_text(submission.ai_reasoning),
            ai_flags: flags,
            ai_line_items: json!(submission.ai_line_items),
        };

        let receipt = self.repo.insert(&mut *tx, &new).await?;

        self.activity
            .record(
                &mut *tx,
                NewActivity::receipt(
                    receipt.id,
                    receipt.department_id,
                    ActivityAction::Created,
                    actor,
                    format!(
                        "Receipt submitted by {} for {}{}",
                        receipt.staff_name,
                        describe_amount(receipt.amount_total),
                        receipt
                            .merchant_name
                            .as_deref()
                            .map(|m| format!(" at {}", m))
                            .unwrap_or_default()
                    ),
                )
                .with_metadata(json!({
                    "confidence": receipt.ai_confidence,
                    "flags": receipt.ai_flags,
                    "category": receipt.category,
                })),
            )
            .await;

        tx.commit().await?;
        tracing::info!("Recibo {} criado ({} / {})", receipt.id, receipt.staff_name, receipt.department_name);
        Ok(receipt)
    }

    /// Correções manuais enquanto ninguém aprovou.
    pub async fn update(&self, id: Uuid, corrections: ReceiptCorrections, actor: &Actor) -> Result<Receipt, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self.lock(&mut tx, id).await?;
        current.status.apply(id, ReceiptTransition::Edit)?;

        let (amount_total, amount_gst) = validate_amounts(
            corrections.amount_total.or(current.amount_total),
            corrections.amount_gst.or(current.amount_gst),
        )?;
        let corrections = ReceiptCorrections {
            merchant_name: clean_text(corrections.merchant_name),
            project_code: clean_text(corrections.project_code),
            amount_total: corrections.amount_total.and(amount_total),
            amount_gst: corrections.amount_gst.and(amount_gst),
            ..corrections
        };

        let mut flags = current.ai_flags.clone();
        apply_age_flag(
            &mut flags,
            corrections.transaction_date.or(current.transaction_date),
            Utc::now().date_naive(),
        );

        let receipt = self.repo.apply_corrections(&mut *tx, id, &corrections, &flags).await?;

        self.activity
            .record(
                &mut *tx,
                NewActivity::receipt(
                    id,
                    receipt.department_id,
                    ActivityAction::Updated,
                    actor,
                    format!("Receipt details corrected by {}", actor.label()),
                )
                .with_metadata(json!(corrections)),
            )
            .await;

        tx.commit().await?;
        Ok(receipt)
    }

    // =========================================================================
    //  TRANSIÇÕES
    // =========================================================================

    /// `submitted → admin_approved`. Não altera valores.
    pub async fn admin_approve(&self, id: Uuid, actor: &Actor) -> Result<Receipt, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self.lock(&mut tx, id).await?;
        current.status.apply(id, ReceiptTransition::AdminApprove)?;

        let receipt = self.repo.mark_admin_approved(&mut *tx, id).await?;

        self.activity
            .record(
                &mut *tx,
                NewActivity::receipt(
                    id,
                    receipt.department_id,
                    ActivityAction::AdminApproved,
                    actor,
                    format!(
                        "Receipt for {} approved by {}",
                        describe_amount(receipt.amount_total),
                        actor.label()
                    ),
                ),
            )
            .await;

        tx.commit().await?;
        tracing::info!("Recibo {} aprovado pelo admin", id);
        Ok(receipt)
    }

    /// Qualquer estado pré-pago → `rejected`. Sempre desvincula do lote e
    /// recalcula os totais do lote antigo.
    pub async fn reject(&self, id: Uuid, actor: &Actor, reason: &str) -> Result<Receipt, AppError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("O motivo da rejeição é obrigatório.".into()));
        }

        let mut tx = self.pool.begin().await?;

        // Trava o lote antes do recibo, mesma ordem das aprovações de lote
        let snapshot = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Recibo {}", id)))?;
        if let Some(batch_id) = snapshot.batch_id {
            self.batch_repo.lock_by_id(&mut *tx, batch_id).await?;
        }

        let current = self.lock(&mut tx, id).await?;
        // Lote mudou entre a leitura e a trava: travar o novo lote agora
        // inverteria a ordem lote → recibo. O cliente relê e tenta de novo.
        ensure_same_batch(&snapshot, &current)?;
        current.status.apply(id, ReceiptTransition::Reject)?;

        let receipt = self.repo.mark_rejected(&mut *tx, id, &actor.label(), reason).await?;

        if let Some(batch_id) = current.batch_id {
            let totals = self.batch_repo.recalculate_totals(&mut *tx, batch_id).await?;
            tracing::info!(
                "Recibo {} saiu do lote {}; novo total {} (GST {})",
                id,
                batch_id,
                totals.total_amount,
                totals.total_gst
            );
        }

        self.activity
            .record(
                &mut *tx,
                NewActivity::receipt(
                    id,
                    receipt.department_id,
                    ActivityAction::Rejected,
                    actor,
                    format!("Receipt rejected by {}: {}", actor.label(), reason),
                )
                .with_metadata(json!({
                    "previousStatus": current.status,
                    "batchId": current.batch_id,
                    "reason": reason,
                })),
            )
            .await;

        tx.commit().await?;
        tracing::info!("Recibo {} rejeitado ({})", id, current.status);
        Ok(receipt)
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn get(&self, id: Uuid) -> Result<Receipt, AppError> {
        self.repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Recibo {}", id)))
    }

    pub async fn list_by_department(
        &self,
        department_id: Uuid,
        status: Option<ReceiptStatus>,
    ) -> Result<Vec<Receipt>, AppError> {
        degrade_read(
            self.repo.list_by_department(&self.pool, department_id, status).await,
            "recibos",
        )
    }

    pub async fn list_by_staff(&self, staff_id: Uuid) -> Result<Vec<Receipt>, AppError> {
        degrade_read(self.repo.list_by_staff(&self.pool, staff_id).await, "recibos")
    }

    pub async fn list_by_batch(&self, batch_id: Uuid) -> Result<Vec<Receipt>, AppError> {
        degrade_read(self.repo.list_by_batch(&self.pool, batch_id).await, "recibos")
    }

    async fn lock(&self, tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, id: Uuid) -> Result<Receipt, AppError> {
        self.repo
            .lock_by_id(&mut **tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Recibo {}", id)))
    }
}

fn validate_amounts(
    amount_total: Option<Decimal>,
    amount_gst: Option<Decimal>,
) -> Result<(Option<Decimal>, Option<Decimal>), AppError> {
    let amount_total = amount_total.map(round_money);
    let amount_gst = amount_gst.map(round_money);

    if amount_total.is_some_and(|a| a < Decimal::ZERO) || amount_gst.is_some_and(|g| g < Decimal::ZERO) {
        return Err(AppError::Validation("Valores não podem ser negativos.".into()));
    }
    if let (Some(total), Some(gst)) = (amount_total, amount_gst) {
        if gst > total {
            return Err(AppError::Validation("O GST não pode ser maior que o total.".into()));
        }
    }
    Ok((amount_total, amount_gst))
}

fn ensure_same_batch(snapshot: &Receipt, current: &Receipt) -> Result<(), AppError> {
    if snapshot.batch_id == current.batch_id {
        return Ok(());
    }
    let moved_to = current
        .batch_id
        .map(|b| b.to_string())
        .unwrap_or_else(|| "nenhum".to_string());
    Err(AppError::invalid_transition(
        "receipt",
        current.id,
        format!("{} (lote alterado para {})", current.status, moved_to),
        ReceiptTransition::Reject.verb(),
    ))
}

fn dedupe_flags(flags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(flags.len());
    for flag in flags {
        let flag = flag.trim().to_string();
        if !flag.is_empty() && !out.contains(&flag) {
            out.push(flag);
        }
    }
    out
}

fn clean_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub(crate) fn describe_amount(amount: Option<Decimal>) -> String {
    match amount {
        Some(a) => format!("${}", round_money(a)),
        None => "an unknown amount".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{activity::ActorRole, batch::BatchStatus, batch::tests::receipt, extraction::RECEIPT_TOO_OLD_FLAG},
        services::test_support::{actor, dec, Workflow},
    };
    use chrono::Duration as Days;

    #[test]
    fn gst_cannot_exceed_total() {
        assert!(validate_amounts(Some(dec("10.00")), Some(dec("10.01"))).is_err());
        assert!(validate_amounts(Some(dec("-1")), None).is_err());
        assert_eq!(
            validate_amounts(Some(dec("45")), Some(dec("3.934"))).unwrap(),
            (Some(dec("45.00")), Some(dec("3.93")))
        );
        assert_eq!(validate_amounts(None, None).unwrap(), (None, None));
    }

    #[test]
    fn flags_keep_order_and_drop_duplicates() {
        let flags = dedupe_flags(vec![
            "Alcohol purchase".into(),
            " ".into(),
            "Receipt too old".into(),
            "Alcohol purchase".into(),
        ]);
        assert_eq!(flags, vec!["Alcohol purchase".to_string(), "Receipt too old".to_string()]);
    }

    #[test]
    fn reject_refuses_a_receipt_batched_after_it_was_read() {
        let snapshot = receipt("45.00", "3.93", ReceiptStatus::AdminApproved);
        let mut current = snapshot.clone();
        assert!(ensure_same_batch(&snapshot, &current).is_ok());

        current.batch_id = Some(Uuid::new_v4());
        let err = ensure_same_batch(&snapshot, &current).unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition { action: "reject", .. }));
    }

    #[test]
    fn amounts_are_described_for_the_audit_trail() {
        assert_eq!(describe_amount(Some(dec("45"))), "$45.00");
        assert_eq!(describe_amount(None), "an unknown amount");
    }

    // --- com banco ---

    #[sqlx::test(migrations = "./migrations")]
    async fn rejecting_a_batched_receipt_detaches_it_and_resums_the_batch(pool: PgPool) {
        let w = Workflow::new(pool).await;
        let admin = actor(ActorRole::Admin, "Admin Ops");

        let kept = w.submit("50.00", "4.13").await;
        let dropped = w.submit("30.00", "2.48").await;
        let batch = w.batches.create(w.department_id, &[kept.id, dropped.id], &admin).await.unwrap();
        assert_eq!(w.used_float().await, dec("80.00"));

        let rejected = w.receipts.reject(dropped.id, &admin, "Personal expense").await.unwrap();
        assert_eq!(rejected.status, ReceiptStatus::Rejected);
        assert_eq!(rejected.batch_id, None);
        assert_eq!(rejected.rejected_by.as_deref(), Some("Admin Ops (admin)"));

        let batch = w.batches.get(batch.header.id).await.unwrap();
        assert_eq!(batch.header.status, BatchStatus::PendingHod);
        assert_eq!(batch.header.total_amount, dec("50.00"));
        assert_eq!(batch.header.total_gst, dec("4.13"));
        assert_eq!(batch.receipts.len(), 1);
        assert_eq!(w.used_float().await, dec("50.00"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn rejected_receipt_stays_rejected(pool: PgPool) {
        let w = Workflow::new(pool).await;
        let admin = actor(ActorRole::Admin, "Admin Ops");

        let r = w.submit("20.00", "1.65").await;
        w.receipts.reject(r.id, &admin, "Blurry photo").await.unwrap();

        let again = w.receipts.reject(r.id, &admin, "Blurry photo").await.unwrap_err();
        assert!(matches!(again, AppError::InvalidStateTransition { action: "reject", .. }));
        let approve = w.receipts.admin_approve(r.id, &admin).await.unwrap_err();
        assert!(matches!(approve, AppError::InvalidStateTransition { .. }));
        let batch = w.batches.create(w.department_id, &[r.id], &admin).await.unwrap_err();
        assert!(matches!(batch, AppError::InvalidStateTransition { .. }));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn age_flag_follows_the_corrected_date(pool: PgPool) {
        let w = Workflow::new(pool).await;
        let staff = actor(ActorRole::Staff, "Ana Lima");
        let today = Utc::now().date_naive();

        // A IA marcou como antigo, mas a data conferida é recente
        let mut submission = w.submission("45.00", "3.93");
        submission.transaction_date = Some(today - Days::days(10));
        submission.ai_flags = vec![RECEIPT_TOO_OLD_FLAG.into(), "Alcohol purchase".into()];
        let r = w.receipts.create(submission, &staff).await.unwrap();
        assert_eq!(r.ai_flags, vec!["Alcohol purchase".to_string()]);

        let old = ReceiptCorrections {
            transaction_date: Some(today - Days::days(45)),
            ..Default::default()
        };
        let r = w.receipts.update(r.id, old, &staff).await.unwrap();
        assert!(r.ai_flags.iter().any(|f| f == RECEIPT_TOO_OLD_FLAG));

        let recent = ReceiptCorrections {
            transaction_date: Some(today - Days::days(10)),
            ..Default::default()
        };
        let r = w.receipts.update(r.id, recent, &staff).await.unwrap();
        assert_eq!(r.ai_flags, vec!["Alcohol purchase".to_string()]);
    }
}
