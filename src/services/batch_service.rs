// src/services/batch_service.rs

use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::{
    common::error::{degrade_read, AppError},
    db::{BatchRepository, ReceiptRepository},
    models::{
        activity::{ActivityAction, Actor, NewActivity},
        batch::{Batch, BatchDetail, BatchStatus, BatchTransition, HodApprovalPlan},
        receipt::{Receipt, ReceiptStatus, ReceiptTransition},
    },
    services::{
        activity_service::ActivityService, department_service::DepartmentService,
        receipt_service::describe_amount,
    },
};

#[derive(Clone)]
pub struct BatchService {
    pool: PgPool,
    repo: BatchRepository,
    receipts: ReceiptRepository,
    departments: DepartmentService,
    activity: ActivityService,
}

impl BatchService {
    pub fn new(
        pool: PgPool,
        repo: BatchRepository,
        receipts: ReceiptRepository,
        departments: DepartmentService,
        activity: ActivityService,
    ) -> Self {
        Self {
            pool,
            repo,
            receipts,
            departments,
            activity,
        }
    }

    // =========================================================================
    //  CRIAÇÃO (admin)
    // =========================================================================

    /// Cria o lote e vincula os recibos numa única transação.
    ///
    /// Recibos ainda `submitted` são aprovados pelo admin no mesmo passo;
    /// os demais precisam estar `admin_approved` e sem lote.
    pub async fn create(&self, department_id: Uuid, receipt_ids: &[Uuid], actor: &Actor) -> Result<BatchDetail, AppError> {
        let ids = unique_ids(receipt_ids);
        if ids.is_empty() {
            return Err(AppError::Validation("Informe ao menos um recibo para o lote.".into()));
        }

        let mut tx = self.pool.begin().await?;

        let department = self.departments.get(&mut *tx, department_id).await?;
        let receipts = self.receipts.lock_by_ids(&mut *tx, &ids).await?;
        check_batchable(department_id, &ids, &receipts)?;

        for receipt in receipts.iter().filter(|r| r.status == ReceiptStatus::Submitted) {
            self.receipts.mark_admin_approved(&mut *tx, receipt.id).await?;
            self.activity
                .record(
                    &mut *tx,
                    NewActivity::receipt(
                        receipt.id,
                        department_id,
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
        }

        let batch = self.repo.insert(&mut *tx, department_id, actor.name.as_deref()).await?;
        let assigned = self.receipts.assign_batch(&mut *tx, &ids, batch.id).await?;
        if assigned != ids.len() as u64 {
            return Err(AppError::InternalServerError(anyhow::anyhow!(
                "lote {}: {} de {} recibos vinculados",
                batch.id,
                assigned,
                ids.len()
            )));
        }
        let totals = self.repo.recalculate_totals(&mut *tx, batch.id).await?;

        self.activity
            .record(
                &mut *tx,
                NewActivity::batch(
                    batch.id,
                    department_id,
                    ActivityAction::BatchCreated,
                    actor,
                    format!(
                        "Top-up request of ${} ({} receipts) submitted for {} by {}",
                        totals.total_amount,
                        ids.len(),
                        department.name,
                        actor.label()
                    ),
                )
                .with_metadata(json!({
                    "receiptIds": ids,
                    "totalAmount": totals.total_amount,
                    "totalGst": totals.total_gst,
                })),
            )
            .await;

        let detail = self.load_detail(&mut tx, batch.id).await?;
        tx.commit().await?;

        tracing::info!("Lote {} criado para {} com total {}", batch.id, department.name, totals.total_amount);
        Ok(detail)
    }

    // =========================================================================
    //  APROVAÇÃO DO HOD (parcial)
    // =========================================================================

    /// Rejeita os itens excluídos, recalcula os totais e só então aprova o
    /// restante. O lote sempre avança para `pending_finance`, mesmo zerado.
    pub async fn hod_approve(
        &self,
        batch_id: Uuid,
        rejected_ids: &[Uuid],
        reasons: &HashMap<Uuid, String>,
        actor: &Actor,
    ) -> Result<BatchDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let batch = self.lock(&mut tx, batch_id).await?;
        batch.status.apply(batch_id, BatchTransition::HodApprove)?;

        let members = self.receipts.lock_batch_members(&mut *tx, batch_id).await?;
        let plan = HodApprovalPlan::build(batch_id, &members, rejected_ids, reasons)?;

        for (receipt_id, reason) in &plan.rejections {
            let receipt = self
                .receipts
                .mark_rejected(&mut *tx, *receipt_id, &actor.label(), reason)
                .await?;
            self.log_line_rejection(&mut tx, &receipt, batch_id, actor, reason).await;
        }

        // Só depois de todas as rejeições desta chamada
        let totals = self.repo.recalculate_totals(&mut *tx, batch_id).await?;
        if totals != plan.totals {
            tracing::warn!(
                "Lote {}: total recalculado {:?} difere do plano {:?}",
                batch_id,
                totals,
                plan.totals
            );
        }

        let approved = self.receipts.mark_hod_approved(&mut *tx, &plan.approvals).await?;
        self.repo.mark_hod_approved(&mut *tx, batch_id).await?;

        self.activity
            .record(
                &mut *tx,
                NewActivity::batch(
                    batch_id,
                    batch.department_id,
                    ActivityAction::HodApproved,
                    actor,
                    format!(
                        "Top-up request approved by {}: {} receipts for ${}, {} rejected",
                        actor.label(),
                        approved,
                        totals.total_amount,
                        plan.rejections.len()
                    ),
                )
                .with_metadata(json!({
                    "approvedReceiptIds": plan.approvals,
                    "rejectedReceiptIds": plan.rejections.iter().map(|(id, _)| id).collect::<Vec<_>>(),
                    "totalAmount": totals.total_amount,
                    "totalGst": totals.total_gst,
                })),
            )
            .await;

        let detail = self.load_detail(&mut tx, batch_id).await?;
        tx.commit().await?;

        tracing::info!(
            "Lote {} aprovado pelo HOD ({} aprovados, {} rejeitados)",
            batch_id,
            approved,
            plan.rejections.len()
        );
        Ok(detail)
    }

    // =========================================================================
    //  DESEMBOLSO (financeiro)
    // =========================================================================

    /// Marca tudo como pago. O float volta sozinho: recibos `paid` saem do uso.
    pub async fn finance_approve(&self, batch_id: Uuid, actor: &Actor) -> Result<BatchDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let batch = self.lock(&mut tx, batch_id).await?;
        batch.status.apply(batch_id, BatchTransition::Disburse)?;

        let members = self.receipts.lock_batch_members(&mut *tx, batch_id).await?;
        if let Some(stray) = members.iter().find(|r| r.status != ReceiptStatus::HodApproved) {
            stray.status.apply(stray.id, ReceiptTransition::Disburse)?;
        }

        let paid = self.receipts.mark_batch_paid(&mut *tx, batch_id).await?;
        let updated = self.repo.mark_paid(&mut *tx, batch_id).await?;

        self.activity
            .record(
                &mut *tx,
                NewActivity::batch(
                    batch_id,
                    batch.department_id,
                    ActivityAction::Paid,
                    actor,
                    format!(
                        "Bank transfer of ${} processed by {} ({} receipts)",
                        updated.total_amount,
                        actor.label(),
                        paid
                    ),
                )
                .with_metadata(json!({
                    "totalAmount": updated.total_amount,
                    "totalGst": updated.total_gst,
                    "receiptCount": paid,
                })),
            )
            .await;

        let detail = self.load_detail(&mut tx, batch_id).await?;
        tx.commit().await?;

        tracing::info!("Lote {} pago: {} recibos, total {}", batch_id, paid, updated.total_amount);
        Ok(detail)
    }

    // =========================================================================
    //  REJEIÇÃO / RETIRADA DO LOTE INTEIRO
    // =========================================================================

    pub async fn reject(&self, batch_id: Uuid, actor: &Actor, reason: &str) -> Result<BatchDetail, AppError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("O motivo da rejeição é obrigatório.".into()));
        }

        let mut tx = self.pool.begin().await?;

        let batch = self.lock(&mut tx, batch_id).await?;
        batch.status.apply(batch_id, BatchTransition::Reject)?;

        let members = self.receipts.lock_batch_members(&mut *tx, batch_id).await?;
        let mut rejected = Vec::new();
        for member in members.iter().filter(|r| !r.status.is_terminal()) {
            let receipt = self
                .receipts
                .mark_rejected(&mut *tx, member.id, &actor.label(), reason)
                .await?;
            self.log_line_rejection(&mut tx, &receipt, batch_id, actor, reason).await;
            rejected.push(receipt.id);
        }

        self.repo.recalculate_totals(&mut *tx, batch_id).await?;
        self.repo.mark_closed(&mut *tx, batch_id, BatchStatus::Rejected).await?;

        self.activity
            .record(
                &mut *tx,
                NewActivity::batch(
                    batch_id,
                    batch.department_id,
                    ActivityAction::BatchRejected,
                    actor,
                    format!("Top-up request rejected by {}: {}", actor.label(), reason),
                )
                .with_metadata(json!({
                    "previousStatus": batch.status,
                    "rejectedReceiptIds": rejected,
                    "reason": reason,
                })),
            )
            .await;

        let detail = self.load_detail(&mut tx, batch_id).await?;
        tx.commit().await?;

        tracing::info!("Lote {} rejeitado ({} recibos)", batch_id, rejected.len());
        Ok(detail)
    }

    /// Admin retira o lote antes do HOD; os recibos continuam aprovados e soltos.
    pub async fn cancel(&self, batch_id: Uuid, actor: &Actor) -> Result<BatchDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let batch = self.lock(&mut tx, batch_id).await?;
        batch.status.apply(batch_id, BatchTransition::Cancel)?;

        let members = self.receipts.lock_batch_members(&mut *tx, batch_id).await?;
        let detached = self.receipts.detach_batch(&mut *tx, batch_id).await?;
        self.repo.recalculate_totals(&mut *tx, batch_id).await?;
        self.repo.mark_closed(&mut *tx, batch_id, BatchStatus::Cancelled).await?;

        self.activity
            .record(
                &mut *tx,
                NewActivity::batch(
                    batch_id,
                    batch.department_id,
                    ActivityAction::BatchCancelled,
                    actor,
                    format!("Top-up request withdrawn by {} ({} receipts released)", actor.label(), detached),
                )
                .with_metadata(json!({
                    "releasedReceiptIds": members.iter().map(|r| r.id).collect::<Vec<_>>(),
                })),
            )
            .await;

        let detail = self.load_detail(&mut tx, batch_id).await?;
        tx.commit().await?;

        tracing::info!("Lote {} retirado pelo admin", batch_id);
        Ok(detail)
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn get(&self, batch_id: Uuid) -> Result<BatchDetail, AppError> {
        let header = self
            .repo
            .find_by_id(&self.pool, batch_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lote {}", batch_id)))?;
        let receipts = self.receipts.list_by_batch(&self.pool, batch_id).await?;
        Ok(BatchDetail { header, receipts })
    }

    pub async fn list_pending_hod(&self, department_id: Uuid) -> Result<Vec<Batch>, AppError> {
        degrade_read(
            self.repo
                .list(&self.pool, Some(department_id), Some(BatchStatus::PendingHod))
                .await,
            "lotes",
        )
    }

    pub async fn list_pending_finance(&self) -> Result<Vec<Batch>, AppError> {
        degrade_read(
            self.repo
                .list(&self.pool, None, Some(BatchStatus::PendingFinance))
                .await,
            "lotes",
        )
    }

    pub async fn list_by_department(
        &self,
        department_id: Uuid,
        status: Option<BatchStatus>,
    ) -> Result<Vec<Batch>, AppError> {
        degrade_read(self.repo.list(&self.pool, Some(department_id), status).await, "lotes")
    }

    // --- helpers ---

    async fn lock(&self, tx: &mut Transaction<'_, Postgres>, batch_id: Uuid) -> Result<Batch, AppError> {
        self.repo
            .lock_by_id(&mut **tx, batch_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lote {}", batch_id)))
    }

    async fn load_detail(&self, tx: &mut Transaction<'_, Postgres>, batch_id: Uuid) -> Result<BatchDetail, AppError> {
        let header = self
            .repo
            .find_by_id(&mut **tx, batch_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lote {}", batch_id)))?;
        let receipts = self.receipts.list_by_batch(&mut **tx, batch_id).await?;
        Ok(BatchDetail { header, receipts })
    }

    async fn log_line_rejection(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        receipt: &Receipt,
        batch_id: Uuid,
        actor: &Actor,
        reason: &str,
    ) {
        self.activity
            .record(
                &mut **tx,
                NewActivity::receipt(
                    receipt.id,
                    receipt.department_id,
                    ActivityAction::Rejected,
                    actor,
                    format!(
                        "Receipt for {} rejected by {} during batch review: {}",
                        describe_amount(receipt.amount_total),
                        actor.label(),
                        reason
                    ),
                )
                .with_metadata(json!({ "batchId": batch_id, "reason": reason })),
            )
            .await;
    }
}

fn unique_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Pré-condições do lote: todos existem, são do departamento, não têm lote e
/// estão `submitted` ou `admin_approved`.
fn check_batchable(department_id: Uuid, ids: &[Uuid], receipts: &[Receipt]) -> Result<(), AppError> {
    if receipts.len() != ids.len() {
        let found: HashSet<Uuid> = receipts.iter().map(|r| r.id).collect();
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !found.contains(id))
            .map(Uuid::to_string)
            .collect();
        return Err(AppError::NotFound(format!("Recibos {}", missing.join(", "))));
    }

    for receipt in receipts {
        if receipt.department_id != department_id {
            return Err(AppError::Validation(format!(
                "Recibo {} pertence a outro departamento",
                receipt.id
            )));
        }
        if let Some(existing) = receipt.batch_id {
            return Err(AppError::invalid_transition(
                "receipt",
                receipt.id,
                format!("{} (lote {})", receipt.status, existing),
                "add_to_batch",
            ));
        }
        match receipt.status {
            ReceiptStatus::Submitted | ReceiptStatus::AdminApproved => {}
            ReceiptStatus::HodApproved | ReceiptStatus::Paid | ReceiptStatus::Rejected => {
                return Err(AppError::invalid_transition(
                    "receipt",
                    receipt.id,
                    receipt.status,
                    "add_to_batch",
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            activity::{ActorRole, EntityType},
            batch::tests::receipt,
        },
        services::test_support::{actor, dec, Workflow},
    };

    #[test]
    fn unique_ids_keeps_first_occurrence_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(unique_ids(&[a, b, a]), vec![a, b]);
    }

    #[test]
    fn batch_accepts_unbatched_submitted_or_approved_receipts() {
        let receipts = vec![
            receipt("50.00", "4.13", ReceiptStatus::AdminApproved),
            receipt("30.00", "2.48", ReceiptStatus::Submitted),
        ];
        let ids: Vec<Uuid> = receipts.iter().map(|r| r.id).collect();
        assert!(check_batchable(Uuid::nil(), &ids, &receipts).is_ok());
    }

    #[test]
    fn batch_refuses_already_batched_or_foreign_receipts() {
        let mut batched = receipt("50.00", "4.13", ReceiptStatus::AdminApproved);
        batched.batch_id = Some(Uuid::new_v4());
        let err = check_batchable(Uuid::nil(), &[batched.id], std::slice::from_ref(&batched)).unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition { .. }));

        let foreign = receipt("10.00", "0.83", ReceiptStatus::AdminApproved);
        let err = check_batchable(Uuid::new_v4(), &[foreign.id], std::slice::from_ref(&foreign)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn batch_refuses_terminal_receipts_and_reports_missing_ids() {
        let paid = receipt("10.00", "0.83", ReceiptStatus::Paid);
        let err = check_batchable(Uuid::nil(), &[paid.id], std::slice::from_ref(&paid)).unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition { .. }));

        let missing = Uuid::new_v4();
        let err = check_batchable(Uuid::nil(), &[missing], &[]).unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg.contains(&missing.to_string())));
    }

    // --- com banco (sqlx::test cria um banco limpo e roda as migrações) ---

    #[sqlx::test(migrations = "./migrations")]
    async fn single_receipt_goes_from_submission_to_paid(pool: PgPool) {
        let w = Workflow::new(pool).await;
        let admin = actor(ActorRole::Admin, "Admin Ops");

        let r = w.submit("45.00", "3.93").await;
        assert_eq!(r.status, ReceiptStatus::Submitted);
        assert_eq!(w.used_float().await, dec("0.00"));

        let r = w.receipts.admin_approve(r.id, &admin).await.unwrap();
        assert_eq!(r.status, ReceiptStatus::AdminApproved);
        assert_eq!(w.used_float().await, dec("45.00"));

        let batch = w.batches.create(w.department_id, &[r.id], &admin).await.unwrap();
        assert_eq!(batch.header.total_amount, dec("45.00"));
        assert_eq!(batch.header.status, BatchStatus::PendingHod);
        assert_eq!(batch.receipts[0].batch_id, Some(batch.header.id));

        let batch = w
            .batches
            .hod_approve(batch.header.id, &[], &HashMap::new(), &actor(ActorRole::Hod, "Hod"))
            .await
            .unwrap();
        assert_eq!(batch.header.status, BatchStatus::PendingFinance);
        assert_eq!(batch.receipts[0].status, ReceiptStatus::HodApproved);
        assert_eq!(w.used_float().await, dec("45.00"));

        let batch = w
            .batches
            .finance_approve(batch.header.id, &actor(ActorRole::Finance, "Finance"))
            .await
            .unwrap();
        assert_eq!(batch.header.status, BatchStatus::Paid);
        assert_eq!(batch.receipts[0].status, ReceiptStatus::Paid);

        let float = w.departments.get_float(w.department_id).await.unwrap();
        assert_eq!(float.used_float, dec("0.00"));
        assert_eq!(float.remaining_float, dec("3500.00"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn hod_rejection_detaches_the_line_and_resums_the_batch(pool: PgPool) {
        let w = Workflow::new(pool).await;
        let admin = actor(ActorRole::Admin, "Admin Ops");
        let hod = actor(ActorRole::Hod, "Hod");

        let fifty = w.submit("50.00", "4.13").await;
        let thirty = w.submit("30.00", "2.48").await;
        let twenty = w.submit("20.00", "1.65").await;

        // Recibos ainda submitted são aprovados na criação do lote
        let batch = w
            .batches
            .create(w.department_id, &[fifty.id, thirty.id, twenty.id], &admin)
            .await
            .unwrap();
        assert_eq!(batch.header.total_amount, dec("100.00"));
        let batch_id = batch.header.id;

        let reasons = HashMap::from([(thirty.id, "Duplicate claim".to_string())]);
        let batch = w.batches.hod_approve(batch_id, &[thirty.id], &reasons, &hod).await.unwrap();

        assert_eq!(batch.header.status, BatchStatus::PendingFinance);
        assert_eq!(batch.header.total_amount, dec("70.00"));
        assert_eq!(batch.header.total_gst, dec("5.78"));
        assert_eq!(batch.receipts.len(), 2);
        assert!(batch.receipts.iter().all(|r| r.status == ReceiptStatus::HodApproved));

        let rejected = w.receipts.get(thirty.id).await.unwrap();
        assert_eq!(rejected.status, ReceiptStatus::Rejected);
        assert_eq!(rejected.batch_id, None);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Duplicate claim"));

        let attached_rejections: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM receipts WHERE status = 'rejected' AND batch_id IS NOT NULL")
                .fetch_one(&w.pool)
                .await
                .unwrap();
        assert_eq!(attached_rejections, 0);
        assert_eq!(w.used_float().await, dec("70.00"));

        // Uma entrada por linha rejeitada e uma do lote, o lote por último
        let log = w.activity.list_by_department(w.department_id, None, None).await.unwrap();
        assert_eq!(log[0].action, ActivityAction::HodApproved);
        assert_eq!(log[0].entity_id, batch_id);
        assert_eq!(log[1].action, ActivityAction::Rejected);
        assert_eq!(log[1].entity_id, thirty.id);
        assert_eq!(log.iter().filter(|e| e.action == ActivityAction::Rejected).count(), 1);
        assert_eq!(log.iter().filter(|e| e.action == ActivityAction::HodApproved).count(), 1);
        assert!(log[0].created_at >= log[1].created_at);

        let line = w.activity.list_by_entity(EntityType::Receipt, thirty.id).await.unwrap();
        assert_eq!(line[0].metadata.as_ref().unwrap()["batchId"], json!(batch_id));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn second_hod_approval_is_refused(pool: PgPool) {
        let w = Workflow::new(pool).await;
        let admin = actor(ActorRole::Admin, "Admin Ops");
        let hod = actor(ActorRole::Hod, "Hod");

        let a = w.submit("50.00", "4.13").await;
        let b = w.submit("30.00", "2.48").await;
        let batch = w.batches.create(w.department_id, &[a.id, b.id], &admin).await.unwrap();
        let batch_id = batch.header.id;

        w.batches.hod_approve(batch_id, &[], &HashMap::new(), &hod).await.unwrap();
        let err = w
            .batches
            .hod_approve(batch_id, &[b.id], &HashMap::new(), &hod)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition { action: "hod_approve", .. }));

        // Nada mudou com a segunda chamada
        let batch = w.batches.get(batch_id).await.unwrap();
        assert_eq!(batch.header.total_amount, dec("80.00"));
        assert_eq!(w.receipts.get(b.id).await.unwrap().status, ReceiptStatus::HodApproved);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn recalculating_totals_twice_gives_the_same_result(pool: PgPool) {
        let w = Workflow::new(pool).await;
        let admin = actor(ActorRole::Admin, "Admin Ops");

        let a = w.submit("12.34", "1.02").await;
        let b = w.submit("7.66", "0.63").await;
        let batch = w.batches.create(w.department_id, &[a.id, b.id], &admin).await.unwrap();
        let repo = BatchRepository::new();

        let first = repo.recalculate_totals(&w.pool, batch.header.id).await.unwrap();
        let second = repo.recalculate_totals(&w.pool, batch.header.id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.total_amount, dec("20.00"));
        assert_eq!(first.total_gst, dec("1.65"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn whole_batch_rejection_releases_the_float(pool: PgPool) {
        let w = Workflow::new(pool).await;
        let admin = actor(ActorRole::Admin, "Admin Ops");

        let a = w.submit("50.00", "4.13").await;
        let b = w.submit("30.00", "2.48").await;
        let batch = w.batches.create(w.department_id, &[a.id, b.id], &admin).await.unwrap();
        assert_eq!(w.used_float().await, dec("80.00"));

        let batch = w
            .batches
            .reject(batch.header.id, &actor(ActorRole::Hod, "Hod"), "Over budget")
            .await
            .unwrap();
        assert_eq!(batch.header.status, BatchStatus::Rejected);
        assert_eq!(batch.header.total_amount, dec("0.00"));
        assert!(batch.receipts.is_empty());
        assert_eq!(w.used_float().await, dec("0.00"));

        let log = w.activity.list_by_department(w.department_id, None, None).await.unwrap();
        assert_eq!(log[0].action, ActivityAction::BatchRejected);
        assert_eq!(log.iter().filter(|e| e.action == ActivityAction::Rejected).count(), 2);
    }
}
