mod common;

use common::{sample_input, seed_default_schedule, submit_to_under_review, wire};
use dealflow::domain::audit::{ACTION_COMMISSION_VOIDED, ACTION_STATUS_CHANGED};
use dealflow::domain::ports::{AuditStore, CommissionStore, InstallmentStore, TransactionStore};
use dealflow::domain::schedule::CommissionStatus;
use dealflow::domain::status::{ActorRole, TransactionStatus};
use dealflow::domain::transaction::{Pagination, TransactionFilter};
use dealflow::error::EngineError;
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
async fn test_create_forces_draft_and_derives_commission() {
    let h = wire().await;
    let mut input = sample_input(h.agent_id, dec!(500000), dec!(2.5));
    input.commission_amount = None;

    let tx = h
        .service
        .create_transaction(input, h.agent_id)
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Draft);
    assert_eq!(tx.version, 1);
    assert_eq!(tx.commission_amount, Some(dec!(12500)));
    assert!(!tx.installments_generated);
}

#[tokio::test]
async fn test_create_rejects_invalid_value_before_persisting() {
    let h = wire().await;
    let input = sample_input(h.agent_id, dec!(-1), dec!(2.5));
    let err = h
        .service
        .create_transaction(input, h.agent_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let page = h
        .service
        .list_transactions(&TransactionFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_admin_approval_path_and_agent_forbidden_at_each_step() {
    let h = wire().await;

    // Admin path succeeds end to end.
    let tx = submit_to_under_review(&h, sample_input(h.agent_id, dec!(500000), dec!(2.5))).await;
    assert_eq!(tx.status, TransactionStatus::UnderReview);
    let approved = h
        .workflow
        .approve(tx.id, tx.version, h.admin_id, None)
        .await
        .unwrap();
    assert_eq!(approved.status, TransactionStatus::Approved);

    // The same review steps as agent are Forbidden every time.
    let tx = h
        .service
        .create_transaction(sample_input(h.agent_id, dec!(500000), dec!(2.5)), h.agent_id)
        .await
        .unwrap();
    let mut current = tx;
    for status in [TransactionStatus::Pending, TransactionStatus::Submitted] {
        current = h
            .service
            .update_transaction_status(current.id, status, h.agent_id, ActorRole::Agent, None)
            .await
            .unwrap();
    }
    for target in [TransactionStatus::UnderReview, TransactionStatus::Approved] {
        let err = h
            .service
            .update_transaction_status(current.id, target, h.agent_id, ActorRole::Agent, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { .. }), "{target:?}");
    }
    // Agent approval through the workflow is equally denied.
    let err = h
        .workflow
        .approve(current.id, current.version, h.agent_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden { .. }));
}

#[tokio::test]
async fn test_status_updates_append_notes_and_audit_snapshots() {
    let h = wire().await;
    let tx = h
        .service
        .create_transaction(sample_input(h.agent_id, dec!(500000), dec!(2.5)), h.agent_id)
        .await
        .unwrap();

    let tx = h
        .service
        .update_transaction_status(
            tx.id,
            TransactionStatus::Pending,
            h.agent_id,
            ActorRole::Agent,
            Some("ready for checks"),
        )
        .await
        .unwrap();
    let tx = h
        .service
        .update_transaction_status(
            tx.id,
            TransactionStatus::Submitted,
            h.agent_id,
            ActorRole::Agent,
            None,
        )
        .await
        .unwrap();

    // Notes accumulate, never overwrite.
    assert_eq!(tx.notes.lines().count(), 2);
    assert!(tx.notes.contains("ready for checks"));

    // The audit trail carries structured before/after snapshots.
    let entries = h.audit.entries_for(tx.id).await.unwrap();
    let status_changes: Vec<_> = entries
        .iter()
        .filter(|e| e.action == ACTION_STATUS_CHANGED)
        .collect();
    assert_eq!(status_changes.len(), 2);
    assert_eq!(status_changes[0].previous_state["status"], "Draft");
    assert_eq!(status_changes[0].new_state["status"], "Pending");
    assert_eq!(status_changes[1].previous_state["status"], "Pending");
    assert_eq!(status_changes[1].new_state["status"], "Submitted");
}

#[tokio::test]
async fn test_version_increments_by_one_per_write() {
    let h = wire().await;
    let tx = submit_to_under_review(&h, sample_input(h.agent_id, dec!(500000), dec!(2.5))).await;
    // create = 1, three lifecycle steps follow.
    assert_eq!(tx.version, 4);
    let approved = h
        .workflow
        .approve(tx.id, tx.version, h.admin_id, None)
        .await
        .unwrap();
    assert_eq!(approved.version, 5);
}

#[tokio::test]
async fn test_get_transaction_is_idempotent_and_not_found_is_distinct() {
    let h = wire().await;
    let tx = h
        .service
        .create_transaction(sample_input(h.agent_id, dec!(500000), dec!(2.5)), h.agent_id)
        .await
        .unwrap();

    let first = h.service.get_transaction(tx.id).await.unwrap();
    let second = h.service.get_transaction(tx.id).await.unwrap();
    assert_eq!(first, second);

    let err = h.service.get_transaction(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[tokio::test]
async fn test_listing_filters_by_agent_and_status() {
    let h = wire().await;
    let other_agent = Uuid::new_v4();
    for value in [dec!(100000), dec!(200000)] {
        h.service
            .create_transaction(sample_input(h.agent_id, value, dec!(2)), h.agent_id)
            .await
            .unwrap();
    }
    h.service
        .create_transaction(sample_input(other_agent, dec!(300000), dec!(2)), other_agent)
        .await
        .unwrap();

    let filter = TransactionFilter {
        agent_id: Some(h.agent_id),
        statuses: Some(vec![TransactionStatus::Draft]),
        ..Default::default()
    };
    let page = h
        .service
        .list_transactions(&filter, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert!(page.items.iter().all(|tx| tx.agent_id == h.agent_id));
}

#[tokio::test]
async fn test_approve_creates_commission_and_reject_does_not() {
    let h = wire().await;

    let tx = submit_to_under_review(&h, sample_input(h.agent_id, dec!(500000), dec!(2.5))).await;
    h.workflow
        .approve(tx.id, tx.version, h.admin_id, None)
        .await
        .unwrap();
    let commission = h.commissions.get_by_transaction(tx.id).await.unwrap().unwrap();
    assert_eq!(commission.amount, dec!(12500));
    assert_eq!(commission.status, CommissionStatus::Pending);
    assert_eq!(commission.agent_id, h.agent_id);

    let tx = submit_to_under_review(&h, sample_input(h.agent_id, dec!(400000), dec!(2))).await;
    let rejected = h
        .workflow
        .reject(tx.id, tx.version, h.admin_id, Some("missing documents"))
        .await
        .unwrap();
    assert_eq!(rejected.status, TransactionStatus::Rejected);
    assert!(h.commissions.get_by_transaction(tx.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_late_rejection_voids_commission_but_keeps_rows() {
    let h = wire().await;
    let schedule_id = seed_default_schedule(&h).await;
    let mut input = sample_input(h.agent_id, dec!(500000), dec!(2.5));
    input.payment_schedule_id = Some(schedule_id);

    let tx = submit_to_under_review(&h, input).await;
    let approved = h
        .workflow
        .approve(tx.id, tx.version, h.admin_id, None)
        .await
        .unwrap();
    let commission = h.commissions.get_by_transaction(tx.id).await.unwrap().unwrap();
    assert_eq!(h.installments.list_by_commission(commission.id).await.unwrap().len(), 3);

    // Pull it back and reject it.
    let reopened = h
        .service
        .update_transaction_status(
            approved.id,
            TransactionStatus::UnderReview,
            h.admin_id,
            ActorRole::Admin,
            None,
        )
        .await
        .unwrap();
    h.workflow
        .reject(reopened.id, reopened.version, h.admin_id, Some("audit finding"))
        .await
        .unwrap();

    let voided = h.commissions.get_by_transaction(tx.id).await.unwrap().unwrap();
    assert_eq!(voided.status, CommissionStatus::Voided);
    assert_eq!(voided.amount, dec!(0));

    // History and installment rows survive the void.
    let history = h.commissions.adjustments(commission.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].previous_amount, dec!(12500));
    assert_eq!(history[0].new_amount, dec!(0));
    assert_eq!(h.installments.list_by_commission(commission.id).await.unwrap().len(), 3);

    let entries = h.audit.entries_for(commission.id).await.unwrap();
    assert!(entries.iter().any(|e| e.action == ACTION_COMMISSION_VOIDED));
}

#[tokio::test]
async fn test_adjustment_preserves_history() {
    let h = wire().await;
    let tx = submit_to_under_review(&h, sample_input(h.agent_id, dec!(500000), dec!(2.5))).await;
    h.workflow
        .approve(tx.id, tx.version, h.admin_id, None)
        .await
        .unwrap();
    let commission = h.commissions.get_by_transaction(tx.id).await.unwrap().unwrap();

    let adjustment = h
        .workflow
        .adjust_commission(commission.id, dec!(12000), "negotiated discount", h.admin_id)
        .await
        .unwrap();
    assert_eq!(adjustment.previous_amount, dec!(12500));
    assert_eq!(adjustment.new_amount, dec!(12000));

    let updated = h.commissions.get_by_transaction(tx.id).await.unwrap().unwrap();
    assert_eq!(updated.amount, dec!(12000));
}

#[tokio::test]
async fn test_transition_to_terminal_states_is_final() {
    let h = wire().await;
    let tx = submit_to_under_review(&h, sample_input(h.agent_id, dec!(500000), dec!(2.5))).await;
    let approved = h
        .workflow
        .approve(tx.id, tx.version, h.admin_id, None)
        .await
        .unwrap();
    let completed = h
        .service
        .update_transaction_status(
            approved.id,
            TransactionStatus::Completed,
            h.admin_id,
            ActorRole::Admin,
            None,
        )
        .await
        .unwrap();
    assert_eq!(completed.status, TransactionStatus::Completed);

    for target in [TransactionStatus::Draft, TransactionStatus::UnderReview] {
        let err = h
            .service
            .update_transaction_status(completed.id, target, h.admin_id, ActorRole::Admin, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { .. }));
    }

    // Cancellation is a terminal status, not deletion.
    let cancelled = h
        .service
        .create_transaction(sample_input(h.agent_id, dec!(100000), dec!(2)), h.agent_id)
        .await
        .unwrap();
    let cancelled = h
        .service
        .update_transaction_status(
            cancelled.id,
            TransactionStatus::Cancelled,
            h.agent_id,
            ActorRole::Agent,
            None,
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, TransactionStatus::Cancelled);
    assert!(h.transactions.get(cancelled.id).await.unwrap().is_some());
}
