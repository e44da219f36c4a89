use chrono::NaiveDate;
use dealflow::application::approval::ApprovalWorkflow;
use dealflow::application::error_stats::{ErrorRateConfig, ErrorRateTracker};
use dealflow::application::scheduler::InstallmentScheduler;
use dealflow::application::service::TransactionService;
use dealflow::domain::commission::{AgentTier, CoBrokingTerms};
use dealflow::domain::schedule::{PaymentSchedule, ScheduleInstallment};
use dealflow::domain::status::{ActorRole, TransactionStatus};
use dealflow::domain::transaction::{NewTransaction, Transaction};
use dealflow::infrastructure::in_memory::{
    InMemoryAuditStore, InMemoryCommissionStore, InMemoryInstallmentStore, InMemoryScheduleStore,
    InMemoryTransactionStore, StaticRoleResolver,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

/// Fully wired engine over in-memory stores, with direct handles kept on
/// the concrete stores for inspection and fault injection.
pub struct Harness {
    pub transactions: Arc<InMemoryTransactionStore>,
    pub commissions: Arc<InMemoryCommissionStore>,
    pub installments: Arc<InMemoryInstallmentStore>,
    pub schedules: Arc<InMemoryScheduleStore>,
    pub audit: Arc<InMemoryAuditStore>,
    pub errors: Arc<ErrorRateTracker>,
    pub service: TransactionService,
    pub workflow: ApprovalWorkflow,
    pub agent_id: Uuid,
    pub admin_id: Uuid,
}

pub async fn wire() -> Harness {
    let transactions = Arc::new(InMemoryTransactionStore::new());
    let commissions = Arc::new(InMemoryCommissionStore::new());
    let installments = Arc::new(InMemoryInstallmentStore::new());
    let schedules = Arc::new(InMemoryScheduleStore::new());
    let audit = Arc::new(InMemoryAuditStore::new());
    let errors = Arc::new(ErrorRateTracker::new(ErrorRateConfig::default()));

    let agent_id = Uuid::new_v4();
    let admin_id = Uuid::new_v4();
    let resolver = StaticRoleResolver::new();
    resolver.assign(agent_id, ActorRole::Agent).await;
    resolver.assign(admin_id, ActorRole::Admin).await;

    let service = TransactionService::new(transactions.clone(), audit.clone(), errors.clone());
    let scheduler = InstallmentScheduler::new(
        transactions.clone(),
        installments.clone(),
        schedules.clone(),
        audit.clone(),
        errors.clone(),
    );
    let workflow = ApprovalWorkflow::new(
        transactions.clone(),
        commissions.clone(),
        scheduler,
        audit.clone(),
        Arc::new(resolver),
        errors.clone(),
    );

    Harness {
        transactions,
        commissions,
        installments,
        schedules,
        audit,
        errors,
        service,
        workflow,
        agent_id,
        admin_id,
    }
}

pub fn sample_input(agent_id: Uuid, value: Decimal, rate: Decimal) -> NewTransaction {
    NewTransaction {
        transaction_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        property_ref: "LOT-1187".into(),
        transaction_type: "sale".into(),
        transaction_value: value,
        commission_rate: rate,
        agent_id,
        co_agent_id: None,
        agent_tier: AgentTier::Advisor,
        co_broking: CoBrokingTerms::default(),
        payment_schedule_id: None,
        commission_amount: None,
    }
}

/// Creates a transaction and drives it to `Under Review`, returning the
/// record ready for an approval decision.
pub async fn submit_to_under_review(harness: &Harness, input: NewTransaction) -> Transaction {
    let tx = harness
        .service
        .create_transaction(input, harness.agent_id)
        .await
        .expect("create");
    let steps = [
        (TransactionStatus::Pending, harness.agent_id, ActorRole::Agent),
        (TransactionStatus::Submitted, harness.agent_id, ActorRole::Agent),
        (TransactionStatus::UnderReview, harness.admin_id, ActorRole::Admin),
    ];
    let mut current = tx;
    for (status, actor, role) in steps {
        current = harness
            .service
            .update_transaction_status(current.id, status, actor, role, None)
            .await
            .expect("lifecycle step");
    }
    current
}

/// Seeds a 50/30/20 schedule and returns its id.
pub async fn seed_default_schedule(harness: &Harness) -> Uuid {
    let schedule = PaymentSchedule {
        id: Uuid::new_v4(),
        name: "50/30/20".into(),
        installments: vec![
            ScheduleInstallment {
                number: 1,
                percentage: dec!(50),
                days_offset: 0,
                description: Some("on approval".into()),
            },
            ScheduleInstallment {
                number: 2,
                percentage: dec!(30),
                days_offset: 30,
                description: None,
            },
            ScheduleInstallment {
                number: 3,
                percentage: dec!(20),
                days_offset: 60,
                description: None,
            },
        ],
    };
    let id = schedule.id;
    harness.schedules.seed(schedule).await;
    id
}
