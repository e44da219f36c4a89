use clap::Parser;
use dealflow::application::approval::ApprovalWorkflow;
use dealflow::application::error_stats::{ErrorRateConfig, ErrorRateTracker};
use dealflow::application::scheduler::InstallmentScheduler;
use dealflow::application::service::TransactionService;
use dealflow::domain::commission::calculate;
use dealflow::domain::ports::{
    AuditStoreRef, CommissionStoreRef, InstallmentStoreRef, RoleResolverRef, ScheduleStoreRef,
    TransactionStoreRef,
};
use dealflow::domain::schedule::{PaymentSchedule, ScheduleInstallment};
use dealflow::domain::status::{ActorRole, TransactionStatus};
use dealflow::infrastructure::in_memory::{
    InMemoryAuditStore, InMemoryCommissionStore, InMemoryInstallmentStore, InMemoryScheduleStore,
    InMemoryTransactionStore, StaticRoleResolver,
};
use dealflow::interfaces::csv::intake_reader::IntakeReader;
use dealflow::interfaces::csv::report_writer::ReportWriter;
use miette::{IntoDiagnostic, Result, miette};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Runs intake transactions through the full lifecycle and prints a
/// commission report CSV on stdout.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input intake CSV file (date, property, type, value, rate, tier,
    /// co_broking, split)
    input: PathBuf,

    /// Payment schedule as percent:days pairs, e.g. "50:0;30:30;20:60".
    /// When given, installments are generated for every approval.
    #[arg(long)]
    schedule: Option<String>,
}

fn parse_schedule(arg: &str) -> Result<Vec<ScheduleInstallment>> {
    arg.split(';')
        .enumerate()
        .map(|(i, part)| {
            let (pct, days) = part
                .split_once(':')
                .ok_or_else(|| miette!("bad schedule segment '{part}', expected percent:days"))?;
            Ok(ScheduleInstallment {
                number: i as u32 + 1,
                percentage: Decimal::from_str(pct.trim()).into_diagnostic()?,
                days_offset: days.trim().parse().into_diagnostic()?,
                description: None,
            })
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let transactions: TransactionStoreRef = Arc::new(InMemoryTransactionStore::new());
    let commissions: CommissionStoreRef = Arc::new(InMemoryCommissionStore::new());
    let installments: InstallmentStoreRef = Arc::new(InMemoryInstallmentStore::new());
    let schedule_store = Arc::new(InMemoryScheduleStore::new());
    let audit: AuditStoreRef = Arc::new(InMemoryAuditStore::new());
    let errors = Arc::new(ErrorRateTracker::new(ErrorRateConfig::default()));

    let agent_id = Uuid::new_v4();
    let admin_id = Uuid::new_v4();
    let resolver = StaticRoleResolver::new();
    resolver.assign(agent_id, ActorRole::Agent).await;
    resolver.assign(admin_id, ActorRole::Admin).await;
    let roles: RoleResolverRef = Arc::new(resolver);

    let schedule_id = match &cli.schedule {
        Some(arg) => {
            let schedule = PaymentSchedule {
                id: Uuid::new_v4(),
                name: arg.clone(),
                installments: parse_schedule(arg)?,
            };
            let id = schedule.id;
            schedule_store.seed(schedule).await;
            Some(id)
        }
        None => None,
    };
    let schedules: ScheduleStoreRef = schedule_store;

    let service = TransactionService::new(transactions.clone(), audit.clone(), errors.clone());
    let scheduler = InstallmentScheduler::new(
        transactions.clone(),
        installments,
        schedules,
        audit.clone(),
        errors.clone(),
    );
    let workflow = ApprovalWorkflow::new(
        transactions,
        commissions,
        scheduler,
        audit,
        roles,
        errors,
    );

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = IntakeReader::new(file);

    let stdout = io::stdout();
    let mut report = ReportWriter::new(stdout.lock());

    for row in reader.rows() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                error!(%err, "skipping unreadable intake row");
                continue;
            }
        };
        let mut input = row.into_new_transaction(agent_id);
        input.payment_schedule_id = schedule_id;

        if let Err(err) = drive_to_approval(&service, &workflow, input, agent_id, admin_id, &mut report).await
        {
            error!(%err, "transaction failed");
        }
    }

    report.flush().into_diagnostic()?;
    Ok(())
}

async fn drive_to_approval(
    service: &TransactionService,
    workflow: &ApprovalWorkflow,
    input: dealflow::domain::transaction::NewTransaction,
    agent_id: Uuid,
    admin_id: Uuid,
    report: &mut ReportWriter<io::StdoutLock<'_>>,
) -> miette::Result<()> {
    let tx = service
        .create_transaction(input, agent_id)
        .await
        .map_err(|e| miette!("{e}"))?;

    let steps = [
        (TransactionStatus::Pending, agent_id, ActorRole::Agent),
        (TransactionStatus::Submitted, agent_id, ActorRole::Agent),
        (TransactionStatus::UnderReview, admin_id, ActorRole::Admin),
    ];
    let mut current = tx;
    for (status, actor, role) in steps {
        current = service
            .update_transaction_status(current.id, status, actor, role, None)
            .await
            .map_err(|e| miette!("{e}"))?;
    }

    let approved = workflow
        .approve(current.id, current.version, admin_id, Some("intake batch"))
        .await
        .map_err(|e| miette!("{e}"))?;

    let breakdown = calculate(&approved.commission_input());
    report
        .write_row(&approved, &breakdown)
        .map_err(|e| miette!("{e}"))?;
    Ok(())
}
