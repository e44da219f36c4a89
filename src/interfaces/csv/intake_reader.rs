use crate::domain::commission::{AgentTier, CoBrokingTerms};
use crate::domain::transaction::NewTransaction;
use crate::error::{EngineError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use uuid::Uuid;

/// One submitted transaction as it arrives from an intake CSV.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct IntakeRow {
    pub date: NaiveDate,
    pub property: String,
    pub r#type: String,
    pub value: Decimal,
    pub rate: Decimal,
    pub tier: String,
    #[serde(default)]
    pub co_broking: bool,
    #[serde(default)]
    pub split: Option<Decimal>,
}

impl IntakeRow {
    pub fn into_new_transaction(self, agent_id: Uuid) -> NewTransaction {
        NewTransaction {
            transaction_date: self.date,
            property_ref: self.property,
            transaction_type: self.r#type,
            transaction_value: self.value,
            commission_rate: self.rate,
            agent_id,
            co_agent_id: None,
            agent_tier: AgentTier::from_name(&self.tier),
            co_broking: CoBrokingTerms {
                enabled: self.co_broking,
                commission_split: self.split,
            },
            payment_schedule_id: None,
            commission_amount: None,
        }
    }
}

/// Streaming reader over intake rows.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record
/// lengths; rows are yielded lazily so large files never sit in memory.
pub struct IntakeReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> IntakeReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn rows(self) -> impl Iterator<Item = Result<IntakeRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(EngineError::from))
    }
}
