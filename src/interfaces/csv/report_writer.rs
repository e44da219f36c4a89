use crate::domain::commission::{CommissionBreakdown, round_currency};
use crate::domain::transaction::Transaction;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct ReportRow {
    transaction_id: String,
    property: String,
    status: String,
    total_commission: Decimal,
    our_agency_commission: Decimal,
    co_agency_commission: Option<Decimal>,
    agency_share: Decimal,
    agent_share: Decimal,
}

/// Writes the commission report CSV consumed by downstream reporting.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_row(&mut self, tx: &Transaction, breakdown: &CommissionBreakdown) -> Result<()> {
        self.writer.serialize(ReportRow {
            transaction_id: tx.id.to_string(),
            property: tx.property_ref.clone(),
            status: tx.status.to_string(),
            total_commission: round_currency(breakdown.total_commission),
            our_agency_commission: round_currency(breakdown.our_agency_commission),
            co_agency_commission: breakdown.co_agency_commission.map(round_currency),
            agency_share: round_currency(breakdown.agency_share),
            agent_share: round_currency(breakdown.agent_share),
        })?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
