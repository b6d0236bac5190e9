//! CSV export of ledger histories.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::SecondsFormat;

use paylog_ledger::LedgerEntry;

const EXPORT_HEADER: [&str; 15] = [
    "id",
    "employee_id",
    "transaction_date",
    "transaction_type",
    "debit_amount",
    "credit_amount",
    "balance",
    "status",
    "reference_id",
    "reference_type",
    "reference_description",
    "period",
    "created_by",
    "created_at",
    "updated_at",
];

/// Write a history as CSV rows and return the number of data rows written.
///
/// Rows keep the order they were handed in; optional columns are left empty.
pub fn write_history_csv(entries: &[LedgerEntry], writer: impl Write) -> Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(EXPORT_HEADER)
        .context("writing CSV header")?;
    for entry in entries {
        csv.write_record(&[
            entry.id.to_string(),
            entry.employee_id.to_string(),
            timestamp(&entry.transaction_date),
            entry.transaction_type.to_string(),
            entry.debit_amount.to_string(),
            entry.credit_amount.to_string(),
            entry.balance.to_string(),
            entry.status.to_string(),
            entry
                .reference_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            entry.reference_type.clone().unwrap_or_default(),
            entry.reference_description.clone().unwrap_or_default(),
            entry.period.map(|p| p.to_string()).unwrap_or_default(),
            entry.created_by.clone(),
            timestamp(&entry.created_at),
            timestamp(&entry.updated_at),
        ])
        .with_context(|| format!("writing CSV row for entry {}", entry.id))?;
    }
    csv.flush().context("flushing CSV output")?;
    Ok(entries.len())
}

fn timestamp(value: &chrono::DateTime<chrono::Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}
