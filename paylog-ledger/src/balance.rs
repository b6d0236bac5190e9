//! Pure balance arithmetic over entry histories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::entry::LedgerEntry;

/// Balance after applying one entry on top of the prior balance.
pub fn next_balance(prior: Decimal, debit: Decimal, credit: Decimal) -> Decimal {
    prior + credit - debit
}

/// Fold an entry history into the current balance.
///
/// Entries must be in ascending id order; CANCELLED rows are skipped. The
/// result must always agree with the balance aggregates computed by storage.
pub fn replay<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Decimal {
    entries
        .into_iter()
        .filter(|entry| entry.is_balance_affecting())
        .fold(Decimal::ZERO, |acc, entry| acc + entry.signed_amount())
}

/// Aggregates over the balance-affecting entries of one employee.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LedgerTotals {
    pub credits: Decimal,
    pub debits: Decimal,
    pub entries: u64,
    pub last_transaction: Option<DateTime<Utc>>,
}

impl LedgerTotals {
    pub fn accumulate(&mut self, entry: &LedgerEntry) {
        if !entry.is_balance_affecting() {
            return;
        }
        self.credits += entry.credit_amount;
        self.debits += entry.debit_amount;
        self.entries += 1;
        if self
            .last_transaction
            .is_none_or(|seen| entry.transaction_date > seen)
        {
            self.last_transaction = Some(entry.transaction_date);
        }
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        let mut totals = Self::default();
        for entry in entries {
            totals.accumulate(entry);
        }
        totals
    }

    pub fn balance(&self) -> Decimal {
        self.credits - self.debits
    }
}
