use rust_decimal::Decimal;
use serde::Serialize;

use paylog_core::{EmployeeId, LedgerId, Page, Paged};

use crate::balance::LedgerTotals;
use crate::entry::LedgerEntry;
use crate::error::LedgerResult;
use crate::query::EntryFilter;
use crate::validate::{ValidatedEntry, ValidationError};

/// Both rows touched by an atomic reversal.
#[derive(Clone, Debug, Serialize)]
pub struct ReversalOutcome {
    /// The original entry, now REVERSED.
    pub original: LedgerEntry,
    /// The freshly posted counter-entry.
    pub counter: LedgerEntry,
}

/// Abstraction over durable ledger storage engines.
///
/// Implementations must make `insert` and `reverse` atomic: the prior-balance
/// read, the snapshot computation, and the row writes happen in one
/// transaction, and a failed reversal leaves neither row changed.
pub trait LedgerStore: Send + Sync {
    /// Persist a validated entry and return the stored row with its assigned
    /// id and balance snapshot.
    fn insert(&self, entry: &ValidatedEntry) -> LedgerResult<LedgerEntry>;

    /// Load one entry by id.
    fn entry(&self, id: LedgerId) -> LedgerResult<LedgerEntry>;

    /// Load one page of an employee's entries, newest first
    /// (`transaction_date DESC, id DESC`).
    fn entries_for(
        &self,
        employee: &EmployeeId,
        filter: &EntryFilter,
        page: Page,
    ) -> LedgerResult<Paged<LedgerEntry>>;

    /// Load the complete history of an employee in ascending id order,
    /// including CANCELLED and REVERSED rows.
    fn history(&self, employee: &EmployeeId) -> LedgerResult<Vec<LedgerEntry>>;

    /// Aggregate the balance-affecting entries of an employee.
    fn totals(&self, employee: &EmployeeId) -> LedgerResult<LedgerTotals>;

    /// Flip an ACTIVE entry to CANCELLED without posting a counter-entry.
    fn cancel(&self, id: LedgerId) -> LedgerResult<LedgerEntry>;

    /// Atomically post the counter-entry and flip the original to REVERSED.
    fn reverse(&self, original: LedgerId, counter: &ValidatedEntry) -> LedgerResult<ReversalOutcome>;

    /// Current balance of an employee; zero when no entries exist.
    fn current_balance(&self, employee: &EmployeeId) -> LedgerResult<Decimal> {
        Ok(self.totals(employee)?.balance())
    }
}

/// Storage-side re-check of the debit/credit exclusivity invariant before a
/// row is written.
pub(crate) fn enforce_exclusivity(debit: Decimal, credit: Decimal) -> Result<(), ValidationError> {
    if debit < Decimal::ZERO {
        return Err(ValidationError::NegativeDebit(debit));
    }
    if credit < Decimal::ZERO {
        return Err(ValidationError::NegativeCredit(credit));
    }
    if debit.is_zero() && credit.is_zero() {
        return Err(ValidationError::NoAmount);
    }
    if !debit.is_zero() && !credit.is_zero() {
        return Err(ValidationError::BothAmounts { debit, credit });
    }
    Ok(())
}
