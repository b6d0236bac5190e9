//! High-level ledger service coordinating validation, locking, and storage.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use paylog_core::{EmployeeId, LedgerId, Page, Paged};

use crate::audit::{AuditReport, LedgerAuditor};
use crate::directory::{EmployeeDirectory, RosterFilter};
use crate::entry::{EntryDraft, LedgerEntry};
use crate::error::{LedgerError, LedgerResult};
use crate::lock::EmployeeLocks;
use crate::query::EntryFilter;
use crate::reversal::counter_draft;
use crate::store::{LedgerStore, ReversalOutcome};
use crate::summary::{EmployeeSummary, RosterRow};
use crate::validate::{validate, ValidationError};

/// Append-only employee ledger.
///
/// Writes targeting the same employee are serialized through an in-process
/// lock so that each stored balance snapshot extends the previous one. Reads
/// never take the lock.
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    directory: Arc<dyn EmployeeDirectory>,
    locks: EmployeeLocks,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>, directory: Arc<dyn EmployeeDirectory>) -> Self {
        Self {
            store,
            directory,
            locks: EmployeeLocks::new(),
        }
    }

    /// Validate and append a new entry, returning the stored row.
    pub fn post(&self, draft: EntryDraft) -> LedgerResult<LedgerEntry> {
        let validated = validate(draft)?;
        let cell = self.locks.cell(&validated.draft().employee_id);
        let _guard = cell.lock();
        let entry = self.store.insert(&validated)?;
        info!(
            employee = %entry.employee_id,
            id = %entry.id,
            kind = %entry.transaction_type,
            "ledger entry posted"
        );
        Ok(entry)
    }

    /// Reverse an active entry by appending a compensating counter-entry.
    ///
    /// The original is marked REVERSED and the counter posted in one atomic
    /// step; afterwards the pair nets to zero in every balance.
    pub fn reverse(
        &self,
        original: LedgerId,
        reason: &str,
        acting_user: &str,
    ) -> LedgerResult<ReversalOutcome> {
        if reason.trim().is_empty() {
            return Err(ValidationError::EmptyReason.into());
        }
        let target = self.store.entry(original)?;
        let cell = self.locks.cell(&target.employee_id);
        let _guard = cell.lock();
        let counter = validate(counter_draft(&target, reason, acting_user))?;
        let outcome = self.store.reverse(original, &counter)?;
        info!(
            employee = %outcome.original.employee_id,
            original = %outcome.original.id,
            counter = %outcome.counter.id,
            "ledger entry reversed"
        );
        Ok(outcome)
    }

    /// Administratively cancel an active entry without a counter-entry.
    ///
    /// Cancelled entries stop counting toward balances but stay in history.
    pub fn cancel(&self, id: LedgerId) -> LedgerResult<LedgerEntry> {
        let target = self.store.entry(id)?;
        let cell = self.locks.cell(&target.employee_id);
        let _guard = cell.lock();
        let entry = self.store.cancel(id)?;
        info!(employee = %entry.employee_id, id = %entry.id, "ledger entry cancelled");
        Ok(entry)
    }

    pub fn entry(&self, id: LedgerId) -> LedgerResult<LedgerEntry> {
        self.store.entry(id)
    }

    /// Page through an employee's entries, newest first.
    pub fn entries_for(
        &self,
        employee: &EmployeeId,
        filter: &EntryFilter,
        page: Page,
    ) -> LedgerResult<Paged<LedgerEntry>> {
        self.store.entries_for(employee, filter, page)
    }

    /// Full history in insertion order, including cancelled and reversed rows.
    pub fn history(&self, employee: &EmployeeId) -> LedgerResult<Vec<LedgerEntry>> {
        self.store.history(employee)
    }

    pub fn current_balance(&self, employee: &EmployeeId) -> LedgerResult<Decimal> {
        self.store.current_balance(employee)
    }

    /// Totals and identity for one employee.
    ///
    /// Unknown employees are rejected here even though balance queries treat
    /// them as empty histories.
    pub fn employee_summary(&self, employee: &EmployeeId) -> LedgerResult<EmployeeSummary> {
        let profile = self
            .directory
            .profile(employee)?
            .ok_or_else(|| LedgerError::EmployeeNotFound(employee.clone()))?;
        let totals = self.store.totals(employee)?;
        Ok(EmployeeSummary::from_parts(profile, &totals))
    }

    /// One roster page with balances attached, including employees that have
    /// never been posted to.
    pub fn roster_summary(
        &self,
        filter: &RosterFilter,
        page: Page,
    ) -> LedgerResult<Paged<RosterRow>> {
        let profiles = self.directory.roster(filter, page)?;
        let mut items = Vec::with_capacity(profiles.items.len());
        for profile in profiles.items {
            let totals = self.store.totals(&profile.id)?;
            items.push(RosterRow::from_parts(profile, &totals));
        }
        Ok(Paged {
            items,
            page: profiles.page,
            total: profiles.total,
        })
    }

    /// Replay an employee's stored history and report every divergence.
    pub fn audit_employee(&self, employee: &EmployeeId) -> LedgerResult<AuditReport> {
        let history = self.store.history(employee)?;
        Ok(LedgerAuditor::audit(&history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticDirectory;
    use crate::entry::TransactionType;
    use crate::memory::MemoryLedgerStore;
    use paylog_core::EmployeeProfile;
    use rust_decimal_macros::dec;

    fn service() -> Ledger {
        let directory = StaticDirectory::new(vec![
            EmployeeProfile::new("E-1001", "Alice Moreau").with_department("Engineering"),
            EmployeeProfile::new("E-1002", "Bob Tanaka"),
        ]);
        Ledger::new(
            Arc::new(MemoryLedgerStore::new()),
            Arc::new(directory),
        )
    }

    #[test]
    fn post_then_reverse_restores_the_balance() {
        let ledger = service();
        let advance = ledger
            .post(EntryDraft::debit(
                "E-1001",
                TransactionType::Advance,
                dec!(5000),
                "hr.clerk",
            ))
            .unwrap();
        assert_eq!(advance.balance, dec!(-5000));

        ledger
            .post(EntryDraft::credit(
                "E-1001",
                TransactionType::Payroll,
                dec!(20000),
                "payroll.bot",
            ))
            .unwrap();
        assert_eq!(
            ledger.current_balance(&EmployeeId::from("E-1001")).unwrap(),
            dec!(15000)
        );

        let outcome = ledger
            .reverse(advance.id, "duplicate advance", "auditor")
            .unwrap();
        assert_eq!(outcome.counter.credit_amount, dec!(5000));
        assert_eq!(
            ledger.current_balance(&EmployeeId::from("E-1001")).unwrap(),
            dec!(20000)
        );
        assert!(ledger
            .audit_employee(&EmployeeId::from("E-1001"))
            .unwrap()
            .is_clean());
    }

    #[test]
    fn reverse_requires_a_reason() {
        let ledger = service();
        let entry = ledger
            .post(EntryDraft::credit(
                "E-1001",
                TransactionType::Bonus,
                dec!(100),
                "hr.clerk",
            ))
            .unwrap();
        let err = ledger.reverse(entry.id, "   ", "auditor").unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::EmptyReason)
        ));
    }

    #[test]
    fn summary_rejects_unknown_employees() {
        let ledger = service();
        let err = ledger
            .employee_summary(&EmployeeId::from("E-9999"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::EmployeeNotFound(_)));
        // Balance queries stay permissive for the same id.
        assert_eq!(
            ledger.current_balance(&EmployeeId::from("E-9999")).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn roster_includes_employees_without_entries() {
        let ledger = service();
        ledger
            .post(EntryDraft::credit(
                "E-1001",
                TransactionType::Payroll,
                dec!(1000),
                "payroll.bot",
            ))
            .unwrap();
        let page = ledger
            .roster_summary(&RosterFilter::default(), Page::default())
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].balance, dec!(1000));
        assert_eq!(page.items[1].balance, Decimal::ZERO);
        assert_eq!(page.items[1].entries, 0);
    }
}
