//! Append-only employee ledger: validation, storage backends, and audit.

mod audit;
mod balance;
mod directory;
mod entry;
mod error;
mod ledger;
mod lock;
mod memory;
mod query;
mod reversal;
mod sqlite;
mod store;
mod summary;
mod validate;

pub use audit::{AuditFinding, AuditReport, LedgerAuditor};
pub use balance::{next_balance, replay, LedgerTotals};
pub use directory::{EmployeeDirectory, RosterFilter, StaticDirectory};
pub use entry::{EntryDraft, EntryStatus, LedgerEntry, TransactionType};
pub use error::{LedgerError, LedgerResult};
pub use ledger::Ledger;
pub use memory::MemoryLedgerStore;
pub use query::EntryFilter;
pub use reversal::{counter_draft, REVERSAL_REFERENCE};
pub use sqlite::SqliteLedgerStore;
pub use store::{LedgerStore, ReversalOutcome};
pub use summary::{EmployeeSummary, RosterRow};
pub use validate::{validate, ValidatedEntry, ValidationError};

#[cfg(test)]
mod tests {
    use super::*;
    use paylog_core::EmployeeId;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn snapshot_chain_matches_replay_and_totals() {
        let store = MemoryLedgerStore::new();
        let employee = EmployeeId::from("E-7");
        let postings = vec![
            EntryDraft::credit(
                employee.clone(),
                TransactionType::Payroll,
                dec!(2500),
                "payroll.bot",
            ),
            EntryDraft::debit(employee.clone(), TransactionType::Loan, dec!(400), "hr.clerk"),
            EntryDraft::credit(employee.clone(), TransactionType::Bonus, dec!(150), "hr.clerk"),
        ];
        let mut last = Decimal::ZERO;
        for draft in postings {
            last = store.insert(&validate(draft).unwrap()).unwrap().balance;
        }
        let history = store.history(&employee).unwrap();
        assert_eq!(last, replay(&history));
        assert_eq!(last, store.totals(&employee).unwrap().balance());
        assert_eq!(last, dec!(2250));
    }
}
