use chrono::{SubsecRound, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use paylog_core::{money, EmployeeId, LedgerId, Page, Paged};

use crate::balance::LedgerTotals;
use crate::entry::{EntryStatus, LedgerEntry};
use crate::error::{LedgerError, LedgerResult};
use crate::query::EntryFilter;
use crate::store::{enforce_exclusivity, LedgerStore, ReversalOutcome};
use crate::validate::ValidatedEntry;

/// In-process ledger store for tests and ephemeral runs.
///
/// Shares the storage semantics of the SQLite backend: one mutex guard spans
/// each write, so the prior-balance fold and the dependent append are atomic.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: i64,
    rows: Vec<LedgerEntry>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryInner {
    fn prior_balance(&self, employee: &EmployeeId) -> Decimal {
        self.rows
            .iter()
            .filter(|row| &row.employee_id == employee && row.is_balance_affecting())
            .fold(Decimal::ZERO, |acc, row| acc + row.signed_amount())
    }

    fn append(&mut self, entry: &ValidatedEntry) -> LedgerResult<LedgerEntry> {
        let draft = entry.draft();
        enforce_exclusivity(draft.debit_amount, draft.credit_amount)?;
        let debit_minor = money::to_minor_units(draft.debit_amount)?;
        let credit_minor = money::to_minor_units(draft.credit_amount)?;

        let prior = self.prior_balance(&draft.employee_id);
        let balance = prior + money::from_minor_units(credit_minor)
            - money::from_minor_units(debit_minor);

        self.next_id += 1;
        let now = Utc::now().trunc_subsecs(6);
        let row = LedgerEntry {
            id: LedgerId::new(self.next_id),
            employee_id: draft.employee_id.clone(),
            transaction_date: draft.transaction_date.unwrap_or(now).trunc_subsecs(6),
            transaction_type: draft.transaction_type,
            debit_amount: money::from_minor_units(debit_minor),
            credit_amount: money::from_minor_units(credit_minor),
            balance,
            reference_id: draft.reference_id,
            reference_type: draft.reference_type.clone(),
            reference_description: draft.reference_description.clone(),
            period: draft.period,
            status: EntryStatus::Active,
            created_by: draft.created_by.clone(),
            created_at: now,
            updated_at: now,
        };
        self.rows.push(row.clone());
        Ok(row)
    }

    fn position(&self, id: LedgerId) -> LedgerResult<usize> {
        self.rows
            .iter()
            .position(|row| row.id == id)
            .ok_or(LedgerError::EntryNotFound(id))
    }

    fn transition(&mut self, id: LedgerId, to: EntryStatus) -> LedgerResult<LedgerEntry> {
        let idx = self.position(id)?;
        if self.rows[idx].status != EntryStatus::Active {
            return Err(LedgerError::InvalidTransition {
                id,
                status: self.rows[idx].status,
            });
        }
        self.rows[idx].status = to;
        self.rows[idx].updated_at = Utc::now().trunc_subsecs(6);
        Ok(self.rows[idx].clone())
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn insert(&self, entry: &ValidatedEntry) -> LedgerResult<LedgerEntry> {
        self.inner.lock().append(entry)
    }

    fn entry(&self, id: LedgerId) -> LedgerResult<LedgerEntry> {
        let inner = self.inner.lock();
        let idx = inner.position(id)?;
        Ok(inner.rows[idx].clone())
    }

    fn entries_for(
        &self,
        employee: &EmployeeId,
        filter: &EntryFilter,
        page: Page,
    ) -> LedgerResult<Paged<LedgerEntry>> {
        let inner = self.inner.lock();
        let mut matched: Vec<LedgerEntry> = inner
            .rows
            .iter()
            .filter(|row| &row.employee_id == employee && filter.matches(row))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            b.transaction_date
                .cmp(&a.transaction_date)
                .then(b.id.cmp(&a.id))
        });
        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size() as usize)
            .collect();
        Ok(Paged { items, page, total })
    }

    fn history(&self, employee: &EmployeeId) -> LedgerResult<Vec<LedgerEntry>> {
        let inner = self.inner.lock();
        Ok(inner
            .rows
            .iter()
            .filter(|row| &row.employee_id == employee)
            .cloned()
            .collect())
    }

    fn totals(&self, employee: &EmployeeId) -> LedgerResult<LedgerTotals> {
        let inner = self.inner.lock();
        Ok(LedgerTotals::from_entries(
            inner.rows.iter().filter(|row| &row.employee_id == employee),
        ))
    }

    fn cancel(&self, id: LedgerId) -> LedgerResult<LedgerEntry> {
        self.inner.lock().transition(id, EntryStatus::Cancelled)
    }

    fn reverse(
        &self,
        original: LedgerId,
        counter: &ValidatedEntry,
    ) -> LedgerResult<ReversalOutcome> {
        let mut inner = self.inner.lock();
        let idx = inner.position(original)?;
        if inner.rows[idx].status != EntryStatus::Active {
            return Err(LedgerError::InvalidTransition {
                id: original,
                status: inner.rows[idx].status,
            });
        }
        // Fallible append first; the status flip below cannot fail.
        let counter_row = inner.append(counter)?;
        let original_row = inner.transition(original, EntryStatus::Reversed)?;
        Ok(ReversalOutcome {
            original: original_row,
            counter: counter_row,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryDraft, TransactionType};
    use crate::validate::validate;
    use rust_decimal_macros::dec;

    #[test]
    fn balances_chain_per_employee() {
        let store = MemoryLedgerStore::new();
        let a = validate(EntryDraft::credit(
            "E-1",
            TransactionType::Payroll,
            dec!(100),
            "bot",
        ))
        .unwrap();
        let b = validate(EntryDraft::debit(
            "E-2",
            TransactionType::Advance,
            dec!(30),
            "bot",
        ))
        .unwrap();

        assert_eq!(store.insert(&a).unwrap().balance, dec!(100));
        assert_eq!(store.insert(&b).unwrap().balance, dec!(-30));
        assert_eq!(store.insert(&a).unwrap().balance, dec!(200));
    }

    #[test]
    fn reverse_flips_and_appends_atomically() {
        let store = MemoryLedgerStore::new();
        let original = store
            .insert(
                &validate(EntryDraft::debit(
                    "E-1",
                    TransactionType::Advance,
                    dec!(50),
                    "bot",
                ))
                .unwrap(),
            )
            .unwrap();
        let counter = validate(EntryDraft::credit(
            "E-1",
            TransactionType::Adjustment,
            dec!(50),
            "bot",
        ))
        .unwrap();

        let outcome = store.reverse(original.id, &counter).unwrap();
        assert_eq!(outcome.original.status, EntryStatus::Reversed);
        assert_eq!(outcome.counter.balance, Decimal::ZERO);

        let err = store.reverse(original.id, &counter).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
        assert_eq!(
            store.history(&EmployeeId::from("E-1")).unwrap().len(),
            2,
            "failed reversal must not append a second counter"
        );
    }
}
