//! Counter-entry construction for auditable reversals.

use crate::entry::{EntryDraft, LedgerEntry, TransactionType};

/// `reference_type` tag carried by every reversal counter-entry.
pub const REVERSAL_REFERENCE: &str = "REVERSAL";

/// Build the draft that compensates an entry.
///
/// Debit and credit swap sides; the counter is typed ADJUSTMENT and points
/// back at the original through the reference fields. The transaction date is
/// left unset and resolves to the reversal time, not the original's date.
pub fn counter_draft(original: &LedgerEntry, reason: &str, acting_user: &str) -> EntryDraft {
    EntryDraft {
        employee_id: original.employee_id.clone(),
        transaction_type: TransactionType::Adjustment,
        debit_amount: original.credit_amount,
        credit_amount: original.debit_amount,
        created_by: acting_user.to_string(),
        transaction_date: None,
        reference_id: Some(original.id),
        reference_type: Some(REVERSAL_REFERENCE.to_string()),
        reference_description: Some(reason.to_string()),
        period: original.period,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryStatus;
    use chrono::Utc;
    use paylog_core::{EmployeeId, LedgerId, PayPeriod};
    use rust_decimal_macros::dec;

    fn advance() -> LedgerEntry {
        let now = Utc::now();
        LedgerEntry {
            id: LedgerId::new(7),
            employee_id: EmployeeId::from("E-1001"),
            transaction_date: now,
            transaction_type: TransactionType::Advance,
            debit_amount: dec!(5000),
            credit_amount: dec!(0),
            balance: dec!(-5000),
            reference_id: None,
            reference_type: None,
            reference_description: Some("salary advance".to_string()),
            period: Some(PayPeriod::new(3, 2024)),
            status: EntryStatus::Active,
            created_by: "hr.clerk".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn swaps_debit_and_credit() {
        let draft = counter_draft(&advance(), "duplicate posting", "auditor");
        assert_eq!(draft.debit_amount, dec!(0));
        assert_eq!(draft.credit_amount, dec!(5000));
        assert_eq!(draft.transaction_type, TransactionType::Adjustment);
    }

    #[test]
    fn references_the_original() {
        let draft = counter_draft(&advance(), "duplicate posting", "auditor");
        assert_eq!(draft.reference_id, Some(LedgerId::new(7)));
        assert_eq!(draft.reference_type.as_deref(), Some(REVERSAL_REFERENCE));
        assert_eq!(
            draft.reference_description.as_deref(),
            Some("duplicate posting")
        );
        assert_eq!(draft.created_by, "auditor");
    }

    #[test]
    fn keeps_the_original_period_tag() {
        let draft = counter_draft(&advance(), "wrong period", "auditor");
        assert_eq!(draft.period, Some(PayPeriod::new(3, 2024)));
        assert!(draft.transaction_date.is_none());
    }
}
