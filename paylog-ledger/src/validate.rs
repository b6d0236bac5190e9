//! Pure validation of entry drafts before they reach storage.

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;

use paylog_core::money;

use crate::entry::EntryDraft;

/// Longest accepted free-text description, in characters.
pub const DESCRIPTION_LIMIT: usize = 500;

/// Rule-level failures raised while checking a draft.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("debit amount {0} is negative")]
    NegativeDebit(Decimal),
    #[error("credit amount {0} is negative")]
    NegativeCredit(Decimal),
    #[error("entry must carry a debit or a credit amount")]
    NoAmount,
    #[error("entry cannot carry both a debit ({debit}) and a credit ({credit})")]
    BothAmounts { debit: Decimal, credit: Decimal },
    #[error("amount {0} exceeds the storage bound")]
    AmountTooLarge(Decimal),
    #[error("employee id cannot be empty")]
    EmptyEmployee,
    #[error("created_by cannot be empty")]
    EmptyActor,
    #[error("description is {0} characters, limit is {DESCRIPTION_LIMIT}")]
    DescriptionTooLong(usize),
    #[error("period month {0} is outside 1..=12")]
    MonthOutOfRange(u32),
    #[error("period year {0} is outside 1900..=9999")]
    YearOutOfRange(i32),
    #[error("reversal reason cannot be empty")]
    EmptyReason,
}

/// A draft that passed every rule, with amounts rounded to the monetary
/// scale and the transaction date resolved.
///
/// Only [`validate`] constructs this type, so storage backends can rely on
/// the invariants without re-deriving them.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedEntry {
    draft: EntryDraft,
}

impl ValidatedEntry {
    pub fn draft(&self) -> &EntryDraft {
        &self.draft
    }
}

/// Check a draft against every posting rule.
///
/// Amounts are rounded to two decimal places before the exclusivity check so
/// that values like `0.004` cannot slip through as "positive" debits that
/// store as zero.
pub fn validate(mut draft: EntryDraft) -> Result<ValidatedEntry, ValidationError> {
    draft.debit_amount = money::normalize(draft.debit_amount);
    draft.credit_amount = money::normalize(draft.credit_amount);

    let debit = draft.debit_amount;
    let credit = draft.credit_amount;
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
    let amount = debit.max(credit);
    if amount > money::max_amount() {
        return Err(ValidationError::AmountTooLarge(amount));
    }

    if draft.employee_id.is_empty() {
        return Err(ValidationError::EmptyEmployee);
    }
    if draft.created_by.trim().is_empty() {
        return Err(ValidationError::EmptyActor);
    }
    if let Some(text) = &draft.reference_description {
        let len = text.chars().count();
        if len > DESCRIPTION_LIMIT {
            return Err(ValidationError::DescriptionTooLong(len));
        }
    }
    if let Some(period) = draft.period {
        if !(1..=12).contains(&period.month) {
            return Err(ValidationError::MonthOutOfRange(period.month));
        }
        if !(1900..=9999).contains(&period.year) {
            return Err(ValidationError::YearOutOfRange(period.year));
        }
    }

    if draft.transaction_date.is_none() {
        draft.transaction_date = Some(Utc::now());
    }

    Ok(ValidatedEntry { draft })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::TransactionType;
    use paylog_core::PayPeriod;
    use rand::Rng;
    use rust_decimal_macros::dec;

    fn draft(debit: Decimal, credit: Decimal) -> EntryDraft {
        let mut draft = EntryDraft::debit("E-1001", TransactionType::Advance, debit, "hr.clerk");
        draft.credit_amount = credit;
        draft
    }

    #[test]
    fn accepts_an_exclusive_positive_amount() {
        let entry = validate(draft(dec!(250), Decimal::ZERO)).unwrap();
        assert_eq!(entry.draft().debit_amount, dec!(250));
        assert!(entry.draft().transaction_date.is_some());
    }

    #[test]
    fn rejects_negative_amounts() {
        assert_eq!(
            validate(draft(dec!(-1), Decimal::ZERO)),
            Err(ValidationError::NegativeDebit(dec!(-1)))
        );
        assert_eq!(
            validate(draft(Decimal::ZERO, dec!(-0.5))),
            Err(ValidationError::NegativeCredit(dec!(-0.50)))
        );
    }

    #[test]
    fn rejects_zero_and_double_sided_amounts() {
        assert_eq!(
            validate(draft(Decimal::ZERO, Decimal::ZERO)),
            Err(ValidationError::NoAmount)
        );
        assert_eq!(
            validate(draft(dec!(10), dec!(10))),
            Err(ValidationError::BothAmounts {
                debit: dec!(10),
                credit: dec!(10)
            })
        );
    }

    #[test]
    fn sub_cent_amounts_round_to_zero_and_fail() {
        assert_eq!(
            validate(draft(dec!(0.004), Decimal::ZERO)),
            Err(ValidationError::NoAmount)
        );
    }

    #[test]
    fn rejects_oversized_amounts() {
        let over = paylog_core::money::max_amount() + dec!(0.01);
        assert_eq!(
            validate(draft(over, Decimal::ZERO)),
            Err(ValidationError::AmountTooLarge(over))
        );
    }

    #[test]
    fn rejects_blank_identities() {
        let mut d = draft(dec!(1), Decimal::ZERO);
        d.employee_id = "".into();
        assert_eq!(validate(d), Err(ValidationError::EmptyEmployee));

        let mut d = draft(dec!(1), Decimal::ZERO);
        d.created_by = "  ".into();
        assert_eq!(validate(d), Err(ValidationError::EmptyActor));
    }

    #[test]
    fn rejects_oversized_description() {
        let d = draft(dec!(1), Decimal::ZERO).with_description("x".repeat(501));
        assert_eq!(validate(d), Err(ValidationError::DescriptionTooLong(501)));
    }

    #[test]
    fn rejects_out_of_range_periods() {
        let d = draft(dec!(1), Decimal::ZERO).with_period(PayPeriod::new(13, 2024));
        assert_eq!(validate(d), Err(ValidationError::MonthOutOfRange(13)));

        let d = draft(dec!(1), Decimal::ZERO).with_period(PayPeriod::new(6, 1850));
        assert_eq!(validate(d), Err(ValidationError::YearOutOfRange(1850)));
    }

    #[test]
    fn random_amount_pairs_never_slip_past_exclusivity() {
        let mut rng = rand::rng();
        for _ in 0..500 {
            let debit = Decimal::new(rng.random_range(-10_000i64..10_000), 2);
            let credit = Decimal::new(rng.random_range(-10_000i64..10_000), 2);
            let exclusive = (debit > Decimal::ZERO && credit == Decimal::ZERO)
                || (credit > Decimal::ZERO && debit == Decimal::ZERO);
            assert_eq!(validate(draft(debit, credit)).is_ok(), exclusive);
        }
    }
}
