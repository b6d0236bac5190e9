use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use paylog_core::{EmployeeId, LedgerId, PayPeriod};

use crate::reversal::REVERSAL_REFERENCE;

/// Canonical ledger record for one monetary event against an employee.
///
/// Rows are append-only: after insertion only `status` and `updated_at` may
/// change, and the only legal transitions are ACTIVE to REVERSED (through a
/// reversal) and ACTIVE to CANCELLED (administrative).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerId,
    pub employee_id: EmployeeId,
    pub transaction_date: DateTime<Utc>,
    pub transaction_type: TransactionType,
    pub debit_amount: Decimal,
    pub credit_amount: Decimal,
    /// Running balance snapshot after this entry was applied.
    pub balance: Decimal,
    pub reference_id: Option<LedgerId>,
    pub reference_type: Option<String>,
    pub reference_description: Option<String>,
    pub period: Option<PayPeriod>,
    pub status: EntryStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Signed effect of this entry on the employee balance.
    pub fn signed_amount(&self) -> Decimal {
        self.credit_amount - self.debit_amount
    }

    /// Whether this entry participates in balance computation.
    ///
    /// Everything except CANCELLED counts: a REVERSED original and its ACTIVE
    /// counter-entry coexist and net to zero inside the fold.
    pub fn is_balance_affecting(&self) -> bool {
        self.status != EntryStatus::Cancelled
    }

    /// Whether this entry is the counter-entry of a reversal.
    pub fn is_reversal(&self) -> bool {
        self.reference_type.as_deref() == Some(REVERSAL_REFERENCE)
    }
}

/// Closed set of monetary event categories.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Advance,
    Loan,
    Deduction,
    Payroll,
    Bonus,
    Allowance,
    Refund,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Advance => "ADVANCE",
            TransactionType::Loan => "LOAN",
            TransactionType::Deduction => "DEDUCTION",
            TransactionType::Payroll => "PAYROLL",
            TransactionType::Bonus => "BONUS",
            TransactionType::Allowance => "ALLOWANCE",
            TransactionType::Refund => "REFUND",
            TransactionType::Adjustment => "ADJUSTMENT",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADVANCE" => Ok(TransactionType::Advance),
            "LOAN" => Ok(TransactionType::Loan),
            "DEDUCTION" => Ok(TransactionType::Deduction),
            "PAYROLL" => Ok(TransactionType::Payroll),
            "BONUS" => Ok(TransactionType::Bonus),
            "ALLOWANCE" => Ok(TransactionType::Allowance),
            "REFUND" => Ok(TransactionType::Refund),
            "ADJUSTMENT" => Ok(TransactionType::Adjustment),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

/// Lifecycle state of a ledger entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    Active,
    Cancelled,
    Reversed,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Active => "ACTIVE",
            EntryStatus::Cancelled => "CANCELLED",
            EntryStatus::Reversed => "REVERSED",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(EntryStatus::Active),
            "CANCELLED" => Ok(EntryStatus::Cancelled),
            "REVERSED" => Ok(EntryStatus::Reversed),
            other => Err(format!("unknown entry status: {other}")),
        }
    }
}

/// Caller-supplied data for a new entry, before validation.
///
/// Exactly one of `debit_amount`/`credit_amount` must be positive; the
/// validator enforces this after rounding to the monetary scale.
#[derive(Clone, Debug, PartialEq)]
pub struct EntryDraft {
    pub employee_id: EmployeeId,
    pub transaction_type: TransactionType,
    pub debit_amount: Decimal,
    pub credit_amount: Decimal,
    pub created_by: String,
    /// Defaults to insertion time when left unset.
    pub transaction_date: Option<DateTime<Utc>>,
    pub reference_id: Option<LedgerId>,
    pub reference_type: Option<String>,
    pub reference_description: Option<String>,
    pub period: Option<PayPeriod>,
}

impl EntryDraft {
    /// Draft recording money owed by the employee (advance, loan, deduction).
    pub fn debit(
        employee_id: impl Into<EmployeeId>,
        transaction_type: TransactionType,
        amount: Decimal,
        created_by: impl Into<String>,
    ) -> Self {
        Self::amounts(employee_id, transaction_type, amount, Decimal::ZERO, created_by)
    }

    /// Draft recording money paid to the employee (payroll, bonus, refund).
    pub fn credit(
        employee_id: impl Into<EmployeeId>,
        transaction_type: TransactionType,
        amount: Decimal,
        created_by: impl Into<String>,
    ) -> Self {
        Self::amounts(employee_id, transaction_type, Decimal::ZERO, amount, created_by)
    }

    fn amounts(
        employee_id: impl Into<EmployeeId>,
        transaction_type: TransactionType,
        debit_amount: Decimal,
        credit_amount: Decimal,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            employee_id: employee_id.into(),
            transaction_type,
            debit_amount,
            credit_amount,
            created_by: created_by.into(),
            transaction_date: None,
            reference_id: None,
            reference_type: None,
            reference_description: None,
            period: None,
        }
    }

    /// Backdate the entry instead of stamping it at insertion time.
    pub fn with_transaction_date(mut self, date: DateTime<Utc>) -> Self {
        self.transaction_date = Some(date);
        self
    }

    /// Link this entry to another record (payroll run, original entry).
    pub fn with_reference(mut self, id: LedgerId, kind: impl Into<String>) -> Self {
        self.reference_id = Some(id);
        self.reference_type = Some(kind.into());
        self
    }

    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.reference_description = Some(text.into());
        self
    }

    pub fn with_period(mut self, period: PayPeriod) -> Self {
        self.period = Some(period);
        self
    }
}
