//! Aggregated per-employee views built from ledger totals.

use chrono::{DateTime, Utc};
use paylog_core::{EmployeeId, EmployeeProfile};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::balance::LedgerTotals;

/// Full financial summary for one employee.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EmployeeSummary {
    pub employee_id: EmployeeId,
    pub display_name: String,
    pub department: Option<String>,
    pub total_credits: Decimal,
    pub total_debits: Decimal,
    pub balance: Decimal,
    pub entries: u64,
    pub last_transaction: Option<DateTime<Utc>>,
}

impl EmployeeSummary {
    pub fn from_parts(profile: EmployeeProfile, totals: &LedgerTotals) -> Self {
        Self {
            employee_id: profile.id,
            display_name: profile.display_name,
            department: profile.department,
            total_credits: totals.credits,
            total_debits: totals.debits,
            balance: totals.balance(),
            entries: totals.entries,
            last_transaction: totals.last_transaction,
        }
    }
}

/// One line of the roster listing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RosterRow {
    pub employee_id: EmployeeId,
    pub display_name: String,
    pub department: Option<String>,
    pub balance: Decimal,
    pub entries: u64,
}

impl RosterRow {
    pub fn from_parts(profile: EmployeeProfile, totals: &LedgerTotals) -> Self {
        Self {
            employee_id: profile.id,
            display_name: profile.display_name,
            department: profile.department,
            balance: totals.balance(),
            entries: totals.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn summary_carries_profile_and_totals() {
        let profile = EmployeeProfile::new("E-1001", "Alice Moreau").with_department("Engineering");
        let totals = LedgerTotals {
            credits: dec!(20000),
            debits: dec!(5000),
            entries: 2,
            last_transaction: None,
        };
        let summary = EmployeeSummary::from_parts(profile, &totals);
        assert_eq!(summary.employee_id.as_str(), "E-1001");
        assert_eq!(summary.balance, dec!(15000));
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.department.as_deref(), Some("Engineering"));
    }

    #[test]
    fn roster_row_is_a_condensed_summary() {
        let profile = EmployeeProfile::new("E-1002", "Bob Tanaka");
        let totals = LedgerTotals::default();
        let row = RosterRow::from_parts(profile, &totals);
        assert_eq!(row.balance, Decimal::ZERO);
        assert_eq!(row.entries, 0);
        assert!(row.department.is_none());
    }
}
