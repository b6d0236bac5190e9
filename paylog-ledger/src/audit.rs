//! Integrity checks over a stored employee history.

use paylog_core::LedgerId;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::balance::replay;
use crate::entry::LedgerEntry;

/// A single divergence detected while walking a history.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum AuditFinding {
    /// An entry carries both a debit and a credit, or neither.
    AmountExclusivity {
        id: LedgerId,
        debit: Decimal,
        credit: Decimal,
    },
    /// A stored balance snapshot does not extend the previous one.
    SnapshotDrift {
        id: LedgerId,
        stored: Decimal,
        expected: Decimal,
    },
    /// The newest stored snapshot disagrees with a full replay.
    TailDivergence { cached: Decimal, replayed: Decimal },
}

/// Outcome of auditing one employee history.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AuditReport {
    pub entries_checked: u64,
    pub findings: Vec<AuditFinding>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Stateless engine that replays a history and compares it to the stored
/// snapshots.
///
/// The input must be one employee's complete history in insertion order.
/// Cancelled entries are skipped when chaining snapshots, so a cancellation
/// legitimately leaves drift findings at the entries posted after it; the
/// tail check then shows how far the cached snapshot sits from a fresh
/// replay.
pub struct LedgerAuditor;

impl LedgerAuditor {
    pub fn audit(entries: &[LedgerEntry]) -> AuditReport {
        let mut findings = Vec::new();
        let mut chain = Decimal::ZERO;
        let mut tail: Option<Decimal> = None;

        for entry in entries {
            let debit_positive = entry.debit_amount > Decimal::ZERO;
            let credit_positive = entry.credit_amount > Decimal::ZERO;
            if debit_positive == credit_positive {
                findings.push(AuditFinding::AmountExclusivity {
                    id: entry.id,
                    debit: entry.debit_amount,
                    credit: entry.credit_amount,
                });
            }

            if !entry.is_balance_affecting() {
                continue;
            }
            let expected = chain + entry.signed_amount();
            if entry.balance != expected {
                findings.push(AuditFinding::SnapshotDrift {
                    id: entry.id,
                    stored: entry.balance,
                    expected,
                });
            }
            chain = entry.balance;
            tail = Some(entry.balance);
        }

        if let Some(cached) = tail {
            let replayed = replay(entries);
            if cached != replayed {
                findings.push(AuditFinding::TailDivergence { cached, replayed });
            }
        }

        AuditReport {
            entries_checked: entries.len() as u64,
            findings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryStatus, TransactionType};
    use chrono::Utc;
    use paylog_core::EmployeeId;
    use rust_decimal_macros::dec;

    fn entry(
        id: i64,
        debit: Decimal,
        credit: Decimal,
        balance: Decimal,
        status: EntryStatus,
    ) -> LedgerEntry {
        let now = Utc::now();
        LedgerEntry {
            id: LedgerId::new(id),
            employee_id: EmployeeId::from("E-1001"),
            transaction_date: now,
            transaction_type: TransactionType::Adjustment,
            debit_amount: debit,
            credit_amount: credit,
            balance,
            reference_id: None,
            reference_type: None,
            reference_description: None,
            period: None,
            status,
            created_by: "auditor".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_history_is_clean() {
        let report = LedgerAuditor::audit(&[]);
        assert!(report.is_clean());
        assert_eq!(report.entries_checked, 0);
    }

    #[test]
    fn reversed_pairs_still_chain_cleanly() {
        let history = vec![
            entry(1, dec!(0), dec!(100), dec!(100), EntryStatus::Active),
            entry(2, dec!(30), dec!(0), dec!(70), EntryStatus::Reversed),
            entry(3, dec!(0), dec!(30), dec!(100), EntryStatus::Active),
        ];
        let report = LedgerAuditor::audit(&history);
        assert!(report.is_clean(), "findings: {:?}", report.findings);
        assert_eq!(report.entries_checked, 3);
    }

    #[test]
    fn flags_entries_with_both_or_neither_amount() {
        let history = vec![
            entry(1, dec!(10), dec!(10), dec!(0), EntryStatus::Active),
            entry(2, dec!(0), dec!(0), dec!(0), EntryStatus::Active),
        ];
        let report = LedgerAuditor::audit(&history);
        let exclusivity = report
            .findings
            .iter()
            .filter(|f| matches!(f, AuditFinding::AmountExclusivity { .. }))
            .count();
        assert_eq!(exclusivity, 2);
    }

    #[test]
    fn cancellation_leaves_drift_and_tail_findings() {
        let history = vec![
            entry(1, dec!(0), dec!(100), dec!(100), EntryStatus::Active),
            entry(2, dec!(30), dec!(0), dec!(70), EntryStatus::Cancelled),
            entry(3, dec!(0), dec!(10), dec!(80), EntryStatus::Active),
        ];
        let report = LedgerAuditor::audit(&history);
        assert!(report.findings.contains(&AuditFinding::SnapshotDrift {
            id: LedgerId::new(3),
            stored: dec!(80),
            expected: dec!(110),
        }));
        assert!(report.findings.contains(&AuditFinding::TailDivergence {
            cached: dec!(80),
            replayed: dec!(110),
        }));
    }

    #[test]
    fn drift_is_reported_against_the_stored_chain() {
        let history = vec![
            entry(1, dec!(0), dec!(100), dec!(100), EntryStatus::Active),
            entry(2, dec!(30), dec!(0), dec!(60), EntryStatus::Active),
            entry(3, dec!(0), dec!(10), dec!(70), EntryStatus::Active),
        ];
        let report = LedgerAuditor::audit(&history);
        let drifts: Vec<&AuditFinding> = report
            .findings
            .iter()
            .filter(|f| matches!(f, AuditFinding::SnapshotDrift { .. }))
            .collect();
        assert_eq!(
            drifts,
            vec![&AuditFinding::SnapshotDrift {
                id: LedgerId::new(2),
                stored: dec!(60),
                expected: dec!(70),
            }]
        );
        assert!(report.findings.contains(&AuditFinding::TailDivergence {
            cached: dec!(70),
            replayed: dec!(80),
        }));
    }
}
