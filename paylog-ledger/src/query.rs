use chrono::{DateTime, Utc};

use paylog_core::PayPeriod;

use crate::entry::{EntryStatus, LedgerEntry, TransactionType};

/// Filter describing which entries of an employee to load.
#[derive(Clone, Debug, Default)]
pub struct EntryFilter {
    pub transaction_type: Option<TransactionType>,
    pub status: Option<EntryStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub period: Option<PayPeriod>,
}

impl EntryFilter {
    pub fn with_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    pub fn with_status(mut self, status: EntryStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_date_range(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_period(mut self, period: PayPeriod) -> Self {
        self.period = Some(period);
        self
    }

    /// In-memory evaluation of the filter, mirroring the SQL predicates.
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if let Some(transaction_type) = self.transaction_type {
            if entry.transaction_type != transaction_type {
                return false;
            }
        }
        if let Some(status) = self.status {
            if entry.status != status {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            if entry.transaction_date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if entry.transaction_date > end {
                return false;
            }
        }
        if let Some(period) = self.period {
            if entry.period != Some(period) {
                return false;
            }
        }
        true
    }
}
