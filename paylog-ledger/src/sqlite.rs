use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Transaction, TransactionBehavior};
use tracing::warn;

use paylog_core::{money, EmployeeId, LedgerId, Page, Paged, PayPeriod};

use crate::balance::LedgerTotals;
use crate::entry::{EntryStatus, LedgerEntry, TransactionType};
use crate::error::{LedgerError, LedgerResult};
use crate::query::EntryFilter;
use crate::store::{enforce_exclusivity, LedgerStore, ReversalOutcome};
use crate::validate::ValidatedEntry;

const LEDGER_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ledger_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    employee_id TEXT NOT NULL,
    transaction_date TEXT NOT NULL,
    transaction_type TEXT NOT NULL,
    debit_minor INTEGER NOT NULL CHECK (debit_minor >= 0),
    credit_minor INTEGER NOT NULL CHECK (credit_minor >= 0),
    balance_minor INTEGER NOT NULL,
    reference_id INTEGER,
    reference_type TEXT,
    reference_description TEXT,
    period_month INTEGER,
    period_year INTEGER,
    status TEXT NOT NULL DEFAULT 'ACTIVE'
        CHECK (status IN ('ACTIVE', 'CANCELLED', 'REVERSED')),
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK ((debit_minor > 0 AND credit_minor = 0)
        OR (credit_minor > 0 AND debit_minor = 0))
);
CREATE INDEX IF NOT EXISTS ledger_idx_employee_date
    ON ledger_entries(employee_id, transaction_date DESC, id DESC);
CREATE INDEX IF NOT EXISTS ledger_idx_employee_status
    ON ledger_entries(employee_id, status);
CREATE INDEX IF NOT EXISTS ledger_idx_reference
    ON ledger_entries(reference_id);
"#;

const ENTRY_COLUMNS: &str = "id, employee_id, transaction_date, transaction_type, \
     debit_minor, credit_minor, balance_minor, reference_id, reference_type, \
     reference_description, period_month, period_year, status, created_by, \
     created_at, updated_at";

const WRITE_RETRIES: u32 = 5;
const RETRY_BACKOFF: Duration = Duration::from_millis(40);

/// SQLite-backed ledger store; the durable backend for production use.
///
/// Writes run inside IMMEDIATE transactions so the prior-balance aggregate
/// and the dependent insert observe a consistent database even across
/// processes. Busy contention is retried a bounded number of times and then
/// surfaced as `Conflict`.
#[derive(Clone, Debug)]
pub struct SqliteLedgerStore {
    path: PathBuf,
}

impl SqliteLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let store = Self { path: path.into() };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> LedgerResult<()> {
        let conn = self.connect()?;
        conn.execute_batch(LEDGER_SCHEMA)?;
        Ok(())
    }

    fn connect(&self) -> LedgerResult<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL; PRAGMA busy_timeout = 250;",
        )?;
        Ok(conn)
    }

    fn write_tx<T>(
        &self,
        employee: &EmployeeId,
        op: impl Fn(&Transaction<'_>) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut attempt = 0;
        loop {
            let mut conn = self.connect()?;
            let tx = match conn.transaction_with_behavior(TransactionBehavior::Immediate) {
                Ok(tx) => tx,
                Err(err) if is_busy(&err) => {
                    if attempt >= WRITE_RETRIES {
                        return Err(LedgerError::Conflict {
                            employee: employee.clone(),
                        });
                    }
                    attempt += 1;
                    warn!(%employee, attempt, "ledger write busy, retrying");
                    thread::sleep(RETRY_BACKOFF);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let value = op(&tx)?;
            tx.commit()?;
            return Ok(value);
        }
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn insert(&self, entry: &ValidatedEntry) -> LedgerResult<LedgerEntry> {
        let employee = entry.draft().employee_id.clone();
        self.write_tx(&employee, |tx| insert_in_tx(tx, entry))
    }

    fn entry(&self, id: LedgerId) -> LedgerResult<LedgerEntry> {
        let conn = self.connect()?;
        entry_by_id(&conn, id)
    }

    fn entries_for(
        &self,
        employee: &EmployeeId,
        filter: &EntryFilter,
        page: Page,
    ) -> LedgerResult<Paged<LedgerEntry>> {
        let conn = self.connect()?;
        let predicate = "employee_id = ?1
               AND (?2 IS NULL OR transaction_type = ?2)
               AND (?3 IS NULL OR status = ?3)
               AND (?4 IS NULL OR transaction_date >= ?4)
               AND (?5 IS NULL OR transaction_date <= ?5)
               AND (?6 IS NULL OR period_month = ?6)
               AND (?7 IS NULL OR period_year = ?7)";

        let mut params: Vec<Value> = Vec::with_capacity(9);
        params.push(Value::from(employee.as_str().to_string()));
        params.push(optional_text(
            filter.transaction_type.map(|t| t.as_str().to_string()),
        ));
        params.push(optional_text(filter.status.map(|s| s.as_str().to_string())));
        params.push(optional_text(filter.start_date.map(encode_timestamp)));
        params.push(optional_text(filter.end_date.map(encode_timestamp)));
        params.push(optional_int(filter.period.map(|p| i64::from(p.month))));
        params.push(optional_int(filter.period.map(|p| i64::from(p.year))));

        let count_sql = format!("SELECT COUNT(*) FROM ledger_entries WHERE {predicate}");
        let total: i64 =
            conn.query_row(&count_sql, params_from_iter(params.iter()), |row| row.get(0))?;

        let rows_sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE {predicate}
             ORDER BY transaction_date DESC, id DESC LIMIT ?8 OFFSET ?9"
        );
        params.push(Value::Integer(i64::from(page.size())));
        params.push(Value::Integer(page.offset() as i64));

        let mut stmt = conn.prepare(&rows_sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(row_to_entry(row)?);
        }
        Ok(Paged {
            items,
            page,
            total: total as u64,
        })
    }

    fn history(&self, employee: &EmployeeId) -> LedgerResult<Vec<LedgerEntry>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE employee_id = ?1 ORDER BY id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![employee.as_str()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(row_to_entry(row)?);
        }
        Ok(entries)
    }

    fn totals(&self, employee: &EmployeeId) -> LedgerResult<LedgerTotals> {
        let conn = self.connect()?;
        let (credits_minor, debits_minor, count, last_raw) = conn.query_row(
            "SELECT COALESCE(SUM(credit_minor), 0), COALESCE(SUM(debit_minor), 0),
                    COUNT(*), MAX(transaction_date)
               FROM ledger_entries
              WHERE employee_id = ?1 AND status <> 'CANCELLED'",
            params![employee.as_str()],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )?;
        let last_transaction = match last_raw {
            Some(raw) => Some(decode_timestamp(&raw)?),
            None => None,
        };
        Ok(LedgerTotals {
            credits: money::from_minor_units(credits_minor),
            debits: money::from_minor_units(debits_minor),
            entries: count as u64,
            last_transaction,
        })
    }

    fn cancel(&self, id: LedgerId) -> LedgerResult<LedgerEntry> {
        let existing = self.entry(id)?;
        self.write_tx(&existing.employee_id, |tx| {
            let updated_at = encode_timestamp(Utc::now());
            let affected = tx.execute(
                "UPDATE ledger_entries SET status = 'CANCELLED', updated_at = ?2
                  WHERE id = ?1 AND status = 'ACTIVE'",
                params![id.as_i64(), updated_at],
            )?;
            if affected == 0 {
                let row = entry_by_id(tx, id)?;
                return Err(LedgerError::InvalidTransition {
                    id,
                    status: row.status,
                });
            }
            entry_by_id(tx, id)
        })
    }

    fn reverse(
        &self,
        original: LedgerId,
        counter: &ValidatedEntry,
    ) -> LedgerResult<ReversalOutcome> {
        let employee = counter.draft().employee_id.clone();
        self.write_tx(&employee, |tx| {
            let updated_at = encode_timestamp(Utc::now());
            let affected = tx.execute(
                "UPDATE ledger_entries SET status = 'REVERSED', updated_at = ?2
                  WHERE id = ?1 AND status = 'ACTIVE'",
                params![original.as_i64(), updated_at],
            )?;
            if affected == 0 {
                let row = entry_by_id(tx, original)?;
                return Err(LedgerError::InvalidTransition {
                    id: original,
                    status: row.status,
                });
            }
            let counter_row = insert_in_tx(tx, counter)?;
            let original_row = entry_by_id(tx, original)?;
            Ok(ReversalOutcome {
                original: original_row,
                counter: counter_row,
            })
        })
    }
}

/// Insert one validated entry inside an open write transaction.
///
/// The prior balance is aggregated here, inside the same transaction, so the
/// snapshot cannot be computed from a stale view.
fn insert_in_tx(tx: &Transaction<'_>, entry: &ValidatedEntry) -> LedgerResult<LedgerEntry> {
    let draft = entry.draft();
    enforce_exclusivity(draft.debit_amount, draft.credit_amount)?;
    let debit_minor = money::to_minor_units(draft.debit_amount)?;
    let credit_minor = money::to_minor_units(draft.credit_amount)?;

    let prior_minor: i64 = tx.query_row(
        "SELECT COALESCE(SUM(credit_minor - debit_minor), 0) FROM ledger_entries
          WHERE employee_id = ?1 AND status <> 'CANCELLED'",
        params![draft.employee_id.as_str()],
        |row| row.get(0),
    )?;
    let balance_minor = prior_minor
        .checked_add(credit_minor)
        .and_then(|value| value.checked_sub(debit_minor))
        .ok_or_else(|| LedgerError::Storage("employee balance overflows minor units".into()))?;

    let now = Utc::now().trunc_subsecs(6);
    let transaction_date = draft
        .transaction_date
        .unwrap_or(now)
        .trunc_subsecs(6);

    tx.execute(
        "INSERT INTO ledger_entries (
            employee_id, transaction_date, transaction_type, debit_minor, credit_minor,
            balance_minor, reference_id, reference_type, reference_description,
            period_month, period_year, status, created_by, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            draft.employee_id.as_str(),
            encode_timestamp(transaction_date),
            draft.transaction_type.as_str(),
            debit_minor,
            credit_minor,
            balance_minor,
            draft.reference_id.map(LedgerId::as_i64),
            draft.reference_type.as_deref(),
            draft.reference_description.as_deref(),
            draft.period.map(|p| i64::from(p.month)),
            draft.period.map(|p| i64::from(p.year)),
            EntryStatus::Active.as_str(),
            draft.created_by.as_str(),
            encode_timestamp(now),
            encode_timestamp(now),
        ],
    )?;

    Ok(LedgerEntry {
        id: LedgerId::new(tx.last_insert_rowid()),
        employee_id: draft.employee_id.clone(),
        transaction_date,
        transaction_type: draft.transaction_type,
        debit_amount: money::from_minor_units(debit_minor),
        credit_amount: money::from_minor_units(credit_minor),
        balance: money::from_minor_units(balance_minor),
        reference_id: draft.reference_id,
        reference_type: draft.reference_type.clone(),
        reference_description: draft.reference_description.clone(),
        period: draft.period,
        status: EntryStatus::Active,
        created_by: draft.created_by.clone(),
        created_at: now,
        updated_at: now,
    })
}

fn entry_by_id(conn: &Connection, id: LedgerId) -> LedgerResult<LedgerEntry> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![id.as_i64()])?;
    match rows.next()? {
        Some(row) => row_to_entry(row),
        None => Err(LedgerError::EntryNotFound(id)),
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == ErrorCode::DatabaseBusy || inner.code == ErrorCode::DatabaseLocked
    )
}

fn optional_text(value: Option<String>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

fn optional_int(value: Option<i64>) -> Value {
    value.map(Value::Integer).unwrap_or(Value::Null)
}

/// Stored timestamps use fixed microsecond precision so the lexicographic
/// text order SQLite compares with equals chronological order.
fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> LedgerResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| LedgerError::Serialization(format!("invalid timestamp {raw}: {err}")))
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> LedgerResult<LedgerEntry> {
    let id: i64 = row.get(0)?;
    let employee: String = row.get(1)?;
    let date_raw: String = row.get(2)?;
    let type_raw: String = row.get(3)?;
    let debit_minor: i64 = row.get(4)?;
    let credit_minor: i64 = row.get(5)?;
    let balance_minor: i64 = row.get(6)?;
    let reference_id: Option<i64> = row.get(7)?;
    let reference_type: Option<String> = row.get(8)?;
    let reference_description: Option<String> = row.get(9)?;
    let period_month: Option<i64> = row.get(10)?;
    let period_year: Option<i64> = row.get(11)?;
    let status_raw: String = row.get(12)?;
    let created_by: String = row.get(13)?;
    let created_raw: String = row.get(14)?;
    let updated_raw: String = row.get(15)?;

    let period = match (period_month, period_year) {
        (Some(month), Some(year)) => Some(PayPeriod::new(month as u32, year as i32)),
        (None, None) => None,
        _ => {
            return Err(LedgerError::Serialization(format!(
                "entry {id} carries a half-set pay period"
            )))
        }
    };
    let transaction_type =
        TransactionType::from_str(&type_raw).map_err(LedgerError::Serialization)?;
    let status = EntryStatus::from_str(&status_raw).map_err(LedgerError::Serialization)?;

    Ok(LedgerEntry {
        id: LedgerId::new(id),
        employee_id: EmployeeId::from(employee),
        transaction_date: decode_timestamp(&date_raw)?,
        transaction_type,
        debit_amount: money::from_minor_units(debit_minor),
        credit_amount: money::from_minor_units(credit_minor),
        balance: money::from_minor_units(balance_minor),
        reference_id: reference_id.map(LedgerId::new),
        reference_type,
        reference_description,
        period,
        status,
        created_by,
        created_at: decode_timestamp(&created_raw)?,
        updated_at: decode_timestamp(&updated_raw)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryDraft;
    use crate::validate::validate;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn credit(store: &SqliteLedgerStore, employee: &str, amount: rust_decimal::Decimal) -> LedgerEntry {
        let draft = EntryDraft::credit(employee, TransactionType::Payroll, amount, "payroll.bot");
        store.insert(&validate(draft).unwrap()).unwrap()
    }

    #[test]
    fn insert_assigns_ids_and_chains_balances() {
        let dir = tempdir().unwrap();
        let store = SqliteLedgerStore::new(dir.path().join("ledger.db")).unwrap();

        let first = credit(&store, "E-1001", dec!(100.50));
        let second = credit(&store, "E-1001", dec!(49.50));
        assert!(second.id > first.id);
        assert_eq!(first.balance, dec!(100.50));
        assert_eq!(second.balance, dec!(150.00));

        let fetched = store.entry(second.id).unwrap();
        assert_eq!(fetched, second);
    }

    #[test]
    fn entry_miss_reports_not_found() {
        let dir = tempdir().unwrap();
        let store = SqliteLedgerStore::new(dir.path().join("ledger.db")).unwrap();
        let err = store.entry(LedgerId::new(999)).unwrap_err();
        assert!(matches!(err, LedgerError::EntryNotFound(id) if id == LedgerId::new(999)));
    }

    #[test]
    fn filters_narrow_by_type_and_status() {
        let dir = tempdir().unwrap();
        let store = SqliteLedgerStore::new(dir.path().join("ledger.db")).unwrap();
        let employee = EmployeeId::from("E-2002");

        credit(&store, "E-2002", dec!(10));
        let advance = validate(EntryDraft::debit(
            "E-2002",
            TransactionType::Advance,
            dec!(5),
            "hr.clerk",
        ))
        .unwrap();
        store.insert(&advance).unwrap();

        let filter = EntryFilter::default().with_type(TransactionType::Advance);
        let paged = store
            .entries_for(&employee, &filter, Page::default())
            .unwrap();
        assert_eq!(paged.total, 1);
        assert_eq!(paged.items[0].transaction_type, TransactionType::Advance);

        let filter = EntryFilter::default().with_status(EntryStatus::Cancelled);
        let paged = store
            .entries_for(&employee, &filter, Page::default())
            .unwrap();
        assert_eq!(paged.total, 0);
    }

    #[test]
    fn totals_skip_cancelled_rows() {
        let dir = tempdir().unwrap();
        let store = SqliteLedgerStore::new(dir.path().join("ledger.db")).unwrap();
        let employee = EmployeeId::from("E-3003");

        credit(&store, "E-3003", dec!(40));
        let second = credit(&store, "E-3003", dec!(60));
        store.cancel(second.id).unwrap();

        let totals = store.totals(&employee).unwrap();
        assert_eq!(totals.entries, 1);
        assert_eq!(totals.balance(), dec!(40));
    }

    #[test]
    fn cancel_is_single_shot() {
        let dir = tempdir().unwrap();
        let store = SqliteLedgerStore::new(dir.path().join("ledger.db")).unwrap();
        let entry = credit(&store, "E-4004", dec!(25));

        let cancelled = store.cancel(entry.id).unwrap();
        assert_eq!(cancelled.status, EntryStatus::Cancelled);
        let err = store.cancel(entry.id).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidTransition {
                status: EntryStatus::Cancelled,
                ..
            }
        ));
    }
}
