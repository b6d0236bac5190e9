//! Command-line surface of the paylog ledger.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use paylog_core::{EmployeeId, LedgerId, Page, PayPeriod};
use paylog_ledger::{
    AuditFinding, EntryDraft, EntryFilter, EntryStatus, Ledger, LedgerEntry, RosterFilter,
    SqliteLedgerStore, StaticDirectory, TransactionType,
};

use crate::export::write_history_csv;
use crate::settings::{load_roster, Settings};

#[derive(Parser, Debug)]
#[command(name = "paylog")]
#[command(version, about = "Append-only employee compensation ledger")]
pub struct Cli {
    /// Path to a TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger database path, overriding the settings file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Roster TOML file naming the known employees
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    /// Emit machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Write daily-rolling log files into this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append a new ledger entry
    Post(PostArgs),
    /// Reverse an entry by posting its counter-entry
    Reverse {
        /// Ledger entry id
        id: LedgerId,
        /// Reason recorded on the counter-entry
        #[arg(long)]
        reason: String,
        /// Acting user recorded as the counter-entry author
        #[arg(long = "by")]
        acting_user: String,
    },
    /// Cancel an entry without posting a counter-entry
    Cancel {
        /// Ledger entry id
        id: LedgerId,
    },
    /// Show one entry in full
    Show {
        /// Ledger entry id
        id: LedgerId,
    },
    /// List an employee's entries, newest first
    List(ListArgs),
    /// Print an employee's current balance
    Balance {
        /// Employee id
        employee: EmployeeId,
    },
    /// Print an employee's totals and identity
    Summary {
        /// Employee id
        employee: EmployeeId,
    },
    /// List employees with their balances
    Roster(RosterArgs),
    /// Verify stored balance snapshots against a fresh replay
    Audit {
        /// Employee id
        employee: EmployeeId,
    },
    /// Export an employee's full history as CSV
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct PostArgs {
    /// Employee the entry belongs to
    #[arg(long)]
    employee: EmployeeId,

    /// Transaction type (ADVANCE, LOAN, DEDUCTION, PAYROLL, BONUS, ALLOWANCE,
    /// REFUND, ADJUSTMENT)
    #[arg(long = "type")]
    transaction_type: TransactionType,

    /// Amount owed by the employee
    #[arg(long)]
    debit: Option<Decimal>,

    /// Amount paid to the employee
    #[arg(long)]
    credit: Option<Decimal>,

    /// Acting user recorded as the entry author
    #[arg(long = "by")]
    created_by: String,

    /// Backdate the entry (RFC 3339)
    #[arg(long)]
    date: Option<DateTime<Utc>>,

    /// Id of a related ledger entry
    #[arg(long)]
    reference_id: Option<LedgerId>,

    /// Kind of the related record
    #[arg(long)]
    reference_type: Option<String>,

    /// Free-text description
    #[arg(long)]
    description: Option<String>,

    /// Pay period the entry belongs to (YYYY-MM)
    #[arg(long)]
    period: Option<PayPeriod>,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Employee id
    employee: EmployeeId,

    /// Only entries of this transaction type
    #[arg(long = "type")]
    transaction_type: Option<TransactionType>,

    /// Only entries in this status (ACTIVE, CANCELLED, REVERSED)
    #[arg(long)]
    status: Option<EntryStatus>,

    /// Entries dated at or after this instant (RFC 3339)
    #[arg(long)]
    from: Option<DateTime<Utc>>,

    /// Entries dated at or before this instant (RFC 3339)
    #[arg(long)]
    to: Option<DateTime<Utc>>,

    /// Only entries tagged with this pay period (YYYY-MM)
    #[arg(long)]
    period: Option<PayPeriod>,

    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Rows per page, defaulting to the settings value
    #[arg(long)]
    page_size: Option<u32>,
}

#[derive(Args, Debug)]
struct RosterArgs {
    /// Substring match against employee id or display name
    #[arg(long)]
    search: Option<String>,

    /// Exact department match, case-insensitive
    #[arg(long)]
    department: Option<String>,

    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Rows per page, defaulting to the settings value
    #[arg(long)]
    page_size: Option<u32>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Employee id
    employee: EmployeeId,

    /// Destination file; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Parse the command line, wire up the ledger, and dispatch.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let log_dir = cli.log_dir.clone().or_else(|| settings.log_dir.clone());
    let _guard = init_tracing(log_dir.as_deref());

    let db_path = cli.db.clone().unwrap_or_else(|| settings.db_path.clone());
    let store = SqliteLedgerStore::new(&db_path)?;
    debug!(db = %db_path.display(), "ledger database opened");

    let roster_path = cli.roster.clone().or_else(|| settings.roster_path.clone());
    let directory = match roster_path {
        Some(path) => StaticDirectory::new(load_roster(&path)?),
        None => StaticDirectory::default(),
    };

    let ledger = Ledger::new(Arc::new(store), Arc::new(directory));

    match cli.command {
        Commands::Post(args) => post(&ledger, args, cli.json),
        Commands::Reverse {
            id,
            reason,
            acting_user,
        } => reverse(&ledger, id, &reason, &acting_user, cli.json),
        Commands::Cancel { id } => cancel(&ledger, id, cli.json),
        Commands::Show { id } => show(&ledger, id, cli.json),
        Commands::List(args) => list(&ledger, args, settings.page_size, cli.json),
        Commands::Balance { employee } => balance(&ledger, &employee, cli.json),
        Commands::Summary { employee } => summary(&ledger, &employee, cli.json),
        Commands::Roster(args) => roster(&ledger, args, settings.page_size, cli.json),
        Commands::Audit { employee } => audit(&ledger, &employee, cli.json),
        Commands::Export(args) => export(&ledger, args),
    }
}

/// Install the tracing subscriber. Honors `RUST_LOG`, defaults to `info`,
/// and switches from stderr to a daily-rolling file when a directory is
/// given. The returned guard must stay alive for the file writer to flush.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "paylog.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

fn post(ledger: &Ledger, args: PostArgs, json: bool) -> Result<()> {
    let draft = EntryDraft {
        employee_id: args.employee,
        transaction_type: args.transaction_type,
        debit_amount: args.debit.unwrap_or(Decimal::ZERO),
        credit_amount: args.credit.unwrap_or(Decimal::ZERO),
        created_by: args.created_by,
        transaction_date: args.date,
        reference_id: args.reference_id,
        reference_type: args.reference_type,
        reference_description: args.description,
        period: args.period,
    };
    let entry = ledger.post(draft)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!("posted {}", entry_line(&entry));
    }
    Ok(())
}

fn reverse(
    ledger: &Ledger,
    id: LedgerId,
    reason: &str,
    acting_user: &str,
    json: bool,
) -> Result<()> {
    let outcome = ledger.reverse(id, reason, acting_user)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("reversed {}", entry_line(&outcome.original));
        println!("counter  {}", entry_line(&outcome.counter));
    }
    Ok(())
}

fn cancel(ledger: &Ledger, id: LedgerId, json: bool) -> Result<()> {
    let entry = ledger.cancel(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!("cancelled {}", entry_line(&entry));
    }
    Ok(())
}

fn show(ledger: &Ledger, id: LedgerId, json: bool) -> Result<()> {
    let entry = ledger.entry(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }
    println!("entry #{}", entry.id);
    println!("  employee     {}", entry.employee_id);
    println!("  date         {}", timestamp(&entry.transaction_date));
    println!("  type         {}", entry.transaction_type);
    println!("  debit        {}", entry.debit_amount);
    println!("  credit       {}", entry.credit_amount);
    println!("  balance      {}", entry.balance);
    println!("  status       {}", entry.status);
    if let Some(reference) = entry.reference_id {
        println!(
            "  reference    #{} ({})",
            reference,
            entry.reference_type.as_deref().unwrap_or("-")
        );
    }
    if let Some(description) = &entry.reference_description {
        println!("  description  {description}");
    }
    if let Some(period) = entry.period {
        println!("  period       {period}");
    }
    println!("  created by   {}", entry.created_by);
    println!("  created at   {}", timestamp(&entry.created_at));
    println!("  updated at   {}", timestamp(&entry.updated_at));
    Ok(())
}

fn list(ledger: &Ledger, args: ListArgs, default_page_size: u32, json: bool) -> Result<()> {
    let filter = EntryFilter {
        transaction_type: args.transaction_type,
        status: args.status,
        start_date: args.from,
        end_date: args.to,
        period: args.period,
    };
    let page = Page::new(args.page, args.page_size.unwrap_or(default_page_size));
    let result = ledger.entries_for(&args.employee, &filter, page)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    for entry in &result.items {
        println!("{}", entry_line(entry));
    }
    println!(
        "page {}/{} ({} entries total)",
        result.page.number(),
        result.page_count().max(1),
        result.total
    );
    Ok(())
}

fn balance(ledger: &Ledger, employee: &EmployeeId, json: bool) -> Result<()> {
    let balance = ledger.current_balance(employee)?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "employee_id": employee,
                "balance": balance,
            }))?
        );
    } else {
        println!("{balance}");
    }
    Ok(())
}

fn summary(ledger: &Ledger, employee: &EmployeeId, json: bool) -> Result<()> {
    let summary = ledger.employee_summary(employee)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!(
        "{} ({})",
        summary.display_name,
        summary.department.as_deref().unwrap_or("no department")
    );
    println!("  balance      {}", summary.balance);
    println!("  credits      {}", summary.total_credits);
    println!("  debits       {}", summary.total_debits);
    println!("  entries      {}", summary.entries);
    if let Some(last) = &summary.last_transaction {
        println!("  last entry   {}", timestamp(last));
    }
    Ok(())
}

fn roster(ledger: &Ledger, args: RosterArgs, default_page_size: u32, json: bool) -> Result<()> {
    let mut filter = RosterFilter::default();
    if let Some(search) = args.search {
        filter = filter.with_search(search);
    }
    if let Some(department) = args.department {
        filter = filter.with_department(department);
    }
    let page = Page::new(args.page, args.page_size.unwrap_or(default_page_size));
    let result = ledger.roster_summary(&filter, page)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    for row in &result.items {
        println!(
            "{}  {}  {}  balance {}  ({} entries)",
            row.employee_id,
            row.display_name,
            row.department.as_deref().unwrap_or("-"),
            row.balance,
            row.entries
        );
    }
    println!(
        "page {}/{} ({} employees total)",
        result.page.number(),
        result.page_count().max(1),
        result.total
    );
    Ok(())
}

fn audit(ledger: &Ledger, employee: &EmployeeId, json: bool) -> Result<()> {
    let report = ledger.audit_employee(employee)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if report.is_clean() {
        println!("{} entries checked, ledger is clean", report.entries_checked);
        return Ok(());
    }
    println!(
        "{} entries checked, {} findings",
        report.entries_checked,
        report.findings.len()
    );
    for finding in &report.findings {
        match finding {
            AuditFinding::AmountExclusivity { id, debit, credit } => {
                println!("  entry #{id}: debit {debit} and credit {credit} violate exclusivity");
            }
            AuditFinding::SnapshotDrift {
                id,
                stored,
                expected,
            } => {
                println!("  entry #{id}: stored balance {stored}, chain expects {expected}");
            }
            AuditFinding::TailDivergence { cached, replayed } => {
                println!("  tail: cached balance {cached}, full replay gives {replayed}");
            }
        }
    }
    Ok(())
}

fn export(ledger: &Ledger, args: ExportArgs) -> Result<()> {
    let history = ledger.history(&args.employee)?;
    match args.output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("creating export file {}", path.display()))?;
            let rows = write_history_csv(&history, file)?;
            println!("exported {rows} entries to {}", path.display());
        }
        None => {
            write_history_csv(&history, std::io::stdout().lock())?;
        }
    }
    Ok(())
}

fn entry_line(entry: &LedgerEntry) -> String {
    let movement = if entry.debit_amount > Decimal::ZERO {
        format!("debit {}", entry.debit_amount)
    } else {
        format!("credit {}", entry.credit_amount)
    };
    format!(
        "#{}  {}  {}  {}  {}  balance {}  {}",
        entry.id,
        timestamp(&entry.transaction_date),
        entry.employee_id,
        entry.transaction_type,
        movement,
        entry.balance,
        entry.status
    )
}

fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}
