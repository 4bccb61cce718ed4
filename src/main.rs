use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use movimientos::ledger::{export_section_csv, export_section_to_path, LedgerStore};
use movimientos::{load_documents, month_name, Bank, Currency, Pipeline, RunSummary, Settings};

#[derive(Debug, Parser)]
#[command(name = "movimientos", version, about = "Bank notification e-mails → monthly movement ledgers")]
struct Cli {
    /// Config file (TOML). Defaults to ./movimientos.toml when present
    #[arg(long, global = true, env = "MOVIMIENTOS_CONFIG")]
    config: Option<PathBuf>,

    /// Use the debug output directory and verbose logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import .eml / .html notifications from a file or directory
    Import { path: PathBuf },

    /// Export one month section as CSV
    Export {
        #[arg(long)]
        bank: Bank,
        #[arg(long)]
        currency: Currency,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Browse a ledger in the terminal
    View {
        #[arg(long)]
        bank: Bank,
        #[arg(long)]
        currency: Currency,
        #[arg(long)]
        year: i32,
        /// Month to open first (1-12)
        #[arg(long)]
        month: Option<u32>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    init_tracing(&settings, cli.debug);

    match cli.command {
        Command::Import { path } => run_import(settings, &path, cli.debug),
        Command::Export {
            bank,
            currency,
            year,
            month,
            out,
        } => run_export(&settings, bank, currency, year, month, out, cli.debug),
        Command::View {
            bank,
            currency,
            year,
            month,
        } => run_view(&settings, bank, currency, year, month, cli.debug),
    }
}

fn init_tracing(settings: &Settings, debug: bool) {
    let level = if debug && settings.debug.verbose_logging {
        "debug"
    } else {
        settings.app.level.as_str()
    };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| format!("movimientos={}", level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_import(settings: Settings, path: &std::path::Path, debug: bool) -> Result<()> {
    println!("📥 Importing bank notifications from {}", path.display());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let loaded = load_documents(path, |sender| settings.is_sender_allowed(sender))?;
    println!(
        "✓ Loaded {} documents ({} skipped by sender, {} unreadable)",
        loaded.documents.len(),
        loaded.skipped_senders,
        loaded.unreadable
    );

    let pipeline = Pipeline::new(settings).with_debug(debug);
    let summary = pipeline.run(&loaded.documents);
    print_summary(&summary);

    if summary.failed_units() > 0 {
        bail!("{} ledger(s) failed to update", summary.failed_units());
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let parse = &summary.parse;
    println!("\n🔍 Parsed {}/{} documents", parse.parsed, parse.documents);
    if parse.undetected > 0 {
        println!("   • {} not recognised", parse.undetected);
    }
    if parse.malformed_date > 0 {
        println!("   • {} with unparsable date", parse.malformed_date);
    }
    if summary.zero_amount + summary.missing_fields > 0 {
        println!("   • {} without amount", summary.zero_amount + summary.missing_fields);
    }
    if summary.undetected_currency > 0 {
        println!("   • {} without currency", summary.undetected_currency);
    }
    if summary.unconfigured > 0 {
        println!("   • {} for banks/currencies not configured", summary.unconfigured);
    }

    println!("\n💾 Ledgers");
    for unit in &summary.units {
        match &unit.result {
            Ok(sections) => {
                for section in sections {
                    let r = &section.report;
                    println!(
                        "✓ {} {} {} {}: {} new ({} in gaps, {} appended), {} duplicates",
                        unit.bank,
                        unit.currency,
                        unit.year,
                        section.month,
                        r.written(),
                        r.written_in_empty,
                        r.appended,
                        r.skipped_duplicates
                    );
                }
            }
            Err(err) if err.is_retryable() => {
                println!("⏸  {}: busy, close it and run again", unit.path.display());
            }
            Err(err) => {
                println!("❌ {}: {}", unit.path.display(), err);
            }
        }
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ {} movements written", summary.written());
}

fn open_existing(settings: &Settings, bank: Bank, currency: Currency, year: i32, debug: bool) -> Result<LedgerStore> {
    let path = settings.ledger_path(bank, currency, year, debug);
    if !path.exists() {
        bail!("ledger not found: {}", path.display());
    }
    Ok(LedgerStore::open(&path)?)
}

fn run_export(
    settings: &Settings,
    bank: Bank,
    currency: Currency,
    year: i32,
    month: u32,
    out: Option<PathBuf>,
    debug: bool,
) -> Result<()> {
    let name = month_name(month).with_context(|| format!("invalid month {}", month))?;
    let store = open_existing(settings, bank, currency, year, debug)?;
    let workbook = store.load_workbook()?.context("ledger has no sections")?;
    let section = workbook
        .sheet(name)
        .with_context(|| format!("section {} not found", name))?;

    match out {
        Some(path) => {
            let rows = export_section_to_path(section, &path)?;
            eprintln!("✓ Exported {} rows to {}", rows, path.display());
        }
        None => {
            export_section_csv(section, std::io::stdout().lock())?;
        }
    }
    Ok(())
}

#[cfg(feature = "tui")]
fn run_view(
    settings: &Settings,
    bank: Bank,
    currency: Currency,
    year: i32,
    month: Option<u32>,
    debug: bool,
) -> Result<()> {
    let store = open_existing(settings, bank, currency, year, debug)?;
    let workbook = store.load_workbook()?.context("ledger has no sections")?;

    let title = format!("{} {} {}", bank, currency, year);
    let mut app = movimientos::ui::App::new(title, &workbook);
    if let Some(name) = month.and_then(month_name) {
        app = app.with_section(name);
    }
    movimientos::ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn run_view(
    _settings: &Settings,
    _bank: Bank,
    _currency: Currency,
    _year: i32,
    _month: Option<u32>,
    _debug: bool,
) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    std::process::exit(1);
}
