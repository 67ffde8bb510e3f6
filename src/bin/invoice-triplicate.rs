//! Invoice Triplicate CLI tool
//!
//! A command-line tool for printing invoices with triplicate copies of their
//! last pages.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use invoice_triplicate::batch::{run_batch, BatchOptions, InvoiceOutcome};
use invoice_triplicate::invoice::InvoiceRange;
use invoice_triplicate::pdf::{inspect_invoice, write_triplicate_pdf};
use invoice_triplicate::printer::{CommandPrinter, DryRunPrinter, Printer, SystemPrinter};
use invoice_triplicate::{AssemblyPolicy, TriplicateRule};

/// Invoice Triplicate - print invoices with extra copies of their last pages
#[derive(Parser)]
#[command(name = "invoice-triplicate")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Print C300.pdf to C310.pdf from the current folder
    invoice-triplicate print --prefix C 300 310

    # Print only the last pages, once, from another folder
    invoice-triplicate print --folder ~/invoices --policy tail-once 1 25

    # Send jobs to a specific printer queue
    invoice-triplicate print --print-command \"lp -d office\" 300 310

    # Write the print document without printing it
    invoice-triplicate build C300.pdf -o C300-print.pdf --policy tail-rescaled")]
struct Cli {
    /// Show debug output (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output arrangement
#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    /// Whole invoice, then the last pages twice more
    FullPlusTwoExtraCopies,
    /// Only the last pages, three times
    FullPlusThreeTailCopies,
    /// Only the last pages, once
    TailOnce,
    /// Only the last pages, once, scaled onto A5 (148x210 mm)
    TailRescaled,
}

impl From<PolicyArg> for AssemblyPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::FullPlusTwoExtraCopies => AssemblyPolicy::FullPlusTwoExtraCopies,
            PolicyArg::FullPlusThreeTailCopies => AssemblyPolicy::FullPlusThreeTailCopies,
            PolicyArg::TailOnce => AssemblyPolicy::TailOnce,
            PolicyArg::TailRescaled => AssemblyPolicy::TailRescaledToFixedSheet,
        }
    }
}

/// Trailing page count rule
#[derive(Clone, Copy, Debug, ValueEnum)]
enum RuleArg {
    /// 1 page per 3, without limit
    Uncapped,
    /// At most 3 pages; invoices over 11 pages are skipped
    Capped,
}

impl From<RuleArg> for TriplicateRule {
    fn from(arg: RuleArg) -> Self {
        match arg {
            RuleArg::Uncapped => TriplicateRule::Uncapped,
            RuleArg::Capped => TriplicateRule::Capped,
        }
    }
}

#[derive(clap::Args)]
struct PlanArgs {
    /// How the print document is arranged
    #[arg(long, value_enum, default_value = "full-plus-two-extra-copies")]
    policy: PolicyArg,

    /// Rule for the number of last pages (defaults to capped for tail-rescaled, uncapped otherwise)
    #[arg(long, value_enum)]
    rule: Option<RuleArg>,
}

impl PlanArgs {
    fn resolve(&self) -> (TriplicateRule, AssemblyPolicy) {
        let policy = AssemblyPolicy::from(self.policy);
        let rule = self.rule.map(TriplicateRule::from).unwrap_or_else(|| policy.default_rule());
        (rule, policy)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print a range of invoices
    Print {
        /// First invoice number
        start: String,

        /// Last invoice number (inclusive)
        end: String,

        /// Folder containing the invoice PDFs
        #[arg(short, long, default_value = ".")]
        folder: PathBuf,

        /// File name prefix, e.g. "C" for C300.pdf
        #[arg(short, long, default_value = "")]
        prefix: String,

        #[command(flatten)]
        plan: PlanArgs,

        /// Pause between print jobs in milliseconds
        #[arg(long, env = "INVOICE_PRINT_DELAY_MS", default_value_t = 2000)]
        delay_ms: u64,

        /// Seconds each print attempt may take before it is abandoned
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Print with this command instead of the system methods; "{}" is replaced by the file path
        #[arg(long, env = "INVOICE_PRINT_COMMAND")]
        print_command: Option<String>,

        /// Build and check the print documents but do not print
        #[arg(long)]
        dry_run: bool,

        /// Keep the temporary print files
        #[arg(long)]
        keep_temp: bool,
    },

    /// Write the print document for one invoice without printing
    Build {
        /// Invoice PDF
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        plan: PlanArgs,
    },

    /// Show page count and duplication plan for an invoice
    Info {
        /// Invoice PDF
        input: PathBuf,

        #[command(flatten)]
        plan: PlanArgs,
    },
}

/// Print attempts bounded by this when no timeout is given for a custom command
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let result = match cli.command {
        Commands::Print {
            start, end, folder, prefix, plan, delay_ms, timeout_secs,
            print_command, dry_run, keep_temp,
        } => {
            cmd_print(
                start, end, folder, prefix, plan, delay_ms, timeout_secs,
                print_command, dry_run, keep_temp,
            )
        }
        Commands::Build { input, output, plan } => cmd_build(input, output, plan),
        Commands::Info { input, plan } => cmd_info(input, plan),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Pick the printer for this run
fn make_printer(
    print_command: Option<String>,
    timeout_secs: Option<u64>,
    dry_run: bool,
) -> Result<Box<dyn Printer>> {
    let timeout = timeout_secs.map(Duration::from_secs);

    if dry_run {
        return Ok(Box::new(DryRunPrinter));
    }
    if let Some(command_line) = print_command {
        let printer = CommandPrinter::parse(&command_line, timeout.unwrap_or(DEFAULT_COMMAND_TIMEOUT))?;
        return Ok(Box::new(printer));
    }

    let printer = SystemPrinter::for_current_platform();
    Ok(Box::new(match timeout {
        Some(timeout) => printer.with_timeout(timeout),
        None => printer,
    }))
}

/// Print a range of invoices
#[allow(clippy::too_many_arguments)]
fn cmd_print(
    start: String,
    end: String,
    folder: PathBuf,
    prefix: String,
    plan: PlanArgs,
    delay_ms: u64,
    timeout_secs: Option<u64>,
    print_command: Option<String>,
    dry_run: bool,
    keep_temp: bool,
) -> Result<()> {
    let range = InvoiceRange::parse(&start, &end)?;
    let (rule, policy) = plan.resolve();
    let printer = make_printer(print_command, timeout_secs, dry_run)?;

    eprintln!("Ready to print invoices:");
    eprintln!("  Folder: {}", folder.display());
    eprintln!("  Prefix: {}", if prefix.is_empty() { "(none)" } else { prefix.as_str() });
    eprintln!("  Range: {} to {}", range.start, range.end);
    eprintln!("  Policy: {} ({} rule)", policy, rule);

    let options = BatchOptions {
        policy,
        rule,
        job_delay: Duration::from_millis(delay_ms),
        keep_temp,
        ..BatchOptions::new(folder, &prefix, range)
    };

    let report = run_batch(&options, printer.as_ref())?;

    if report.is_empty() {
        eprintln!("No invoice files found in the specified range");
        return Ok(());
    }

    for result in &report.results {
        let name = result.file.file_name();
        match &result.outcome {
            InvoiceOutcome::Printed(summary) => eprintln!(
                "  ✓ {} ({} pages, last {} triplicated, {} printed)",
                name, summary.total_pages, summary.duplicate_count, summary.output_pages
            ),
            InvoiceOutcome::Skipped(reason) => eprintln!("  - {} skipped: {}", name, reason),
            InvoiceOutcome::Failed(reason) => eprintln!("  ✗ {} failed: {}", name, reason),
        }
    }
    for name in &report.missing {
        eprintln!("  ? {} not found", name);
    }

    eprintln!(
        "Process completed! Successfully printed {}/{} invoice(s)",
        report.printed(),
        report.found()
    );

    Ok(())
}

/// Write the print document for one invoice
fn cmd_build(input: PathBuf, output: PathBuf, plan: PlanArgs) -> Result<()> {
    let (rule, policy) = plan.resolve();

    eprintln!("Building {} ({})...", input.display(), policy);
    let summary = write_triplicate_pdf(&input, &output, rule, policy)
        .with_context(|| format!("Failed to build print document for {}", input.display()))?;

    eprintln!(
        "Output: {} ({} pages from {}, last {} triplicated)",
        output.display(),
        summary.output_pages,
        summary.total_pages,
        summary.duplicate_count
    );

    Ok(())
}

/// Show information about an invoice
fn cmd_info(input: PathBuf, plan: PlanArgs) -> Result<()> {
    let (rule, policy) = plan.resolve();
    let info = inspect_invoice(&input, rule, policy)?;

    println!("File: {}", input.display());
    println!("Pages: {}", info.page_count);
    if let Some(title) = &info.title {
        println!("Title: {}", title);
    }
    println!("Policy: {} ({} rule)", policy, rule);

    match (&info.plan, info.output_pages) {
        (Ok(spec), Some(pages)) => {
            println!("Triplicate pages: last {}", spec.duplicate_count);
            println!("Pages to print: {}", pages);
        }
        (Ok(_), None) => println!("Would be skipped: too many pages for {}", policy),
        (Err(e), _) => println!("Would be skipped: {}", e),
    }

    Ok(())
}
