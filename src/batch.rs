//! Printing a range of invoices
//!
//! Documents are handled strictly one after another: build the print
//! document, check it, print it, delete it. A problem with one invoice is
//! logged and the batch moves on; only a missing folder stops the run.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use log::{error, info, warn};
use crate::error::{Error, Result};
use crate::invoice::{find_invoice_files, temp_output_path, InvoiceFile, InvoiceRange};
use crate::pdf::{count_pages, write_triplicate_pdf, TriplicateSummary};
use crate::plan::{AssemblyPolicy, TriplicateRule};
use crate::printer::Printer;

/// Pause between print jobs so the printer queue is not flooded
pub const DEFAULT_JOB_DELAY: Duration = Duration::from_secs(2);

/// Options for a batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Folder holding the invoice PDFs
    pub folder: PathBuf,
    /// File name prefix, e.g. "C" for C300.pdf
    pub prefix: String,
    /// Invoice numbers to print
    pub range: InvoiceRange,
    pub policy: AssemblyPolicy,
    pub rule: TriplicateRule,
    /// Pause after each printed invoice except the last
    pub job_delay: Duration,
    /// Leave the transient print files on disk
    pub keep_temp: bool,
}

impl BatchOptions {
    /// Options with the default policy and its default rule
    pub fn new(folder: impl Into<PathBuf>, prefix: &str, range: InvoiceRange) -> Self {
        let policy = AssemblyPolicy::default();
        Self {
            folder: folder.into(),
            prefix: prefix.to_string(),
            range,
            policy,
            rule: policy.default_rule(),
            job_delay: DEFAULT_JOB_DELAY,
            keep_temp: false,
        }
    }
}

/// What happened to one invoice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceOutcome {
    Printed(TriplicateSummary),
    /// Nothing to print, e.g. fewer than 3 pages
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct InvoiceResult {
    pub file: InvoiceFile,
    pub outcome: InvoiceOutcome,
}

/// Summary of a batch run
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// One entry per invoice found, in invoice order
    pub results: Vec<InvoiceResult>,
    /// File names in the range that were not found
    pub missing: Vec<String>,
}

impl BatchReport {
    /// True when no invoice in the range existed
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn found(&self) -> usize {
        self.results.len()
    }

    pub fn printed(&self) -> usize {
        self.count(|o| matches!(o, InvoiceOutcome::Printed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, InvoiceOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, InvoiceOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&InvoiceOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// A file that is deleted when dropped, whatever happened in between
struct TempFile {
    path: PathBuf,
    keep: bool,
}

impl TempFile {
    fn new(path: PathBuf, keep: bool) -> Self {
        Self { path, keep }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.keep || !self.path.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Could not remove {}: {}", self.path.display(), e);
        }
    }
}

/// Print every invoice in `options.range` found in `options.folder`
pub fn run_batch(options: &BatchOptions, printer: &dyn Printer) -> Result<BatchReport> {
    info!("Searching for invoices in: {}", options.folder.display());
    info!("Range: {} to {}", options.range.start, options.range.end);

    let scan = find_invoice_files(&options.folder, &options.prefix, options.range)?;
    let mut report = BatchReport {
        results: Vec::with_capacity(scan.found.len()),
        missing: scan.missing,
    };

    if scan.found.is_empty() {
        warn!("No invoice files found in the specified range");
        return Ok(report);
    }
    info!("Found {} invoice file(s)", scan.found.len());

    let total = scan.found.len();
    for (i, file) in scan.found.into_iter().enumerate() {
        info!("[{}/{}] Processing {}", i + 1, total, file.file_name());

        let outcome = match print_invoice(&file, options, printer) {
            Ok(summary) => {
                info!("  printed {}", file.file_name());
                InvoiceOutcome::Printed(summary)
            }
            Err(e) if e.is_skip() => {
                warn!("  skipped {}: {}", file.file_name(), e);
                InvoiceOutcome::Skipped(e.to_string())
            }
            Err(e) => {
                error!("  failed {}: {}", file.file_name(), e);
                InvoiceOutcome::Failed(e.to_string())
            }
        };

        let printed = matches!(outcome, InvoiceOutcome::Printed(_));
        report.results.push(InvoiceResult { file, outcome });

        if printed && i + 1 < total && !options.job_delay.is_zero() {
            thread::sleep(options.job_delay);
        }
    }

    info!(
        "Printed {}/{} invoice(s), {} skipped, {} failed",
        report.printed(),
        report.found(),
        report.skipped(),
        report.failed()
    );

    Ok(report)
}

/// Build, verify and print one invoice; the transient file is always removed
fn print_invoice(file: &InvoiceFile, options: &BatchOptions, printer: &dyn Printer) -> Result<TriplicateSummary> {
    let temp = TempFile::new(temp_output_path(&file.path), options.keep_temp);

    let summary = write_triplicate_pdf(&file.path, temp.path(), options.rule, options.policy)?;

    let written = count_pages(temp.path())?;
    if written != summary.output_pages {
        return Err(Error::General(format!(
            "Print document has {} pages, expected {}",
            written, summary.output_pages
        )));
    }

    info!("  original pages: {}", summary.total_pages);
    info!("  triplicate pages: last {}", summary.duplicate_count);
    info!("  pages to print: {}", summary.output_pages);
    info!("  sending to {} printer", printer.name());

    printer.print(temp.path())?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_options() {
        let options = BatchOptions::new("/invoices", "C", InvoiceRange::new(1, 2).unwrap());
        assert_eq!(options.policy, AssemblyPolicy::FullPlusTwoExtraCopies);
        assert_eq!(options.rule, TriplicateRule::Uncapped);
        assert_eq!(options.job_delay, DEFAULT_JOB_DELAY);
        assert!(!options.keep_temp);
    }

    #[test]
    fn test_temp_file_removed_on_drop() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("C1_temp_print.pdf");
        std::fs::write(&path, b"%PDF").unwrap();
        drop(TempFile::new(path.clone(), false));
        assert!(!path.exists());
    }

    #[test]
    fn test_temp_file_kept_when_asked() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("C1_temp_print.pdf");
        std::fs::write(&path, b"%PDF").unwrap();
        drop(TempFile::new(path.clone(), true));
        assert!(path.exists());
    }

    #[test]
    fn test_report_counts() {
        let file = InvoiceFile { number: 1, path: PathBuf::from("1.pdf") };
        let summary = TriplicateSummary { total_pages: 3, duplicate_count: 1, output_pages: 5 };
        let report = BatchReport {
            results: vec![
                InvoiceResult { file: file.clone(), outcome: InvoiceOutcome::Printed(summary) },
                InvoiceResult { file: file.clone(), outcome: InvoiceOutcome::Skipped("short".into()) },
                InvoiceResult { file: file.clone(), outcome: InvoiceOutcome::Failed("offline".into()) },
                InvoiceResult { file, outcome: InvoiceOutcome::Failed("offline".into()) },
            ],
            missing: vec![],
        };
        assert_eq!(report.found(), 4);
        assert_eq!(report.printed(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 2);
    }

    #[test]
    fn test_missing_folder_stops_the_run() {
        let options = BatchOptions::new("no/such/folder", "", InvoiceRange::new(1, 1).unwrap());
        let result = run_batch(&options, &crate::printer::DryRunPrinter);
        assert!(matches!(result, Err(Error::FolderNotFound(_))));
    }

    // Runs against generated PDFs are in tests/integration.rs
}
