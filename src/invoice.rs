//! Invoice file discovery
//!
//! Invoices live in one folder as `{prefix}{number}.pdf`. A run covers an
//! inclusive range of numbers; gaps in the range are expected and only
//! produce a warning.

use std::path::{Path, PathBuf};
use log::warn;
use crate::error::{Error, Result};

/// Inclusive range of invoice numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceRange {
    pub start: u64,
    pub end: u64,
}

impl InvoiceRange {
    /// Create a range, checking `start <= end`
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidRange(format!(
                "start invoice number {} must be less than or equal to end invoice number {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse user-entered start/end values
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let start = parse_invoice_number(start, "start")?;
        let end = parse_invoice_number(end, "end")?;
        Self::new(start, end)
    }

    /// Number of invoice numbers covered, saturating at `u64::MAX`
    pub fn count(&self) -> u64 {
        self.end.saturating_sub(self.start).saturating_add(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> {
        self.start..=self.end
    }
}

fn parse_invoice_number(value: &str, which: &str) -> Result<u64> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::InvalidRange(format!("{} invoice number is required", which)));
    }
    value.parse::<u64>().map_err(|_| {
        Error::InvalidRange(format!("{} invoice number must be an integer, got '{}'", which, value))
    })
}

/// File name for an invoice number, e.g. `C300.pdf`
pub fn invoice_file_name(prefix: &str, number: u64) -> String {
    format!("{}{}.pdf", prefix, number)
}

/// An invoice PDF found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceFile {
    pub number: u64,
    pub path: PathBuf,
}

impl InvoiceFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Outcome of scanning a folder for a range of invoices
#[derive(Debug, Clone, Default)]
pub struct InvoiceScan {
    /// Files that exist, in invoice number order
    pub found: Vec<InvoiceFile>,
    /// File names in the range that do not exist
    pub missing: Vec<String>,
}

/// Look up every invoice in `range` inside `folder`.
///
/// A missing folder is an error; missing invoices are logged and recorded.
pub fn find_invoice_files(folder: &Path, prefix: &str, range: InvoiceRange) -> Result<InvoiceScan> {
    if !folder.is_dir() {
        return Err(Error::FolderNotFound(folder.to_path_buf()));
    }

    let mut scan = InvoiceScan::default();
    for number in range.iter() {
        let name = invoice_file_name(prefix, number);
        let path = folder.join(&name);
        if path.is_file() {
            scan.found.push(InvoiceFile { number, path });
        } else {
            warn!("{} not found", name);
            scan.missing.push(name);
        }
    }

    Ok(scan)
}

/// Transient print file next to the source, e.g. `C300_temp_print.pdf`
pub fn temp_output_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "invoice".to_string());
    source.with_file_name(format!("{}_temp_print.pdf", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_range() {
        let range = InvoiceRange::parse(" 300 ", "305").unwrap();
        assert_eq!(range, InvoiceRange { start: 300, end: 305 });
        assert_eq!(range.count(), 6);
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![300, 301, 302, 303, 304, 305]);
    }

    #[test]
    fn test_single_invoice_range() {
        let range = InvoiceRange::parse("7", "7").unwrap();
        assert_eq!(range.count(), 1);
    }

    #[test]
    fn test_full_range_count_saturates() {
        let range = InvoiceRange::new(0, u64::MAX).unwrap();
        assert_eq!(range.count(), u64::MAX);
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(matches!(InvoiceRange::parse("10", "9"), Err(Error::InvalidRange(_))));
        assert!(matches!(InvoiceRange::parse("abc", "9"), Err(Error::InvalidRange(_))));
        assert!(matches!(InvoiceRange::parse("1", "2.5"), Err(Error::InvalidRange(_))));
        assert!(matches!(InvoiceRange::parse("", "9"), Err(Error::InvalidRange(_))));
        assert!(matches!(InvoiceRange::parse("-1", "9"), Err(Error::InvalidRange(_))));
    }

    #[test]
    fn test_file_names() {
        assert_eq!(invoice_file_name("C", 300), "C300.pdf");
        assert_eq!(invoice_file_name("", 42), "42.pdf");
    }

    #[test]
    fn test_temp_output_path() {
        let temp = temp_output_path(Path::new("/invoices/C300.pdf"));
        assert_eq!(temp, Path::new("/invoices/C300_temp_print.pdf"));
    }

    #[test]
    fn test_find_invoice_files_records_gaps() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(dir.path().join("C1.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("C3.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("2.pdf"), b"%PDF").unwrap();

        let scan = find_invoice_files(dir.path(), "C", InvoiceRange::new(1, 3).unwrap()).unwrap();
        let numbers: Vec<u64> = scan.found.iter().map(|f| f.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(scan.missing, vec!["C2.pdf".to_string()]);
        assert_eq!(scan.found[1].file_name(), "C3.pdf");
    }

    #[test]
    fn test_find_invoice_files_missing_folder() {
        let result = find_invoice_files(
            Path::new("definitely/not/a/folder"),
            "",
            InvoiceRange::new(1, 2).unwrap(),
        );
        assert!(matches!(result, Err(Error::FolderNotFound(_))));
    }
}
