//! Error types for the invoice triplicate library

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the invoice triplicate library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invoice file not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invoice folder not found
    #[error("Folder not found: {}", .0.display())]
    FolderNotFound(PathBuf),

    /// Invoice range is not a pair of integers with start <= end
    #[error("Invalid invoice range: {0}")]
    InvalidRange(String),

    /// Document has fewer than 3 pages
    #[error("PDF has {0} page(s), fewer than 3 - no triplicate pages to print")]
    TooFewPages(usize),

    /// Document exceeds the capped rule's page limit
    #[error("PDF has {pages} pages, more than the limit of {limit}")]
    TooManyPages { pages: usize, limit: usize },

    /// Assembly was asked for a zero-length tail
    #[error("No duplicate pages to produce")]
    NoDuplicatePages,

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// Every print method failed
    #[error("Could not print PDF: {0}")]
    PrintFailure(String),

    /// A print command did not finish in time
    #[error("Print command timed out after {}s", .0.as_secs())]
    PrintTimeout(Duration),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Errors that mean "this document has nothing to print" rather than a failure.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Error::TooFewPages(_) | Error::TooManyPages { .. } | Error::NoDuplicatePages
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_classification() {
        assert!(Error::TooFewPages(2).is_skip());
        assert!(Error::TooManyPages { pages: 12, limit: 11 }.is_skip());
        assert!(Error::NoDuplicatePages.is_skip());
        assert!(!Error::PrintFailure("offline".to_string()).is_skip());
        assert!(!Error::PrintTimeout(Duration::from_secs(20)).is_skip());
    }

    #[test]
    fn test_messages() {
        let err = Error::TooManyPages { pages: 12, limit: 11 };
        assert_eq!(err.to_string(), "PDF has 12 pages, more than the limit of 11");
        assert_eq!(
            Error::PrintTimeout(Duration::from_secs(30)).to_string(),
            "Print command timed out after 30s"
        );
    }
}
