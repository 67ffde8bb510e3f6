//! Invoice Triplicate Library
//!
//! Prints numbered invoice PDFs with extra copies of their trailing pages.
//! This library provides functionality to:
//! - Decide how many trailing pages to duplicate for a page count
//! - Arrange the output pages under one of several assembly policies
//! - Rewrite a PDF's page tree accordingly, optionally rescaling pages to A5
//! - Find `{prefix}{number}.pdf` invoices for a range of numbers
//! - Submit print documents through ranked system print methods
//!
//! # Example
//!
//! ```no_run
//! use invoice_triplicate::batch::{run_batch, BatchOptions};
//! use invoice_triplicate::invoice::InvoiceRange;
//! use invoice_triplicate::printer::SystemPrinter;
//!
//! let range = InvoiceRange::parse("300", "310").expect("Invalid range");
//! let options = BatchOptions::new("invoices", "C", range);
//! let report = run_batch(&options, &SystemPrinter::for_current_platform())
//!     .expect("Failed to print invoices");
//! println!("Printed {}/{}", report.printed(), report.found());
//! ```

pub mod error;
pub mod plan;
pub mod layout;
pub mod pdf;
pub mod invoice;
pub mod printer;
pub mod batch;

// Re-export commonly used items
pub use error::{Error, Result};
pub use plan::{assemble, AssemblyPolicy, TriplicateRule, TriplicateSpec};
