//! PDF manipulation module

pub mod triplicate;
pub mod metadata;

// Re-export commonly used items
pub use triplicate::{triplicate_document, write_triplicate_pdf, TriplicateSummary};
pub use metadata::{count_pages, count_pages_in, inspect_invoice, InvoiceInfo};
