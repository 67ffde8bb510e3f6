//! Page counts and document information

use std::path::Path;
use lopdf::{Document, Object};
use crate::error::{Error, Result};
use crate::plan::{assemble, AssemblyPolicy, TriplicateRule, TriplicateSpec};

/// Count pages by reading the Count field from the root Pages dictionary
///
/// This is cheaper than walking the tree and is what the written print
/// document is checked against before it goes to the printer.
pub fn count_pages_in(doc: &Document) -> Result<usize> {
    let pages_id = doc
        .catalog()?
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| Error::General("Catalog has no Pages reference".to_string()))?;

    let count = doc
        .get_dictionary(pages_id)?
        .get(b"Count")
        .and_then(Object::as_i64)
        .map_err(|_| Error::General("Pages has no integer Count".to_string()))?;

    usize::try_from(count).map_err(|_| Error::General(format!("Negative page count: {}", count)))
}

/// Count the number of pages in a PDF file
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let page_count = count_pages_in(&doc)?;

    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    Ok(page_count)
}

/// Page count, title and duplication plan for one invoice
#[derive(Debug)]
pub struct InvoiceInfo {
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// The plan, or why this invoice would be skipped
    pub plan: Result<TriplicateSpec>,
    /// Pages the print document would contain, when the plan succeeds
    pub output_pages: Option<usize>,
}

/// Inspect an invoice without writing anything
pub fn inspect_invoice(path: &Path, rule: TriplicateRule, policy: AssemblyPolicy) -> Result<InvoiceInfo> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let page_count = doc.get_pages().len();
    let plan = rule.plan(page_count);
    let output_pages = plan.as_ref().ok().and_then(|spec| {
        let indices: Vec<usize> = (0..page_count).collect();
        assemble(&indices, spec.duplicate_count, policy).ok().map(|pages| pages.len())
    });

    Ok(InvoiceInfo {
        page_count,
        title: info_string(&doc, b"Title"),
        plan,
        output_pages,
    })
}

/// Read a text entry from the trailer's Info dictionary
fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info_id = doc.trailer.get(b"Info").and_then(Object::as_reference).ok()?;
    let info = doc.get_dictionary(info_id).ok()?;
    let bytes = info.get(key).and_then(Object::as_str).ok()?;
    String::from_utf8(bytes.to_vec()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_pages_nonexistent_file() {
        let result = count_pages(Path::new("nonexistent.pdf"));
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_inspect_nonexistent_file() {
        let result = inspect_invoice(
            Path::new("nonexistent.pdf"),
            TriplicateRule::Uncapped,
            AssemblyPolicy::TailOnce,
        );
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    // Tests against generated PDFs are in tests/integration.rs
}
