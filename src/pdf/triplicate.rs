//! Building the print document with lopdf
//!
//! The source document is reused as the object store: kept pages stay where
//! they are, repeated pages get a cloned page dictionary (sharing content
//! streams and resources), and a fresh Pages node and Catalog replace the
//! original tree. Anything left unreachable is pruned before saving.

use std::collections::HashSet;
use std::path::Path;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use log::debug;
use crate::error::{Error, Result};
use crate::layout::{fit_centered, PageBox, PageDimensions};
use crate::plan::{assemble, AssemblyPolicy, TriplicateRule, CAPPED_MAX_DUPLICATES};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against cyclic Parent chains in damaged files
const MAX_TREE_DEPTH: usize = 64;

/// Resource name of the wrapped original page on a rescaled page
const RESCALED_XOBJECT: &str = "Invoice";

/// What was done to one document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriplicateSummary {
    /// Pages in the source document
    pub total_pages: usize,
    /// Trailing pages selected for duplication
    pub duplicate_count: usize,
    /// Pages in the output document
    pub output_pages: usize,
}

/// Rearrange the pages of `doc` according to `rule` and `policy`.
///
/// Fails with a skip-type error (see [`Error::is_skip`]) when the document
/// has nothing to duplicate or exceeds the capped page limit.
pub fn triplicate_document(
    mut doc: Document,
    rule: TriplicateRule,
    policy: AssemblyPolicy,
) -> Result<(Document, TriplicateSummary)> {
    let source_pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let spec = rule.plan(source_pages.len())?;
    let selected = assemble(&source_pages, spec.duplicate_count, policy)?;
    let sheet = policy.target_sheet().map(|dims| dims.media_box());

    let mut placed: HashSet<ObjectId> = HashSet::new();
    let mut page_ids: Vec<ObjectId> = Vec::with_capacity(selected.len());

    for source_id in selected {
        let page = flattened_page(&doc, source_id)?;

        let page_id = match sheet {
            Some(ref sheet) => rescale_page(&mut doc, source_id, page, sheet)?,
            None if placed.insert(source_id) => {
                doc.objects.insert(source_id, Object::Dictionary(page));
                source_id
            }
            None => doc.add_object(Object::Dictionary(page)),
        };
        page_ids.push(page_id);
    }

    replace_page_tree(&mut doc, &page_ids)?;

    let pruned = doc.prune_objects();
    debug!("Pruned {} unreachable objects", pruned.len());
    doc.compress();

    let duplicate_count = if sheet.is_some() {
        spec.duplicate_count.min(CAPPED_MAX_DUPLICATES)
    } else {
        spec.duplicate_count
    };

    Ok((
        doc,
        TriplicateSummary {
            total_pages: spec.total_pages,
            duplicate_count,
            output_pages: page_ids.len(),
        },
    ))
}

/// Load `source`, rearrange its pages and save the result to `output`
///
/// # Example
///
/// ```no_run
/// use invoice_triplicate::pdf::write_triplicate_pdf;
/// use invoice_triplicate::plan::{AssemblyPolicy, TriplicateRule};
/// use std::path::Path;
///
/// let summary = write_triplicate_pdf(
///     Path::new("C300.pdf"),
///     Path::new("C300_temp_print.pdf"),
///     TriplicateRule::Uncapped,
///     AssemblyPolicy::FullPlusTwoExtraCopies,
/// ).expect("Failed to build print document");
/// println!("{} pages to print", summary.output_pages);
/// ```
pub fn write_triplicate_pdf(
    source: &Path,
    output: &Path,
    rule: TriplicateRule,
    policy: AssemblyPolicy,
) -> Result<TriplicateSummary> {
    if !source.exists() {
        return Err(Error::FileNotFound(source.to_path_buf()));
    }

    let doc = Document::load(source)?;
    let (mut doc, summary) = triplicate_document(doc, rule, policy)?;
    doc.save(output)?;

    Ok(summary)
}

/// Copy of a page dictionary with inherited attributes made explicit,
/// so the page survives being moved under a new Pages node
fn flattened_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = doc.get_object(page_id)?.as_dict()?.clone();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(parent_id) = parent {
        if depth >= MAX_TREE_DEPTH {
            return Err(Error::General(format!(
                "Page tree deeper than {} levels at object {:?}",
                MAX_TREE_DEPTH, page_id
            )));
        }
        let node = doc.get_object(parent_id)?.as_dict()?;
        for key in INHERITABLE_KEYS {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    Ok(page)
}

/// Point a new Catalog at a new Pages node holding `page_ids` in order
fn replace_page_tree(doc: &mut Document, page_ids: &[ObjectId]) -> Result<()> {
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = page_ids
        .iter()
        .map(|&id| Object::Reference(id))
        .collect();

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(page_ids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    doc.objects.insert(pages_id, Object::Dictionary(pages_object));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in page_ids {
        let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
        page.set("Parent", Object::Reference(pages_id));
    }

    Ok(())
}

/// Wrap the page's content in a Form XObject and draw it scaled onto `sheet`.
///
/// Returns the id of the new page; the original page object is left untouched.
fn rescale_page(
    doc: &mut Document,
    source_id: ObjectId,
    page: Dictionary,
    sheet: &PageBox,
) -> Result<ObjectId> {
    let source: &Document = doc;
    let source_box = page_box(source, &page, b"CropBox")
        .or_else(|| page_box(source, &page, b"MediaBox"))
        .unwrap_or_else(|| PageDimensions::letter().media_box());
    let content = page_content(source, source_id)?;

    let mut form = Dictionary::new();
    form.set("Type", Object::Name(b"XObject".to_vec()));
    form.set("Subtype", Object::Name(b"Form".to_vec()));
    form.set("FormType", Object::Integer(1));
    form.set("BBox", box_array(&source_box));
    if let Ok(resources) = page.get(b"Resources") {
        form.set("Resources", resources.clone());
    }
    let form_id = doc.add_object(Stream::new(form, content));

    let transform = fit_centered(&source_box, sheet);
    let draw = format!("q\n{}\n/{} Do\nQ\n", transform.to_cm(), RESCALED_XOBJECT);
    let draw_id = doc.add_object(Stream::new(Dictionary::new(), draw.into_bytes()));

    let mut xobjects = Dictionary::new();
    xobjects.set(RESCALED_XOBJECT, Object::Reference(form_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut rescaled = Dictionary::new();
    rescaled.set("Type", Object::Name(b"Page".to_vec()));
    rescaled.set("MediaBox", box_array(sheet));
    rescaled.set("Resources", Object::Dictionary(resources));
    rescaled.set("Contents", Object::Reference(draw_id));
    if let Ok(rotate) = page.get(b"Rotate") {
        rescaled.set("Rotate", rotate.clone());
    }

    debug!(
        "Rescaled page {:?} from {:.2}x{:.2} by {:.4}",
        source_id,
        source_box.width(),
        source_box.height(),
        transform.scale
    );

    Ok(doc.add_object(Object::Dictionary(rescaled)))
}

/// Decoded content of every stream in a page's Contents, one per line so
/// operators at stream boundaries stay separate
fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    for stream_id in doc.get_page_contents(page_id) {
        let stream = doc.get_object(stream_id)?.as_stream()?;
        let data = stream.decompressed_content().unwrap_or_else(|_| stream.content.clone());
        if !content.is_empty() {
            content.push(b'\n');
        }
        content.extend_from_slice(&data);
    }
    Ok(content)
}

/// Read a rectangle entry such as MediaBox, following a reference if needed
fn page_box(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<PageBox> {
    let value = match page.get(key).ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let values = value.as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    Some(PageBox::new(
        as_f64(doc, &values[0])?,
        as_f64(doc, &values[1])?,
        as_f64(doc, &values[2])?,
        as_f64(doc, &values[3])?,
    ))
}

fn as_f64(doc: &Document, number: &Object) -> Option<f64> {
    match number {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r as f64),
            _ => None,
        },
        _ => None,
    }
}

fn box_array(rect: &PageBox) -> Object {
    Object::Array(vec![
        Object::Real(rect.llx as f32),
        Object::Real(rect.lly as f32),
        Object::Real(rect.urx as f32),
        Object::Real(rect.ury as f32),
    ])
}
