//! Page-level document assembly.
//!
//! Source documents are renumbered past the output's highest object id and
//! their objects moved over wholesale. Only the page dictionaries are
//! rewritten: inherited attributes are copied down from the old page tree
//! so the pages survive being re-parented under a single flat `Pages` node.
//! Whatever the old trees, catalogs and outlines leave unreachable is pruned
//! in [`PdfAssembler::finish`].

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use std::collections::HashSet;

use crate::error::{PdfMixError, Result};

/// Page attributes a page may inherit from its ancestors.
const INHERITABLE: &[&[u8]] = &[b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `Parent` chains in broken files.
const MAX_TREE_DEPTH: usize = 64;

/// Builds a new document by appending pages from other documents.
#[derive(Debug)]
pub struct PdfAssembler {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfAssembler {
    /// Start an empty output document.
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Pages appended so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append every page of `source`, in order. Returns the pages added.
    pub fn append_document(&mut self, source: Document) -> Result<usize> {
        let count = source.get_pages().len();
        let indices: Vec<usize> = (0..count).collect();
        self.append_pages(source, &indices)
    }

    /// Append the zero-based `indices` of `source`, in the given order.
    ///
    /// An index may repeat; every repeat after the first becomes a copy
    /// of the page dictionary sharing the same content and resources.
    ///
    /// # Errors
    ///
    /// Returns [`PdfMixError::InvalidPageSelection`] if an index is out of
    /// range. Nothing is appended in that case.
    pub fn append_pages(&mut self, mut source: Document, indices: &[usize]) -> Result<usize> {
        let total = source.get_pages().len();
        let invalid: Vec<usize> = indices
            .iter()
            .filter(|&&index| index >= total)
            .map(|index| index + 1)
            .collect();
        if !invalid.is_empty() {
            return Err(PdfMixError::InvalidPageSelection {
                path: Default::default(),
                invalid,
                total_pages: total,
            });
        }
        if indices.is_empty() {
            return Ok(0);
        }

        source.renumber_objects_with(self.doc.max_id + 1);
        let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();

        let mut pages = Vec::with_capacity(indices.len());
        for &index in indices {
            let page_id = page_ids[index];
            pages.push((page_id, flatten_page(&source, page_id)?));
        }

        self.doc.max_id = self.doc.max_id.max(source.max_id);
        self.doc.objects.extend(source.objects);

        let mut placed: HashSet<ObjectId> = HashSet::new();
        for (page_id, mut page) in pages {
            page.set("Parent", self.pages_id);
            let target = if placed.insert(page_id) {
                page_id
            } else {
                self.doc.new_object_id()
            };
            self.doc.objects.insert(target, Object::Dictionary(page));
            self.kids.push(target);
        }

        Ok(indices.len())
    }

    /// Close the page tree and return the document.
    ///
    /// Objects no longer reachable from the new catalog are dropped.
    pub fn finish(mut self) -> Document {
        let kids: Vec<Object> = self.kids.iter().map(|id| Object::Reference(*id)).collect();
        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.prune_objects();
        self.doc
    }
}

/// Copy of the page at `page_id` with inherited attributes made explicit.
fn flatten_page(source: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = source.get_dictionary(page_id)?.clone();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let Some(node_id) = parent else { break };
        let Ok(node) = source.get_dictionary(node_id) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key)
                && let Ok(value) = node.get(key)
            {
                page.set(*key, value.clone());
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(page)
}
