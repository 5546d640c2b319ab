//! Building a new PDF from pages of other PDFs
//!
//! Source documents are imported whole with their object ids shifted past
//! everything already in the output, then individual pages are appended to a
//! fresh page tree. Objects no page ends up referencing are pruned on
//! [`PdfAssembler::finish`].

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::WorkflowError;
use crate::model::{PdfSource, RasterImage, Rotation};
use crate::page_info::inherited;
use crate::raster::embed_image;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// A page dictionary with inherited attributes already resolved
#[derive(Debug, Clone)]
struct PageTemplate {
    dict: Dictionary,
    rotation: Rotation,
}

/// Pages of one imported source, in order
#[derive(Debug, Clone)]
pub struct ImportedSource {
    pages: Vec<PageTemplate>,
}

impl ImportedSource {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn template(&self, index: usize) -> Result<&PageTemplate, WorkflowError> {
        self.pages.get(index).ok_or_else(|| {
            WorkflowError::OperationError(format!(
                "Page index {} out of range (source has {} pages)",
                index,
                self.pages.len()
            ))
        })
    }
}

/// Incrementally assembles an output PDF
pub struct PdfAssembler {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    /// Sources already imported by [`PdfAssembler::copy_source_page`]
    imported: Vec<(PdfSource, ImportedSource)>,
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfAssembler {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            imported: Vec::new(),
        }
    }

    /// Number of pages appended so far
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Import every object of `bytes` so its pages can be copied
    pub fn import(&mut self, bytes: &[u8]) -> Result<ImportedSource, WorkflowError> {
        let source = Document::load_mem(bytes)?;
        if source.is_encrypted() {
            return Err(WorkflowError::ParseError(
                "PDF is encrypted and cannot be edited".into(),
            ));
        }

        let offset = self.doc.max_id;

        let mut pages = Vec::new();
        for page_id in source.get_pages().into_values() {
            let page_dict = source.get_dictionary(page_id)?;
            let mut dict = page_dict.clone();
            for key in INHERITABLE_KEYS {
                if !dict.has(key) {
                    if let Some(value) = inherited(&source, page_dict, key) {
                        dict.set(key.to_vec(), value.clone());
                    }
                }
            }
            dict.remove(b"Parent");

            let rotation = dict
                .get(b"Rotate")
                .and_then(Object::as_i64)
                .ok()
                .and_then(Rotation::from_degrees)
                .unwrap_or_default();

            let dict = remap_dict(dict, offset);
            pages.push(PageTemplate { dict, rotation });
        }

        let source_max = source
            .objects
            .keys()
            .map(|id| id.0)
            .max()
            .unwrap_or(0)
            .max(source.max_id);

        for (old_id, object) in source.objects.into_iter() {
            let new_id = (old_id.0 + offset, old_id.1);
            self.doc.objects.insert(new_id, remap_object_refs(object, offset));
        }
        self.doc.max_id = offset + source_max;

        Ok(ImportedSource { pages })
    }

    /// Append page `index` of an imported source, turned by `rotation` on top
    /// of whatever `/Rotate` it already had
    pub fn copy_page(
        &mut self,
        source: &ImportedSource,
        index: usize,
        rotation: Rotation,
    ) -> Result<(), WorkflowError> {
        let template = source.template(index)?.clone();
        self.push_template(template, rotation);
        Ok(())
    }

    /// Append page `index` of `source`, importing the source on first use.
    /// Nothing is appended when the source cannot be imported or has no
    /// such page.
    pub fn copy_source_page(
        &mut self,
        source: &PdfSource,
        index: usize,
        rotation: Rotation,
    ) -> Result<(), WorkflowError> {
        let slot = match self.imported.iter().position(|(s, _)| s.same_buffer(source)) {
            Some(slot) => slot,
            None => {
                let handle = self.import(source.bytes())?;
                self.imported.push((source.clone(), handle));
                self.imported.len() - 1
            }
        };
        let template = self.imported[slot].1.template(index)?.clone();
        self.push_template(template, rotation);
        Ok(())
    }

    fn push_template(&mut self, template: PageTemplate, rotation: Rotation) {
        let PageTemplate { mut dict, rotation: intrinsic } = template;
        dict.set("Parent", Object::Reference(self.pages_id));
        let total = intrinsic.plus(rotation);
        if total.is_none() {
            dict.remove(b"Rotate");
        } else {
            dict.set("Rotate", i64::from(total));
        }

        let page_id = self.doc.add_object(dict);
        self.kids.push(Object::Reference(page_id));
    }

    /// Append a page that shows `image` stretched over `width` x `height` points
    pub fn add_raster_page(
        &mut self,
        image: &RasterImage,
        width: f32,
        height: f32,
        rotation: Rotation,
    ) -> Result<(), WorkflowError> {
        let image_id = embed_image(&mut self.doc, image)?;

        let mut xobjects = Dictionary::new();
        xobjects.set("Im0", Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let content = format!("q\n{} 0 0 {} 0 0 cm\n/Im0 Do\nQ\n", width, height);
        self.push_page(width, height, rotation, resources, content.into_bytes());
        Ok(())
    }

    /// Append an empty page
    pub fn add_blank_page(&mut self, width: f32, height: f32, rotation: Rotation) {
        self.push_page(width, height, rotation, Dictionary::new(), Vec::new());
    }

    fn push_page(
        &mut self,
        width: f32,
        height: f32,
        rotation: Rotation,
        resources: Dictionary,
        content: Vec<u8>,
    ) {
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content));

        let mut page = Dictionary::new();
        page.set("Type", "Page");
        page.set("Parent", Object::Reference(self.pages_id));
        page.set(
            "MediaBox",
            vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width),
                Object::Real(height),
            ],
        );
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Reference(content_id));
        if !rotation.is_none() {
            page.set("Rotate", i64::from(rotation));
        }

        let page_id = self.doc.add_object(page);
        self.kids.push(Object::Reference(page_id));
    }

    /// Write the page tree and serialize
    pub fn finish(mut self) -> Result<Vec<u8>, WorkflowError> {
        let count = self.kids.len() as i64;
        let mut pages = Dictionary::new();
        pages.set("Type", "Pages");
        pages.set("Kids", Object::Array(self.kids));
        pages.set("Count", count);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", "Catalog");
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        self.doc.prune_objects();
        self.doc.compress();

        let mut buffer = Vec::new();
        self.doc.save_to(&mut buffer).map_err(|e| {
            WorkflowError::OperationError(format!("Failed to save assembled PDF: {}", e))
        })?;
        Ok(buffer)
    }
}

/// Recursively shift object references by `offset`
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(dict) => Object::Dictionary(remap_dict(dict, offset)),
        Object::Stream(mut stream) => {
            stream.dict = remap_dict(stream.dict, offset);
            Object::Stream(stream)
        }
        other => other,
    }
}

fn remap_dict(mut dict: Dictionary, offset: u32) -> Dictionary {
    for (_, value) in dict.iter_mut() {
        *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
    }
    dict
}
