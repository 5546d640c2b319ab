//! Page geometry extraction
//!
//! Reads page size and intrinsic rotation, following the page tree for
//! inherited attributes.

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;

use crate::error::WorkflowError;
use crate::model::Rotation;

/// Guard against cyclic `/Parent` chains in malformed files
const MAX_TREE_DEPTH: usize = 32;

/// US Letter, used when no MediaBox can be found
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Geometry of a single PDF page
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageInfo {
    /// Page number (1-indexed)
    pub page_num: u32,
    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Rotation stored in the file
    pub rotation: Rotation,
}

impl PageInfo {
    /// Extract info for one page (1-indexed)
    pub fn from_document(doc: &Document, page_num: u32) -> Result<Self, WorkflowError> {
        let pages = doc.get_pages();
        let page_id = pages
            .get(&page_num)
            .ok_or_else(|| WorkflowError::OperationError(format!("Page {} not found", page_num)))?;
        Self::from_page_id(doc, page_num, *page_id)
    }

    /// Extract info for every page, in order
    pub fn all_from_document(doc: &Document) -> Result<Vec<Self>, WorkflowError> {
        doc.get_pages()
            .into_iter()
            .map(|(page_num, page_id)| Self::from_page_id(doc, page_num, page_id))
            .collect()
    }

    fn from_page_id(doc: &Document, page_num: u32, page_id: ObjectId) -> Result<Self, WorkflowError> {
        let page_dict = doc.get_dictionary(page_id).map_err(|_| {
            WorkflowError::ParseError(format!("Page {} is not a dictionary", page_num))
        })?;

        let media_box = match inherited(doc, page_dict, b"MediaBox") {
            Some(obj) => parse_box(doc, obj)?,
            None => DEFAULT_MEDIA_BOX,
        };
        let width = (media_box[2] - media_box[0]).abs() as f32;
        let height = (media_box[3] - media_box[1]).abs() as f32;

        let rotation = inherited(doc, page_dict, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .and_then(Rotation::from_degrees)
            .unwrap_or_default();

        Ok(Self {
            page_num,
            width,
            height,
            rotation,
        })
    }
}

/// Look up `key` on the page or the nearest ancestor that defines it
pub(crate) fn inherited<'a>(
    doc: &'a Document,
    page_dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page_dict;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Parse a box array `[x1, y1, x2, y2]`, resolving an indirect reference
fn parse_box(doc: &Document, obj: &Object) -> Result<[f64; 4], WorkflowError> {
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id)?,
        other => other,
    };
    let array = obj
        .as_array()
        .map_err(|_| WorkflowError::ParseError("MediaBox is not an array".into()))?;

    if array.len() != 4 {
        return Err(WorkflowError::ParseError(
            "MediaBox must have 4 elements".into(),
        ));
    }

    let mut result = [0.0; 4];
    for (i, value) in array.iter().enumerate() {
        result[i] = match value {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            _ => {
                return Err(WorkflowError::ParseError(format!(
                    "MediaBox element {} is not a number",
                    i
                )))
            }
        };
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_pdf;

    #[test]
    fn test_parse_box_array() {
        let doc = Document::with_version("1.7");
        let array = Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(612.0),
            Object::Real(792.0),
        ]);
        assert_eq!(parse_box(&doc, &array).unwrap(), [0.0, 0.0, 612.0, 792.0]);
        assert!(parse_box(&doc, &Object::Integer(3)).is_err());
    }

    #[test]
    fn test_media_box_inherited_from_page_tree() {
        let pdf = create_test_pdf(2, "Info");
        let doc = Document::load_mem(&pdf).unwrap();
        let infos = PageInfo::all_from_document(&doc).unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].width, 612.0);
        assert_eq!(infos[0].height, 792.0);
        assert_eq!(infos[1].page_num, 2);
        assert_eq!(infos[0].rotation, Rotation::NONE);
    }

    #[test]
    fn test_missing_page_is_error() {
        let pdf = create_test_pdf(1, "Info");
        let doc = Document::load_mem(&pdf).unwrap();
        assert!(PageInfo::from_document(&doc, 4).is_err());
    }
}
