//! Document model backed by `lopdf`.
//!
//! [`PdfDocument`] is the only place that touches PDF object structure. The
//! operations ask it for page counts and sizes, hand it pixel buffers to
//! embed, and tell it which structural dictionaries to rewrite.

use crate::error::PdfOpsError;
use crate::output::DocumentMetadata;
use crate::pipeline::layout::Rect;
use crate::pipeline::pages::PageRange;
use crate::pipeline::recolor::{PixelBuffer, Rgb};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// US Letter, used when a page carries no MediaBox anywhere in its tree.
const DEFAULT_MEDIA_BOX: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 612.0,
    height: 792.0,
};

/// Page-tree depth limit when walking `/Parent` links.
const MAX_TREE_DEPTH: usize = 64;

/// Reference to an image embedded with [`PdfDocument::embed_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHandle(ObjectId);

/// What kind of interactive field to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text {
        #[serde(default)]
        value: String,
        #[serde(default = "default_font_size")]
        font_size: f32,
    },
    Checkbox {
        #[serde(default)]
        checked: bool,
    },
}

fn default_font_size() -> f32 {
    12.0
}

/// A loaded or newly created PDF.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    doc: Document,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument {
    // -- Construction ---------------------------------------------------------

    /// An empty document with a page tree and no pages.
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => Object::Integer(0),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        Self { doc }
    }

    /// Parse PDF bytes.
    ///
    /// With `tolerant` set, a failed parse is retried once on the bytes
    /// between the `%PDF` header and the last `%%EOF` marker, which recovers
    /// files with junk prepended or appended by mail gateways and uploaders.
    pub fn load(name: &str, bytes: &[u8], tolerant: bool) -> Result<Self, PdfOpsError> {
        let doc = match Document::load_mem(bytes) {
            Ok(doc) => doc,
            Err(err) => {
                if looks_encrypted(bytes, &err.to_string()) {
                    return Err(PdfOpsError::Encrypted {
                        name: name.to_string(),
                    });
                }
                let trimmed = if tolerant { trim_to_pdf_body(bytes) } else { None };
                let Some(trimmed) = trimmed else {
                    return Err(PdfOpsError::ProcessingFailed(format!(
                        "could not parse '{}': {}",
                        name, err
                    )));
                };
                warn!(
                    "'{}' failed to parse ({}); retrying on {} trimmed bytes",
                    name,
                    err,
                    trimmed.len()
                );
                Document::load_mem(trimmed).map_err(|retry_err| {
                    PdfOpsError::ProcessingFailed(format!(
                        "could not parse '{}': {} (tolerant retry: {})",
                        name, err, retry_err
                    ))
                })?
            }
        };

        if doc.trailer.has(b"Encrypt") {
            return Err(PdfOpsError::Encrypted {
                name: name.to_string(),
            });
        }

        debug!("Loaded '{}': {} pages", name, doc.get_pages().len());
        Ok(Self { doc })
    }

    /// Serialise the document.
    pub fn save(&mut self) -> Result<Vec<u8>, PdfOpsError> {
        self.doc.prune_objects();
        self.doc.compress();
        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| PdfOpsError::ProcessingFailed(format!("failed to serialise PDF: {}", e)))?;
        debug!("Saved PDF: {} bytes", buf.len());
        Ok(buf)
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// MediaBox of the page at 0-based `index`, following inheritance.
    pub fn media_box(&self, index: usize) -> Result<Rect, PdfOpsError> {
        let page_id = self.page_id(index)?;
        let rect = self
            .inherited(page_id, b"MediaBox")
            .and_then(|obj| obj.as_array().ok())
            .and_then(|arr| rect_from_array(&self.doc, arr))
            .unwrap_or(DEFAULT_MEDIA_BOX);
        Ok(rect)
    }

    /// Page width and height in points (unrotated MediaBox).
    pub fn page_size(&self, index: usize) -> Result<(f32, f32), PdfOpsError> {
        let rect = self.media_box(index)?;
        Ok((rect.width, rect.height))
    }

    pub fn metadata(&self) -> DocumentMetadata {
        let info = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .map(|obj| resolve(&self.doc, obj))
            .and_then(|obj| obj.as_dict().ok());
        let field = |key: &[u8]| -> Option<String> {
            info.and_then(|d| d.get(key).ok())
                .map(|obj| resolve(&self.doc, obj))
                .and_then(decode_text_string)
                .filter(|s| !s.trim().is_empty())
        };
        let page_count = self.page_count();
        DocumentMetadata {
            title: field(b"Title"),
            author: field(b"Author"),
            subject: field(b"Subject"),
            creator: field(b"Creator"),
            producer: field(b"Producer"),
            page_count,
            pdf_version: self.doc.version.clone(),
            first_page_size: if page_count > 0 {
                self.page_size(0).ok()
            } else {
                None
            },
        }
    }

    /// Number of annotations on the page at `index`.
    pub fn annotation_count(&self, index: usize) -> Result<usize, PdfOpsError> {
        let page_id = self.page_id(index)?;
        Ok(self.page_annotations(page_id).len())
    }

    /// Names (`/T`) of the fields registered in the form, in order.
    pub fn form_field_names(&self) -> Vec<String> {
        let Some(acro) = self
            .catalog()
            .ok()
            .and_then(|c| c.get(b"AcroForm").ok())
            .map(|obj| resolve(&self.doc, obj))
            .and_then(|obj| obj.as_dict().ok())
        else {
            return Vec::new();
        };
        acro.get(b"Fields")
            .ok()
            .map(|obj| resolve(&self.doc, obj))
            .and_then(|obj| obj.as_array().ok())
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| resolve(&self.doc, f).as_dict().ok())
                    .filter_map(|d| d.get(b"T").ok())
                    .filter_map(decode_text_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Decoded content stream bytes of the page at `index`.
    pub fn page_content(&self, index: usize) -> Result<Vec<u8>, PdfOpsError> {
        let page_id = self.page_id(index)?;
        self.doc
            .get_page_content(page_id)
            .map_err(|e| PdfOpsError::ProcessingFailed(format!("page {}: {}", index + 1, e)))
    }

    // -- Page creation and images ---------------------------------------------

    /// Append an empty page and return its 0-based index.
    pub fn add_page(&mut self, width: f32, height: f32) -> Result<usize, PdfOpsError> {
        let pages_id = self.pages_root()?;
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => box_array(Rect::new(0.0, 0.0, width, height)),
            "Resources" => Dictionary::new(),
            "Contents" => Vec::<Object>::new(),
        });

        let pages = self.dict_mut(pages_id)?;
        let count = pages.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
        match pages.get_mut(b"Kids").and_then(Object::as_array_mut) {
            Ok(kids) => kids.push(Object::Reference(page_id)),
            Err(_) => pages.set("Kids", vec![Object::Reference(page_id)]),
        }
        pages.set("Count", Object::Integer(count + 1));

        Ok(self.page_count() - 1)
    }

    /// Embed an RGBA buffer as a DeviceRGB image, alpha composited over white.
    pub fn embed_image(&mut self, image: &PixelBuffer) -> ImageHandle {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(image.width() as i64),
            "Height" => Object::Integer(image.height() as i64),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => Object::Integer(8),
        };
        let id = self
            .doc
            .add_object(Stream::new(dict, image.to_rgb_over_white()));
        ImageHandle(id)
    }

    /// Draw an embedded image into `rect` on top of the page's content.
    pub fn draw_image(
        &mut self,
        index: usize,
        image: ImageHandle,
        rect: Rect,
    ) -> Result<(), PdfOpsError> {
        let page_id = self.page_id(index)?;
        let name = self.register_xobject(page_id, image.0)?;
        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    rect.width.into(),
                    Object::Integer(0),
                    Object::Integer(0),
                    rect.height.into(),
                    rect.x.into(),
                    rect.y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ];
        self.push_content(page_id, encode_ops(ops)?, false)
    }

    /// Add a `width × height` page showing `image` at `rect`; returns the
    /// new page's index.
    pub fn add_image_page(
        &mut self,
        width: f32,
        height: f32,
        image: &PixelBuffer,
        rect: Rect,
    ) -> Result<usize, PdfOpsError> {
        let index = self.add_page(width, height)?;
        let handle = self.embed_image(image);
        self.draw_image(index, handle, rect)?;
        Ok(index)
    }

    /// Replace everything drawn on a page with `image` at `rect`, resizing the
    /// page to `width × height`. Annotations are kept.
    pub fn replace_page_with_image(
        &mut self,
        index: usize,
        width: f32,
        height: f32,
        image: &PixelBuffer,
        rect: Rect,
    ) -> Result<(), PdfOpsError> {
        let page_id = self.page_id(index)?;
        {
            let page = self.dict_mut(page_id)?;
            page.set("MediaBox", box_array(Rect::new(0.0, 0.0, width, height)));
            for key in [&b"CropBox"[..], b"TrimBox", b"BleedBox", b"ArtBox", b"Rotate"] {
                page.remove(key);
            }
            page.set("Resources", Dictionary::new());
            page.set("Contents", Vec::<Object>::new());
        }
        let handle = self.embed_image(image);
        self.draw_image(index, handle, rect)
    }

    // -- Structural edits -----------------------------------------------------

    /// Remove `/Annots` from the given pages; returns how many annotations
    /// were removed. With `drop_form` the catalog's `/AcroForm` goes too.
    pub fn strip_annotations(
        &mut self,
        indices: &[usize],
        drop_form: bool,
    ) -> Result<usize, PdfOpsError> {
        let mut removed = 0;
        for &index in indices {
            let page_id = self.page_id(index)?;
            removed += self.page_annotations(page_id).len();
            self.dict_mut(page_id)?.remove(b"Annots");
        }
        if drop_form {
            let catalog_id = self.catalog_id()?;
            if self.dict_mut(catalog_id)?.remove(b"AcroForm").is_some() {
                debug!("Removed /AcroForm from catalog");
            }
        }
        Ok(removed)
    }

    /// Paint a full-page rectangle in `color` beneath the existing content.
    pub fn add_background(&mut self, index: usize, color: Rgb) -> Result<(), PdfOpsError> {
        let page_id = self.page_id(index)?;
        let rect = self.media_box(index)?;
        let [r, g, b] = color.to_unit();
        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new(
                "re",
                vec![
                    rect.x.into(),
                    rect.y.into(),
                    rect.width.into(),
                    rect.height.into(),
                ],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ];
        self.push_content(page_id, encode_ops(ops)?, true)
    }

    /// Add an interactive field as a widget annotation on the page at
    /// `index`, registered in the catalog's `/AcroForm`.
    pub fn add_form_field(
        &mut self,
        index: usize,
        name: &str,
        kind: &FieldKind,
        rect: Rect,
    ) -> Result<(), PdfOpsError> {
        let page_id = self.page_id(index)?;

        let mut widget = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "T" => Object::string_literal(name),
            "Rect" => box_array(rect),
            "P" => page_id,
            "F" => Object::Integer(4),
        };
        match kind {
            FieldKind::Text { value, font_size } => {
                widget.set("FT", "Tx");
                widget.set(
                    "DA",
                    Object::string_literal(format!("/Helv {} Tf 0 g", font_size)),
                );
                if !value.is_empty() {
                    widget.set("V", Object::string_literal(value.as_str()));
                }
            }
            FieldKind::Checkbox { checked } => {
                let state = if *checked { "Yes" } else { "Off" };
                let on = self.checkbox_appearance(rect, true)?;
                let off = self.checkbox_appearance(rect, false)?;
                widget.set("FT", "Btn");
                widget.set("V", state);
                widget.set("AS", state);
                widget.set(
                    "AP",
                    dictionary! {
                        "N" => dictionary! { "Yes" => on, "Off" => off },
                    },
                );
            }
        }
        let widget_id = self.doc.add_object(widget);

        let mut annots = self.page_annotations(page_id);
        annots.push(Object::Reference(widget_id));
        self.dict_mut(page_id)?.set("Annots", annots);

        self.register_field(widget_id)?;
        debug!("Added field '{}' on page {}", name, index + 1);
        Ok(())
    }

    /// A new document holding pages `range.start..=range.end` of this one.
    pub fn extract_pages(&self, range: PageRange) -> Result<PdfDocument, PdfOpsError> {
        let total = self.page_count() as u32;
        if range.start < 1 || range.end < range.start || range.end > total {
            return Err(PdfOpsError::Internal(format!(
                "extract_pages({}-{}) on a {}-page document",
                range.start, range.end, total
            )));
        }
        let mut doc = self.doc.clone();
        let drop: Vec<u32> = (1..=total)
            .filter(|p| *p < range.start || *p > range.end)
            .collect();
        if !drop.is_empty() {
            doc.delete_pages(&drop);
        }
        debug!(
            "Extracted pages {}-{} ({} dropped)",
            range.start,
            range.end,
            drop.len()
        );
        Ok(PdfDocument { doc })
    }

    // -- Helpers --------------------------------------------------------------

    fn page_id(&self, index: usize) -> Result<ObjectId, PdfOpsError> {
        let pages = self.doc.get_pages();
        pages.get(&(index as u32 + 1)).copied().ok_or_else(|| {
            PdfOpsError::Internal(format!(
                "page index {} out of range ({} pages)",
                index,
                pages.len()
            ))
        })
    }

    fn catalog_id(&self) -> Result<ObjectId, PdfOpsError> {
        self.doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|e| PdfOpsError::ProcessingFailed(format!("document has no catalog: {}", e)))
    }

    fn catalog(&self) -> Result<&Dictionary, PdfOpsError> {
        let id = self.catalog_id()?;
        self.doc
            .get_dictionary(id)
            .map_err(|e| PdfOpsError::ProcessingFailed(format!("catalog unreadable: {}", e)))
    }

    fn pages_root(&self) -> Result<ObjectId, PdfOpsError> {
        self.catalog()?
            .get(b"Pages")
            .and_then(Object::as_reference)
            .map_err(|e| PdfOpsError::ProcessingFailed(format!("catalog has no /Pages: {}", e)))
    }

    fn dict_mut(&mut self, id: ObjectId) -> Result<&mut Dictionary, PdfOpsError> {
        self.doc
            .get_dictionary_mut(id)
            .map_err(|e| PdfOpsError::ProcessingFailed(format!("object {:?}: {}", id, e)))
    }

    /// Value of `key` on the page or the nearest ancestor that sets it.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut id = page_id;
        for _ in 0..MAX_TREE_DEPTH {
            let dict = self.doc.get_dictionary(id).ok()?;
            if let Ok(value) = dict.get(key) {
                return Some(resolve(&self.doc, value));
            }
            id = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        }
        None
    }

    fn page_annotations(&self, page_id: ObjectId) -> Vec<Object> {
        self.doc
            .get_dictionary(page_id)
            .ok()
            .and_then(|d| d.get(b"Annots").ok())
            .map(|obj| resolve(&self.doc, obj))
            .and_then(|obj| obj.as_array().ok())
            .cloned()
            .unwrap_or_default()
    }

    /// Add a content stream before or after the page's existing streams.
    fn push_content(
        &mut self,
        page_id: ObjectId,
        content: Vec<u8>,
        prepend: bool,
    ) -> Result<(), PdfOpsError> {
        let existing: Vec<Object> = match self.doc.get_dictionary(page_id) {
            Ok(page) => match page.get(b"Contents") {
                Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                    Ok(Object::Array(items)) => items.clone(),
                    _ => vec![Object::Reference(*id)],
                },
                Ok(Object::Array(items)) => items.clone(),
                _ => Vec::new(),
            },
            Err(_) => Vec::new(),
        };

        let stream_id = self.doc.add_object(Stream::new(Dictionary::new(), content));
        let mut contents = Vec::with_capacity(existing.len() + 1);
        if prepend {
            contents.push(Object::Reference(stream_id));
            contents.extend(existing);
        } else {
            contents.extend(existing);
            contents.push(Object::Reference(stream_id));
        }
        self.dict_mut(page_id)?.set("Contents", contents);
        Ok(())
    }

    /// Make the page's resources direct and add `image_id` under a fresh
    /// XObject name, which is returned.
    fn register_xobject(
        &mut self,
        page_id: ObjectId,
        image_id: ObjectId,
    ) -> Result<String, PdfOpsError> {
        let mut resources = self
            .inherited(page_id, b"Resources")
            .and_then(|obj| obj.as_dict().ok())
            .cloned()
            .unwrap_or_else(Dictionary::new);
        let mut xobjects = resources
            .get(b"XObject")
            .ok()
            .map(|obj| resolve(&self.doc, obj))
            .and_then(|obj| obj.as_dict().ok())
            .cloned()
            .unwrap_or_else(Dictionary::new);

        let mut n = 0usize;
        let name = loop {
            let candidate = format!("Im{}", n);
            if !xobjects.has(candidate.as_bytes()) {
                break candidate;
            }
            n += 1;
        };

        xobjects.set(name.clone(), Object::Reference(image_id));
        resources.set("XObject", xobjects);
        self.dict_mut(page_id)?.set("Resources", resources);
        Ok(name)
    }

    fn checkbox_appearance(&mut self, rect: Rect, on: bool) -> Result<ObjectId, PdfOpsError> {
        let (w, h) = (rect.width, rect.height);
        let ops = if on {
            let inset = (w.min(h) * 0.2).max(1.0);
            vec![
                Operation::new("q", vec![]),
                Operation::new("w", vec![Object::Integer(1)]),
                Operation::new("m", vec![inset.into(), inset.into()]),
                Operation::new("l", vec![(w - inset).into(), (h - inset).into()]),
                Operation::new("m", vec![inset.into(), (h - inset).into()]),
                Operation::new("l", vec![(w - inset).into(), inset.into()]),
                Operation::new("S", vec![]),
                Operation::new("Q", vec![]),
            ]
        } else {
            Vec::new()
        };
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => box_array(Rect::new(0.0, 0.0, w, h)),
        };
        Ok(self.doc.add_object(Stream::new(dict, encode_ops(ops)?)))
    }

    fn register_field(&mut self, widget_id: ObjectId) -> Result<(), PdfOpsError> {
        let catalog_id = self.catalog_id()?;
        let current = self.catalog()?.get(b"AcroForm").ok().cloned();

        let (acro_id, mut acro) = match current {
            Some(Object::Reference(id)) => {
                let dict = self
                    .doc
                    .get_dictionary(id)
                    .cloned()
                    .unwrap_or_else(|_| Dictionary::new());
                (Some(id), dict)
            }
            Some(Object::Dictionary(dict)) => (None, dict),
            _ => (None, Dictionary::new()),
        };

        let mut fields = acro
            .get(b"Fields")
            .ok()
            .map(|obj| resolve(&self.doc, obj))
            .and_then(|obj| obj.as_array().ok())
            .cloned()
            .unwrap_or_default();
        fields.push(Object::Reference(widget_id));
        acro.set("Fields", fields);
        acro.set("NeedAppearances", Object::Boolean(true));
        if !acro.has(b"DA") {
            acro.set("DA", Object::string_literal("/Helv 0 Tf 0 g"));
        }
        if !acro.has(b"DR") {
            acro.set(
                "DR",
                dictionary! {
                    "Font" => dictionary! {
                        "Helv" => dictionary! {
                            "Type" => "Font",
                            "Subtype" => "Type1",
                            "BaseFont" => "Helvetica",
                        },
                    },
                },
            );
        }

        match acro_id {
            Some(id) => {
                self.doc.objects.insert(id, Object::Dictionary(acro));
            }
            None => self.dict_mut(catalog_id)?.set("AcroForm", acro),
        }
        Ok(())
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn rect_from_array(doc: &Document, arr: &[Object]) -> Option<Rect> {
    if arr.len() != 4 {
        return None;
    }
    let n: Vec<f32> = arr
        .iter()
        .filter_map(|o| number(resolve(doc, o)))
        .collect();
    if n.len() != 4 {
        return None;
    }
    let (x0, x1) = (n[0].min(n[2]), n[0].max(n[2]));
    let (y0, y1) = (n[1].min(n[3]), n[1].max(n[3]));
    if x1 - x0 <= 0.0 || y1 - y0 <= 0.0 {
        return None;
    }
    Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
}

fn box_array(rect: Rect) -> Vec<Object> {
    vec![
        rect.x.into(),
        rect.y.into(),
        (rect.x + rect.width).into(),
        (rect.y + rect.height).into(),
    ]
}

fn encode_ops(operations: Vec<Operation>) -> Result<Vec<u8>, PdfOpsError> {
    Content { operations }
        .encode()
        .map_err(|e| PdfOpsError::Internal(format!("content encoding failed: {}", e)))
}

/// Decode a PDF text string: UTF-16BE with BOM, otherwise byte-per-char.
fn decode_text_string(obj: &Object) -> Option<String> {
    let Object::String(bytes, _) = obj else {
        return None;
    };
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        Some(String::from_utf16_lossy(&units))
    } else {
        Some(bytes.iter().map(|&b| b as char).collect())
    }
}

fn looks_encrypted(bytes: &[u8], error: &str) -> bool {
    let lower = error.to_ascii_lowercase();
    lower.contains("decrypt")
        || lower.contains("encrypt")
        || bytes.windows(8).any(|w| w == b"/Encrypt")
}

/// Bytes from the first `%PDF` to the end of the last `%%EOF`, or `None` if
/// that would not change anything.
fn trim_to_pdf_body(bytes: &[u8]) -> Option<&[u8]> {
    let start = bytes.windows(4).position(|w| w == b"%PDF")?;
    let end = bytes
        .windows(5)
        .rposition(|w| w == b"%%EOF")
        .map(|p| p + 5)
        .filter(|&e| e > start)
        .unwrap_or(bytes.len());
    if start == 0 && end == bytes.len() {
        return None;
    }
    Some(&bytes[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_pages(n: usize) -> PdfDocument {
        let mut doc = PdfDocument::new();
        for i in 0..n {
            doc.add_page(200.0 + i as f32, 300.0).unwrap();
        }
        doc
    }

    fn reload(doc: &mut PdfDocument) -> PdfDocument {
        let bytes = doc.save().unwrap();
        PdfDocument::load("test.pdf", &bytes, false).unwrap()
    }

    fn add_link_annotation(doc: &mut PdfDocument, index: usize) {
        let page_id = doc.page_id(index).unwrap();
        let annot = doc.doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Square",
            "Rect" => box_array(Rect::new(10.0, 10.0, 20.0, 20.0)),
        });
        let mut annots = doc.page_annotations(page_id);
        annots.push(Object::Reference(annot));
        doc.dict_mut(page_id).unwrap().set("Annots", annots);
    }

    #[test]
    fn new_pages_round_trip() {
        let mut doc = doc_with_pages(3);
        let loaded = reload(&mut doc);
        assert_eq!(loaded.page_count(), 3);
        assert_eq!(loaded.page_size(2).unwrap(), (202.0, 300.0));
        assert_eq!(loaded.metadata().page_count, 3);
    }

    #[test]
    fn media_box_is_inherited_from_page_tree() {
        let mut doc = doc_with_pages(1);
        let root = doc.pages_root().unwrap();
        let page_id = doc.page_id(0).unwrap();
        doc.dict_mut(page_id).unwrap().remove(b"MediaBox");
        doc.dict_mut(root)
            .unwrap()
            .set("MediaBox", box_array(Rect::new(0.0, 0.0, 100.0, 50.0)));
        assert_eq!(doc.page_size(0).unwrap(), (100.0, 50.0));

        doc.dict_mut(root).unwrap().remove(b"MediaBox");
        assert_eq!(doc.page_size(0).unwrap(), (612.0, 792.0));
    }

    #[test]
    fn strip_selected_annotations_only() {
        let mut doc = doc_with_pages(2);
        add_link_annotation(&mut doc, 0);
        add_link_annotation(&mut doc, 0);
        add_link_annotation(&mut doc, 1);
        let removed = doc.strip_annotations(&[0], false).unwrap();
        assert_eq!(removed, 2);
        let loaded = reload(&mut doc);
        assert_eq!(loaded.annotation_count(0).unwrap(), 0);
        assert_eq!(loaded.annotation_count(1).unwrap(), 1);
    }

    #[test]
    fn background_is_painted_first() {
        let mut doc = doc_with_pages(1);
        let img = PixelBuffer::filled(2, 2, [0, 0, 0, 255]);
        let handle = doc.embed_image(&img);
        doc.draw_image(0, handle, Rect::new(0.0, 0.0, 10.0, 10.0))
            .unwrap();
        doc.add_background(0, Rgb::new(255, 0, 0)).unwrap();

        let loaded = reload(&mut doc);
        let content = String::from_utf8_lossy(&loaded.page_content(0).unwrap()).into_owned();
        let fill = content.find(" re").expect("background rectangle");
        let draw = content.find("Do").expect("image draw");
        assert!(fill < draw, "{content}");
        assert!(content.contains(" rg"), "{content}");
    }

    #[test]
    fn form_fields_are_registered() {
        let mut doc = doc_with_pages(2);
        doc.add_form_field(
            0,
            "name",
            &FieldKind::Text {
                value: "Ada".into(),
                font_size: 11.0,
            },
            Rect::new(50.0, 50.0, 100.0, 20.0),
        )
        .unwrap();
        doc.add_form_field(
            1,
            "agree",
            &FieldKind::Checkbox { checked: true },
            Rect::new(50.0, 80.0, 12.0, 12.0),
        )
        .unwrap();
        let loaded = reload(&mut doc);
        assert_eq!(loaded.form_field_names(), vec!["name", "agree"]);
        assert_eq!(loaded.annotation_count(1).unwrap(), 1);
    }

    #[test]
    fn extract_keeps_requested_pages_in_order() {
        let doc = doc_with_pages(6);
        let mut part = doc.extract_pages(PageRange::new(2, 4)).unwrap();
        let loaded = reload(&mut part);
        assert_eq!(loaded.page_count(), 3);
        assert_eq!(loaded.page_size(0).unwrap().0, 201.0);
        assert_eq!(loaded.page_size(2).unwrap().0, 203.0);
        assert!(doc.extract_pages(PageRange::new(5, 7)).is_err());
    }

    #[test]
    fn replace_page_resizes_and_redraws() {
        let mut doc = doc_with_pages(1);
        let img = PixelBuffer::filled(4, 4, [10, 20, 30, 255]);
        doc.replace_page_with_image(0, 50.0, 60.0, &img, Rect::new(0.0, 0.0, 50.0, 60.0))
            .unwrap();
        let loaded = reload(&mut doc);
        assert_eq!(loaded.page_size(0).unwrap(), (50.0, 60.0));
        let content = String::from_utf8_lossy(&loaded.page_content(0).unwrap()).into_owned();
        assert!(content.contains("/Im0 Do"), "{content}");
    }

    #[test]
    fn tolerant_load_trims_junk() {
        let mut doc = doc_with_pages(2);
        let mut bytes = b"garbage from a mail gateway\r\n".to_vec();
        bytes.extend(doc.save().unwrap());
        bytes.extend_from_slice(b"\r\n-- trailing signature --\r\n");
        let loaded = PdfDocument::load("junk.pdf", &bytes, true).unwrap();
        assert_eq!(loaded.page_count(), 2);
    }

    #[test]
    fn trim_body_bounds() {
        assert_eq!(trim_to_pdf_body(b"%PDF-1.7 x %%EOF"), None);
        assert_eq!(
            trim_to_pdf_body(b"xx%PDF-1.7 x %%EOFyy"),
            Some(&b"%PDF-1.7 x %%EOF"[..])
        );
        assert_eq!(trim_to_pdf_body(b"no header"), None);
    }

    #[test]
    fn garbage_is_a_processing_failure() {
        let err = PdfDocument::load("x.pdf", b"%PDF-1.7 nonsense", true).unwrap_err();
        assert!(matches!(err, PdfOpsError::ProcessingFailed(_)), "{err}");
    }

    #[test]
    fn text_string_decoding() {
        let utf16 = Object::String(vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69], lopdf::StringFormat::Literal);
        assert_eq!(decode_text_string(&utf16).as_deref(), Some("Hi"));
        assert_eq!(
            decode_text_string(&Object::string_literal("Plain")).as_deref(),
            Some("Plain")
        );
    }
}
