//! In process pdf manipulation built on lopdf
use std::collections::BTreeMap;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use ntex::http::StatusCode;
use thiserror::Error;

use crate::errors::{HttpResponseError, IntoHttpResponseError};
use crate::utils::pages::{parse_page_ranges, PageRangeError};

/// Attributes a page inherits from its page tree ancestors
const INHERITABLE_KEYS: [&[u8]; 4] =
  [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// US letter in points, used when a page has no media box
const LETTER: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

const INCH: f32 = 72.0;

/// Font resource name used to stamp page numbers
const PAGE_NUMBER_FONT: &str = "PdfMasterPageNumber";

#[derive(Debug, Error)]
pub enum PdfError {
  #[error("Invalid PDF: {0}")]
  Parse(#[from] lopdf::Error),
  #[error("Unable to write PDF: {0}")]
  Save(String),
  #[error("PDF is encrypted")]
  Encrypted,
  #[error("Incorrect password")]
  WrongPassword,
  #[error("Unsupported encryption: {0}")]
  UnsupportedEncryption(String),
  #[error("No pages selected")]
  NoPages,
  #[error(transparent)]
  PageRange(#[from] PageRangeError),
  #[error("Invalid image: {0}")]
  InvalidImage(String),
  #[error("Unable to build archive: {0}")]
  Archive(#[from] zip::result::ZipError),
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

impl IntoHttpResponseError for PdfError {
  fn to_http_error(&self) -> HttpResponseError {
    let status = match self {
      PdfError::Parse(_)
      | PdfError::Encrypted
      | PdfError::NoPages
      | PdfError::PageRange(_)
      | PdfError::InvalidImage(_) => StatusCode::BAD_REQUEST,
      PdfError::WrongPassword => StatusCode::UNAUTHORIZED,
      PdfError::UnsupportedEncryption(_) => StatusCode::UNPROCESSABLE_ENTITY,
      PdfError::Save(_) | PdfError::Archive(_) | PdfError::Io(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    HttpResponseError {
      msg: format!("{}", self),
      status,
    }
  }
}

/// Parse a document from memory
pub fn load(data: &[u8]) -> Result<Document, PdfError> {
  Ok(Document::load_mem(data)?)
}

/// Parse a document that must not be encrypted
pub fn load_plain(data: &[u8]) -> Result<Document, PdfError> {
  let doc = load(data)?;
  if is_encrypted(&doc) {
    return Err(PdfError::Encrypted);
  }
  Ok(doc)
}

pub fn is_encrypted(doc: &Document) -> bool {
  doc.trailer.get(b"Encrypt").is_ok()
}

/// Serialize a document to memory
pub fn save(doc: &mut Document) -> Result<Vec<u8>, PdfError> {
  let mut buffer = Vec::new();
  doc
    .save_to(&mut buffer)
    .map_err(|err| PdfError::Save(format!("{}", err)))?;
  Ok(buffer)
}

fn type_name(object: &Object) -> Option<&[u8]> {
  object
    .as_dict()
    .ok()
    .and_then(|dict| dict.get(b"Type").ok())
    .and_then(|kind| kind.as_name().ok())
}

fn number(object: &Object) -> Option<f32> {
  match object {
    Object::Integer(value) => Some(*value as f32),
    Object::Real(value) => Some(*value as f32),
    _ => None,
  }
}

/// Follow a reference if the object is one
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
  match object {
    Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
    _ => object,
  }
}

/// Look for an attribute on the page or on one of its ancestors
fn inherited_attribute(
  doc: &Document,
  page_id: ObjectId,
  key: &[u8],
) -> Option<Object> {
  let mut current = Some(page_id);
  // Bounded walk to survive cyclic page trees
  let mut depth = 0;
  while let Some(node_id) = current {
    if depth > 64 {
      break;
    }
    let node = doc.get_object(node_id).ok()?.as_dict().ok()?;
    if let Ok(value) = node.get(key) {
      return Some(value.to_owned());
    }
    current = node.get(b"Parent").and_then(Object::as_reference).ok();
    depth += 1;
  }
  None
}

fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
  let media_box = inherited_attribute(doc, page_id, b"MediaBox");
  let values = media_box
    .as_ref()
    .map(|object| resolve(doc, object))
    .and_then(|object| object.as_array().ok())
    .map(|array| {
      array
        .iter()
        .filter_map(|item| number(resolve(doc, item)))
        .collect::<Vec<f32>>()
    });
  match values {
    Some(values) if values.len() == 4 => [
      values[0].min(values[2]),
      values[1].min(values[3]),
      values[0].max(values[2]),
      values[1].max(values[3]),
    ],
    _ => LETTER,
  }
}

/// Copy a page dictionary with its inherited attributes made explicit
fn detached_page(
  doc: &Document,
  page_id: ObjectId,
) -> Result<Dictionary, PdfError> {
  let mut page = doc.get_object(page_id)?.as_dict()?.clone();
  for key in INHERITABLE_KEYS {
    if page.has(key) {
      continue;
    }
    if let Some(value) = inherited_attribute(doc, page_id, key) {
      page.set(key.to_vec(), value);
    }
  }
  Ok(page)
}

/// # Assemble a document
/// Build a new document out of `objects` with `pages` as a flat page tree.
/// Previous catalogs and page tree nodes are dropped, objects no longer
/// reachable are pruned.
fn assemble(
  objects: BTreeMap<ObjectId, Object>,
  pages: Vec<(ObjectId, Dictionary)>,
  max_id: u32,
) -> Result<Vec<u8>, PdfError> {
  let mut doc = Document::with_version("1.5");
  for (id, object) in objects {
    match type_name(&object) {
      Some(b"Catalog") | Some(b"Pages") | Some(b"Outlines")
      | Some(b"Outline") => continue,
      _ => {
        doc.objects.insert(id, object);
      }
    }
  }
  let pages_id = (max_id + 1, 0);
  let catalog_id = (max_id + 2, 0);
  doc.max_id = max_id + 2;
  let mut kids = Vec::with_capacity(pages.len());
  for (page_id, mut page) in pages {
    page.set("Parent", pages_id);
    doc.objects.insert(page_id, Object::Dictionary(page));
    kids.push(Object::Reference(page_id));
  }
  let count = kids.len() as i64;
  doc.objects.insert(
    pages_id,
    Object::Dictionary(dictionary! {
      "Type" => "Pages",
      "Kids" => kids,
      "Count" => count,
    }),
  );
  doc.objects.insert(
    catalog_id,
    Object::Dictionary(dictionary! {
      "Type" => "Catalog",
      "Pages" => pages_id,
    }),
  );
  doc.trailer.set("Root", catalog_id);
  doc.prune_objects();
  doc.renumber_objects();
  save(&mut doc)
}

/// # Merge documents
/// Concatenate every page of every document in the given order
pub fn merge(documents: Vec<Vec<u8>>) -> Result<Vec<u8>, PdfError> {
  let mut max_id = 1;
  let mut pages = Vec::new();
  let mut objects = BTreeMap::new();
  for data in documents {
    let mut doc = load_plain(&data)?;
    doc.renumber_objects_with(max_id);
    max_id = doc.max_id + 1;
    for page_id in doc.get_pages().into_values() {
      pages.push((page_id, detached_page(&doc, page_id)?));
    }
    objects.extend(doc.objects);
  }
  if pages.is_empty() {
    return Err(PdfError::NoPages);
  }
  assemble(objects, pages, max_id)
}

/// # Split a document
/// Keep the pages matching `selection` (ie: `1-3,5`) in document order
pub fn split(data: &[u8], selection: &str) -> Result<Vec<u8>, PdfError> {
  let doc = load_plain(data)?;
  let all_pages = doc.get_pages();
  let selected = parse_page_ranges(selection, all_pages.len() as u32)?;
  if selected.is_empty() {
    return Err(PdfError::NoPages);
  }
  let mut pages = Vec::with_capacity(selected.len());
  for number in selected {
    if let Some(page_id) = all_pages.get(&number) {
      pages.push((*page_id, detached_page(&doc, *page_id)?));
    }
  }
  let max_id = doc.max_id;
  assemble(doc.objects, pages, max_id)
}

/// Number of pages of a document
#[cfg(test)]
pub fn page_count(data: &[u8]) -> Result<usize, PdfError> {
  Ok(load(data)?.get_pages().len())
}

/// # Optimize a document
/// Drop unused objects and empty streams then deflate every stream
pub fn optimize(data: &[u8]) -> Result<Vec<u8>, PdfError> {
  let mut doc = load_plain(data)?;
  doc.prune_objects();
  doc.delete_zero_length_streams();
  doc.compress();
  doc.renumber_objects();
  save(&mut doc)
}

fn content_refs(doc: &Document, page: &Dictionary) -> Vec<Object> {
  match page.get(b"Contents") {
    Ok(Object::Reference(id)) => match doc.get_object(*id) {
      Ok(Object::Array(items)) => items.clone(),
      _ => vec![Object::Reference(*id)],
    },
    Ok(Object::Array(items)) => items.clone(),
    _ => Vec::new(),
  }
}

fn font_resources(doc: &Document, resources: &Dictionary) -> Dictionary {
  resources
    .get(b"Font")
    .ok()
    .map(|fonts| resolve(doc, fonts))
    .and_then(|fonts| fonts.as_dict().ok())
    .cloned()
    .unwrap_or_else(Dictionary::new)
}

/// # Add page numbers
/// Stamp every page with his 1-based number at the bottom right corner
pub fn add_page_numbers(data: &[u8]) -> Result<Vec<u8>, PdfError> {
  let mut doc = load_plain(data)?;
  let font_id = doc.add_object(dictionary! {
    "Type" => "Font",
    "Subtype" => "Type1",
    "BaseFont" => "Helvetica",
  });
  let save_state_id = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
  for (number, page_id) in doc.get_pages() {
    let [_, y0, x1, _] = media_box(&doc, page_id);
    let page = doc.get_object(page_id)?.as_dict()?;
    let mut resources = inherited_attribute(&doc, page_id, b"Resources")
      .as_ref()
      .map(|resources| resolve(&doc, resources))
      .and_then(|resources| resources.as_dict().ok())
      .cloned()
      .unwrap_or_else(Dictionary::new);
    let mut fonts = font_resources(&doc, &resources);
    fonts.set(PAGE_NUMBER_FONT, font_id);
    resources.set("Font", fonts);
    let mut contents = vec![Object::Reference(save_state_id)];
    contents.extend(content_refs(&doc, page));
    let stamp = format!(
      "\nQ\nBT /{} 10 Tf {:.2} {:.2} Td ({}) Tj ET\n",
      PAGE_NUMBER_FONT,
      x1 - 0.8 * INCH,
      y0 + 0.5 * INCH,
      number
    );
    let stamp_id = doc.add_object(Stream::new(dictionary! {}, stamp.into_bytes()));
    contents.push(Object::Reference(stamp_id));
    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Resources", resources);
    page.set("Contents", contents);
  }
  save(&mut doc)
}

/// Text of every page in order, pages that can't be decoded are empty
pub fn extract_pages_text(data: &[u8]) -> Result<Vec<String>, PdfError> {
  let doc = load_plain(data)?;
  let pages = doc.get_pages();
  let mut texts = Vec::with_capacity(pages.len());
  for number in pages.keys() {
    match doc.extract_text(&[*number]) {
      Ok(text) => texts.push(text),
      Err(err) => {
        log::warn!("unable to extract text of page {}: {}", number, err);
        texts.push(String::new());
      }
    }
  }
  Ok(texts)
}
