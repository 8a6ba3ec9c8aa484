//! Minimal office open xml writer for extracted pdf text
use super::archive::zip_entries;
use super::pdf::{extract_pages_text, PdfError};

pub const DOCX_CONTENT_TYPE: &str =
  "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;

const PAGE_BREAK: &str = r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#;

/// Escape text for xml and drop control characters xml 1.0 refuses
fn escape_xml(text: &str) -> String {
  let mut escaped = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => escaped.push_str("&amp;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '"' => escaped.push_str("&quot;"),
      '\'' => escaped.push_str("&apos;"),
      '\t' => escaped.push(c),
      c if c.is_control() => {}
      c => escaped.push(c),
    }
  }
  escaped
}

fn paragraph(line: &str) -> String {
  if line.is_empty() {
    return String::from("<w:p/>");
  }
  format!(
    r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
    escape_xml(line)
  )
}

/// Body of word/document.xml, one paragraph per line and a page break between pages
pub fn document_xml(pages: &[String]) -> String {
  let mut body = String::new();
  for (index, text) in pages.iter().enumerate() {
    if index > 0 {
      body.push_str(PAGE_BREAK);
    }
    let lines = text.trim_end().lines().map(|line| line.trim_end());
    for line in lines {
      body.push_str(&paragraph(line));
    }
  }
  format!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
    body
  )
}

/// Package pages of text as a docx file
pub fn text_to_docx(pages: &[String]) -> Result<Vec<u8>, PdfError> {
  zip_entries(&[
    (String::from("[Content_Types].xml"), CONTENT_TYPES.as_bytes().to_vec()),
    (String::from("_rels/.rels"), PACKAGE_RELS.as_bytes().to_vec()),
    (String::from("word/document.xml"), document_xml(pages).into_bytes()),
    (
      String::from("word/_rels/document.xml.rels"),
      DOCUMENT_RELS.as_bytes().to_vec(),
    ),
  ])
}

/// # Pdf to docx
/// Convert the text layer of a pdf to a docx document
pub fn pdf_to_docx(data: &[u8]) -> Result<Vec<u8>, PdfError> {
  let pages = extract_pages_text(data)?;
  text_to_docx(&pages)
}

#[cfg(test)]
mod tests {
  use std::io::{Cursor, Read};

  use super::*;
  use crate::utils::tests::gen_pdf;

  #[test]
  fn escape_special_characters() {
    assert_eq!(
      escape_xml("a < b & \"c\" > 'd'\u{7}"),
      "a &lt; b &amp; &quot;c&quot; &gt; &apos;d&apos;"
    );
  }

  #[test]
  fn pages_are_separated_by_breaks() {
    let xml = document_xml(&[
      String::from("first line\nsecond line\n"),
      String::from("next page"),
    ]);
    assert_eq!(xml.matches(PAGE_BREAK).count(), 1);
    assert!(xml.contains(">first line</w:t>"));
    assert!(xml.contains(">second line</w:t>"));
    assert!(xml.find("second line").unwrap() < xml.find(PAGE_BREAK).unwrap());
    assert!(xml.find(PAGE_BREAK).unwrap() < xml.find("next page").unwrap());
  }

  #[test]
  fn docx_package_layout() {
    let data = pdf_to_docx(&gen_pdf(2, "Word")).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
    let names = (0..archive.len())
      .map(|index| archive.by_index(index).unwrap().name().to_owned())
      .collect::<Vec<_>>();
    assert_eq!(
      names,
      vec![
        "[Content_Types].xml",
        "_rels/.rels",
        "word/document.xml",
        "word/_rels/document.xml.rels",
      ]
    );
    let mut xml = String::new();
    archive
      .by_name("word/document.xml")
      .unwrap()
      .read_to_string(&mut xml)
      .unwrap();
    assert!(xml.contains("Word 1"));
    assert!(xml.contains("Word 2"));
  }
}
