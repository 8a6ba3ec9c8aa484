use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::pdf::PdfError;

/// Pack entries into a deflated zip archive keeping their order
pub fn zip_entries(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, PdfError> {
  let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
  let options =
    FileOptions::default().compression_method(CompressionMethod::Deflated);
  for (name, data) in entries {
    writer.start_file(name.as_str(), options)?;
    writer.write_all(data)?;
  }
  let cursor = writer.finish()?;
  Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
  use std::io::Read;

  use super::*;

  #[test]
  fn entries_keep_order_and_content() {
    let data = zip_entries(&[
      (String::from("page_1.jpg"), b"first".to_vec()),
      (String::from("page_2.jpg"), b"second".to_vec()),
    ])
    .unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
    assert_eq!(archive.len(), 2);
    let mut content = String::new();
    archive
      .by_index(1)
      .unwrap()
      .read_to_string(&mut content)
      .unwrap();
    assert_eq!(content, "second");
    assert_eq!(archive.by_index(0).unwrap().name(), "page_1.jpg");
  }
}
