use std::collections::HashMap;

/// A file part of a multipart upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
  pub(crate) field: String,
  pub(crate) filename: String,
  pub(crate) content_type: String,
  pub(crate) data: Vec<u8>,
}

impl UploadedFile {
  /// Check if the file looks like the given kind
  /// either by his filename or by his content type
  pub fn is_kind(&self, kind: FileKind) -> bool {
    let filename = self.filename.to_lowercase();
    let content_type = self.content_type.to_lowercase();
    kind
      .markers()
      .iter()
      .any(|marker| filename.contains(marker) || content_type.contains(marker))
  }
}

/// A parsed multipart/form-data request
#[derive(Debug, Default)]
pub struct UploadForm {
  pub(crate) files: Vec<UploadedFile>,
  pub(crate) fields: HashMap<String, String>,
}

impl UploadForm {
  /// First file uploaded under the given field name
  pub fn file(&self, field: &str) -> Option<&UploadedFile> {
    self.files.iter().find(|file| file.field == field)
  }

  /// Every file uploaded under the given field name in upload order
  pub fn files(&self, field: &str) -> Vec<&UploadedFile> {
    self.files.iter().filter(|file| file.field == field).collect()
  }

  /// Text field trimmed, None when missing
  pub fn field(&self, name: &str) -> Option<&str> {
    self.fields.get(name).map(|value| value.trim())
  }
}

/// Kind of documents the tools accept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
  Pdf,
  Docx,
  Jpeg,
}

impl FileKind {
  fn markers(&self) -> &'static [&'static str] {
    match self {
      FileKind::Pdf => &["application/pdf", ".pdf"],
      FileKind::Docx => &[
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".docx",
      ],
      FileKind::Jpeg => &["image/jpeg", ".jpg", ".jpeg"],
    }
  }
}
