/// Ghostscript quality presets accepted by the compress tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressLevel {
  Screen,
  #[default]
  Ebook,
  Printer,
}

impl CompressLevel {
  /// Parse a level, unknown values fall back to ebook
  pub fn parse(value: Option<&str>) -> Self {
    match value.map(|v| v.to_lowercase()).as_deref() {
      Some("screen") => CompressLevel::Screen,
      Some("printer") => CompressLevel::Printer,
      _ => CompressLevel::Ebook,
    }
  }

  pub fn gs_preset(&self) -> &'static str {
    match self {
      CompressLevel::Screen => "/screen",
      CompressLevel::Ebook => "/ebook",
      CompressLevel::Printer => "/printer",
    }
  }
}

/// A file produced by a tool ready to be sent back
#[derive(Debug)]
pub struct Attachment {
  pub(crate) filename: &'static str,
  pub(crate) content_type: &'static str,
  pub(crate) data: Vec<u8>,
}

impl Attachment {
  pub fn pdf(filename: &'static str, data: Vec<u8>) -> Self {
    Attachment {
      filename,
      content_type: "application/pdf",
      data,
    }
  }
}
