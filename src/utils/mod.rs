pub mod pages;
pub mod command;
pub mod multipart;

use once_cell::sync::Lazy;
use regex::Regex;
use ntex::web;
use ntex::http::header;
use ntex::http::error::BlockingError;

use crate::errors::HttpResponseError;
use crate::models::Attachment;
use crate::services::pdf::PdfError;

static UNSAFE_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| {
  let pattern = r"[^A-Za-z0-9_.-]";
  Regex::new(pattern).expect("filename pattern is valid")
});

/// # Sanitize a filename
/// Keep an ascii filename safe to use inside a temporary directory.
/// Whitespaces become underscores, path separators and any other character
/// than letters, digits, `_`, `.` and `-` are dropped.
/// The result may be empty.
pub fn sanitize_filename(filename: &str) -> String {
  let filename = filename.replace(['/', '\\'], " ");
  let filename = filename
    .split_whitespace()
    .collect::<Vec<&str>>()
    .join("_");
  let filename = UNSAFE_FILENAME_CHARS.replace_all(&filename, "");
  filename.trim_matches(|c| c == '.' || c == '_').to_owned()
}

/// Build the http response sending a tool result as a download
pub fn attachment(file: Attachment) -> web::HttpResponse {
  web::HttpResponse::Ok()
    .content_type(file.content_type)
    .header(
      header::CONTENT_DISPOSITION,
      format!("attachment; filename=\"{}\"", file.filename),
    )
    .body(file.data)
}

/// Run cpu bound pdf work on the blocking thread pool
pub async fn blocking<F, T>(work: F) -> Result<T, HttpResponseError>
where
  F: FnOnce() -> Result<T, PdfError> + Send + 'static,
  T: Send + 'static,
{
  match web::block(work).await {
    Ok(result) => Ok(result),
    Err(BlockingError::Error(err)) => Err(err.into()),
    Err(BlockingError::Canceled) => {
      Err(HttpResponseError::internal("pdf worker canceled"))
    }
  }
}

#[cfg(test)]
pub mod tests {
  use ntex::web::*;
  use lopdf::content::{Content, Operation};
  use lopdf::{dictionary, Document, Object, Stream};

  use crate::models::DaemonConfig;

  pub use ntex::web::test::TestServer;

  pub type TestReturn = Result<(), Box<dyn std::error::Error + 'static>>;

  type Config = fn(&mut ServiceConfig);

  pub fn before() {
    // Build a test env logger
    let _ = env_logger::builder().is_test(true).try_init();
  }

  pub fn has_binary(bin: &str) -> bool {
    std::process::Command::new(bin)
      .arg("--version")
      .output()
      .is_ok()
  }

  pub fn generate_server_with(
    daemon_config: DaemonConfig,
    config: Config,
  ) -> test::TestServer {
    before();
    test::server(move || {
      App::new()
        .state(daemon_config.clone())
        .wrap(crate::server::cors_headers())
        .configure(config)
    })
  }

  pub fn generate_server(config: Config) -> test::TestServer {
    generate_server_with(DaemonConfig::default(), config)
  }

  /// A4 document of `pages` pages, page n shows `<label> <n>`
  pub fn gen_pdf(pages: u32, label: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
      "Type" => "Font",
      "Subtype" => "Type1",
      "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
      "Font" => dictionary! {
        "F1" => font_id,
      },
    });
    let mut kids = Vec::new();
    for number in 1..=pages {
      let content = Content {
        operations: vec![
          Operation::new("BT", vec![]),
          Operation::new("Tf", vec!["F1".into(), 24.into()]),
          Operation::new("Td", vec![100.into(), 600.into()]),
          Operation::new(
            "Tj",
            vec![Object::string_literal(format!("{} {}", label, number))],
          ),
          Operation::new("ET", vec![]),
        ],
      };
      let content_id =
        doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
      let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
      });
      kids.push(Object::Reference(page_id));
    }
    let count = kids.len() as i64;
    doc.objects.insert(
      pages_id,
      Object::Dictionary(dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
      }),
    );
    let catalog_id = doc.add_object(dictionary! {
      "Type" => "Catalog",
      "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
  }

  /// Encrypted with an empty user password, opens without prompting
  pub fn gen_owner_only_pdf(pages: u32, label: &str) -> Vec<u8> {
    let mut doc = crate::services::pdf::load(&gen_pdf(pages, label)).unwrap();
    crate::services::crypt::encrypt(&mut doc, "", "owner").unwrap();
    crate::services::pdf::save(&mut doc).unwrap()
  }

  /// Document claiming aes encryption (V4/R4)
  pub fn gen_aes_pdf(label: &str) -> Vec<u8> {
    let mut doc = crate::services::pdf::load(&gen_pdf(1, label)).unwrap();
    let encrypt_id = doc.add_object(dictionary! {
      "Filter" => "Standard",
      "V" => 4,
      "R" => 4,
      "Length" => 128,
      "P" => -4,
      "O" => Object::String(vec![0; 32], lopdf::StringFormat::Hexadecimal),
      "U" => Object::String(vec![0; 32], lopdf::StringFormat::Hexadecimal),
    });
    doc.trailer.set("Encrypt", encrypt_id);
    crate::services::pdf::save(&mut doc).unwrap()
  }

  /// Jpeg headers only, enough to be embedded but not decoded
  pub fn gen_jpeg(
    width: u16,
    height: u16,
    components: u8,
    dpi: Option<u16>,
  ) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    if let Some(dpi) = dpi {
      data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
      data.extend_from_slice(b"JFIF\0");
      data.extend_from_slice(&[0x01, 0x01, 0x01]);
      data.extend_from_slice(&dpi.to_be_bytes());
      data.extend_from_slice(&dpi.to_be_bytes());
      data.extend_from_slice(&[0x00, 0x00]);
    }
    let length = 8 + 3 * u16::from(components);
    data.extend_from_slice(&[0xFF, 0xC0]);
    data.extend_from_slice(&length.to_be_bytes());
    data.push(8);
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&width.to_be_bytes());
    data.push(components);
    for id in 1..=components {
      data.extend_from_slice(&[id, 0x11, 0x00]);
    }
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
  }

  /// Build multipart/form-data bodies for requests
  #[derive(Default)]
  pub struct MultipartBody {
    body: Vec<u8>,
  }

  impl MultipartBody {
    const BOUNDARY: &'static str = "pdfmasterd-test-boundary";

    pub fn new() -> Self {
      Self::default()
    }

    pub fn file(
      mut self,
      name: &str,
      filename: &str,
      content_type: &str,
      data: &[u8],
    ) -> Self {
      self.body.extend_from_slice(
        format!(
          "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
          Self::BOUNDARY,
          name,
          filename,
          content_type
        )
        .as_bytes(),
      );
      self.body.extend_from_slice(data);
      self.body.extend_from_slice(b"\r\n");
      self
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
      self.body.extend_from_slice(
        format!(
          "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
          Self::BOUNDARY,
          name,
          value
        )
        .as_bytes(),
      );
      self
    }

    /// Content type header and body
    pub fn finish(mut self) -> (String, Vec<u8>) {
      self
        .body
        .extend_from_slice(format!("--{}--\r\n", Self::BOUNDARY).as_bytes());
      (
        format!("multipart/form-data; boundary={}", Self::BOUNDARY),
        self.body,
      )
    }
  }

  #[test]
  fn sanitize_filenames() {
    use super::sanitize_filename;

    assert_eq!(sanitize_filename("My cool file.docx"), "My_cool_file.docx");
    assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
    assert_eq!(sanitize_filename("résumé.docx"), "rsum.docx");
    assert_eq!(sanitize_filename("..."), "");
  }
}
