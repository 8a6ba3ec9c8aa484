use ntex::web;
use ntex::http::StatusCode;

use crate::errors::HttpResponseError;
use crate::models::{Attachment, DaemonConfig, FileKind};
use crate::services::{archive, docx, ghostscript, image, libreoffice};
use crate::utils::{self, multipart};
use crate::utils::command::CommandError;

const DEFAULT_DPI: u32 = 150;
const MIN_DPI: i64 = 36;
const MAX_DPI: i64 = 600;

#[web::post("/api/pdf-to-word")]
async fn pdf_to_word(
  req: web::HttpRequest,
  payload: web::types::Payload,
  config: web::types::State<DaemonConfig>,
) -> Result<web::HttpResponse, HttpResponseError> {
  let form =
    multipart::read_form(&req, payload, config.max_upload_size).await?;
  let file = form
    .file("file")
    .filter(|file| file.is_kind(FileKind::Pdf))
    .ok_or_else(|| HttpResponseError::bad_request("PDF required"))?;
  let data = file.data.clone();
  let data = utils::blocking(move || docx::pdf_to_docx(&data)).await?;
  Ok(utils::attachment(Attachment {
    filename: "converted.docx",
    content_type: docx::DOCX_CONTENT_TYPE,
    data,
  }))
}

#[web::post("/api/word-to-pdf")]
async fn word_to_pdf(
  req: web::HttpRequest,
  payload: web::types::Payload,
  config: web::types::State<DaemonConfig>,
) -> Result<web::HttpResponse, HttpResponseError> {
  let form =
    multipart::read_form(&req, payload, config.max_upload_size).await?;
  let file = form
    .file("file")
    .filter(|file| file.is_kind(FileKind::Docx))
    .ok_or_else(|| HttpResponseError::bad_request("DOCX required"))?;
  let data = libreoffice::docx_to_pdf(&config, &file.filename, &file.data)
    .await
    .map_err(|err| match err {
      CommandError::NotFound(_) => HttpResponseError {
        msg: String::from("LibreOffice not available on server."),
        status: StatusCode::INTERNAL_SERVER_ERROR,
      },
      err => err.into(),
    })?;
  Ok(utils::attachment(Attachment::pdf("converted.pdf", data)))
}

/// Requested resolution clamped to what ghostscript renders in a sane time
fn parse_dpi(value: Option<&str>) -> Result<u32, HttpResponseError> {
  match value {
    None | Some("") => Ok(DEFAULT_DPI),
    Some(value) => {
      let dpi = value.parse::<i64>().map_err(|_| {
        HttpResponseError::bad_request(format!("Invalid dpi: {}", value))
      })?;
      Ok(dpi.clamp(MIN_DPI, MAX_DPI) as u32)
    }
  }
}

#[web::post("/api/pdf-to-jpg")]
async fn pdf_to_jpg(
  req: web::HttpRequest,
  payload: web::types::Payload,
  config: web::types::State<DaemonConfig>,
) -> Result<web::HttpResponse, HttpResponseError> {
  let form =
    multipart::read_form(&req, payload, config.max_upload_size).await?;
  let file = form
    .file("file")
    .filter(|file| file.is_kind(FileKind::Pdf))
    .ok_or_else(|| HttpResponseError::bad_request("PDF required"))?;
  let dpi = parse_dpi(form.field("dpi"))?;
  let images = ghostscript::rasterize(&config, &file.data, dpi).await?;
  log::debug!("rendered {} pages at {} dpi", images.len(), dpi);
  let data = utils::blocking(move || archive::zip_entries(&images)).await?;
  Ok(utils::attachment(Attachment {
    filename: "images.zip",
    content_type: "application/zip",
    data,
  }))
}

#[web::post("/api/jpg-to-pdf")]
async fn jpg_to_pdf(
  req: web::HttpRequest,
  payload: web::types::Payload,
  config: web::types::State<DaemonConfig>,
) -> Result<web::HttpResponse, HttpResponseError> {
  let form =
    multipart::read_form(&req, payload, config.max_upload_size).await?;
  let files = form.files("files");
  if files.is_empty() {
    return Err(HttpResponseError::bad_request("No images uploaded"));
  }
  if let Some(file) = files.iter().find(|file| !file.is_kind(FileKind::Jpeg)) {
    return Err(HttpResponseError::bad_request(format!(
      "Invalid image: {}",
      file.filename
    )));
  }
  let images = files
    .into_iter()
    .map(|file| (file.filename.clone(), file.data.clone()))
    .collect::<Vec<_>>();
  let data = utils::blocking(move || image::jpegs_to_pdf(images)).await?;
  Ok(utils::attachment(Attachment::pdf("converted.pdf", data)))
}

pub fn ntex_config(config: &mut web::ServiceConfig) {
  config.service(pdf_to_word);
  config.service(word_to_pdf);
  config.service(pdf_to_jpg);
  config.service(jpg_to_pdf);
}
