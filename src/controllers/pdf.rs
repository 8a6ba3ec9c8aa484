use ntex::web;

use crate::errors::HttpResponseError;
use crate::models::{
  Attachment, CompressLevel, DaemonConfig, FileKind, UploadForm,
};
use crate::services::{crypt, ghostscript, pdf};
use crate::utils::{self, multipart};

#[web::post("/api/merge")]
async fn merge_pdf(
  req: web::HttpRequest,
  payload: web::types::Payload,
  config: web::types::State<DaemonConfig>,
) -> Result<web::HttpResponse, HttpResponseError> {
  let form =
    multipart::read_form(&req, payload, config.max_upload_size).await?;
  let files = form.files("files");
  if files.is_empty() {
    return Err(HttpResponseError::bad_request("No files uploaded"));
  }
  if let Some(file) = files.iter().find(|file| !file.is_kind(FileKind::Pdf)) {
    return Err(HttpResponseError::bad_request(format!(
      "Invalid file type: {}",
      file.filename
    )));
  }
  let documents = files
    .into_iter()
    .map(|file| file.data.clone())
    .collect::<Vec<_>>();
  log::debug!("merging {} documents", documents.len());
  let data = utils::blocking(move || pdf::merge(documents)).await?;
  Ok(utils::attachment(Attachment::pdf("merged.pdf", data)))
}

#[web::post("/api/split")]
async fn split_pdf(
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
  let pages = form.field("pages").unwrap_or_default().to_owned();
  let data = utils::blocking(move || pdf::split(&data, &pages)).await?;
  Ok(utils::attachment(Attachment::pdf("split.pdf", data)))
}

#[web::post("/api/compress")]
async fn compress_pdf(
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
  let level = CompressLevel::parse(form.field("level"));
  // Ghostscript opens owner-only protected files without a password
  let data = file.data.clone();
  utils::blocking(move || pdf::load_plain(&data).map(|_| ())).await?;
  let data = match ghostscript::compress(&config, &file.data, level).await {
    Ok(data) => data,
    Err(err) => {
      log::warn!("ghostscript compression failed, optimizing instead: {}", err);
      let data = file.data.clone();
      utils::blocking(move || pdf::optimize(&data)).await?
    }
  };
  Ok(utils::attachment(Attachment::pdf("compressed.pdf", data)))
}

/// File and trimmed password of protect and unlock requests
fn password_form(
  form: &UploadForm,
) -> Result<(Vec<u8>, String), HttpResponseError> {
  let file = form.file("file").filter(|file| file.is_kind(FileKind::Pdf));
  let password = form.field("password").unwrap_or_default();
  match file {
    Some(file) if !password.is_empty() => {
      Ok((file.data.clone(), password.to_owned()))
    }
    _ => Err(HttpResponseError::bad_request("PDF and password required")),
  }
}

#[web::post("/api/protect")]
async fn protect_pdf(
  req: web::HttpRequest,
  payload: web::types::Payload,
  config: web::types::State<DaemonConfig>,
) -> Result<web::HttpResponse, HttpResponseError> {
  let form =
    multipart::read_form(&req, payload, config.max_upload_size).await?;
  let (data, password) = password_form(&form)?;
  let data = utils::blocking(move || crypt::protect(&data, &password)).await?;
  Ok(utils::attachment(Attachment::pdf("protected.pdf", data)))
}

#[web::post("/api/unlock")]
async fn unlock_pdf(
  req: web::HttpRequest,
  payload: web::types::Payload,
  config: web::types::State<DaemonConfig>,
) -> Result<web::HttpResponse, HttpResponseError> {
  let form =
    multipart::read_form(&req, payload, config.max_upload_size).await?;
  let (data, password) = password_form(&form)?;
  let data = utils::blocking(move || crypt::unlock(&data, &password)).await?;
  Ok(utils::attachment(Attachment::pdf("unlocked.pdf", data)))
}

#[web::post("/api/page-number")]
async fn add_page_numbers(
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
  let data = utils::blocking(move || pdf::add_page_numbers(&data)).await?;
  Ok(utils::attachment(Attachment::pdf("numbered.pdf", data)))
}

pub fn ntex_config(config: &mut web::ServiceConfig) {
  config.service(merge_pdf);
  config.service(split_pdf);
  config.service(compress_pdf);
  config.service(protect_pdf);
  config.service(unlock_pdf);
  config.service(add_page_numbers);
}
