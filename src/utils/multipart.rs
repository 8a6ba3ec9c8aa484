use futures::StreamExt;
use ntex::web;
use ntex::http::{header, StatusCode};

use crate::errors::HttpResponseError;
use crate::models::{UploadForm, UploadedFile};

fn invalid_form(err: multer::Error) -> HttpResponseError {
  HttpResponseError::bad_request(format!("Invalid multipart body: {}", err))
}

/// # Parse a multipart body
/// Parts with a filename are files, the others are text fields.
/// File inputs submitted empty are ignored.
pub async fn parse_form(
  body: Vec<u8>,
  boundary: String,
) -> Result<UploadForm, HttpResponseError> {
  let stream = futures::stream::once(async move {
    Ok::<_, std::io::Error>(bytes::Bytes::from(body))
  });
  let mut multipart = multer::Multipart::new(stream, boundary);
  let mut form = UploadForm::default();
  while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
    let name = field.name().unwrap_or_default().to_owned();
    let filename = field.file_name().map(|filename| filename.to_owned());
    let content_type = field
      .content_type()
      .map(|mime| mime.to_string())
      .unwrap_or_default();
    let data = field.bytes().await.map_err(invalid_form)?;
    match filename {
      Some(filename) => {
        if filename.is_empty() && data.is_empty() {
          continue;
        }
        form.files.push(UploadedFile {
          field: name,
          filename,
          content_type,
          data: data.to_vec(),
        });
      }
      None => {
        form
          .fields
          .insert(name, String::from_utf8_lossy(&data).into_owned());
      }
    }
  }
  Ok(form)
}

/// # Read a multipart form
/// Read the whole request body up to `limit` bytes then parse it
pub async fn read_form(
  req: &web::HttpRequest,
  mut payload: web::types::Payload,
  limit: usize,
) -> Result<UploadForm, HttpResponseError> {
  let content_type = req
    .headers()
    .get(header::CONTENT_TYPE)
    .and_then(|value| value.to_str().ok())
    .unwrap_or_default();
  let boundary = multer::parse_boundary(content_type).map_err(|_| {
    HttpResponseError::bad_request("multipart/form-data body required")
  })?;
  let mut body = Vec::new();
  while let Some(chunk) = payload.next().await {
    let chunk = chunk.map_err(|err| {
      HttpResponseError::bad_request(format!("unable to read body {}", err))
    })?;
    if body.len() + chunk.len() > limit {
      return Err(HttpResponseError {
        msg: String::from("payload too large"),
        status: StatusCode::PAYLOAD_TOO_LARGE,
      });
    }
    body.extend_from_slice(&chunk);
  }
  parse_form(body, boundary).await
}
