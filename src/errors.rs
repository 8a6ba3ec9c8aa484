use ntex::web;
use ntex::http::StatusCode;
use serde_json::json;
use thiserror::Error;

use crate::services::pdf::PdfError;
use crate::utils::command::CommandError;

/// Http response error
#[derive(Debug, Error)]
pub struct HttpResponseError {
  pub(crate) msg: String,
  pub(crate) status: StatusCode,
}

impl HttpResponseError {
  pub fn bad_request<T: ToString>(msg: T) -> Self {
    HttpResponseError {
      msg: msg.to_string(),
      status: StatusCode::BAD_REQUEST,
    }
  }

  pub fn internal<T: ToString>(msg: T) -> Self {
    HttpResponseError {
      msg: msg.to_string(),
      status: StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl std::fmt::Display for HttpResponseError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "[{}] {}", self.status, self.msg)
  }
}

pub trait IntoHttpResponseError {
  fn to_http_error(&self) -> HttpResponseError;
}

impl web::WebResponseError for HttpResponseError {
  // builds the actual response to send back when an error occurs
  fn error_response(&self, _: &web::HttpRequest) -> web::HttpResponse {
    log::error!("Error response: {}", self);
    let err_json = json!({ "msg": self.msg });
    web::HttpResponse::build(self.status).json(&err_json)
  }
}

impl From<PdfError> for HttpResponseError {
  fn from(err: PdfError) -> Self {
    err.to_http_error()
  }
}

impl From<CommandError> for HttpResponseError {
  fn from(err: CommandError) -> Self {
    err.to_http_error()
  }
}

/// Generic Daemon error
#[derive(Debug, Error)]
pub enum DaemonError {
  /// Io error while reading the config file
  #[error(transparent)]
  Io(#[from] std::io::Error),
  /// Config file is not valid yaml
  #[error(transparent)]
  Yaml(#[from] serde_yaml::Error),
  /// Config values are not usable
  #[error("invalid config: {0}")]
  InvalidConfig(String),
}
