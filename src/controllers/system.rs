use ntex::web;
use ntex::http::header;
use chrono::Utc;

use crate::errors::HttpResponseError;
use crate::models::{HealthInfo, VersionInfo};
use crate::version;

#[web::get("/api/health")]
async fn get_health() -> Result<web::HttpResponse, HttpResponseError> {
  let info = HealthInfo {
    status: String::from("ok"),
    time: Utc::now()
      .naive_utc()
      .format("%Y-%m-%dT%H:%M:%S%.6f")
      .to_string(),
  };
  Ok(web::HttpResponse::Ok().json(&info))
}

#[web::get("/version")]
async fn get_version() -> Result<web::HttpResponse, HttpResponseError> {
  let info = VersionInfo {
    arch: String::from(version::ARCH),
    version: String::from(version::VERSION),
  };
  Ok(web::HttpResponse::Ok().json(&info))
}

/// Answer browsers cors preflight requests
async fn preflight() -> web::HttpResponse {
  web::HttpResponse::NoContent()
    .header(header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS")
    .header(header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type")
    .finish()
}

pub fn ntex_config(config: &mut web::ServiceConfig) {
  config.service(get_health);
  config.service(get_version);
  config.service(
    web::resource("/api/{tail}*")
      .guard(web::guard::Options())
      .to(preflight),
  );
}
