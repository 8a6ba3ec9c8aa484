use serde::{Serialize, Deserialize};

/// Response of the health endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthInfo {
  pub(crate) status: String,
  pub(crate) time: String,
}

/// Response of the version endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionInfo {
  pub(crate) arch: String,
  pub(crate) version: String,
}
