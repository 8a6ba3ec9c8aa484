use std::time::Duration;

use serde::{Serialize, Deserialize};

/// Daemon config resolved from cli arguments, environment and config file
#[derive(Debug, Clone)]
pub struct DaemonConfig {
  pub(crate) hosts: Vec<String>,
  pub(crate) workers: usize,
  pub(crate) gs_bin: String,
  pub(crate) soffice_bin: String,
  pub(crate) tool_timeout: Duration,
  pub(crate) max_upload_size: usize,
}

impl Default for DaemonConfig {
  fn default() -> Self {
    DaemonConfig {
      hosts: vec![String::from("tcp://0.0.0.0:10000")],
      workers: 2,
      gs_bin: String::from("gs"),
      soffice_bin: String::from("soffice"),
      tool_timeout: Duration::from_secs(120),
      max_upload_size: 50 * 1024 * 1024,
    }
  }
}

/// Content of /etc/pdfmasterd/pdfmasterd.conf
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DaemonConfigFile {
  pub(crate) hosts: Option<Vec<String>>,
  pub(crate) workers: Option<usize>,
  pub(crate) gs_bin: Option<String>,
  pub(crate) soffice_bin: Option<String>,
  pub(crate) tool_timeout: Option<u64>,
  pub(crate) max_upload_mb: Option<usize>,
}
