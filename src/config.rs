use std::path::Path;
use std::time::Duration;

use crate::cli::Cli;
use crate::errors::DaemonError;
use crate::models::{DaemonConfig, DaemonConfigFile};

/// Host derived from the PORT environment variable if set
fn host_from_port(port: Option<String>) -> Result<Option<String>, DaemonError> {
  match port {
    None => Ok(None),
    Some(port) => {
      let port = port.trim().parse::<u16>().map_err(|_| {
        DaemonError::InvalidConfig(format!("PORT {:?} is not a valid port", port))
      })?;
      Ok(Some(format!("tcp://0.0.0.0:{}", port)))
    }
  }
}

fn merge_config(
  args: &Cli,
  port: Option<String>,
  config: &DaemonConfigFile,
) -> Result<DaemonConfig, DaemonError> {
  let defaults = DaemonConfig::default();

  let hosts = if let Some(ref hosts) = args.hosts {
    hosts.to_owned()
  } else if let Some(host) = host_from_port(port)? {
    vec![host]
  } else if let Some(ref hosts) = config.hosts {
    hosts.to_owned()
  } else {
    defaults.hosts
  };

  let workers = args.workers.or(config.workers).unwrap_or(defaults.workers);
  if workers == 0 {
    return Err(DaemonError::InvalidConfig(String::from(
      "workers must be greater than 0",
    )));
  }

  let gs_bin = if let Some(ref gs_bin) = args.gs_bin {
    gs_bin.to_owned()
  } else if let Some(ref gs_bin) = config.gs_bin {
    gs_bin.to_owned()
  } else {
    defaults.gs_bin
  };

  let soffice_bin = if let Some(ref soffice_bin) = args.soffice_bin {
    soffice_bin.to_owned()
  } else if let Some(ref soffice_bin) = config.soffice_bin {
    soffice_bin.to_owned()
  } else {
    defaults.soffice_bin
  };

  let tool_timeout = args
    .tool_timeout
    .or(config.tool_timeout)
    .map(Duration::from_secs)
    .unwrap_or(defaults.tool_timeout);

  let max_upload_size = match args.max_upload_mb.or(config.max_upload_mb) {
    None => defaults.max_upload_size,
    Some(mb) => mb.checked_mul(1024 * 1024).ok_or_else(|| {
      DaemonError::InvalidConfig(format!("max upload of {} MiB is too large", mb))
    })?,
  };

  Ok(DaemonConfig {
    hosts,
    workers,
    gs_bin,
    soffice_bin,
    tool_timeout,
    max_upload_size,
  })
}

fn read_config_file(
  config_dir: &str,
) -> Result<DaemonConfigFile, DaemonError> {
  let config_path = Path::new(config_dir).join("pdfmasterd.conf");

  if !config_path.exists() {
    return Ok(DaemonConfigFile::default());
  }

  let content = std::fs::read_to_string(&config_path)?;
  let config = serde_yaml::from_str::<DaemonConfigFile>(&content)?;

  Ok(config)
}

/// Init Daemon config
/// It will read /etc/pdfmasterd/pdfmasterd.conf
/// and merge it with cli arguments and the PORT environment variable
/// priority goes to arguments then environment then the config file
pub fn init(args: &Cli) -> Result<DaemonConfig, DaemonError> {
  let file_config = read_config_file(&args.config_dir)?;
  merge_config(args, std::env::var("PORT").ok(), &file_config)
}
