//! Run external document tools (ghostscript, libreoffice)
use std::io::ErrorKind;
use std::process::{Output, Stdio};
use std::time::Duration;

use ntex::http::StatusCode;
use thiserror::Error;
use tokio::process::Command;

use crate::errors::{HttpResponseError, IntoHttpResponseError};

#[derive(Debug, Error)]
pub enum CommandError {
  #[error("{0} is not installed")]
  NotFound(String),
  #[error("{bin} exited with code {code:?}: {stderr}")]
  ExitStatus {
    bin: String,
    code: Option<i32>,
    stderr: String,
  },
  #[error("{0} did not produce any output")]
  MissingOutput(String),
  #[error("command killed after {0:?}")]
  Timeout(Duration),
  #[error("command io error {0}")]
  Io(#[from] std::io::Error),
}

impl IntoHttpResponseError for CommandError {
  fn to_http_error(&self) -> HttpResponseError {
    HttpResponseError {
      msg: format!("{}", self),
      status: StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

/// # Run a command
/// Spawn `bin` with `args` and wait for it at most `timeout`.
/// The child is killed when the timeout is reached.
///
/// # Arguments
/// - [bin](str) binary name or path
/// - [args](Vec<String>) arguments given to the binary
/// - [timeout](Duration) maximum running time
///
/// # Return
/// The [output](Output) of a successful run
/// or a [command error](CommandError)
///
/// # Examples
/// ```rust,norun
/// use crate::utils;
///
/// utils::command::run("gs", &args, Duration::from_secs(120)).await?;
/// ```
pub async fn run(
  bin: &str,
  args: &[String],
  timeout: Duration,
) -> Result<Output, CommandError> {
  log::debug!("running {} {:?}", bin, args);
  let child = Command::new(bin)
    .args(args)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true)
    .spawn()
    .map_err(|err| match err.kind() {
      ErrorKind::NotFound => CommandError::NotFound(bin.to_owned()),
      _ => CommandError::Io(err),
    })?;
  let output = match tokio::time::timeout(timeout, child.wait_with_output())
    .await
  {
    Err(_) => {
      log::error!("{} killed after {:?}", bin, timeout);
      return Err(CommandError::Timeout(timeout));
    }
    Ok(output) => output?,
  };
  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
    log::error!("{} failed with {}: {}", bin, output.status, &stderr);
    return Err(CommandError::ExitStatus {
      bin: bin.to_owned(),
      code: output.status.code(),
      stderr,
    });
  }
  Ok(output)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sh(script: &str) -> Vec<String> {
    vec![String::from("-c"), script.to_owned()]
  }

  #[ntex::test]
  async fn captures_stdout() {
    let output = run("sh", &sh("echo pdf"), Duration::from_secs(5))
      .await
      .unwrap();
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "pdf");
  }

  #[ntex::test]
  async fn reports_exit_status() {
    let err = run("sh", &sh("echo broken >&2; exit 3"), Duration::from_secs(5))
      .await
      .unwrap_err();
    match err {
      CommandError::ExitStatus { code, stderr, .. } => {
        assert_eq!(code, Some(3));
        assert_eq!(stderr, "broken");
      }
      _ => panic!("unexpected error {:?}", err),
    }
  }

  #[ntex::test]
  async fn reports_missing_binary() {
    let err = run("pdfmasterd-missing-tool", &[], Duration::from_secs(5))
      .await
      .unwrap_err();
    assert!(matches!(err, CommandError::NotFound(_)));
    assert_eq!(err.to_http_error().status, StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[ntex::test]
  async fn kills_after_timeout() {
    let err = run("sh", &sh("sleep 5"), Duration::from_millis(100))
      .await
      .unwrap_err();
    assert!(matches!(err, CommandError::Timeout(_)));
  }
}
