//! LibreOffice backed docx to pdf conversion
use std::path::Path;

use crate::models::DaemonConfig;
use crate::utils::command::{self, CommandError};
use crate::utils::sanitize_filename;

use super::ghostscript::read_output;

/// # Docx to pdf
/// Convert a docx with a headless libreoffice.
/// Each conversion gets his own user profile so concurrent runs don't lock
/// each other.
pub async fn docx_to_pdf(
  config: &DaemonConfig,
  filename: &str,
  data: &[u8],
) -> Result<Vec<u8>, CommandError> {
  let dir = tempfile::tempdir()?;
  let mut filename = sanitize_filename(filename);
  if filename.is_empty() {
    filename = String::from("input.docx");
  }
  let input = dir.path().join(&filename);
  let out_dir = dir.path().join("out");
  let profile = dir.path().join("profile");
  tokio::fs::create_dir(&out_dir).await?;
  tokio::fs::write(&input, data).await?;
  let args = vec![
    format!("-env:UserInstallation=file://{}", profile.display()),
    String::from("--headless"),
    String::from("--convert-to"),
    String::from("pdf"),
    String::from("--outdir"),
    out_dir.display().to_string(),
    input.display().to_string(),
  ];
  command::run(&config.soffice_bin, &args, config.tool_timeout).await?;
  let stem = Path::new(&filename)
    .file_stem()
    .map(|stem| stem.to_string_lossy().into_owned())
    .unwrap_or_else(|| String::from("input"));
  let output = out_dir.join(format!("{}.pdf", stem));
  read_output(&config.soffice_bin, &output).await
}

#[cfg(test)]
mod tests {
  use super::*;

  #[ntex::test]
  async fn missing_libreoffice() {
    let config = DaemonConfig {
      soffice_bin: String::from("pdfmasterd-missing-soffice"),
      ..Default::default()
    };
    let err = docx_to_pdf(&config, "letter.docx", b"PK")
      .await
      .unwrap_err();
    assert!(matches!(err, CommandError::NotFound(_)));
  }

  #[ntex::test]
  async fn failing_libreoffice() {
    let config = DaemonConfig {
      soffice_bin: String::from("false"),
      ..Default::default()
    };
    let err = docx_to_pdf(&config, "letter.docx", b"PK")
      .await
      .unwrap_err();
    assert!(matches!(err, CommandError::ExitStatus { .. }));
  }
}
