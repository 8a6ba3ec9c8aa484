//! Ghostscript backed compression and rasterization
use std::path::Path;

use crate::models::{CompressLevel, DaemonConfig};
use crate::utils::command::{self, CommandError};

fn path_arg(prefix: &str, path: &Path) -> String {
  format!("{}{}", prefix, path.display())
}

/// # Compress a pdf
/// Rewrite a pdf through ghostscript pdfwrite with the given preset
pub async fn compress(
  config: &DaemonConfig,
  data: &[u8],
  level: CompressLevel,
) -> Result<Vec<u8>, CommandError> {
  let dir = tempfile::tempdir()?;
  let input = dir.path().join("input.pdf");
  let output = dir.path().join("compressed.pdf");
  tokio::fs::write(&input, data).await?;
  let args = vec![
    String::from("-sDEVICE=pdfwrite"),
    String::from("-dCompatibilityLevel=1.5"),
    format!("-dPDFSETTINGS={}", level.gs_preset()),
    String::from("-dNOPAUSE"),
    String::from("-dQUIET"),
    String::from("-dBATCH"),
    path_arg("-sOutputFile=", &output),
    input.display().to_string(),
  ];
  command::run(&config.gs_bin, &args, config.tool_timeout).await?;
  read_output(&config.gs_bin, &output).await
}

/// Page number of a rasterized page file name
fn rendered_page_number(file_name: &str) -> Option<u32> {
  file_name
    .strip_prefix("page_")?
    .strip_suffix(".jpg")?
    .parse::<u32>()
    .ok()
}

/// # Rasterize a pdf
/// Render every page as a jpeg at the given resolution
///
/// # Return
/// Pages as `page_<n>.jpg` with their content sorted by page number
pub async fn rasterize(
  config: &DaemonConfig,
  data: &[u8],
  dpi: u32,
) -> Result<Vec<(String, Vec<u8>)>, CommandError> {
  let dir = tempfile::tempdir()?;
  let input = dir.path().join("input.pdf");
  tokio::fs::write(&input, data).await?;
  let args = vec![
    String::from("-sDEVICE=jpeg"),
    format!("-r{}", dpi),
    String::from("-dJPEGQ=90"),
    String::from("-dNOPAUSE"),
    String::from("-dQUIET"),
    String::from("-dBATCH"),
    path_arg("-sOutputFile=", &dir.path().join("page_%d.jpg")),
    input.display().to_string(),
  ];
  command::run(&config.gs_bin, &args, config.tool_timeout).await?;
  let mut pages = Vec::new();
  let mut entries = tokio::fs::read_dir(dir.path()).await?;
  while let Some(entry) = entries.next_entry().await? {
    let file_name = entry.file_name().to_string_lossy().into_owned();
    if let Some(number) = rendered_page_number(&file_name) {
      pages.push((number, file_name, entry.path()));
    }
  }
  if pages.is_empty() {
    return Err(CommandError::MissingOutput(config.gs_bin.to_owned()));
  }
  pages.sort_by_key(|(number, _, _)| *number);
  let mut images = Vec::with_capacity(pages.len());
  for (_, file_name, path) in pages {
    images.push((file_name, tokio::fs::read(path).await?));
  }
  Ok(images)
}

/// Read a file a tool should have produced
pub(crate) async fn read_output(
  bin: &str,
  path: &Path,
) -> Result<Vec<u8>, CommandError> {
  match tokio::fs::read(path).await {
    Ok(data) if !data.is_empty() => Ok(data),
    Ok(_) => Err(CommandError::MissingOutput(bin.to_owned())),
    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
      Err(CommandError::MissingOutput(bin.to_owned()))
    }
    Err(err) => Err(err.into()),
  }
}
