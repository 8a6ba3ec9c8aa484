use clap::Parser;

/// pdfmaster daemon
/// merge, split, compress, convert and protect pdf files over http
#[derive(Debug, Clone, Default, Parser)]
#[clap(about, version)]
pub(crate) struct Cli {
  /// Hosts to listen on, use tcp:// or unix:// as protocol
  /// default to tcp://0.0.0.0:10000 or tcp://0.0.0.0:$PORT
  #[clap(short = 'H', long = "host")]
  pub(crate) hosts: Option<Vec<String>>,
  /// Number of http workers
  #[clap(long)]
  pub(crate) workers: Option<usize>,
  /// Pdfmasterd config dir
  #[clap(long, default_value = "/etc/pdfmasterd")]
  pub(crate) config_dir: String,
  /// Ghostscript binary used for compression and rasterization
  #[clap(long)]
  pub(crate) gs_bin: Option<String>,
  /// LibreOffice binary used for docx conversion
  #[clap(long)]
  pub(crate) soffice_bin: Option<String>,
  /// Maximum time in seconds an external tool is allowed to run
  #[clap(long)]
  pub(crate) tool_timeout: Option<u64>,
  /// Maximum size of an upload in MiB
  #[clap(long)]
  pub(crate) max_upload_mb: Option<usize>,
}
