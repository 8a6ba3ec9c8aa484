//! pdfmaster daemon
//!
//! Provides an http api to work on pdf files:
//! - merge, split and compress
//! - convert from and to docx and jpeg
//! - protect, unlock and number pages
//!
use clap::Parser;

mod cli;
mod version;
mod controllers;

mod utils;
mod errors;
mod config;
mod server;
mod models;
mod services;

/// pdfmasterd is the daemon serving the pdf tools
///
/// # Example
/// ```sh
/// pdfmasterd --host tcp://0.0.0.0:10000 --workers 2
/// ```
#[ntex::main]
async fn main() -> std::io::Result<()> {
  // Parsing command line arguments
  let args = cli::Cli::parse();

  // Building env logger
  if std::env::var("LOG_LEVEL").is_err() {
    std::env::set_var("LOG_LEVEL", "pdfmasterd=info,warn,error");
  }
  env_logger::Builder::new().parse_env("LOG_LEVEL").init();

  // Merge cli args, environment and config file with priority to args
  let daemon_config = match config::init(&args) {
    Err(err) => {
      log::error!("{}", err);
      std::process::exit(1);
    }
    Ok(daemon_config) => daemon_config,
  };

  // start ntex http server
  server::start(daemon_config).await?;
  log::info!("shutdown");
  Ok(())
}
