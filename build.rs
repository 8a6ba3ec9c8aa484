use std::fs;
use std::path::PathBuf;

use clap::CommandFactory;

include!("src/cli.rs");

fn main() -> std::io::Result<()> {
  println!("cargo:rerun-if-changed=src/cli.rs");
  let out_dir = match std::env::var_os("OUT_DIR") {
    None => return Ok(()),
    Some(out_dir) => PathBuf::from(out_dir),
  };
  let man_dir = out_dir.join("man");
  fs::create_dir_all(&man_dir)?;
  let cmd = Cli::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buffer: Vec<u8> = Default::default();
  man.render(&mut buffer)?;
  fs::write(man_dir.join("pdfmasterd.1"), buffer)?;
  Ok(())
}
