//! Build script rendering the `gatewire(1)` man page from the CLI definition.

use std::{env, fs, path::PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli.rs"]
mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/cli.rs");
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let out_dir = manifest_dir.join("target").join("generated-man");
    fs::create_dir_all(&out_dir)?;

    let command = cli::Cli::command();
    let file_name = format!("{}.1", command.get_name());
    let mut page = Vec::new();
    Man::new(command).section("1").render(&mut page)?;
    fs::write(out_dir.join(file_name), page)?;

    Ok(())
}
