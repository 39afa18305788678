//! Build script for generating the `drbridge` man pages.
//!
//! Packaging picks the pages up from the build output directory: one page for
//! the top-level command and one per subcommand, named `drbridge-<name>.1`.

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Command, CommandFactory};
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

fn render(command: Command, out_dir: &Path, file_name: &str) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    Man::new(command).render(&mut buffer)?;
    fs::write(out_dir.join(file_name), buffer)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout();
    writeln!(stdout, "cargo:rerun-if-changed=build.rs")?;
    writeln!(stdout, "cargo:rerun-if-changed=src/cli/mod.rs")?;

    let out_dir = PathBuf::from(env::var_os("OUT_DIR").ok_or("OUT_DIR was not set")?);

    let command = cli::Cli::command();
    for subcommand in command.get_subcommands() {
        let file_name = format!("drbridge-{}.1", subcommand.get_name());
        render(subcommand.clone(), &out_dir, &file_name)?;
    }
    render(command, &out_dir, "drbridge.1")?;

    Ok(())
}
