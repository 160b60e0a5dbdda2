//! Web admin host simulator - Main Entry Point

use anyhow::Result;
use clap::Parser;

mod cli;
mod file_flash;
mod host;

fn main() -> Result<()> {
    env_logger::init();
    let cli = cli::Cli::parse();
    cli::run(cli)
}
