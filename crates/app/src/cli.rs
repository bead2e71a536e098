use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::{
    config::{MapArgs, MapConfig, ServeArgs, ServeConfig},
    session,
};

#[derive(Debug, Parser)]
#[command(
    name = "quakemap",
    about = "Interactive earthquake map with plate boundaries",
    version
)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch both feeds and serve the map page with its JSON API.
    Serve(ServeArgs),
    /// Fetch both feeds once and print the composed map as JSON.
    Snapshot(MapArgs),
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Serve(args) => session::serve(ServeConfig::try_from(args)?),
        Command::Snapshot(args) => session::snapshot(MapConfig::try_from(args)?),
    }
}
