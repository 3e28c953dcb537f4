use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "meetup-discord-router", version, about)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, env = "CONFIG_PATH", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Overrides the configured listen port.
    #[arg(long)]
    pub port: Option<u16>,
}
