#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod cli;
mod config;
mod events;
mod meetup;
mod pipeline;
mod routing;
mod utils;
mod web;

use config::Config;
use web::WebServer;

#[tokio::main]
async fn main() -> Result<()> {
    utils::logging::init_tracing();

    let args = cli::Cli::parse();
    let mut config = Config::load_from_file(&args.config)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    let config = Arc::new(config);
    info!(
        groups = config.meetup_groups.len(),
        "meetup-discord router starting up"
    );

    let source = Arc::new(meetup::MeetupClient::new(&config.fetch)?);
    let pipeline = Arc::new(pipeline::EventPipeline::new(config.clone(), source));

    let web_server = WebServer::new(config, pipeline);
    web_server.start().await?;

    info!("meetup-discord router shutting down");
    Ok(())
}
