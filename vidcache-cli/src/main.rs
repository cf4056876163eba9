mod cli;
mod commands;

use crate::cli::{Args, Commands, LogOutput};
use anyhow::Result;
use bridge_desktop::ChannelLifecycleObserver;
use clap::Parser;
use core_runtime::logging::{init_logging, parse_level, LogFormat, LoggingConfig};
use core_service::{bootstrap_desktop, DesktopOptions};
use std::process;
use std::sync::Arc;
use tracing::error;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Application error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let logging = LoggingConfig::default()
        .with_level(parse_level(&args.log_level)?)
        .with_format(match args.log_format {
            LogOutput::Pretty => LogFormat::Pretty,
            LogOutput::Json => LogFormat::Json,
            LogOutput::Compact => LogFormat::Compact,
        });
    init_logging(logging.clone())?;

    let observer = Arc::new(ChannelLifecycleObserver::new());
    let service = bootstrap_desktop(DesktopOptions {
        data_dir: args.data_dir,
        player_command: args.player,
        player_args: args.player_args,
        logging,
        lifecycle_observer: Some(observer.clone()),
        ..DesktopOptions::default()
    })
    .await?;

    let report = service.initialize().await;
    if report.dropped > 0 {
        eprintln!(
            "{} cached video(s) were missing and have been forgotten",
            report.dropped
        );
    }

    match args.command {
        Commands::Load { input } => commands::load(&service, &input).await,
        Commands::Cache => commands::cache(&service).await,
        Commands::Status { json } => commands::status(&service, json).await,
        Commands::Play { from } => commands::play(&service, observer, from).await,
        Commands::Clear => commands::clear(&service).await,
    }
}
