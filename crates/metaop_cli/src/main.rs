// SPDX-License-Identifier: MIT OR Apache-2.0
//! `metaop` - inspect and instantiate node-graph meta-operations.

mod cli;
mod commands;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use commands::Output;
use config::CliConfig;
use metaop_graph::MetaOperationRegistry;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load_or_default(cli.config.as_deref())?;

    let filter = cli.log.as_deref().unwrap_or(&config.log_filter);
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .with_context(|| format!("Invalid log filter `{filter}`"))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Starting metaop v{}", env!("CARGO_PKG_VERSION"));

    let registry = MetaOperationRegistry::with_builtins()?;
    let output = Output {
        format: cli.format.unwrap_or(config.format),
        pretty: config.pretty,
    };

    let text = commands::run(&cli.command, &registry, &config, output)?;
    println!("{text}");
    Ok(())
}
