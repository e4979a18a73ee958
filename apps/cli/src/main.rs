//! warpdl CLI - multi-connection download accelerator
//!
//! Thin shell around the engine: argument parsing, a progress bar that
//! polls the shared counter, and Ctrl-C wiring to the cancellation
//! token.

mod progress;

use anyhow::Result;
use clap::Parser;
use console::style;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use warpdl_core::Transfer;
use warpdl_types::TransferConfig;

/// warpdl - high-performance multi-connection download manager
#[derive(Parser)]
#[command(name = "warpdl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// URL to download
    url: String,

    /// Number of concurrent connections
    #[arg(short = 'c', long = "concurrent", default_value_t = 16)]
    concurrent: u32,

    /// Output filename (defaults to the URL's basename)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Disable DNS-over-HTTPS resolution (use system DNS)
    #[arg(long)]
    no_doh: bool,

    /// Skip TLS certificate verification
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Verbose engine logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "warpdl_core=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = TransferConfig::new(cli.url);
    config.concurrency = cli.concurrent;
    config.output = cli.output;
    config.use_doh = !cli.no_doh;
    config.insecure_tls = cli.insecure;

    let output = config.output_path();
    let transfer = Transfer::new(config)?;
    let stats = transfer.stats();
    let cancel = transfer.cancel_token();

    let mut task = tokio::spawn(async move { transfer.run().await });

    let bar = progress::transfer_bar(&output);
    let mut poll = tokio::time::interval(Duration::from_millis(100));

    let result = loop {
        tokio::select! {
            joined = &mut task => break joined?,
            _ = tokio::signal::ctrl_c() => {
                bar.set_message("cancelling...".to_string());
                cancel.cancel();
            }
            _ = poll.tick() => progress::update(&bar, &stats),
        }
    };

    match result {
        Ok(()) => {
            progress::update(&bar, &stats);
            bar.finish_with_message(format!(
                "{} {}",
                style("✓").green().bold(),
                output.display()
            ));
            Ok(())
        }
        Err(err) => {
            bar.abandon_with_message(format!(
                "{} {}",
                style("✗").red().bold(),
                err
            ));
            Err(err.into())
        }
    }
}
