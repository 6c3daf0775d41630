//! TurboSSE demo: print every event payload from an SSE endpoint.
//!
//! ```text
//! SSE_USERNAME=reader SSE_PASSWORD=secret \
//!     turbosse-demo --url http://localhost:8080/events -H "X-Tenant: blue"
//! ```

mod cli;
mod logging;

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use turbosse::{HandlerError, SseClient};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format)?;

    let config = cli.stream_config().context("invalid stream configuration")?;
    let client = SseClient::new(config, |payload: String| -> Result<(), HandlerError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{payload}")?;
        stdout.flush()?;
        Ok(())
    });

    client.start();

    match cli.run_for {
        Some(secs) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Interrupted"),
                () = tokio::time::sleep(Duration::from_secs(secs)) => {
                    info!(secs, "Run time elapsed");
                }
            }
        }
        None => {
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            info!("Interrupted");
        }
    }

    client.shutdown();
    client.join().await;

    let stats = serde_json::to_string_pretty(&client.stats())?;
    eprintln!("{stats}");
    Ok(())
}
