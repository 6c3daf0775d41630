//! Command-line arguments.

use clap::{Parser, ValueEnum};
use turbosse::{StreamConfig, StreamResult};

/// Read a Server-Sent Events stream and print every event payload
#[derive(Parser, Debug)]
#[command(
    name = "turbosse-demo",
    version,
    about = "Read a Server-Sent Events stream and print every event payload",
    long_about = "Connects to an SSE endpoint with HTTP basic credentials and prints each\n\
                  event payload on its own line. Dropped connections are re-established\n\
                  immediately. Press Ctrl-C to stop.\n\n\
                  Credentials passed on the command line may be visible to other users;\n\
                  prefer SSE_USERNAME and SSE_PASSWORD."
)]
pub struct Cli {
    /// Event stream URL
    #[arg(long, env = "SSE_URL")]
    pub url: String,

    /// Basic auth username
    #[arg(long, short = 'u', env = "SSE_USERNAME")]
    pub username: String,

    /// Basic auth password
    #[arg(long, short = 'p', env = "SSE_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Extra request header as `Name: value` (repeatable; comma-separated in the env var)
    #[arg(
        long = "header",
        short = 'H',
        env = "SSE_HEADERS",
        value_delimiter = ',',
        value_parser = parse_header
    )]
    pub headers: Vec<(String, String)>,

    /// Seconds of silence after which the stream is reported as idle
    #[arg(long, env = "SSE_STREAM_END_TIME")]
    pub stream_end_time: Option<u64>,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    pub run_for: Option<u64>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// How log lines are written to stderr.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable
    Pretty,
    /// One JSON object per line
    Json,
}

impl Cli {
    /// Build the stream configuration from the parsed arguments.
    pub fn stream_config(&self) -> StreamResult<StreamConfig> {
        let mut builder = StreamConfig::builder()
            .url(&self.url)
            .username(&self.username)
            .password(&self.password)
            .headers(self.headers.iter().cloned());
        if let Some(secs) = self.stream_end_time {
            builder = builder.stream_end_time(secs);
        }
        builder.build()
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in `{raw}`"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
