//! Carmine demo client - asks for a name and has the remote side greet it.

use anyhow::{Context as _, Result};
use carmine_core::{Session, TransportOptions};
use carmine_demo::{RemoteTest, RemoteTestStub};
use clap::Parser;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "carmine-client")]
#[command(about = "Interactive client for the Carmine demo server")]
struct Args {
    /// Remote endpoint (http://, https:// or tcp://)
    #[arg(short, long, default_value = "http://127.0.0.1:8080/carmine")]
    endpoint: String,

    /// Name to send instead of prompting for one
    #[arg(short, long)]
    name: Option<String>,

    /// Give up on the call after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Give up connecting after this many seconds
    #[arg(long)]
    connect_timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

async fn prompt_name() -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"Type your name: ").await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read name from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::WARN };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let mut options = TransportOptions::default();
    if let Some(secs) = args.connect_timeout {
        options = options.with_connect_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = args.timeout {
        options = options.with_request_timeout(Duration::from_secs(secs));
    }
    let session = Session::builder(args.endpoint.as_str())
        .options(options)
        .build()?;
    debug!("Session created for {}", session.endpoint());

    let name = match args.name {
        Some(name) => name,
        None => prompt_name().await?,
    };

    let remote_test: RemoteTestStub = session.remote();
    let greeting = remote_test
        .get_greetings(name)
        .await
        .with_context(|| format!("Remote call to {} failed", session.endpoint()))?;
    println!("{}", greeting);

    Ok(())
}
