//! Carmine demo server - serves `RemoteTest` over HTTP and, optionally, raw TCP.

use anyhow::Result;
use carmine_core::{start_http_server, Dispatcher, ServerConfig, TcpServer};
use carmine_demo::ConventionResolver;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "carmine-server")]
#[command(about = "Demo server answering Carmine remote invocations")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = ServerConfig::DEFAULT_HOST)]
    host: String,

    /// Path accepting invocation requests
    #[arg(long, default_value = ServerConfig::DEFAULT_INVOKE_PATH)]
    path: String,

    /// Also accept raw TCP invocations on this port
    #[arg(long)]
    tcp_port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting Carmine demo server");

    let dispatcher = Dispatcher::new(ConventionResolver::demo());

    let mut http = start_http_server(dispatcher.clone(), &args.host, args.port, &args.path).await?;
    info!("Invocation endpoint: {}", http.endpoint(&args.path));

    let tcp = match args.tcp_port {
        Some(port) => {
            let handle = TcpServer::start(dispatcher, (args.host.as_str(), port)).await?;
            info!("Invocation endpoint: {}", handle.endpoint());
            Some(handle)
        }
        None => None,
    };

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    drop(tcp);
    http.shutdown();
    http.join().await;

    Ok(())
}
