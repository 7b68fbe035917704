//! # Glory-Hole DNS Server
//!
//! Filtering, recursive-forwarding DNS server for home and small-office
//! networks: blocklists, expression policies, conditional forwarding, a
//! sharded response cache and an auditable query log.

mod bootstrap;
mod di;
mod server;

use clap::Parser;
use gloryhole_domain::config::CliOverrides;
use gloryhole_infrastructure::dns::DnsServerHandler;
use std::path::PathBuf;
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "gloryhole")]
#[command(version, about = "Filtering recursive-forwarding DNS server")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:53 (overrides the config file)
    #[arg(short, long)]
    listen: Option<String>,

    /// Query log database URL (overrides the config file)
    #[arg(long)]
    database: Option<String>,

    /// Log level filter, e.g. info or gloryhole=debug
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let overrides = CliOverrides {
        config: cli.config,
        listen: cli.listen,
        database: cli.database,
        log_level: cli.log_level,
    };

    bootstrap::logging::init(overrides.log_level.as_deref());
    let config = bootstrap::config::load(&overrides)?;

    info!(listen = %config.server.listen_address, "Glory-Hole starting");

    let ctx = di::AppContext::build(&config).await?;
    ctx.start_jobs(&config).await;

    let handler = DnsServerHandler::new(ctx.handler.clone());
    let server = tokio::spawn(server::dns::start_dns_server(
        config.server.clone(),
        handler,
        ctx.shutdown.clone(),
    ));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    ctx.shutdown.cancel();

    // Let the listener drain and the log writer flush.
    server.await??;
    info!("Glory-Hole stopped");
    Ok(())
}
