use anyhow::Context;
use clap::Parser;
use edgepix::config::Config;
use edgepix::engine::ImageEngine;
use edgepix::error::ProxyError;
use edgepix::fetch::HttpFetcher;
use edgepix::metrics::Metrics;
use edgepix::proxy::{EdgepixService, ImageProxy};
use pingora_core::server::configuration::Opt;
use pingora_core::server::Server;
use std::path::PathBuf;
use std::sync::Arc;

/// Edgepix - on-the-fly image transformation proxy built on Cloudflare's Pingora
#[derive(Parser, Debug)]
#[command(name = "edgepix")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Daemon mode
    #[arg(short = 'd', long)]
    daemon: bool,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,

    /// Upgrade workers gracefully
    #[arg(long)]
    upgrade: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("edgepix: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    // Configuration is an immutable snapshot for the life of the process
    let config = Config::load(args.config.as_ref()).map_err(ProxyError::Config)?;

    edgepix::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging subsystem: {}", e))?;

    tracing::info!(
        config_file = ?args.config,
        server_address = %config.server.address,
        server_port = config.server.port,
        allow_list = ?config.access.allow_list,
        limits = ?config.limits,
        "Configuration loaded successfully"
    );

    let engine = ImageEngine::with_limits(config.limits);
    let operations = engine.verify_capabilities().map_err(ProxyError::from)?;

    let fetcher = HttpFetcher::new(&config.fetch)
        .map_err(|e| ProxyError::Server(e.to_string()))
        .context("Failed to create HTTP fetcher")?;

    let config = Arc::new(config);
    let proxy = ImageProxy::new(
        Arc::clone(&config),
        Arc::new(engine),
        Arc::new(fetcher),
        Arc::new(Metrics::new()),
    );

    let opt = Opt {
        daemon: args.daemon,
        test: args.test,
        upgrade: args.upgrade,
        ..Default::default()
    };

    let mut server = Server::new(Some(opt)).map_err(|e| ProxyError::Server(e.to_string()))?;
    server.bootstrap();

    let mut proxy_service = pingora_proxy::http_proxy_service(
        &server.configuration,
        EdgepixService::new(Arc::new(proxy)),
    );
    proxy_service.threads = Some(config.server.threads);

    let listen_addr = config.server.listen_addr();
    proxy_service.add_tcp(&listen_addr);

    tracing::info!(
        address = %listen_addr,
        threads = config.server.threads,
        operations = operations,
        "Starting Edgepix image proxy"
    );

    server.add_service(proxy_service);
    server.run_forever();
}
