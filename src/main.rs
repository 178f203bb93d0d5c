//! v2 Compatibility Gateway
//!
//! Serves the legacy form-encoded v2 host query endpoints and answers them
//! through the structured v3 services.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use v2_compat_gateway::{init_logging_with_config, start_server, GatewayConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Legacy v2 API gateway over the v3 services")]
struct Args {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short = 'c', long, env = "V2GW_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the configuration file)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Base URL of the v3 services (overrides the configuration file)
    #[arg(long)]
    upstream_url: Option<String>,

    /// Enable verbose logging (DEBUG level)
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn into_config(self) -> Result<GatewayConfig> {
        let mut config = GatewayConfig::load(self.config.as_deref())?;
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = self.upstream_url {
            config.upstream.base_url = url;
        }
        config.logging.verbose |= self.verbose;
        config.logging.quiet |= self.quiet;
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config()?;

    init_logging_with_config(&config.logging)?;

    info!("Starting v2 compatibility gateway");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Upstream: {}", config.upstream.base_url);
    info!("Port: {}", config.server.port);

    start_server(&config).await
}
