use std::path::PathBuf;

use color_eyre::{
    eyre::{eyre, Report},
    Result,
};
use ethql_server::explorer::{
    self,
    config::{parse_block, ExplorerConfig, GraphqlConfig, StateConfig},
};
use tracing::info;

pub fn install_tracing() -> Result<()> {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{
        fmt::{self},
        prelude::*,
        EnvFilter,
    };

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned());
    let main_layer = fmt::layer()
        .event_format(fmt::format().with_ansi(true))
        .with_filter(EnvFilter::from(filter));
    tracing_subscriber::registry()
        .with(main_layer)
        .with(ErrorLayer::default())
        .init();
    color_eyre::install()
}

use clap::Parser;
use tokio::task::JoinError;

/// Start the EthQL account explorer
#[derive(Parser, Debug)]
#[command()]
struct NodeOptions {
    #[arg(short, long, default_value_t = 4000)]
    port: u16,

    /// Ethereum JSON-RPC endpoint to read accounts from
    #[arg(long, conflicts_with = "genesis")]
    rpc_url: Option<String>,

    /// Block tag or number used for JSON-RPC reads
    #[arg(long, default_value = "latest", requires = "rpc_url")]
    block: String,

    /// Genesis file to serve accounts from
    #[arg(short, long)]
    genesis: Option<PathBuf>,

    #[arg(long, default_value_t = 100)]
    depth_limit: usize,

    #[arg(long, default_value_t = 1000)]
    complexity_limit: usize,

    #[arg(long, default_value_t = 32)]
    max_batch: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_tracing()?;

    let NodeOptions {
        port,
        rpc_url,
        block,
        genesis,
        depth_limit,
        complexity_limit,
        max_batch,
    } = NodeOptions::parse();

    let state = match rpc_url {
        Some(url) => StateConfig::Rpc {
            url,
            block: parse_block(&block)?,
        },
        None => StateConfig::Genesis { path: genesis },
    };

    let explorer_config = ExplorerConfig {
        state,
        graphql: GraphqlConfig {
            bind_address: format!("0.0.0.0:{}", port).parse()?,
            depth_limit,
            complexity_limit,
            max_batch,
        },
    };

    let graphql_handle = explorer::start(explorer_config).await?;

    let err = tokio::select! {
        r = graphql_handle => service_stopped("graphql", r),
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            return Ok(());
        }
    };

    Err(err)
}

fn service_stopped(name: &str, result: std::result::Result<Result<()>, JoinError>) -> Report {
    match result {
        Ok(Ok(_)) => eyre!(format!("{} stopped", name)),
        Ok(Err(e)) => e,
        Err(e) => eyre!(Box::new(e)),
    }
}
