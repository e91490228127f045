pub mod config;
pub mod graphql;
pub mod state;

use color_eyre::Result;
use tokio::task::JoinHandle;

pub async fn start(config: config::ExplorerConfig) -> Result<JoinHandle<Result<()>>> {
    let state = state::connect(config.state).await?;

    let graphql_config = config.graphql;
    let graphql_server = graphql::start(graphql_config, state).await?;

    Ok(graphql_server)
}
