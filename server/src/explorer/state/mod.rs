use std::sync::Arc;

use async_trait::async_trait;
use color_eyre::Result;
use eth_primitive_types::U256;
use ethql_primitives::{AccountInfo, EvmAddress};
use tracing::instrument;

use super::config::StateConfig;

mod genesis;
mod rpc;

pub use genesis::GenesisState;
pub use rpc::RpcState;

/// Read access to account state.
///
/// Sources only have to answer `account_info`; the per-field methods exist so
/// a source that fetches fields separately (like a JSON-RPC node) does not
/// have to load the whole account for every field.
#[async_trait]
pub trait AccountState: Send + Sync {
    async fn account_info(&self, address: EvmAddress) -> Result<AccountInfo>;

    async fn code(&self, address: EvmAddress) -> Result<Vec<u8>> {
        Ok(self.account_info(address).await?.code)
    }

    async fn transaction_count(&self, address: EvmAddress) -> Result<u64> {
        Ok(self.account_info(address).await?.nonce)
    }

    async fn balance(&self, address: EvmAddress) -> Result<U256> {
        Ok(self.account_info(address).await?.balance)
    }
}

pub type StateSource = Arc<dyn AccountState>;

#[instrument]
pub async fn connect(config: StateConfig) -> Result<StateSource> {
    Ok(match config {
        StateConfig::Genesis { path: Some(path) } => Arc::new(GenesisState::from_file(&path).await?),
        StateConfig::Genesis { path: None } => Arc::new(GenesisState::default()),
        StateConfig::Rpc { url, block } => Arc::new(RpcState::new(&url, block)?),
    })
}
