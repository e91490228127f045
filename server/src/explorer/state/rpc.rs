use async_trait::async_trait;
use color_eyre::{
    eyre::{eyre, Context},
    Result,
};
use eth_primitive_types::{H160, U256};
use ethers::{
    providers::{Http, Middleware, Provider},
    types::{BlockId, BlockNumber},
};
use tracing::{debug, instrument};

use ethql_primitives::{AccountInfo, EvmAddress};

use super::AccountState;

/// Account state read from an Ethereum node over JSON-RPC.
#[derive(Clone, Debug)]
pub struct RpcState {
    provider: Provider<Http>,
    block: BlockNumber,
}

impl RpcState {
    pub fn new(url: &str, block: BlockNumber) -> Result<Self> {
        let provider = Provider::<Http>::try_from(url)
            .with_context(|| format!("invalid rpc url {:?}", url))?;

        Ok(Self { provider, block })
    }

    fn block_id(&self) -> Option<BlockId> {
        Some(self.block.into())
    }
}

#[async_trait]
impl AccountState for RpcState {
    #[instrument(skip(self))]
    async fn account_info(&self, address: EvmAddress) -> Result<AccountInfo> {
        let (balance, nonce, code) = tokio::try_join!(
            self.balance(address),
            self.transaction_count(address),
            self.code(address),
        )?;

        Ok(AccountInfo {
            balance,
            nonce,
            code,
        })
    }

    #[instrument(skip(self))]
    async fn code(&self, address: EvmAddress) -> Result<Vec<u8>> {
        let code = self
            .provider
            .get_code(H160::from(address), self.block_id())
            .await
            .context("eth_getCode failed")?;
        debug!(len = code.len(), "code fetched");

        Ok(code.to_vec())
    }

    #[instrument(skip(self))]
    async fn transaction_count(&self, address: EvmAddress) -> Result<u64> {
        let count = self
            .provider
            .get_transaction_count(H160::from(address), self.block_id())
            .await
            .context("eth_getTransactionCount failed")?;

        count
            .try_into()
            .map_err(|_| eyre!("transaction count {} out of range", count))
    }

    #[instrument(skip(self))]
    async fn balance(&self, address: EvmAddress) -> Result<U256> {
        self.provider
            .get_balance(H160::from(address), self.block_id())
            .await
            .context("eth_getBalance failed")
    }
}
