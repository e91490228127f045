use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use color_eyre::{
    eyre::{eyre, Context},
    Result,
};
use eth_primitive_types::U256;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use ethql_primitives::{decode_hex, parse_quantity, AccountInfo, EvmAddress};

use super::AccountState;

/// Immutable in-memory account state, usually loaded from a genesis file.
/// Addresses that are not part of the allocation are empty accounts.
#[derive(Clone, Debug, Default)]
pub struct GenesisState {
    accounts: HashMap<EvmAddress, AccountInfo>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GenesisDocument {
    Genesis {
        alloc: HashMap<String, GenesisAccount>,
    },
    Alloc(HashMap<String, GenesisAccount>),
}

#[derive(Deserialize, Default)]
struct GenesisAccount {
    #[serde(default)]
    balance: Option<Quantity>,
    #[serde(default)]
    nonce: Option<Quantity>,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Quantity {
    Text(String),
    Number(u64),
}

impl Quantity {
    fn to_u256(&self) -> Result<U256> {
        match self {
            Quantity::Text(text) => Ok(parse_quantity(text)?),
            Quantity::Number(number) => Ok(U256::from(*number)),
        }
    }
}

impl GenesisState {
    pub fn with_account(mut self, address: EvmAddress, account: AccountInfo) -> Self {
        self.accounts.insert(address, account);
        self
    }

    fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Reads either a full geth genesis document or a bare `alloc` map.
    pub fn from_json(json: &str) -> Result<Self> {
        let alloc = match serde_json::from_str(json).context("can't parse genesis")? {
            GenesisDocument::Genesis { alloc } => alloc,
            GenesisDocument::Alloc(alloc) => alloc,
        };

        let mut accounts = HashMap::with_capacity(alloc.len());
        for (address, account) in alloc {
            let address = EvmAddress::parse_lenient(&address)
                .with_context(|| format!("invalid genesis address {:?}", address))?;
            let account = account
                .into_account_info()
                .with_context(|| format!("invalid genesis account {}", address))?;

            accounts.insert(address, account);
        }

        Ok(Self { accounts })
    }

    #[instrument]
    pub async fn from_file(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("can't read genesis file {}", path.display()))?;

        let state = Self::from_json(&json)?;
        info!(accounts = state.len(), "genesis loaded");

        Ok(state)
    }
}

impl GenesisAccount {
    fn into_account_info(self) -> Result<AccountInfo> {
        let nonce: u64 = match self.nonce {
            Some(nonce) => nonce
                .to_u256()?
                .try_into()
                .map_err(|_| eyre!("nonce out of range"))?,
            None => 0,
        };

        Ok(AccountInfo {
            balance: self
                .balance
                .map(|balance| balance.to_u256())
                .transpose()?
                .unwrap_or_default(),
            nonce,
            code: self
                .code
                .map(|code| decode_hex(&code))
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

#[async_trait]
impl AccountState for GenesisState {
    #[instrument(skip(self))]
    async fn account_info(&self, address: EvmAddress) -> Result<AccountInfo> {
        let account = self.accounts.get(&address).cloned();
        debug!(known = account.is_some(), "account lookup");

        Ok(account.unwrap_or_default())
    }
}
