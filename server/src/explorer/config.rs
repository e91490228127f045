use std::{net::SocketAddr, path::PathBuf};

use color_eyre::{eyre::eyre, Result};
use ethers::types::{BlockNumber, U64};
use ethql_primitives::parse_quantity;

#[derive(Clone, Debug)]
pub enum StateConfig {
    /// Serve accounts from a genesis allocation.
    /// If no path is set, every account is empty.
    Genesis { path: Option<PathBuf> },
    /// Forward account reads to an Ethereum node.
    Rpc { url: String, block: BlockNumber },
}

#[derive(Clone, Debug)]
pub struct GraphqlConfig {
    /// Address to bind the GraphQL server to.
    pub bind_address: SocketAddr,
    /// Query depth limit.
    pub depth_limit: usize,
    /// Query complexity limit.
    pub complexity_limit: usize,
    /// Maximum number of addresses in a single `accounts` query.
    pub max_batch: usize,
}

impl Default for GraphqlConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 4000)),
            depth_limit: 100,
            complexity_limit: 1000,
            max_batch: 32,
        }
    }
}

pub struct ExplorerConfig {
    pub state: StateConfig,
    pub graphql: GraphqlConfig,
}

/// Parses a block tag (`latest`, `pending`, `earliest`, `safe`, `finalized`)
/// or a block number in hex or decimal.
pub fn parse_block(s: &str) -> Result<BlockNumber> {
    let s = s.trim().to_lowercase();
    if let Ok(block) = s.parse::<BlockNumber>() {
        return Ok(block);
    }

    // older ethers releases only take hex numbers
    let number = parse_quantity(&s)?;
    let number: u64 = number
        .try_into()
        .map_err(|_| eyre!("block number {} out of range", number))?;
    Ok(BlockNumber::Number(U64::from(number)))
}
