use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use alloy::network::EthereumWallet;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::CommitmentConfig;
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult, WireError};
use crate::model::{Chain, ChainFamily, Network, Stage};

/// Default public endpoint for a network. Sandbox maps to local nodes with
/// one port per EVM chain.
pub fn default_rpc_url(network: &Network) -> Option<String> {
    let url = match (network.chain, network.stage) {
        (Chain::Ethereum, Stage::Mainnet) => "https://eth.llamarpc.com".to_string(),
        (Chain::Bsc, Stage::Mainnet) => "https://bsc-dataseed.binance.org".to_string(),
        (Chain::Polygon, Stage::Mainnet) => "https://polygon-rpc.com".to_string(),
        (Chain::Arbitrum, Stage::Mainnet) => "https://arb1.arbitrum.io/rpc".to_string(),
        (Chain::Metis, Stage::Mainnet) => "https://andromeda.metis.io/?owner=1088".to_string(),
        (Chain::Solana, Stage::Mainnet) => "https://api.mainnet-beta.solana.com".to_string(),
        (Chain::Ethereum, Stage::Testnet) => {
            "https://ethereum-sepolia-rpc.publicnode.com".to_string()
        }
        (Chain::Bsc, Stage::Testnet) => {
            "https://data-seed-prebsc-1-s1.binance.org:8545".to_string()
        }
        (Chain::Polygon, Stage::Testnet) => "https://rpc-amoy.polygon.technology".to_string(),
        (Chain::Arbitrum, Stage::Testnet) => {
            "https://sepolia-rollup.arbitrum.io/rpc".to_string()
        }
        (Chain::Metis, Stage::Testnet) => "https://sepolia.metisdevops.link".to_string(),
        (Chain::Solana, Stage::Testnet) => "https://api.devnet.solana.com".to_string(),
        (Chain::Solana, Stage::Sandbox) => "http://127.0.0.1:8899".to_string(),
        (chain, Stage::Sandbox) => {
            format!("http://127.0.0.1:{}", 8444 + chain.eid_offset())
        }
    };
    Some(url)
}

/// RPC handles per network, built lazily and shared. EVM chains hand out
/// type-erased alloy providers, Solana a nonblocking client.
pub struct ProviderPool {
    stage: Stage,
    overrides: BTreeMap<String, String>,
    commitment: CommitmentConfig,
    confirmation_timeout: Duration,
    evm: Mutex<HashMap<Chain, DynProvider>>,
    solana: Mutex<HashMap<Chain, Arc<RpcClient>>>,
}

impl ProviderPool {
    pub fn new(stage: Stage) -> Self {
        Self::with_overrides(stage, BTreeMap::new())
    }

    /// Overrides are keyed by network string, e.g. "ethereum-mainnet"
    pub fn with_overrides(stage: Stage, overrides: BTreeMap<String, String>) -> Self {
        Self {
            stage,
            overrides,
            commitment: CommitmentConfig::confirmed(),
            confirmation_timeout: Duration::from_secs(60),
            evm: Mutex::new(HashMap::new()),
            solana: Mutex::new(HashMap::new()),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn commitment(&self) -> CommitmentConfig {
        self.commitment
    }

    pub fn confirmation_timeout(&self) -> Duration {
        self.confirmation_timeout
    }

    pub fn rpc_url(&self, chain: Chain) -> AppResult<String> {
        let network = Network::new(chain, self.stage);
        if let Some(url) = self.overrides.get(&network.to_string()) {
            return Ok(url.clone());
        }
        default_rpc_url(&network)
            .ok_or_else(|| AppError::Wire(WireError::UnsupportedChain(chain)))
    }

    /// Read-only provider for an EVM chain, cached per chain
    pub async fn evm(&self, chain: Chain) -> AppResult<DynProvider> {
        if chain.family() != ChainFamily::Evm {
            return Err(AppError::Wire(WireError::UnsupportedChain(chain)));
        }
        let mut cache = self.evm.lock().await;
        if let Some(provider) = cache.get(&chain) {
            return Ok(provider.clone());
        }
        let url = self.rpc_url(chain)?;
        let provider = ProviderBuilder::new()
            .connect(&url)
            .await
            .map_err(|e| {
                AppError::Wire(WireError::ChainReadFailed {
                    chain,
                    message: format!("provider connect failed: {}", e),
                })
            })?
            .erased();
        cache.insert(chain, provider.clone());
        Ok(provider)
    }

    /// Wallet-filled provider for sending. Not cached: the wallet is bound
    /// to one signer.
    pub async fn evm_with_wallet(
        &self,
        chain: Chain,
        signer: PrivateKeySigner,
    ) -> AppResult<DynProvider> {
        if chain.family() != ChainFamily::Evm {
            return Err(AppError::Wire(WireError::UnsupportedChain(chain)));
        }
        let url = self.rpc_url(chain)?;
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .with_cached_nonce_management()
            .connect(&url)
            .await
            .map_err(|e| {
                AppError::Wire(WireError::ChainReadFailed {
                    chain,
                    message: format!("provider connect failed: {}", e),
                })
            })?
            .erased();
        Ok(provider)
    }

    /// Nonblocking Solana client, cached
    pub async fn solana(&self, chain: Chain) -> AppResult<Arc<RpcClient>> {
        if chain.family() != ChainFamily::Solana {
            return Err(AppError::Wire(WireError::UnsupportedChain(chain)));
        }
        let mut cache = self.solana.lock().await;
        if let Some(client) = cache.get(&chain) {
            return Ok(client.clone());
        }
        let url = self.rpc_url(chain)?;
        let client = Arc::new(RpcClient::new_with_commitment(url, self.commitment));
        cache.insert(chain, client.clone());
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_beats_default() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "ethereum-mainnet".to_string(),
            "http://localhost:9000".to_string(),
        );
        let pool = ProviderPool::with_overrides(Stage::Mainnet, overrides);
        assert_eq!(pool.rpc_url(Chain::Ethereum).unwrap(), "http://localhost:9000");
        assert_eq!(
            pool.rpc_url(Chain::Bsc).unwrap(),
            "https://bsc-dataseed.binance.org"
        );
    }

    #[test]
    fn test_sandbox_ports_are_distinct_per_chain() {
        let pool = ProviderPool::new(Stage::Sandbox);
        let urls: Vec<String> = Chain::all()
            .into_iter()
            .map(|c| pool.rpc_url(c).unwrap())
            .collect();
        let mut deduped = urls.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(urls.len(), deduped.len());
        assert_eq!(pool.rpc_url(Chain::Ethereum).unwrap(), "http://127.0.0.1:8545");
        assert_eq!(pool.rpc_url(Chain::Solana).unwrap(), "http://127.0.0.1:8899");
    }

    #[tokio::test]
    async fn test_family_mismatch_is_rejected() {
        let pool = ProviderPool::new(Stage::Sandbox);
        assert!(pool.evm(Chain::Solana).await.is_err());
        assert!(pool.solana(Chain::Ethereum).await.is_err());
    }
}
