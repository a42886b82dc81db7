use std::collections::BTreeMap;

use crate::error::{AppError, AppResult};
use crate::model::{Network, Stage};

/// Process-level settings, read from the environment. File-backed inputs
/// (token config, deployments, signers) are referenced by path here and
/// loaded during bootstrap.
#[derive(Debug, Clone)]
pub struct Settings {
    pub stage: String,
    pub token: String,
    pub chains: String,
    pub app_config_path: String,
    pub deployments_path: String,
    pub signers_path: Option<String>,
    pub mnemonic: String,
    pub rpc_urls: String,
    pub dry_run: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let dry_run = std::env::var("DRY_RUN")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Ok(Self {
            stage: std::env::var("STAGE").unwrap_or_else(|_| "sandbox".to_string()),
            token: std::env::var("OFT_TOKEN").unwrap_or_else(|_| "Rocket".to_string()),
            chains: std::env::var("CHAINS")
                .unwrap_or_else(|_| "ethereum,bsc,solana".to_string()),
            app_config_path: std::env::var("APP_CONFIG_PATH")
                .unwrap_or_else(|_| "config/oft.json".to_string()),
            deployments_path: std::env::var("DEPLOYMENTS_PATH")
                .unwrap_or_else(|_| "config/deployments.json".to_string()),
            signers_path: std::env::var("SIGNERS_PATH").ok(),
            mnemonic: std::env::var("MNEMONIC").unwrap_or_else(|_| {
                "test test test test test test test test test test test junk".to_string()
            }),
            rpc_urls: std::env::var("RPC_URLS").unwrap_or_default(),
            dry_run,
        })
    }

    pub fn parse_stage(&self) -> AppResult<Stage> {
        self.stage.parse()
    }

    /// Networks to wire, from the comma-separated chain list
    pub fn networks(&self) -> AppResult<Vec<Network>> {
        let stage = self.parse_stage()?;
        self.chains
            .split(',')
            .map(|raw| raw.trim())
            .filter(|raw| !raw.is_empty())
            .map(|raw| Ok(Network::new(raw.parse()?, stage)))
            .collect()
    }

    /// RPC overrides from "network=url" pairs, e.g.
    /// "ethereum-mainnet=http://localhost:8545,solana-mainnet=http://localhost:8899"
    pub fn rpc_overrides(&self) -> AppResult<BTreeMap<String, String>> {
        let mut overrides = BTreeMap::new();
        for entry in self.rpc_urls.split(',').filter(|e| !e.trim().is_empty()) {
            let (network, url) = entry.split_once('=').ok_or_else(|| {
                AppError::InvalidInput(format!("invalid rpc override: {}", entry))
            })?;
            let network: Network = network.trim().parse()?;
            overrides.insert(network.to_string(), url.trim().to_string());
        }
        Ok(overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Chain;

    fn settings() -> Settings {
        Settings {
            stage: "mainnet".to_string(),
            token: "Rocket".to_string(),
            chains: "ethereum, bsc ,solana".to_string(),
            app_config_path: "config/oft.json".to_string(),
            deployments_path: "config/deployments.json".to_string(),
            signers_path: None,
            mnemonic: "test test test test test test test test test test test junk"
                .to_string(),
            rpc_urls: String::new(),
            dry_run: false,
        }
    }

    #[test]
    fn test_networks_split_and_trim() {
        let networks = settings().networks().unwrap();
        assert_eq!(networks.len(), 3);
        assert_eq!(networks[0], Network::new(Chain::Ethereum, Stage::Mainnet));
        assert_eq!(networks[2], Network::new(Chain::Solana, Stage::Mainnet));
    }

    #[test]
    fn test_unknown_chain_is_rejected() {
        let mut s = settings();
        s.chains = "ethereum,mars".to_string();
        assert!(s.networks().is_err());
    }

    #[test]
    fn test_rpc_overrides_parse_pairs() {
        let mut s = settings();
        s.rpc_urls =
            "ethereum-mainnet=http://localhost:8545, solana-mainnet=http://localhost:8899"
                .to_string();
        let overrides = s.rpc_overrides().unwrap();
        assert_eq!(
            overrides.get("ethereum-mainnet").map(String::as_str),
            Some("http://localhost:8545")
        );
        assert_eq!(
            overrides.get("solana-mainnet").map(String::as_str),
            Some("http://localhost:8899")
        );
    }

    #[test]
    fn test_malformed_override_is_rejected() {
        let mut s = settings();
        s.rpc_urls = "ethereum-mainnet".to_string();
        assert!(s.rpc_overrides().is_err());
    }
}
