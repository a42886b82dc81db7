pub mod evm;
pub mod solana;

pub use evm::{EvmCall, EvmWireable};
pub use solana::SolanaWireable;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::appconfig::AppConfig;
use crate::error::{AppError, AppResult, WireError};
use crate::keys::SignerRegistry;
use crate::model::{
    deployment::{resolve_reference, sdk_package},
    Chain, ChainFamily, Deployment, Eid, Network, Stage,
};
use crate::providers::ProviderPool;

/// Everything a change builder needs for one run: resolved config,
/// shared RPC handles, signer keys and the deployment records of every
/// network involved.
pub struct WireContext {
    pub stage: Stage,
    pub app_config: AppConfig,
    pub providers: Arc<ProviderPool>,
    pub signers: Arc<SignerRegistry>,
    pub deployments: Vec<Deployment>,
}

impl WireContext {
    pub fn network(&self, chain: Chain) -> Network {
        Network::new(chain, self.stage)
    }
}

/// One reconciliation step: what configuration expects, what the chain
/// currently has, and the prepared call that moves current to expected.
/// Builders emit a change only when the two differ after canonicalization.
#[derive(Debug, Clone)]
pub struct PendingChange {
    pub expected: Value,
    pub current: Value,
    pub method: String,
    pub payload: ChangePayload,
    /// Local chain the call executes on
    pub chain: Chain,
    /// Remote endpoint this change concerns, absent for combined changes
    pub remote: Option<Eid>,
    /// Target the call goes to: contract address or program id
    pub target: String,
    /// Signer alias expected to submit the change
    pub signer: String,
    pub metadata: Value,
}

impl PendingChange {
    pub fn family(&self) -> ChainFamily {
        match self.payload {
            ChangePayload::Evm { .. } => ChainFamily::Evm,
            ChangePayload::Solana { .. } => ChainFamily::Solana,
        }
    }

    pub fn summary(&self) -> String {
        match self.remote {
            Some(eid) => format!("{} -> {} (remote {})", self.method, self.target, eid),
            None => format!("{} -> {}", self.method, self.target),
        }
    }
}

/// Prepared call for one change, in the target family's native form
#[derive(Debug, Clone)]
pub enum ChangePayload {
    Evm {
        to: alloy::primitives::Address,
        call: EvmCall,
    },
    Solana {
        instruction: solana_sdk::instruction::Instruction,
    },
}

/// Wireable trait - implemented by each chain family's change builder
///
/// Builders must be read-only and idempotent: a second run against a chain
/// that already matches configuration returns no changes.
#[async_trait]
pub trait Wireable: Send + Sync {
    /// Compute the changes that bring one local deployment in line with
    /// configuration against every given remote.
    ///
    /// Candidate steps per remote run concurrently and their outputs are
    /// flattened in input order. No ordering is imposed among dependent
    /// steps of one batch; submission order is the caller's concern.
    async fn build_changes(
        &self,
        ctx: &WireContext,
        token: &str,
        local: Network,
        remotes: &[Network],
    ) -> AppResult<Vec<PendingChange>>;

    /// Chain family this builder handles
    fn family(&self) -> ChainFamily;
}

/// WireRouter - routes each local network to its family's change builder
pub struct WireRouter {
    builders: HashMap<ChainFamily, Arc<dyn Wireable>>,
}

impl WireRouter {
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Register a builder for a chain family
    pub fn register_builder(&mut self, family: ChainFamily, builder: Arc<dyn Wireable>) {
        info!("Registering wire builder for family: {:?}", family);
        self.builders.insert(family, builder);
    }

    /// Build the changes for one local network
    #[instrument(skip(self, ctx), fields(token = %token, local = %local))]
    pub async fn build_changes(
        &self,
        ctx: &WireContext,
        token: &str,
        local: Network,
        remotes: &[Network],
    ) -> AppResult<Vec<PendingChange>> {
        let family = local.chain.family();
        let builder = self
            .builders
            .get(&family)
            .ok_or(WireError::UnsupportedChain(local.chain))?;

        if builder.family() != family {
            return Err(WireError::WireableChainMismatch {
                expected: family,
                actual: builder.family(),
            }
            .into());
        }

        builder.build_changes(ctx, token, local, remotes).await
    }

    /// Build changes for several locals concurrently. Each local is wired
    /// against every other network in the list; outputs are flattened in
    /// input order so runs are reproducible.
    pub async fn collect(
        &self,
        ctx: &WireContext,
        token: &str,
        locals: &[Network],
    ) -> AppResult<Vec<PendingChange>> {
        let jobs = locals.iter().map(|local| {
            let remotes: Vec<Network> = locals
                .iter()
                .filter(|n| *n != local)
                .copied()
                .collect();
            async move { self.build_changes(ctx, token, *local, &remotes).await }
        });
        let nested = futures::future::try_join_all(jobs).await?;
        Ok(nested.into_iter().flatten().collect())
    }

    pub fn registered_families(&self) -> Vec<ChainFamily> {
        self.builders.keys().copied().collect()
    }

    pub fn supports_family(&self, family: ChainFamily) -> bool {
        self.builders.contains_key(&family)
    }
}

impl Default for WireRouter {
    fn default() -> Self {
        let mut router = Self::new();
        router.register_builder(ChainFamily::Evm, Arc::new(EvmWireable::new()));
        router.register_builder(ChainFamily::Solana, Arc::new(SolanaWireable::new()));
        router
    }
}

/// Normalize an address string into peer bytes: hex addresses are
/// left-padded to 32 bytes, base58 addresses must already be 32.
pub fn to_bytes32(address: &str) -> AppResult<[u8; 32]> {
    let mut out = [0u8; 32];
    if let Some(stripped) = address.strip_prefix("0x") {
        let raw = hex::decode(stripped).map_err(|e| {
            AppError::Wire(WireError::InvalidAddress {
                address: address.to_string(),
                message: e.to_string(),
            })
        })?;
        if raw.len() > 32 {
            return Err(AppError::Wire(WireError::InvalidAddress {
                address: address.to_string(),
                message: format!("{} bytes does not fit bytes32", raw.len()),
            }));
        }
        out[32 - raw.len()..].copy_from_slice(&raw);
        return Ok(out);
    }
    let raw = bs58::decode(address).into_vec().map_err(|e| {
        AppError::Wire(WireError::InvalidAddress {
            address: address.to_string(),
            message: e.to_string(),
        })
    })?;
    if raw.len() != 32 {
        return Err(AppError::Wire(WireError::InvalidAddress {
            address: address.to_string(),
            message: format!("base58 address must decode to 32 bytes, got {}", raw.len()),
        }));
    }
    out.copy_from_slice(&raw);
    Ok(out)
}

pub fn hex_bytes(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode a config hex blob, with or without the 0x prefix
pub fn decode_hex_blob(raw: &str) -> AppResult<Vec<u8>> {
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(stripped)
        .map_err(|e| AppError::Wire(WireError::InvalidOptions(format!("{}: {}", raw, e))))
}

/// Expected peer bytes for a pair. An empty config value derives a
/// package-qualified reference from the remote chain's deployment.
pub fn expected_peer(
    config: &AppConfig,
    deployments: &[Deployment],
    token: &str,
    local: Network,
    remote: Network,
) -> AppResult<[u8; 32]> {
    let raw = config.peer(local.eid(), remote.eid())?;
    let reference = if raw.is_empty() {
        let remote_info = config.token_info(token, remote.chain)?;
        format!(
            "{}|{}",
            sdk_package(remote.chain.family()),
            remote_info.deploy_name()
        )
    } else {
        raw.clone()
    };
    let address = resolve_reference(&reference, &remote, deployments)?;
    to_bytes32(&address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::deployment::EVM_SDK_PACKAGE;

    #[test]
    fn test_to_bytes32_pads_evm_addresses() {
        let bytes = to_bytes32("0x0b2c639c533813f4aa9d7837caf62653d097ff85").unwrap();
        assert_eq!(&bytes[..12], &[0u8; 12]);
        assert_eq!(
            hex::encode(&bytes[12..]),
            "0b2c639c533813f4aa9d7837caf62653d097ff85"
        );
    }

    #[test]
    fn test_to_bytes32_base58_passthrough() {
        let key = solana_sdk::pubkey::Pubkey::new_unique();
        let bytes = to_bytes32(&key.to_string()).unwrap();
        assert_eq!(bytes, key.to_bytes());
    }

    #[test]
    fn test_to_bytes32_rejects_oversize() {
        let long = format!("0x{}", "11".repeat(33));
        assert!(to_bytes32(&long).is_err());
        assert!(to_bytes32("not-an-address!!").is_err());
    }

    #[test]
    fn test_decode_hex_blob_accepts_both_prefixes() {
        assert_eq!(decode_hex_blob("0x0003").unwrap(), vec![0, 3]);
        assert_eq!(decode_hex_blob("0003").unwrap(), vec![0, 3]);
        assert!(decode_hex_blob("0xzz").is_err());
    }

    #[test]
    fn test_expected_peer_derives_reference_for_empty_config() {
        use crate::model::{Chain, Stage};

        let config = AppConfig::from_json(
            r#"{
                "token": {
                    "Rocket": { "decimal": 18, "types": { "default": "OFT" } }
                },
                "peer": { "default": { "default": "" } }
            }"#,
        )
        .unwrap();
        let local = Network::new(Chain::Ethereum, Stage::Mainnet);
        let remote = Network::new(Chain::Bsc, Stage::Mainnet);
        let deployments = vec![Deployment {
            name: "RocketOFT".to_string(),
            address: "0x0b2c639c533813f4aa9d7837caf62653d097ff85".to_string(),
            network: remote,
            source: Some(EVM_SDK_PACKAGE.to_string()),
            compatible_versions: vec![],
            abi: None,
            bytecode: None,
        }];

        let bytes = expected_peer(&config, &deployments, "Rocket", local, remote).unwrap();
        assert_eq!(
            hex_bytes(&bytes),
            "0x0000000000000000000000000b2c639c533813f4aa9d7837caf62653d097ff85"
        );
    }

    #[test]
    fn test_expected_peer_honors_explicit_config() {
        use crate::model::{Chain, Stage};

        let key = solana_sdk::pubkey::Pubkey::new_unique();
        let config = AppConfig::from_json(&format!(
            r#"{{
                "token": {{
                    "Rocket": {{ "decimal": 18, "types": {{ "default": "OFT" }} }}
                }},
                "peer": {{ "30101": {{ "30168": "{}" }} }}
            }}"#,
            key
        ))
        .unwrap();
        let local = Network::new(Chain::Ethereum, Stage::Mainnet);
        let remote = Network::new(Chain::Solana, Stage::Mainnet);

        let bytes = expected_peer(&config, &[], "Rocket", local, remote).unwrap();
        assert_eq!(bytes, key.to_bytes());
    }
}
