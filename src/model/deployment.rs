use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, WireError};
use crate::model::{ChainFamily, Network};

/// Artifact packages that deployment references may be qualified with
pub const EVM_SDK_PACKAGE: &str = "@layerzerolabs/oft-evm-sdk";
pub const SOLANA_SDK_PACKAGE: &str = "@layerzerolabs/oft-solana-sdk";

/// Package alias for a chain family, used when deriving peer references
pub fn sdk_package(family: ChainFamily) -> &'static str {
    match family {
        ChainFamily::Evm => EVM_SDK_PACKAGE,
        ChainFamily::Solana => SOLANA_SDK_PACKAGE,
    }
}

/// One deployed artifact on one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub name: String,
    pub address: String,
    pub network: Network,
    /// Package the artifact came from, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compatible_versions: Vec<String>,
    /// Carried through from EVM artifact files; never interpreted here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytecode: Option<String>,
}

/// Read-only lookup of deployment records. Calling twice with the same
/// networks returns the same records.
#[async_trait]
pub trait DeploymentRegistry: Send + Sync {
    async fn get_deployments(&self, networks: &[Network]) -> AppResult<Vec<Deployment>>;
}

/// In-memory registry backed by a fixed record list
#[derive(Debug, Clone, Default)]
pub struct StaticDeployments {
    records: Vec<Deployment>,
}

impl StaticDeployments {
    pub fn new(records: Vec<Deployment>) -> Self {
        Self { records }
    }

    pub fn from_json(raw: &str) -> AppResult<Self> {
        let records: Vec<Deployment> = serde_json::from_str(raw)
            .map_err(|e| AppError::InvalidInput(format!("deployments parse error: {}", e)))?;
        Ok(Self::new(records))
    }
}

#[async_trait]
impl DeploymentRegistry for StaticDeployments {
    async fn get_deployments(&self, networks: &[Network]) -> AppResult<Vec<Deployment>> {
        Ok(self
            .records
            .iter()
            .filter(|d| networks.contains(&d.network))
            .cloned()
            .collect())
    }
}

/// A config-side pointer to a contract: a literal address, or a
/// package-qualified deployment reference "package|deployName"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Address(String),
    Deployment { package: String, deploy_name: String },
}

impl Reference {
    pub fn parse(raw: &str) -> Reference {
        match raw.split_once('|') {
            Some((package, name)) => Reference::Deployment {
                package: package.to_string(),
                deploy_name: name.to_string(),
            },
            None => Reference::Address(raw.to_string()),
        }
    }
}

/// Resolve a reference to an address against the records of one network.
/// A package-qualified reference must match a record's name; when the record
/// carries a source package it must match too.
pub fn resolve_reference(
    raw: &str,
    network: &Network,
    deployments: &[Deployment],
) -> AppResult<String> {
    match Reference::parse(raw) {
        Reference::Address(addr) => Ok(addr),
        Reference::Deployment {
            package,
            deploy_name,
        } => deployments
            .iter()
            .find(|d| {
                d.network == *network
                    && d.name == deploy_name
                    && d.source.as_deref().map_or(true, |s| s == package)
            })
            .map(|d| d.address.clone())
            .ok_or_else(|| {
                AppError::Wire(WireError::DeploymentNotFound {
                    reference: raw.to_string(),
                    network: network.to_string(),
                })
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Chain, Stage};

    fn record(name: &str, address: &str, network: Network) -> Deployment {
        Deployment {
            name: name.to_string(),
            address: address.to_string(),
            network,
            source: Some(EVM_SDK_PACKAGE.to_string()),
            compatible_versions: vec![],
            abi: None,
            bytecode: None,
        }
    }

    #[test]
    fn test_reference_parse() {
        assert_eq!(
            Reference::parse("@layerzerolabs/oft-evm-sdk|RocketOFT"),
            Reference::Deployment {
                package: "@layerzerolabs/oft-evm-sdk".to_string(),
                deploy_name: "RocketOFT".to_string(),
            }
        );
        assert_eq!(
            Reference::parse("0x1a44076050125825900e736c501f859c50fe728c"),
            Reference::Address("0x1a44076050125825900e736c501f859c50fe728c".to_string())
        );
    }

    #[test]
    fn test_resolve_reference_literal_passthrough() {
        let network = Network::new(Chain::Ethereum, Stage::Mainnet);
        let resolved = resolve_reference("0xabc", &network, &[]).unwrap();
        assert_eq!(resolved, "0xabc");
    }

    #[test]
    fn test_resolve_reference_by_deploy_name() {
        let network = Network::new(Chain::Ethereum, Stage::Mainnet);
        let deployments = vec![
            record("RocketOFT", "0x1111", network),
            record(
                "RocketOFT",
                "0x2222",
                Network::new(Chain::Bsc, Stage::Mainnet),
            ),
        ];
        let resolved = resolve_reference(
            "@layerzerolabs/oft-evm-sdk|RocketOFT",
            &network,
            &deployments,
        )
        .unwrap();
        assert_eq!(resolved, "0x1111");
    }

    #[test]
    fn test_resolve_reference_missing_is_error() {
        let network = Network::new(Chain::Ethereum, Stage::Mainnet);
        let err = resolve_reference(
            "@layerzerolabs/oft-evm-sdk|MissingOFT",
            &network,
            &[record("RocketOFT", "0x1111", network)],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AppError::Wire(WireError::DeploymentNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_static_registry_filters_by_network() {
        let eth = Network::new(Chain::Ethereum, Stage::Mainnet);
        let bsc = Network::new(Chain::Bsc, Stage::Mainnet);
        let registry = StaticDeployments::new(vec![
            record("RocketOFT", "0x1111", eth),
            record("RocketOFT", "0x2222", bsc),
        ]);
        let records = registry.get_deployments(&[eth]).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].address, "0x1111");
    }

    #[test]
    fn test_deployment_serde_uses_network_string() {
        let record = record("RocketOFT", "0x1111", Network::new(Chain::Ethereum, Stage::Mainnet));
        let raw = serde_json::to_string(&record).unwrap();
        assert!(raw.contains("\"network\":\"ethereum-mainnet\""));
        let parsed: Deployment = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, record);
    }
}
