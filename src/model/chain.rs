use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Universal Chain enum - used everywhere in the system
/// Any chain can be the local or the remote side of a wiring pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Bsc,
    Polygon,
    Arbitrum,
    Metis,
    Solana,
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Bsc => "bsc",
            Chain::Polygon => "polygon",
            Chain::Arbitrum => "arbitrum",
            Chain::Metis => "metis",
            Chain::Solana => "solana",
        }
    }

    /// Return all supported chains
    pub fn all() -> Vec<Chain> {
        vec![
            Chain::Ethereum,
            Chain::Bsc,
            Chain::Polygon,
            Chain::Arbitrum,
            Chain::Metis,
            Chain::Solana,
        ]
    }

    /// Execution model family this chain belongs to
    pub fn family(&self) -> ChainFamily {
        match self {
            Chain::Solana => ChainFamily::Solana,
            _ => ChainFamily::Evm,
        }
    }

    /// Endpoint id offset within a stage
    pub fn eid_offset(&self) -> u32 {
        match self {
            Chain::Ethereum => 101,
            Chain::Bsc => 102,
            Chain::Polygon => 109,
            Chain::Arbitrum => 110,
            Chain::Solana => 168,
            Chain::Metis => 176,
        }
    }
}

impl FromStr for Chain {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ethereum" => Ok(Chain::Ethereum),
            "bsc" => Ok(Chain::Bsc),
            "polygon" => Ok(Chain::Polygon),
            "arbitrum" => Ok(Chain::Arbitrum),
            "metis" => Ok(Chain::Metis),
            "solana" => Ok(Chain::Solana),
            other => Err(AppError::InvalidInput(format!("unknown chain: {}", other))),
        }
    }
}

/// Execution model family. EVM chains share one contract-call wiring path,
/// Solana has its own instruction/PDA path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    Evm,
    Solana,
}

impl ChainFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainFamily::Evm => "evm",
            ChainFamily::Solana => "solana",
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deployment stage. Each stage has its own config set, signers and endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Sandbox,
    Testnet,
    Mainnet,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Sandbox => "sandbox",
            Stage::Testnet => "testnet",
            Stage::Mainnet => "mainnet",
        }
    }

    pub fn all() -> Vec<Stage> {
        vec![Stage::Sandbox, Stage::Testnet, Stage::Mainnet]
    }

    /// Endpoint id base for the stage
    pub fn eid_base(&self) -> u32 {
        match self {
            Stage::Sandbox => 20000,
            Stage::Testnet => 40000,
            Stage::Mainnet => 30000,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Stage {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sandbox" => Ok(Stage::Sandbox),
            "testnet" => Ok(Stage::Testnet),
            "mainnet" => Ok(Stage::Mainnet),
            other => Err(AppError::InvalidInput(format!("unknown stage: {}", other))),
        }
    }
}

/// A concrete network: one chain on one stage, e.g. "ethereum-mainnet"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Network {
    pub chain: Chain,
    pub stage: Stage,
}

impl Serialize for Network {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Network {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Network {
    pub fn new(chain: Chain, stage: Stage) -> Self {
        Self { chain, stage }
    }

    pub fn eid(&self) -> Eid {
        Eid::of(self.chain, self.stage)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.chain, self.stage)
    }
}

impl FromStr for Network {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (chain, stage) = s
            .split_once('-')
            .ok_or_else(|| AppError::InvalidInput(format!("invalid network: {}", s)))?;
        Ok(Network::new(chain.parse()?, stage.parse()?))
    }
}

/// Endpoint id identifying one network on the messaging layer.
/// Encodes stage base plus a per-chain offset, so the mapping is reversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Eid(pub u32);

impl Eid {
    pub fn of(chain: Chain, stage: Stage) -> Eid {
        Eid(stage.eid_base() + chain.eid_offset())
    }

    /// Reverse-map an endpoint id back to its network
    pub fn network(&self) -> Option<Network> {
        for stage in Stage::all() {
            for chain in Chain::all() {
                if Eid::of(chain, stage).0 == self.0 {
                    return Some(Network::new(chain, stage));
                }
            }
        }
        None
    }

    pub fn chain(&self) -> Option<Chain> {
        self.network().map(|n| n.chain)
    }
}

impl fmt::Display for Eid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
