pub mod resolver;

pub use resolver::{resolve_one, resolve_two, Dimension, FallbackMap};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AppError, AppResult, ConfigError};
use crate::model::{Chain, Eid, MsgType, OftType, TokenInfo};

/// Declarative wiring configuration for one stage. Keyed sections fall back
/// through eid, chain name (where allowed) and "default".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub token: BTreeMap<String, TokenConfig>,

    /// peer[localEid|default][remoteEid|default] = address, reference or ""
    #[serde(default)]
    pub peer: FallbackMap<FallbackMap<String>>,

    /// enforceOptions[localEid|default][remoteEid|default] = options per msg type
    #[serde(rename = "enforceOptions", default)]
    pub enforce_options: FallbackMap<FallbackMap<EnforcedMessageOptions>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier: Option<VerifierConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub decimal: u8,
    /// Flavor per chain name, with a "default" fallback
    #[serde(default)]
    pub types: BTreeMap<String, OftType>,
    /// Pre-existing token addresses per chain name, for adapter flavors
    #[serde(default)]
    pub address: BTreeMap<String, String>,
}

/// Enforced execution options blobs, keyed by message type code in config
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcedMessageOptions {
    #[serde(rename = "1", default, skip_serializing_if = "Option::is_none")]
    pub send: Option<String>,
    #[serde(rename = "2", default, skip_serializing_if = "Option::is_none")]
    pub send_and_call: Option<String>,
}

impl EnforcedMessageOptions {
    pub fn for_msg_type(&self, msg_type: MsgType) -> Option<&str> {
        match msg_type {
            MsgType::Send => self.send.as_deref(),
            MsgType::SendAndCall => self.send_and_call.as_deref(),
        }
    }
}

/// Security stack settings per direction. The whole section and each
/// direction are optional on chains that treat them as such.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifierConfig {
    #[serde(rename = "sendUln", default, skip_serializing_if = "Option::is_none")]
    pub send_uln: Option<UlnSettings>,
    #[serde(rename = "receiveUln", default, skip_serializing_if = "Option::is_none")]
    pub receive_uln: Option<UlnSettings>,
}

/// ULN settings, each field independently resolved over
/// [eid, chain, default] x [eid, chain, default]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UlnSettings {
    #[serde(default)]
    pub confirmations: FallbackMap<FallbackMap<u64>>,
    #[serde(rename = "requiredDVNs", default)]
    pub required_dvns: FallbackMap<FallbackMap<Vec<String>>>,
    #[serde(rename = "optionalDVNs", default)]
    pub optional_dvns: FallbackMap<FallbackMap<Vec<String>>>,
    #[serde(rename = "optionalDVNsThreshold", default)]
    pub optional_dvns_threshold: FallbackMap<FallbackMap<u8>>,
}

/// Direction of a ULN lookup relative to the local chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UlnDirection {
    Send,
    Receive,
}

impl UlnDirection {
    pub fn section(&self) -> &'static str {
        match self {
            UlnDirection::Send => "verifier.sendUln",
            UlnDirection::Receive => "verifier.receiveUln",
        }
    }
}

/// Fully resolved ULN settings for one (local, remote) pair, DVN entries
/// still in config form (references or literals) but in canonical order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUln {
    pub confirmations: u64,
    pub required_dvns: Vec<String>,
    pub optional_dvns: Vec<String>,
    pub optional_dvns_threshold: u8,
}

/// Case-insensitive sort making DVN list comparison order-free
fn canonical_dvns(list: &[String]) -> Vec<String> {
    let mut sorted = list.to_vec();
    sorted.sort_by_key(|entry| entry.to_lowercase());
    sorted
}

impl AppConfig {
    pub fn from_json(raw: &str) -> AppResult<Self> {
        serde_json::from_str(raw).map_err(|e| {
            AppError::Config(ConfigError::InvalidValue {
                path: "appConfig".to_string(),
                message: e.to_string(),
            })
        })
    }

    fn token_config(&self, name: &str) -> AppResult<&TokenConfig> {
        self.token.get(name).ok_or_else(|| {
            AppError::Config(ConfigError::UnknownToken {
                name: name.to_string(),
                available: self.token.keys().cloned().collect::<Vec<_>>().join(", "),
            })
        })
    }

    /// Resolve a token's flavor on one chain. The adapter flavor carries the
    /// pre-existing token address when configured.
    pub fn token_info(&self, name: &str, chain: Chain) -> AppResult<TokenInfo> {
        let token = self.token_config(name)?;
        let oft_type = token
            .types
            .get(chain.as_str())
            .or_else(|| token.types.get("default"))
            .copied()
            .ok_or_else(|| {
                AppError::Config(ConfigError::NotFound {
                    path: format!("token.{}.types[{}|default]", name, chain),
                })
            })?;
        let address = match oft_type {
            OftType::OftAdapter => token.address.get(chain.as_str()).cloned(),
            OftType::Oft => None,
        };
        Ok(TokenInfo {
            name: name.to_string(),
            oft_type,
            token: address,
        })
    }

    pub fn decimals(&self, name: &str) -> AppResult<u8> {
        Ok(self.token_config(name)?.decimal)
    }

    /// Configured peer value for a pair; empty string means "derive from the
    /// remote deployment"
    pub fn peer(&self, local: Eid, remote: Eid) -> AppResult<&String> {
        resolve_two(
            "peer",
            &self.peer,
            &Dimension::eid_or_default(local),
            &Dimension::eid_or_default(remote),
        )
    }

    pub fn enforced_options(&self, local: Eid, remote: Eid) -> AppResult<&EnforcedMessageOptions> {
        resolve_two(
            "enforceOptions",
            &self.enforce_options,
            &Dimension::eid_or_default(local),
            &Dimension::eid_or_default(remote),
        )
    }

    /// Settings tree for one direction, None when the section or direction
    /// is absent. Call sites decide whether absence is fatal.
    pub fn uln_settings(&self, direction: UlnDirection) -> Option<&UlnSettings> {
        let verifier = self.verifier.as_ref()?;
        match direction {
            UlnDirection::Send => verifier.send_uln.as_ref(),
            UlnDirection::Receive => verifier.receive_uln.as_ref(),
        }
    }

    /// Resolve every ULN field for one pair. Each field falls back
    /// independently; any missing field is fatal and names its path.
    pub fn resolve_uln(
        &self,
        direction: UlnDirection,
        local: (Eid, Chain),
        remote: (Eid, Chain),
    ) -> AppResult<ResolvedUln> {
        let settings = self.uln_settings(direction).ok_or_else(|| {
            AppError::Config(ConfigError::MissingSection(direction.section().to_string()))
        })?;
        let first = Dimension::eid_chain_or_default(local.0, local.1);
        let second = Dimension::eid_chain_or_default(remote.0, remote.1);
        let section = direction.section();

        let confirmations = *resolve_two(
            &format!("{}.confirmations", section),
            &settings.confirmations,
            &first,
            &second,
        )?;
        let required_dvns = canonical_dvns(resolve_two(
            &format!("{}.requiredDVNs", section),
            &settings.required_dvns,
            &first,
            &second,
        )?);
        let optional_dvns = canonical_dvns(resolve_two(
            &format!("{}.optionalDVNs", section),
            &settings.optional_dvns,
            &first,
            &second,
        )?);
        let optional_dvns_threshold = *resolve_two(
            &format!("{}.optionalDVNsThreshold", section),
            &settings.optional_dvns_threshold,
            &first,
            &second,
        )?;

        Ok(ResolvedUln {
            confirmations,
            required_dvns,
            optional_dvns,
            optional_dvns_threshold,
        })
    }
}
