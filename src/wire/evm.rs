use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::DynProvider;
use alloy::sol;
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use crate::appconfig::UlnDirection;
use crate::error::{AppError, AppResult, WireError};
use crate::keys::DEPLOYER;
use crate::model::{
    deployment::{resolve_reference, EVM_SDK_PACKAGE},
    Chain, ChainFamily, Eid, MsgType, Network,
};
use crate::wire::{
    decode_hex_blob, expected_peer, hex_bytes, ChangePayload, PendingChange, WireContext, Wireable,
};

/// Config kind for verification settings in the EVM message library
const CONFIG_TYPE_ULN: u32 = 2;

sol! {
    #[derive(Debug)]
    struct EnforcedOptionParam {
        uint32 eid;
        uint16 msgType;
        bytes options;
    }

    #[derive(Debug)]
    struct SetConfigParam {
        uint32 eid;
        uint32 configType;
        bytes config;
    }

    #[derive(Debug)]
    struct UlnConfig {
        uint64 confirmations;
        uint8 requiredDVNCount;
        uint8 optionalDVNCount;
        uint8 optionalDVNThreshold;
        address[] requiredDVNs;
        address[] optionalDVNs;
    }

    #[derive(Debug)]
    #[sol(rpc)]
    contract OftContract {
        function peers(uint32 eid) external view returns (bytes32 peer);
        function endpoint() external view returns (address);
        function enforcedOptions(uint32 eid, uint16 msgType) external view returns (bytes memory options);
        function setPeer(uint32 eid, bytes32 peer) external;
        function setEnforcedOptions(EnforcedOptionParam[] calldata params) external;
    }

    #[derive(Debug)]
    #[sol(rpc)]
    contract EndpointContract {
        function getSendLibrary(address sender, uint32 dstEid) external view returns (address lib);
        function getReceiveLibrary(address receiver, uint32 srcEid) external view returns (address lib, bool isDefault);
        function setConfig(address oapp, address lib, SetConfigParam[] calldata params) external;
    }

    #[derive(Debug)]
    #[sol(rpc)]
    contract UlnContract {
        function getUlnConfig(address oapp, uint32 eid) external view returns (UlnConfig memory config);
    }
}

/// Typed EVM call carried by a pending change, encoded to calldata at
/// submission time
#[derive(Debug, Clone)]
pub enum EvmCall {
    SetPeer {
        eid: u32,
        peer: B256,
    },
    SetEnforcedOptions {
        params: Vec<EnforcedOptionParam>,
    },
    SetConfig {
        oapp: Address,
        lib: Address,
        params: Vec<SetConfigParam>,
    },
}

impl EvmCall {
    pub fn method(&self) -> &'static str {
        match self {
            EvmCall::SetPeer { .. } => "setPeer",
            EvmCall::SetEnforcedOptions { .. } => "setEnforcedOptions",
            EvmCall::SetConfig { .. } => "setConfig",
        }
    }

    pub fn abi_encode(&self) -> Vec<u8> {
        match self {
            EvmCall::SetPeer { eid, peer } => OftContract::setPeerCall {
                eid: *eid,
                peer: *peer,
            }
            .abi_encode(),
            EvmCall::SetEnforcedOptions { params } => OftContract::setEnforcedOptionsCall {
                params: params.clone(),
            }
            .abi_encode(),
            EvmCall::SetConfig { oapp, lib, params } => EndpointContract::setConfigCall {
                oapp: *oapp,
                lib: *lib,
                params: params.clone(),
            }
            .abi_encode(),
        }
    }
}

/// Change builder for EVM chains. All reads go through the local chain's
/// provider; a change is emitted only when the canonical expected and
/// current values differ.
pub struct EvmWireable;

impl EvmWireable {
    pub fn new() -> Self {
        Self
    }

    fn oft_address(&self, ctx: &WireContext, token: &str, local: Network) -> AppResult<Address> {
        let info = ctx.app_config.token_info(token, local.chain)?;
        let reference = format!("{}|{}", EVM_SDK_PACKAGE, info.deploy_name());
        let address = resolve_reference(&reference, &local, &ctx.deployments)?;
        address.parse::<Address>().map_err(|e| {
            AppError::Wire(WireError::InvalidAddress {
                address,
                message: e.to_string(),
            })
        })
    }

    async fn set_peer_changes(
        &self,
        ctx: &WireContext,
        provider: &DynProvider,
        token: &str,
        local: Network,
        oft: Address,
        remotes: &[Network],
    ) -> AppResult<Vec<PendingChange>> {
        let contract = OftContract::new(oft, provider.clone());
        let jobs = remotes.iter().map(|remote| {
            let contract = &contract;
            async move {
                let expected = expected_peer(&ctx.app_config, &ctx.deployments, token, local, *remote)?;
                let remote_eid = remote.eid();
                let current: B256 = contract.peers(remote_eid.0).call().await.map_err(|e| {
                    AppError::Wire(WireError::ChainReadFailed {
                        chain: local.chain,
                        message: format!("peers({}): {}", remote_eid, e),
                    })
                })?;
                if current.0 == expected {
                    return Ok::<Option<PendingChange>, AppError>(None);
                }
                Ok(Some(PendingChange {
                    expected: json!(hex_bytes(&expected)),
                    current: json!(hex_bytes(current.as_slice())),
                    method: "setPeer".to_string(),
                    payload: ChangePayload::Evm {
                        to: oft,
                        call: EvmCall::SetPeer {
                            eid: remote_eid.0,
                            peer: B256::from(expected),
                        },
                    },
                    chain: local.chain,
                    remote: Some(remote_eid),
                    target: oft.to_string(),
                    signer: DEPLOYER.to_string(),
                    metadata: json!({ "token": token }),
                }))
            }
        });
        let results = futures::future::try_join_all(jobs).await?;
        Ok(results.into_iter().flatten().collect())
    }

    async fn set_enforced_options_changes(
        &self,
        ctx: &WireContext,
        provider: &DynProvider,
        token: &str,
        local: Network,
        oft: Address,
        remotes: &[Network],
    ) -> AppResult<Vec<PendingChange>> {
        let contract = OftContract::new(oft, provider.clone());
        let jobs = remotes.iter().map(|remote| {
            let contract = &contract;
            async move {
                let remote_eid = remote.eid();
                let options = ctx.app_config.enforced_options(local.eid(), remote_eid)?;
                let mut drifted = Vec::new();
                for msg_type in MsgType::all() {
                    let Some(blob) = options.for_msg_type(msg_type) else {
                        continue;
                    };
                    let expected = decode_hex_blob(blob)?;
                    let current: Bytes = contract
                        .enforcedOptions(remote_eid.0, msg_type.as_u16())
                        .call()
                        .await
                        .map_err(|e| {
                            AppError::Wire(WireError::ChainReadFailed {
                                chain: local.chain,
                                message: format!(
                                    "enforcedOptions({}, {}): {}",
                                    remote_eid, msg_type, e
                                ),
                            })
                        })?;
                    if current.as_ref() != expected.as_slice() {
                        drifted.push((remote_eid, msg_type, expected, current));
                    }
                }
                Ok::<_, AppError>(drifted)
            }
        });
        let drifted: Vec<_> = futures::future::try_join_all(jobs)
            .await?
            .into_iter()
            .flatten()
            .collect();

        if drifted.is_empty() {
            return Ok(vec![]);
        }
        Ok(vec![combined_enforced_options_change(
            oft,
            local.chain,
            token,
            drifted,
        )])
    }

    async fn set_uln_changes(
        &self,
        ctx: &WireContext,
        provider: &DynProvider,
        token: &str,
        local: Network,
        oft: Address,
        remotes: &[Network],
        direction: UlnDirection,
    ) -> AppResult<Vec<PendingChange>> {
        if ctx.app_config.uln_settings(direction).is_none() {
            warn!(
                "no {} settings configured, skipping for {}",
                direction.section(),
                local
            );
            return Ok(vec![]);
        }

        let contract = OftContract::new(oft, provider.clone());
        let endpoint_addr: Address = contract.endpoint().call().await.map_err(|e| {
            AppError::Wire(WireError::ChainReadFailed {
                chain: local.chain,
                message: format!("endpoint(): {}", e),
            })
        })?;
        let endpoint = EndpointContract::new(endpoint_addr, provider.clone());

        let jobs = remotes.iter().map(|remote| {
            let endpoint = &endpoint;
            async move {
                let remote_eid = remote.eid();
                let resolved = ctx.app_config.resolve_uln(
                    direction,
                    (local.eid(), local.chain),
                    (remote_eid, remote.chain),
                )?;
                let required = self.dvn_addresses(ctx, local, &resolved.required_dvns)?;
                let optional = self.dvn_addresses(ctx, local, &resolved.optional_dvns)?;
                let expected = UlnConfig {
                    confirmations: resolved.confirmations,
                    requiredDVNCount: required.len() as u8,
                    optionalDVNCount: optional.len() as u8,
                    optionalDVNThreshold: resolved.optional_dvns_threshold,
                    requiredDVNs: required,
                    optionalDVNs: optional,
                };

                let lib: Address = match direction {
                    UlnDirection::Send => endpoint
                        .getSendLibrary(oft, remote_eid.0)
                        .call()
                        .await
                        .map_err(|e| {
                            AppError::Wire(WireError::ChainReadFailed {
                                chain: local.chain,
                                message: format!("getSendLibrary({}): {}", remote_eid, e),
                            })
                        })?,
                    UlnDirection::Receive => {
                        endpoint
                            .getReceiveLibrary(oft, remote_eid.0)
                            .call()
                            .await
                            .map_err(|e| {
                                AppError::Wire(WireError::ChainReadFailed {
                                    chain: local.chain,
                                    message: format!("getReceiveLibrary({}): {}", remote_eid, e),
                                })
                            })?
                            .lib
                    }
                };

                let uln = UlnContract::new(lib, provider.clone());
                let mut current: UlnConfig =
                    uln.getUlnConfig(oft, remote_eid.0).call().await.map_err(|e| {
                        AppError::Wire(WireError::ChainReadFailed {
                            chain: local.chain,
                            message: format!("getUlnConfig({}): {}", remote_eid, e),
                        })
                    })?;
                current.requiredDVNs.sort_unstable();
                current.optionalDVNs.sort_unstable();

                if uln_matches(&expected, &current) {
                    return Ok::<Option<PendingChange>, AppError>(None);
                }

                let config = Bytes::from(expected.abi_encode());
                Ok(Some(PendingChange {
                    expected: uln_json(&expected),
                    current: uln_json(&current),
                    method: "setConfig".to_string(),
                    payload: ChangePayload::Evm {
                        to: endpoint_addr,
                        call: EvmCall::SetConfig {
                            oapp: oft,
                            lib,
                            params: vec![SetConfigParam {
                                eid: remote_eid.0,
                                configType: CONFIG_TYPE_ULN,
                                config,
                            }],
                        },
                    },
                    chain: local.chain,
                    remote: Some(remote_eid),
                    target: endpoint_addr.to_string(),
                    signer: DEPLOYER.to_string(),
                    metadata: json!({
                        "token": token,
                        "direction": direction.section(),
                        "lib": lib.to_string(),
                    }),
                }))
            }
        });
        let results = futures::future::try_join_all(jobs).await?;
        Ok(results.into_iter().flatten().collect())
    }

    /// Resolve DVN references against the local network and return them in
    /// canonical order
    fn dvn_addresses(
        &self,
        ctx: &WireContext,
        local: Network,
        entries: &[String],
    ) -> AppResult<Vec<Address>> {
        let mut addresses = entries
            .iter()
            .map(|entry| {
                let resolved = resolve_reference(entry, &local, &ctx.deployments)?;
                resolved.parse::<Address>().map_err(|e| {
                    AppError::Wire(WireError::InvalidAddress {
                        address: resolved,
                        message: e.to_string(),
                    })
                })
            })
            .collect::<AppResult<Vec<Address>>>()?;
        addresses.sort_unstable();
        Ok(addresses)
    }
}

impl Default for EvmWireable {
    fn default() -> Self {
        Self::new()
    }
}

/// All drifted entries for one deployment ride a single combined transaction
fn combined_enforced_options_change(
    oft: Address,
    chain: Chain,
    token: &str,
    drifted: Vec<(Eid, MsgType, Vec<u8>, Bytes)>,
) -> PendingChange {
    let expected_json: Vec<_> = drifted
        .iter()
        .map(|(eid, mt, expected, _)| {
            json!({ "eid": eid.0, "msgType": mt.as_u16(), "options": hex_bytes(expected) })
        })
        .collect();
    let current_json: Vec<_> = drifted
        .iter()
        .map(|(eid, mt, _, current)| {
            json!({ "eid": eid.0, "msgType": mt.as_u16(), "options": hex_bytes(current.as_ref()) })
        })
        .collect();
    let params: Vec<EnforcedOptionParam> = drifted
        .into_iter()
        .map(|(eid, mt, expected, _)| EnforcedOptionParam {
            eid: eid.0,
            msgType: mt.as_u16(),
            options: Bytes::from(expected),
        })
        .collect();

    PendingChange {
        expected: json!(expected_json),
        current: json!(current_json),
        method: "setEnforcedOptions".to_string(),
        payload: ChangePayload::Evm {
            to: oft,
            call: EvmCall::SetEnforcedOptions { params },
        },
        chain,
        remote: None,
        target: oft.to_string(),
        signer: DEPLOYER.to_string(),
        metadata: json!({ "token": token }),
    }
}

fn uln_matches(expected: &UlnConfig, current: &UlnConfig) -> bool {
    expected.confirmations == current.confirmations
        && expected.requiredDVNCount == current.requiredDVNCount
        && expected.optionalDVNCount == current.optionalDVNCount
        && expected.optionalDVNThreshold == current.optionalDVNThreshold
        && expected.requiredDVNs == current.requiredDVNs
        && expected.optionalDVNs == current.optionalDVNs
}

fn uln_json(config: &UlnConfig) -> serde_json::Value {
    json!({
        "confirmations": config.confirmations,
        "requiredDVNs": config.requiredDVNs.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
        "optionalDVNs": config.optionalDVNs.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
        "optionalDVNsThreshold": config.optionalDVNThreshold,
    })
}

#[async_trait]
impl Wireable for EvmWireable {
    async fn build_changes(
        &self,
        ctx: &WireContext,
        token: &str,
        local: Network,
        remotes: &[Network],
    ) -> AppResult<Vec<PendingChange>> {
        let oft = self.oft_address(ctx, token, local)?;
        let provider = ctx.providers.evm(local.chain).await?;

        let (peers, enforced, uln_send, uln_receive) = tokio::try_join!(
            self.set_peer_changes(ctx, &provider, token, local, oft, remotes),
            self.set_enforced_options_changes(ctx, &provider, token, local, oft, remotes),
            self.set_uln_changes(ctx, &provider, token, local, oft, remotes, UlnDirection::Send),
            self.set_uln_changes(
                ctx,
                &provider,
                token,
                local,
                oft,
                remotes,
                UlnDirection::Receive
            ),
        )?;

        Ok(peers
            .into_iter()
            .chain(enforced)
            .chain(uln_send)
            .chain(uln_receive)
            .collect())
    }

    fn family(&self) -> ChainFamily {
        ChainFamily::Evm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_peer_calldata_selector() {
        let call = EvmCall::SetPeer {
            eid: 30102,
            peer: B256::from([7u8; 32]),
        };
        let data = call.abi_encode();
        assert_eq!(&data[..4], &OftContract::setPeerCall::SELECTOR);
        assert_eq!(call.method(), "setPeer");
    }

    #[test]
    fn test_set_config_calldata_selector() {
        let call = EvmCall::SetConfig {
            oapp: Address::repeat_byte(1),
            lib: Address::repeat_byte(2),
            params: vec![SetConfigParam {
                eid: 30102,
                configType: CONFIG_TYPE_ULN,
                config: Bytes::from(vec![1, 2, 3]),
            }],
        };
        let data = call.abi_encode();
        assert_eq!(&data[..4], &EndpointContract::setConfigCall::SELECTOR);
    }

    #[test]
    fn test_uln_matches_ignores_nothing() {
        let a = UlnConfig {
            confirmations: 6,
            requiredDVNCount: 1,
            optionalDVNCount: 0,
            optionalDVNThreshold: 0,
            requiredDVNs: vec![Address::repeat_byte(1)],
            optionalDVNs: vec![],
        };
        let mut b = UlnConfig {
            confirmations: 6,
            requiredDVNCount: 1,
            optionalDVNCount: 0,
            optionalDVNThreshold: 0,
            requiredDVNs: vec![Address::repeat_byte(1)],
            optionalDVNs: vec![],
        };
        assert!(uln_matches(&a, &b));
        b.confirmations = 12;
        assert!(!uln_matches(&a, &b));
    }

    #[test]
    fn test_enforced_options_drift_combines_into_one_change() {
        let oft = Address::repeat_byte(9);
        let drifted = vec![
            (
                Eid(30102),
                MsgType::Send,
                vec![0x00, 0x03],
                Bytes::from(vec![0x00]),
            ),
            (
                Eid(30168),
                MsgType::SendAndCall,
                vec![0x00, 0x04],
                Bytes::new(),
            ),
        ];
        let change = combined_enforced_options_change(oft, Chain::Ethereum, "Rocket", drifted);
        assert_eq!(change.method, "setEnforcedOptions");
        assert_eq!(change.remote, None);
        let ChangePayload::Evm {
            call: EvmCall::SetEnforcedOptions { params },
            ..
        } = change.payload
        else {
            panic!("expected an EVM enforced-options payload");
        };
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].eid, 30102);
        assert_eq!(params[0].msgType, MsgType::Send.as_u16());
        assert_eq!(params[1].eid, 30168);
        assert_eq!(change.expected.as_array().map(|entries| entries.len()), Some(2));
    }

    #[test]
    fn test_uln_abi_encoding_is_order_sensitive() {
        // Canonical sorting must happen before encoding, the ABI keeps order
        let sorted = UlnConfig {
            confirmations: 6,
            requiredDVNCount: 2,
            optionalDVNCount: 0,
            optionalDVNThreshold: 0,
            requiredDVNs: vec![Address::repeat_byte(1), Address::repeat_byte(2)],
            optionalDVNs: vec![],
        };
        let reversed = UlnConfig {
            confirmations: 6,
            requiredDVNCount: 2,
            optionalDVNCount: 0,
            optionalDVNThreshold: 0,
            requiredDVNs: vec![Address::repeat_byte(2), Address::repeat_byte(1)],
            optionalDVNs: vec![],
        };
        assert_ne!(sorted.abi_encode(), reversed.abi_encode());
    }
}
