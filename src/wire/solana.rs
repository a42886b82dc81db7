use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{json, Value};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signer;
use tracing::info;

use crate::appconfig::{AppConfig, UlnDirection};
use crate::error::{AppError, AppResult, WireError};
use crate::keys::{lockbox_keypair, mint_keypair, DEPLOYER};
use crate::model::{
    deployment::resolve_reference, Chain, ChainFamily, Deployment, MsgType, Network, OftType,
};
use crate::programs::{
    oft::{create_mint_instructions, EnforcedOptionsAccount, PeerAccount, MINT_ACCOUNT_SPACE},
    parse_account, pda,
    uln::{ExecutorSettings, DEFAULT_MAX_MESSAGE_SIZE},
    EndpointProgram, OftProgram, ReceiveConfigAccount, SendConfigAccount, UlnConfig,
    CONFIG_TYPE_EXECUTOR, CONFIG_TYPE_RECEIVE_ULN, CONFIG_TYPE_SEND_ULN, ENDPOINT_DEPLOYMENT,
    EXECUTOR_DEPLOYMENT, OFT_DEPLOYMENT, ULN_DEPLOYMENT,
};
use crate::wire::{
    decode_hex_blob, expected_peer, hex_bytes, ChangePayload, PendingChange, WireContext, Wireable,
};

/// Look up a program deployment by name on one network
pub fn find_program(
    name: &str,
    network: &Network,
    deployments: &[Deployment],
) -> AppResult<Pubkey> {
    let record = deployments
        .iter()
        .find(|d| d.network == *network && d.name == name)
        .ok_or_else(|| {
            AppError::Wire(WireError::DeploymentNotFound {
                reference: name.to_string(),
                network: network.to_string(),
            })
        })?;
    Pubkey::from_str(&record.address).map_err(|e| {
        AppError::Wire(WireError::InvalidAddress {
            address: record.address.clone(),
            message: e.to_string(),
        })
    })
}

/// Peer bytes a Solana local expects for one remote. None means the pair is
/// skipped: with no configured value and a Solana remote, derivation would
/// point the deployment back at its own program family mid-rollout.
pub fn solana_expected_peer(
    config: &AppConfig,
    deployments: &[Deployment],
    token: &str,
    local: Network,
    remote: Network,
) -> AppResult<Option<[u8; 32]>> {
    let raw = config.peer(local.eid(), remote.eid())?;
    if raw.is_empty() && remote.chain.family() == ChainFamily::Solana {
        info!("no peer configured for {} -> {}, skipping pair", local, remote);
        return Ok(None);
    }
    expected_peer(config, deployments, token, local, remote).map(Some)
}

/// Map DVN references to their program's config store, the key form the
/// message library holds
fn dvn_config_keys(
    network: Network,
    deployments: &[Deployment],
    entries: &[String],
) -> AppResult<Vec<[u8; 32]>> {
    entries
        .iter()
        .map(|entry| {
            let resolved = resolve_reference(entry, &network, deployments)?;
            let program = Pubkey::from_str(&resolved).map_err(|e| {
                AppError::Wire(WireError::InvalidAddress {
                    address: resolved.clone(),
                    message: e.to_string(),
                })
            })?;
            Ok(pda::dvn_config(&program).to_bytes())
        })
        .collect()
}

async fn fetch_account_data(
    client: &RpcClient,
    chain: Chain,
    address: &Pubkey,
) -> AppResult<Option<Vec<u8>>> {
    client
        .get_account_with_commitment(address, client.commitment())
        .await
        .map(|response| response.value.map(|account| account.data))
        .map_err(|e| {
            AppError::Wire(WireError::ChainReadFailed {
                chain,
                message: format!("getAccount({}): {}", address, e),
            })
        })
}

async fn account_exists(client: &RpcClient, chain: Chain, address: &Pubkey) -> AppResult<bool> {
    Ok(fetch_account_data(client, chain, address).await?.is_some())
}

async fn rent_exempt_lamports(client: &RpcClient, chain: Chain, space: usize) -> AppResult<u64> {
    client
        .get_minimum_balance_for_rent_exemption(space)
        .await
        .map_err(|e| {
            AppError::Wire(WireError::ChainReadFailed {
                chain,
                message: format!("getMinimumBalanceForRentExemption: {}", e),
            })
        })
}

/// Both message types must match the store; a drift in either one triggers a
/// single rewrite carrying the full desired state
fn enforced_options_match(
    expected_send: &[u8],
    expected_call: &[u8],
    current: &EnforcedOptionsAccount,
) -> bool {
    expected_send == current.send && expected_call == current.send_and_call
}

/// Program handles and token accounts resolved once per local run
#[derive(Debug)]
struct WireTargets {
    token: String,
    oft_type: OftType,
    decimals: u8,
    /// Mint taken from config when an adapter wraps an existing token
    configured_token: Option<Pubkey>,
    payer: Pubkey,
    mint: Pubkey,
    lockbox: Pubkey,
    oft: OftProgram,
    oft_config: Pubkey,
    endpoint: EndpointProgram,
    uln_program: Pubkey,
}

/// Change builder for the Solana runtime. Configuration lives in program
/// accounts, so wiring mixes two kinds of change: inits that create missing
/// stores and updates that rewrite drifted ones. Store existence is probed
/// up front; a batch holding both kinds converges over reruns.
pub struct SolanaWireable;

impl SolanaWireable {
    pub fn new() -> Self {
        Self
    }

    fn targets(&self, ctx: &WireContext, token: &str, local: Network) -> AppResult<WireTargets> {
        let info = ctx.app_config.token_info(token, local.chain)?;
        let decimals = ctx.app_config.decimals(token)?;
        let payer = ctx.signers.solana_keypair(DEPLOYER)?.pubkey();
        let oft = OftProgram::new(find_program(OFT_DEPLOYMENT, &local, &ctx.deployments)?);
        let endpoint =
            EndpointProgram::new(find_program(ENDPOINT_DEPLOYMENT, &local, &ctx.deployments)?);
        let uln_program = find_program(ULN_DEPLOYMENT, &local, &ctx.deployments)?;

        let configured_token = match &info.token {
            Some(address) => Some(Pubkey::from_str(address).map_err(|e| {
                AppError::Wire(WireError::InvalidAddress {
                    address: address.clone(),
                    message: e.to_string(),
                })
            })?),
            None => None,
        };
        let mint = configured_token.unwrap_or_else(|| mint_keypair(token).pubkey());
        let lockbox = lockbox_keypair(token).pubkey();
        // the config store is keyed by the account the program owns: the
        // mint for fresh OFTs, the lockbox for adapters
        let keyed_by = match info.oft_type {
            OftType::Oft => mint,
            OftType::OftAdapter => lockbox,
        };
        let oft_config = oft.config_pda(&keyed_by);

        Ok(WireTargets {
            token: token.to_string(),
            oft_type: info.oft_type,
            decimals,
            configured_token,
            payer,
            mint,
            lockbox,
            oft_config,
            oft,
            endpoint,
            uln_program,
        })
    }

    fn init_change(
        &self,
        t: &WireTargets,
        local: Network,
        remote: Option<Network>,
        method: &str,
        instruction: Instruction,
    ) -> PendingChange {
        let target = instruction.program_id.to_string();
        PendingChange {
            expected: json!(true),
            current: json!(false),
            method: method.to_string(),
            payload: ChangePayload::Solana { instruction },
            chain: local.chain,
            remote: remote.map(|r| r.eid()),
            target,
            signer: DEPLOYER.to_string(),
            metadata: json!({ "token": t.token }),
        }
    }

    /// Create the mint and the deployment's config store when absent. Both
    /// stores are remote-independent, so this runs once per local.
    async fn init_oft_changes(
        &self,
        client: &RpcClient,
        t: &WireTargets,
        local: Network,
    ) -> AppResult<Vec<PendingChange>> {
        let (mint_exists, config_exists) = tokio::try_join!(
            account_exists(client, local.chain, &t.mint),
            account_exists(client, local.chain, &t.oft_config),
        )?;

        let mut instructions: Vec<Instruction> = Vec::new();
        match t.oft_type {
            OftType::Oft => {
                if !mint_exists {
                    let rent =
                        rent_exempt_lamports(client, local.chain, MINT_ACCOUNT_SPACE as usize)
                            .await?;
                    // the config store holds mint authority so bridged-in
                    // amounts can be minted
                    instructions.extend(create_mint_instructions(
                        &t.payer,
                        &t.mint,
                        &t.oft_config,
                        t.decimals,
                        rent,
                    )?);
                }
                if !config_exists {
                    instructions.push(t.oft.init_oft(&t.payer, &t.mint)?);
                }
            }
            OftType::OftAdapter => {
                if t.configured_token.is_none() && !mint_exists {
                    let rent =
                        rent_exempt_lamports(client, local.chain, MINT_ACCOUNT_SPACE as usize)
                            .await?;
                    instructions.extend(create_mint_instructions(
                        &t.payer,
                        &t.mint,
                        &t.payer,
                        t.decimals,
                        rent,
                    )?);
                }
                if !config_exists {
                    instructions.push(t.oft.init_adapter_oft(&t.payer, &t.mint, &t.lockbox)?);
                }
            }
        }

        Ok(instructions
            .into_iter()
            .map(|ix| self.init_change(t, local, None, "initOFT", ix))
            .collect())
    }

    async fn set_peer_changes(
        &self,
        ctx: &WireContext,
        client: &RpcClient,
        t: &WireTargets,
        local: Network,
        remote: Network,
    ) -> AppResult<Vec<PendingChange>> {
        let Some(expected) =
            solana_expected_peer(&ctx.app_config, &ctx.deployments, &t.token, local, remote)?
        else {
            return Ok(vec![]);
        };
        let remote_eid = remote.eid();
        let store = t.oft.peer_pda(&t.oft_config, remote_eid.0);
        let current = match fetch_account_data(client, local.chain, &store).await? {
            Some(data) => Some(parse_account::<PeerAccount>("Peer", &data)?.peer_address),
            None => None,
        };
        if current == Some(expected) {
            return Ok(vec![]);
        }
        let instruction = t.oft.set_peer(&t.payer, &t.oft_config, remote_eid.0, expected)?;
        Ok(vec![PendingChange {
            expected: json!(hex_bytes(&expected)),
            current: json!(current.map(|bytes| hex_bytes(&bytes)).unwrap_or_default()),
            method: "setPeer".to_string(),
            payload: ChangePayload::Solana { instruction },
            chain: local.chain,
            remote: Some(remote_eid),
            target: t.oft.program_id.to_string(),
            signer: DEPLOYER.to_string(),
            metadata: json!({ "token": t.token }),
        }])
    }

    async fn init_send_library_changes(
        &self,
        client: &RpcClient,
        t: &WireTargets,
        local: Network,
        remote: Network,
    ) -> AppResult<Vec<PendingChange>> {
        let remote_eid = remote.eid();
        let store = t.endpoint.send_library_config_pda(&t.oft_config, remote_eid.0);
        if account_exists(client, local.chain, &store).await? {
            return Ok(vec![]);
        }
        let instruction = t
            .endpoint
            .init_send_library(&t.payer, &t.oft_config, remote_eid.0)?;
        Ok(vec![self.init_change(
            t,
            local,
            Some(remote),
            "initSendLibrary",
            instruction,
        )])
    }

    async fn init_receive_library_changes(
        &self,
        client: &RpcClient,
        t: &WireTargets,
        local: Network,
        remote: Network,
    ) -> AppResult<Vec<PendingChange>> {
        let remote_eid = remote.eid();
        let store = t
            .endpoint
            .receive_library_config_pda(&t.oft_config, remote_eid.0);
        if account_exists(client, local.chain, &store).await? {
            return Ok(vec![]);
        }
        let instruction = t
            .endpoint
            .init_receive_library(&t.payer, &t.oft_config, remote_eid.0)?;
        Ok(vec![self.init_change(
            t,
            local,
            Some(remote),
            "initReceiveLibrary",
            instruction,
        )])
    }

    /// The nonce store is keyed by the remote's peer bytes, so it shares the
    /// peer derivation and its skip condition
    async fn init_nonce_changes(
        &self,
        ctx: &WireContext,
        client: &RpcClient,
        t: &WireTargets,
        local: Network,
        remote: Network,
    ) -> AppResult<Vec<PendingChange>> {
        let Some(peer) =
            solana_expected_peer(&ctx.app_config, &ctx.deployments, &t.token, local, remote)?
        else {
            return Ok(vec![]);
        };
        let remote_eid = remote.eid();
        let store = t.endpoint.nonce_pda(&t.oft_config, remote_eid.0, &peer);
        if account_exists(client, local.chain, &store).await? {
            return Ok(vec![]);
        }
        let instruction = t
            .endpoint
            .init_nonce(&t.payer, &t.oft_config, remote_eid.0, peer)?;
        Ok(vec![self.init_change(
            t,
            local,
            Some(remote),
            "initOappNonce",
            instruction,
        )])
    }

    async fn set_enforced_options_changes(
        &self,
        ctx: &WireContext,
        client: &RpcClient,
        t: &WireTargets,
        local: Network,
        remote: Network,
    ) -> AppResult<Vec<PendingChange>> {
        let remote_eid = remote.eid();
        let options = ctx.app_config.enforced_options(local.eid(), remote_eid)?;
        let expected_send = match options.for_msg_type(MsgType::Send) {
            Some(blob) => decode_hex_blob(blob)?,
            None => Vec::new(),
        };
        let expected_call = match options.for_msg_type(MsgType::SendAndCall) {
            Some(blob) => decode_hex_blob(blob)?,
            None => Vec::new(),
        };

        let store = t.oft.enforced_options_pda(&t.oft_config, remote_eid.0);
        let current = match fetch_account_data(client, local.chain, &store).await? {
            Some(data) => parse_account::<EnforcedOptionsAccount>("EnforcedOptions", &data)?,
            None => EnforcedOptionsAccount::default(),
        };
        if enforced_options_match(&expected_send, &expected_call, &current) {
            return Ok(vec![]);
        }

        // one instruction carries both message types as full desired state
        let instruction = t.oft.set_enforced_options(
            &t.payer,
            &t.oft_config,
            remote_eid.0,
            expected_send.clone(),
            expected_call.clone(),
        )?;
        Ok(vec![PendingChange {
            expected: json!({
                "send": hex_bytes(&expected_send),
                "sendAndCall": hex_bytes(&expected_call),
            }),
            current: json!({
                "send": hex_bytes(&current.send),
                "sendAndCall": hex_bytes(&current.send_and_call),
            }),
            method: "setEnforcedOptions".to_string(),
            payload: ChangePayload::Solana { instruction },
            chain: local.chain,
            remote: Some(remote_eid),
            target: t.oft.program_id.to_string(),
            signer: DEPLOYER.to_string(),
            metadata: json!({ "token": t.token }),
        }])
    }

    /// Register the deployment with the message library for one remote by
    /// creating its config stores
    async fn init_uln_config_changes(
        &self,
        client: &RpcClient,
        t: &WireTargets,
        local: Network,
        remote: Network,
    ) -> AppResult<Vec<PendingChange>> {
        let remote_eid = remote.eid();
        let store = pda::send_config(&t.uln_program, &t.oft_config, remote_eid.0);
        if account_exists(client, local.chain, &store).await? {
            return Ok(vec![]);
        }
        let instruction = t.endpoint.init_oapp_config(
            &t.payer,
            &t.oft_config,
            &t.uln_program,
            remote_eid.0,
        )?;
        Ok(vec![self.init_change(
            t,
            local,
            Some(remote),
            "initOappConfig",
            instruction,
        )])
    }

    async fn set_uln_config_changes(
        &self,
        ctx: &WireContext,
        client: &RpcClient,
        t: &WireTargets,
        local: Network,
        remote: Network,
        direction: UlnDirection,
    ) -> AppResult<Vec<PendingChange>> {
        let remote_eid = remote.eid();
        // a missing verifier section is fatal here: leaving the library at
        // defaults would silently weaken verification
        let resolved = ctx.app_config.resolve_uln(
            direction,
            (local.eid(), local.chain),
            (remote_eid, remote.chain),
        )?;
        let required = dvn_config_keys(local, &ctx.deployments, &resolved.required_dvns)?;
        let optional = dvn_config_keys(local, &ctx.deployments, &resolved.optional_dvns)?;
        let expected = UlnConfig {
            confirmations: resolved.confirmations,
            required_dvn_count: required.len() as u8,
            optional_dvn_count: optional.len() as u8,
            optional_dvn_threshold: resolved.optional_dvns_threshold,
            required_dvns: required,
            optional_dvns: optional,
        }
        .canonicalized();

        let (store, config_type) = match direction {
            UlnDirection::Send => (
                pda::send_config(&t.uln_program, &t.oft_config, remote_eid.0),
                CONFIG_TYPE_SEND_ULN,
            ),
            UlnDirection::Receive => (
                pda::receive_config(&t.uln_program, &t.oft_config, remote_eid.0),
                CONFIG_TYPE_RECEIVE_ULN,
            ),
        };
        let current = match fetch_account_data(client, local.chain, &store).await? {
            Some(data) => Some(
                match direction {
                    UlnDirection::Send => {
                        parse_account::<SendConfigAccount>("SendConfig", &data)?.uln
                    }
                    UlnDirection::Receive => {
                        parse_account::<ReceiveConfigAccount>("ReceiveConfig", &data)?.uln
                    }
                }
                .canonicalized(),
            ),
            None => None,
        };
        if current.as_ref() == Some(&expected) {
            return Ok(vec![]);
        }

        let instruction = t.endpoint.set_config(
            &t.payer,
            &t.oft_config,
            &t.uln_program,
            remote_eid.0,
            config_type,
            expected.encode()?,
            store,
        )?;
        Ok(vec![PendingChange {
            expected: expected.to_json(),
            current: current.map(|c| c.to_json()).unwrap_or(Value::Null),
            method: "setConfig".to_string(),
            payload: ChangePayload::Solana { instruction },
            chain: local.chain,
            remote: Some(remote_eid),
            target: t.endpoint.program_id.to_string(),
            signer: DEPLOYER.to_string(),
            metadata: json!({ "token": t.token, "direction": direction.section() }),
        }])
    }

    /// Executor settings live beside the send config in the same store
    async fn set_executor_changes(
        &self,
        ctx: &WireContext,
        client: &RpcClient,
        t: &WireTargets,
        local: Network,
        remote: Network,
    ) -> AppResult<Vec<PendingChange>> {
        let remote_eid = remote.eid();
        let executor_program = find_program(EXECUTOR_DEPLOYMENT, &local, &ctx.deployments)?;
        let expected = ExecutorSettings {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            executor: pda::executor_config(&executor_program).to_bytes(),
        };

        let store = pda::send_config(&t.uln_program, &t.oft_config, remote_eid.0);
        let current = match fetch_account_data(client, local.chain, &store).await? {
            Some(data) => Some(parse_account::<SendConfigAccount>("SendConfig", &data)?.executor),
            None => None,
        };
        if current.as_ref() == Some(&expected) {
            return Ok(vec![]);
        }

        let instruction = t.endpoint.set_config(
            &t.payer,
            &t.oft_config,
            &t.uln_program,
            remote_eid.0,
            CONFIG_TYPE_EXECUTOR,
            expected.encode()?,
            store,
        )?;
        Ok(vec![PendingChange {
            expected: expected.to_json(),
            current: current.map(|c| c.to_json()).unwrap_or(Value::Null),
            method: "setExecutorConfig".to_string(),
            payload: ChangePayload::Solana { instruction },
            chain: local.chain,
            remote: Some(remote_eid),
            target: t.endpoint.program_id.to_string(),
            signer: DEPLOYER.to_string(),
            metadata: json!({ "token": t.token }),
        }])
    }
}

impl Default for SolanaWireable {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Wireable for SolanaWireable {
    async fn build_changes(
        &self,
        ctx: &WireContext,
        token: &str,
        local: Network,
        remotes: &[Network],
    ) -> AppResult<Vec<PendingChange>> {
        let client = ctx.providers.solana(local.chain).await?;
        let targets = self.targets(ctx, token, local)?;

        let mut changes = self.init_oft_changes(&client, &targets, local).await?;

        let jobs = remotes.iter().map(|remote| {
            let client = &client;
            let targets = &targets;
            async move {
                let (
                    peer,
                    send_lib,
                    receive_lib,
                    nonce,
                    options,
                    init_uln,
                    uln_send,
                    uln_receive,
                    executor,
                ) = tokio::try_join!(
                    self.set_peer_changes(ctx, client, targets, local, *remote),
                    self.init_send_library_changes(client, targets, local, *remote),
                    self.init_receive_library_changes(client, targets, local, *remote),
                    self.init_nonce_changes(ctx, client, targets, local, *remote),
                    self.set_enforced_options_changes(ctx, client, targets, local, *remote),
                    self.init_uln_config_changes(client, targets, local, *remote),
                    self.set_uln_config_changes(
                        ctx,
                        client,
                        targets,
                        local,
                        *remote,
                        UlnDirection::Send
                    ),
                    self.set_uln_config_changes(
                        ctx,
                        client,
                        targets,
                        local,
                        *remote,
                        UlnDirection::Receive
                    ),
                    self.set_executor_changes(ctx, client, targets, local, *remote),
                )?;
                Ok::<Vec<PendingChange>, AppError>(
                    peer.into_iter()
                        .chain(send_lib)
                        .chain(receive_lib)
                        .chain(nonce)
                        .chain(options)
                        .chain(init_uln)
                        .chain(uln_send)
                        .chain(uln_receive)
                        .chain(executor)
                        .collect(),
                )
            }
        });
        let nested = futures::future::try_join_all(jobs).await?;
        changes.extend(nested.into_iter().flatten());
        Ok(changes)
    }

    fn family(&self) -> ChainFamily {
        ChainFamily::Solana
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::SignerRegistry;
    use crate::model::Stage;
    use crate::providers::ProviderPool;
    use std::sync::Arc;

    const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";

    const ROCKET_OFT: &str = r#"{
        "token": {
            "Rocket": { "decimal": 9, "types": { "default": "OFT" } }
        },
        "peer": { "default": { "default": "" } }
    }"#;

    fn network(chain: Chain) -> Network {
        Network::new(chain, Stage::Mainnet)
    }

    fn program_record(name: &str, network: Network) -> Deployment {
        Deployment {
            name: name.to_string(),
            address: Pubkey::new_unique().to_string(),
            network,
            source: None,
            compatible_versions: vec![],
            abi: None,
            bytecode: None,
        }
    }

    fn context(config_json: &str, deployments: Vec<Deployment>) -> WireContext {
        WireContext {
            stage: Stage::Mainnet,
            app_config: AppConfig::from_json(config_json).unwrap(),
            providers: Arc::new(ProviderPool::new(Stage::Mainnet)),
            signers: Arc::new(SignerRegistry::single_mnemonic(Stage::Mainnet, TEST_MNEMONIC)),
            deployments,
        }
    }

    fn program_records(network: Network) -> Vec<Deployment> {
        vec![
            program_record(OFT_DEPLOYMENT, network),
            program_record(ENDPOINT_DEPLOYMENT, network),
            program_record(ULN_DEPLOYMENT, network),
            program_record(EXECUTOR_DEPLOYMENT, network),
        ]
    }

    #[test]
    fn test_find_program_filters_by_network() {
        let solana = network(Chain::Solana);
        let records = vec![
            program_record(ENDPOINT_DEPLOYMENT, solana),
            program_record(ENDPOINT_DEPLOYMENT, network(Chain::Ethereum)),
        ];
        let found = find_program(ENDPOINT_DEPLOYMENT, &solana, &records).unwrap();
        assert_eq!(found.to_string(), records[0].address);
        assert!(find_program(ULN_DEPLOYMENT, &solana, &records).is_err());
    }

    #[test]
    fn test_enforced_options_match_is_idempotent() {
        let store = EnforcedOptionsAccount {
            send: vec![0x00, 0x03, 0x01],
            send_and_call: vec![0x00, 0x03],
            bump: 254,
        };
        assert!(enforced_options_match(&store.send, &store.send_and_call, &store));
    }

    #[test]
    fn test_enforced_options_drift_in_either_type_triggers() {
        let store = EnforcedOptionsAccount {
            send: vec![0x00, 0x03, 0x01],
            send_and_call: vec![0x00, 0x03],
            bump: 254,
        };
        assert!(!enforced_options_match(&[0x00, 0x04], &store.send_and_call, &store));
        assert!(!enforced_options_match(&store.send, &[0x00, 0x04], &store));
        // missing store reads as empty and drifts against any expectation
        assert!(!enforced_options_match(
            &store.send,
            &store.send_and_call,
            &EnforcedOptionsAccount::default(),
        ));
    }

    #[test]
    fn test_solana_expected_peer_skips_unresolvable_solana_remote() {
        let config = AppConfig::from_json(ROCKET_OFT).unwrap();
        let local = network(Chain::Solana);
        let skipped = solana_expected_peer(&config, &[], "Rocket", local, local).unwrap();
        assert!(skipped.is_none());
    }

    #[test]
    fn test_solana_expected_peer_derives_evm_reference() {
        let config = AppConfig::from_json(ROCKET_OFT).unwrap();
        let local = network(Chain::Solana);
        let remote = network(Chain::Ethereum);
        let deployments = vec![Deployment {
            name: "RocketOFT".to_string(),
            address: "0x0b2c639c533813f4aa9d7837caf62653d097ff85".to_string(),
            network: remote,
            source: Some(crate::model::deployment::EVM_SDK_PACKAGE.to_string()),
            compatible_versions: vec![],
            abi: None,
            bytecode: None,
        }];
        let peer = solana_expected_peer(&config, &deployments, "Rocket", local, remote)
            .unwrap()
            .unwrap();
        assert_eq!(&peer[..12], &[0u8; 12]);
        assert_eq!(
            hex::encode(&peer[12..]),
            "0b2c639c533813f4aa9d7837caf62653d097ff85"
        );
    }

    #[test]
    fn test_dvn_config_keys_map_programs_to_stores() {
        let solana = network(Chain::Solana);
        let dvn = Pubkey::new_unique();
        let keys = dvn_config_keys(solana, &[], &[dvn.to_string()]).unwrap();
        assert_eq!(keys, vec![pda::dvn_config(&dvn).to_bytes()]);
        assert!(dvn_config_keys(solana, &[], &["not-a-key".to_string()]).is_err());
    }

    #[test]
    fn test_targets_key_config_by_mint_for_oft() {
        let solana = network(Chain::Solana);
        let ctx = context(ROCKET_OFT, program_records(solana));
        let targets = SolanaWireable::new().targets(&ctx, "Rocket", solana).unwrap();
        assert_eq!(targets.mint, mint_keypair("Rocket").pubkey());
        assert_eq!(targets.oft_config, targets.oft.config_pda(&targets.mint));
        assert!(targets.configured_token.is_none());
    }

    #[test]
    fn test_targets_key_config_by_lockbox_for_adapter() {
        let solana = network(Chain::Solana);
        let ctx = context(
            r#"{
                "token": {
                    "Rocket": { "decimal": 9, "types": { "default": "OFTAdapter" } }
                },
                "peer": { "default": { "default": "" } }
            }"#,
            program_records(solana),
        );
        let targets = SolanaWireable::new().targets(&ctx, "Rocket", solana).unwrap();
        assert_eq!(targets.lockbox, lockbox_keypair("Rocket").pubkey());
        assert_eq!(targets.oft_config, targets.oft.config_pda(&targets.lockbox));
        assert_ne!(targets.oft_config, targets.oft.config_pda(&targets.mint));
    }

    #[test]
    fn test_targets_adapter_prefers_configured_token() {
        let solana = network(Chain::Solana);
        let existing = Pubkey::new_unique();
        let ctx = context(
            &format!(
                r#"{{
                    "token": {{
                        "Rocket": {{
                            "decimal": 9,
                            "types": {{ "default": "OFTAdapter" }},
                            "address": {{ "solana": "{}" }}
                        }}
                    }},
                    "peer": {{ "default": {{ "default": "" }} }}
                }}"#,
                existing
            ),
            program_records(solana),
        );
        let targets = SolanaWireable::new().targets(&ctx, "Rocket", solana).unwrap();
        assert_eq!(targets.mint, existing);
        assert_eq!(targets.configured_token, Some(existing));
    }

    #[test]
    fn test_targets_require_program_deployments() {
        let solana = network(Chain::Solana);
        let ctx = context(ROCKET_OFT, vec![]);
        let err = SolanaWireable::new()
            .targets(&ctx, "Rocket", solana)
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Wire(WireError::DeploymentNotFound { .. })
        ));
    }
}
