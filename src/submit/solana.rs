use std::time::{Duration, Instant};

use async_trait::async_trait;
use solana_address_lookup_table_interface::instruction::{
    create_lookup_table, extend_lookup_table,
};
use solana_address_lookup_table_interface::state::AddressLookupTable;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{CommitmentConfig, RpcSendTransactionConfig};
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::{v0, AddressLookupTableAccount, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::VersionedTransaction;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, SubmitError};
use crate::keys::match_extra_signers;
use crate::model::{Chain, ChainFamily};
use crate::submit::Submitter;
use crate::wire::{ChangePayload, PendingChange, WireContext};

/// Wire limit for one serialized transaction (IPv6 MTU minus headers)
const MAX_TRANSACTION_SIZE: usize = 1232;

/// Accounts beyond this count take the lookup-table path without probing
const LOOKUP_TABLE_ACCOUNT_THRESHOLD: usize = 28;

/// Addresses per extend instruction; more would not fit one transaction
const LOOKUP_TABLE_EXTEND_BATCH: usize = 25;

/// Compute unit floor, also used when simulation reports nothing
const MIN_COMPUTE_UNITS: u32 = 1000;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Compute budget from a measured simulation: never below the floor,
/// otherwise half again the measured units to absorb state drift between
/// simulation and inclusion
pub fn scale_compute_units(measured: Option<u64>) -> u32 {
    match measured {
        Some(units) if units >= MIN_COMPUTE_UNITS as u64 => {
            (units * 3).div_ceil(2).min(u32::MAX as u64) as u32
        }
        _ => MIN_COMPUTE_UNITS,
    }
}

fn compile_message(
    payer: &Pubkey,
    instructions: &[Instruction],
    tables: &[AddressLookupTableAccount],
    blockhash: Hash,
) -> AppResult<VersionedMessage> {
    let message = v0::Message::try_compile(payer, instructions, tables, blockhash)
        .map_err(|e| AppError::Submit(SubmitError::InvalidTransaction(e.to_string())))?;
    Ok(VersionedMessage::V0(message))
}

/// Wire size of a message once placeholder signatures are attached
fn transaction_size(message: &VersionedMessage) -> AppResult<usize> {
    let probe = VersionedTransaction {
        signatures: vec![Signature::default(); message.header().num_required_signatures as usize],
        message: message.clone(),
    };
    bincode::serialized_size(&probe)
        .map(|size| size as usize)
        .map_err(|e| AppError::Submit(SubmitError::InvalidTransaction(e.to_string())))
}

/// Whether an instruction must ride a lookup table to stay under the wire
/// limit
pub fn needs_lookup_table(instruction: &Instruction, payer: &Pubkey) -> AppResult<bool> {
    if instruction.accounts.len() > LOOKUP_TABLE_ACCOUNT_THRESHOLD {
        return Ok(true);
    }
    let message = compile_message(payer, std::slice::from_ref(instruction), &[], Hash::default())?;
    Ok(transaction_size(&message)? > MAX_TRANSACTION_SIZE)
}

/// One submission bound to a client, payer and confirmation policy
struct SolanaSender<'a> {
    client: &'a RpcClient,
    chain: Chain,
    payer: &'a Keypair,
    commitment: CommitmentConfig,
    timeout: Duration,
}

impl SolanaSender<'_> {
    async fn latest_blockhash(&self) -> AppResult<Hash> {
        self.client.get_latest_blockhash().await.map_err(|e| {
            AppError::Submit(SubmitError::SendFailed {
                chain: self.chain,
                message: format!("getLatestBlockhash: {}", e),
            })
        })
    }

    /// Compile, sign, send with preflight off and wait for the configured
    /// commitment
    async fn send_and_confirm(
        &self,
        extras: &[Keypair],
        instructions: &[Instruction],
        tables: &[AddressLookupTableAccount],
    ) -> AppResult<Signature> {
        let blockhash = self.latest_blockhash().await?;
        let message = compile_message(&self.payer.pubkey(), instructions, tables, blockhash)?;

        let size = transaction_size(&message)?;
        if size > MAX_TRANSACTION_SIZE {
            return Err(AppError::Submit(SubmitError::TooLarge {
                size,
                limit: MAX_TRANSACTION_SIZE,
            }));
        }

        let mut signers: Vec<&(dyn Signer + Sync)> = vec![self.payer];
        signers.extend(extras.iter().map(|keypair| keypair as &(dyn Signer + Sync)));
        let transaction = VersionedTransaction::try_new(message, &signers)
            .map_err(|e| AppError::Submit(SubmitError::InvalidTransaction(e.to_string())))?;

        let signature = self
            .client
            .send_transaction_with_config(
                &transaction,
                RpcSendTransactionConfig {
                    skip_preflight: true,
                    ..RpcSendTransactionConfig::default()
                },
            )
            .await
            .map_err(|e| {
                AppError::Submit(SubmitError::SendFailed {
                    chain: self.chain,
                    message: e.to_string(),
                })
            })?;
        self.confirm(&signature).await?;
        Ok(signature)
    }

    /// Poll signature status until it reaches the configured commitment
    async fn confirm(&self, signature: &Signature) -> AppResult<()> {
        let start = Instant::now();
        loop {
            match self.client.get_signature_statuses(&[*signature]).await {
                Ok(response) => {
                    if let Some(Some(status)) = response.value.first() {
                        if let Some(err) = &status.err {
                            return Err(AppError::Submit(SubmitError::SendFailed {
                                chain: self.chain,
                                message: format!("{}: {:?}", signature, err),
                            }));
                        }
                        if status.satisfies_commitment(self.commitment) {
                            return Ok(());
                        }
                    }
                }
                Err(_) => {
                    // Continue waiting
                }
            }

            if start.elapsed() > self.timeout {
                return Err(AppError::Submit(SubmitError::ConfirmationTimeout(
                    signature.to_string(),
                )));
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Create a lookup table holding the given addresses: create at a
    /// finalized slot, extend in batches, then poll until every address is
    /// present
    async fn prepare_lookup_table(
        &self,
        addresses: &[Pubkey],
    ) -> AppResult<AddressLookupTableAccount> {
        let slot = self
            .client
            .get_slot_with_commitment(CommitmentConfig::finalized())
            .await
            .map_err(|e| {
                AppError::Submit(SubmitError::SendFailed {
                    chain: self.chain,
                    message: format!("getSlot: {}", e),
                })
            })?;
        let authority = self.payer.pubkey();
        let (create, table_address) = create_lookup_table(authority, authority, slot);
        self.send_and_confirm(&[], &[create], &[]).await?;

        for chunk in addresses.chunks(LOOKUP_TABLE_EXTEND_BATCH) {
            let extend =
                extend_lookup_table(table_address, authority, Some(authority), chunk.to_vec());
            self.send_and_confirm(&[], &[extend], &[]).await?;
        }

        self.wait_for_table(&table_address, addresses.len()).await
    }

    async fn wait_for_table(
        &self,
        table_address: &Pubkey,
        expected_len: usize,
    ) -> AppResult<AddressLookupTableAccount> {
        let start = Instant::now();
        loop {
            let account = self
                .client
                .get_account_with_commitment(table_address, self.commitment)
                .await
                .map(|response| response.value)
                .unwrap_or(None);
            if let Some(account) = account {
                let table = AddressLookupTable::deserialize(&account.data).map_err(|e| {
                    AppError::Submit(SubmitError::LookupTableInactive(format!(
                        "{}: {}",
                        table_address, e
                    )))
                })?;
                if table.addresses.len() >= expected_len {
                    // entries become referenceable one slot after the
                    // extend that wrote them lands
                    tokio::time::sleep(POLL_INTERVAL).await;
                    return Ok(AddressLookupTableAccount {
                        key: *table_address,
                        addresses: table.addresses.to_vec(),
                    });
                }
            }

            if start.elapsed() > self.timeout {
                return Err(AppError::Submit(SubmitError::LookupTableInactive(
                    table_address.to_string(),
                )));
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Simulate to measure compute units; a failed simulation is fatal
    async fn measured_compute_units(
        &self,
        instruction: &Instruction,
        tables: &[AddressLookupTableAccount],
    ) -> AppResult<Option<u64>> {
        let blockhash = self.latest_blockhash().await?;
        let message = compile_message(
            &self.payer.pubkey(),
            std::slice::from_ref(instruction),
            tables,
            blockhash,
        )?;
        let probe = VersionedTransaction {
            signatures: vec![
                Signature::default();
                message.header().num_required_signatures as usize
            ],
            message,
        };
        let result = self
            .client
            .simulate_transaction(&probe)
            .await
            .map_err(|e| AppError::Submit(SubmitError::SimulationFailed(e.to_string())))?;
        if let Some(err) = result.value.err {
            return Err(AppError::Submit(SubmitError::SimulationFailed(format!(
                "{:?}",
                err
            ))));
        }
        Ok(result.value.units_consumed)
    }

    /// Oversized instructions ride a lookup table and carry a measured
    /// compute budget
    async fn send_with_lookup_table(
        &self,
        extras: &[Keypair],
        instruction: &Instruction,
    ) -> AppResult<Signature> {
        let addresses: Vec<Pubkey> = instruction
            .accounts
            .iter()
            .map(|meta| meta.pubkey)
            .collect();
        let table = self.prepare_lookup_table(&addresses).await?;
        info!(
            "lookup table {} holds {} addresses",
            table.key,
            table.addresses.len()
        );

        let tables = std::slice::from_ref(&table);
        let measured = self.measured_compute_units(instruction, tables).await?;
        let limit = scale_compute_units(measured);
        debug!("compute unit limit {} from measured {:?}", limit, measured);
        let budget = ComputeBudgetInstruction::set_compute_unit_limit(limit);
        self.send_and_confirm(extras, &[budget, instruction.clone()], tables)
            .await
    }
}

/// Submitter for Solana: matches extra signers against the token's derived
/// keypairs, upgrades oversized instructions to a lookup-table transaction
/// and polls signature status for confirmation.
pub struct SolanaSubmitter;

impl SolanaSubmitter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SolanaSubmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Submitter for SolanaSubmitter {
    async fn submit(
        &self,
        ctx: &WireContext,
        token: &str,
        change: &PendingChange,
    ) -> AppResult<String> {
        let ChangePayload::Solana { instruction } = &change.payload else {
            return Err(AppError::Submit(SubmitError::InvalidTransaction(format!(
                "{} is not a Solana change",
                change.method
            ))));
        };

        let client = ctx.providers.solana(change.chain).await?;
        let payer = ctx.signers.solana_keypair(&change.signer)?;
        let required: Vec<Pubkey> = instruction
            .accounts
            .iter()
            .filter(|meta| meta.is_signer)
            .map(|meta| meta.pubkey)
            .collect();
        let extras = match_extra_signers(&required, &payer.pubkey(), token)?;

        let sender = SolanaSender {
            client: &client,
            chain: change.chain,
            payer: &payer,
            commitment: ctx.providers.commitment(),
            timeout: ctx.providers.confirmation_timeout(),
        };
        let signature = if needs_lookup_table(instruction, &payer.pubkey())? {
            sender.send_with_lookup_table(&extras, instruction).await?
        } else {
            sender
                .send_and_confirm(&extras, std::slice::from_ref(instruction), &[])
                .await?
        };
        Ok(signature.to_string())
    }

    fn family(&self) -> ChainFamily {
        ChainFamily::Solana
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::instruction::AccountMeta;

    fn account_metas(count: usize) -> Vec<AccountMeta> {
        (0..count)
            .map(|_| AccountMeta::new(Pubkey::new_unique(), false))
            .collect()
    }

    #[test]
    fn test_scale_compute_units_floors_small_measurements() {
        assert_eq!(scale_compute_units(None), 1000);
        assert_eq!(scale_compute_units(Some(0)), 1000);
        assert_eq!(scale_compute_units(Some(999)), 1000);
    }

    #[test]
    fn test_scale_compute_units_adds_headroom() {
        assert_eq!(scale_compute_units(Some(1000)), 1500);
        assert_eq!(scale_compute_units(Some(200_000)), 300_000);
        // odd measurements round the headroom up
        assert_eq!(scale_compute_units(Some(1001)), 1502);
    }

    #[test]
    fn test_small_instruction_skips_lookup_table() {
        let payer = Pubkey::new_unique();
        let instruction = Instruction {
            program_id: Pubkey::new_unique(),
            accounts: account_metas(4),
            data: vec![0u8; 40],
        };
        assert!(!needs_lookup_table(&instruction, &payer).unwrap());
    }

    #[test]
    fn test_many_accounts_force_lookup_table() {
        let payer = Pubkey::new_unique();
        let instruction = Instruction {
            program_id: Pubkey::new_unique(),
            accounts: account_metas(LOOKUP_TABLE_ACCOUNT_THRESHOLD + 1),
            data: vec![],
        };
        assert!(needs_lookup_table(&instruction, &payer).unwrap());
    }

    #[test]
    fn test_oversized_payload_forces_lookup_table() {
        let payer = Pubkey::new_unique();
        let instruction = Instruction {
            program_id: Pubkey::new_unique(),
            accounts: account_metas(2),
            data: vec![0u8; MAX_TRANSACTION_SIZE],
        };
        assert!(needs_lookup_table(&instruction, &payer).unwrap());
    }

    #[test]
    fn test_extend_batches_stay_within_one_transaction() {
        let addresses: Vec<Pubkey> = (0..60).map(|_| Pubkey::new_unique()).collect();
        let batches: Vec<_> = addresses.chunks(LOOKUP_TABLE_EXTEND_BATCH).collect();
        assert_eq!(batches.len(), 3);

        let authority = Pubkey::new_unique();
        let extend = extend_lookup_table(
            Pubkey::new_unique(),
            authority,
            Some(authority),
            batches[0].to_vec(),
        );
        let message = compile_message(&authority, &[extend], &[], Hash::default()).unwrap();
        assert!(transaction_size(&message).unwrap() <= MAX_TRANSACTION_SIZE);
    }

    #[test]
    fn test_transaction_size_counts_signatures() {
        let payer = Pubkey::new_unique();
        let co_signer = Pubkey::new_unique();
        let single = Instruction {
            program_id: Pubkey::new_unique(),
            accounts: vec![AccountMeta::new(payer, true)],
            data: vec![],
        };
        let double = Instruction {
            program_id: single.program_id,
            accounts: vec![
                AccountMeta::new(payer, true),
                AccountMeta::new(co_signer, true),
            ],
            data: vec![],
        };
        let small = compile_message(&payer, std::slice::from_ref(&single), &[], Hash::default())
            .and_then(|m| transaction_size(&m))
            .unwrap();
        let large = compile_message(&payer, std::slice::from_ref(&double), &[], Hash::default())
            .and_then(|m| transaction_size(&m))
            .unwrap();
        assert!(large >= small + 64);
    }
}
