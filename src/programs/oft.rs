use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;

use crate::error::{AppError, AppResult};
use crate::programs::{discriminator, pda};

/// Message-layer decimal precision shared by every chain of a deployment
pub const SHARED_DECIMALS: u8 = 6;

/// SPL token mint account size
pub const MINT_ACCOUNT_SPACE: u64 = 82;

/// Peer store of one remote, written by set_peer
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct PeerAccount {
    pub peer_address: [u8; 32],
    pub bump: u8,
}

/// Enforced options store of one remote, one blob per message type
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct EnforcedOptionsAccount {
    pub send: Vec<u8>,
    pub send_and_call: Vec<u8>,
    pub bump: u8,
}

#[derive(BorshSerialize)]
struct InitOftArgs {
    admin: [u8; 32],
    shared_decimals: u8,
}

#[derive(BorshSerialize)]
struct InitAdapterOftArgs {
    admin: [u8; 32],
    shared_decimals: u8,
}

#[derive(BorshSerialize)]
struct SetPeerArgs {
    dst_eid: u32,
    peer: [u8; 32],
}

#[derive(BorshSerialize)]
struct SetEnforcedOptionsArgs {
    dst_eid: u32,
    send: Vec<u8>,
    send_and_call: Vec<u8>,
}

/// Client for the OFT program of one token deployment
#[derive(Debug)]
pub struct OftProgram {
    pub program_id: Pubkey,
}

impl OftProgram {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn config_pda(&self, token_account: &Pubkey) -> Pubkey {
        pda::oft_config(&self.program_id, token_account)
    }

    pub fn peer_pda(&self, oft_config: &Pubkey, dst_eid: u32) -> Pubkey {
        pda::peer(&self.program_id, oft_config, dst_eid)
    }

    pub fn enforced_options_pda(&self, oft_config: &Pubkey, dst_eid: u32) -> Pubkey {
        pda::enforced_options(&self.program_id, oft_config, dst_eid)
    }

    fn instruction(&self, method: &str, args: impl BorshSerialize, accounts: Vec<AccountMeta>) -> AppResult<Instruction> {
        let mut data = discriminator(method).to_vec();
        args.serialize(&mut data)
            .map_err(|e| AppError::Internal(format!("args encode for {}: {}", method, e)))?;
        Ok(Instruction {
            program_id: self.program_id,
            accounts,
            data,
        })
    }

    /// Register a fresh OFT: config store keyed by the mint, mint authority
    /// moved to the config store
    pub fn init_oft(&self, payer: &Pubkey, mint: &Pubkey) -> AppResult<Instruction> {
        let oft_config = self.config_pda(mint);
        self.instruction(
            "init_oft",
            InitOftArgs {
                admin: payer.to_bytes(),
                shared_decimals: SHARED_DECIMALS,
            },
            vec![
                AccountMeta::new(*payer, true),
                AccountMeta::new(oft_config, false),
                AccountMeta::new(*mint, false),
                AccountMeta::new_readonly(spl_token::id(), false),
                AccountMeta::new_readonly(solana_system_interface::program::id(), false),
            ],
        )
    }

    /// Register an adapter: config store keyed by the lockbox, which signs
    /// its own creation
    pub fn init_adapter_oft(
        &self,
        payer: &Pubkey,
        token_mint: &Pubkey,
        lockbox: &Pubkey,
    ) -> AppResult<Instruction> {
        let oft_config = self.config_pda(lockbox);
        self.instruction(
            "init_adapter_oft",
            InitAdapterOftArgs {
                admin: payer.to_bytes(),
                shared_decimals: SHARED_DECIMALS,
            },
            vec![
                AccountMeta::new(*payer, true),
                AccountMeta::new(oft_config, false),
                AccountMeta::new_readonly(*token_mint, false),
                AccountMeta::new(*lockbox, true),
                AccountMeta::new_readonly(spl_token::id(), false),
                AccountMeta::new_readonly(solana_system_interface::program::id(), false),
            ],
        )
    }

    pub fn set_peer(
        &self,
        admin: &Pubkey,
        oft_config: &Pubkey,
        dst_eid: u32,
        peer: [u8; 32],
    ) -> AppResult<Instruction> {
        let peer_pda = self.peer_pda(oft_config, dst_eid);
        self.instruction(
            "set_peer",
            SetPeerArgs { dst_eid, peer },
            vec![
                AccountMeta::new(*admin, true),
                AccountMeta::new_readonly(*oft_config, false),
                AccountMeta::new(peer_pda, false),
                AccountMeta::new_readonly(solana_system_interface::program::id(), false),
            ],
        )
    }

    /// One instruction carries both message types; callers pass the full
    /// desired state
    pub fn set_enforced_options(
        &self,
        admin: &Pubkey,
        oft_config: &Pubkey,
        dst_eid: u32,
        send: Vec<u8>,
        send_and_call: Vec<u8>,
    ) -> AppResult<Instruction> {
        let options_pda = self.enforced_options_pda(oft_config, dst_eid);
        self.instruction(
            "set_enforced_options",
            SetEnforcedOptionsArgs {
                dst_eid,
                send,
                send_and_call,
            },
            vec![
                AccountMeta::new(*admin, true),
                AccountMeta::new_readonly(*oft_config, false),
                AccountMeta::new(options_pda, false),
                AccountMeta::new_readonly(solana_system_interface::program::id(), false),
            ],
        )
    }
}

/// System and SPL instructions that materialize a fresh mint before the OFT
/// program takes it over
pub fn create_mint_instructions(
    payer: &Pubkey,
    mint: &Pubkey,
    authority: &Pubkey,
    decimals: u8,
    rent_lamports: u64,
) -> AppResult<Vec<Instruction>> {
    let create = solana_system_interface::instruction::create_account(
        payer,
        mint,
        rent_lamports,
        MINT_ACCOUNT_SPACE,
        &spl_token::id(),
    );
    let init = spl_token::instruction::initialize_mint(
        &spl_token::id(),
        mint,
        authority,
        None,
        decimals,
    )
    .map_err(|e| AppError::Internal(format!("initialize_mint: {}", e)))?;
    Ok(vec![create, init])
}
