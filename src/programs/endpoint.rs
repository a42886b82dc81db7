use borsh::BorshSerialize;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;

use crate::error::{AppError, AppResult};
use crate::programs::{discriminator, pda};

#[derive(BorshSerialize)]
struct InitSendLibraryArgs {
    eid: u32,
}

#[derive(BorshSerialize)]
struct InitReceiveLibraryArgs {
    eid: u32,
}

#[derive(BorshSerialize)]
struct InitNonceArgs {
    remote_eid: u32,
    remote_oapp: [u8; 32],
}

#[derive(BorshSerialize)]
struct InitOappConfigArgs {
    eid: u32,
}

#[derive(BorshSerialize)]
struct SetConfigArgs {
    oapp: [u8; 32],
    eid: u32,
    config_type: u32,
    config: Vec<u8>,
}

/// Client for the messaging endpoint program. Library and nonce stores
/// live under the endpoint, config stores under the message library it
/// delegates to.
#[derive(Debug)]
pub struct EndpointProgram {
    pub program_id: Pubkey,
}

impl EndpointProgram {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn send_library_config_pda(&self, oapp: &Pubkey, dst_eid: u32) -> Pubkey {
        pda::send_library_config(&self.program_id, oapp, dst_eid)
    }

    pub fn receive_library_config_pda(&self, oapp: &Pubkey, src_eid: u32) -> Pubkey {
        pda::receive_library_config(&self.program_id, oapp, src_eid)
    }

    pub fn nonce_pda(&self, oapp: &Pubkey, remote_eid: u32, remote_peer: &[u8; 32]) -> Pubkey {
        pda::nonce(&self.program_id, oapp, remote_eid, remote_peer)
    }

    fn instruction(
        &self,
        method: &str,
        args: impl BorshSerialize,
        accounts: Vec<AccountMeta>,
    ) -> AppResult<Instruction> {
        let mut data = discriminator(method).to_vec();
        args.serialize(&mut data)
            .map_err(|e| AppError::Internal(format!("args encode for {}: {}", method, e)))?;
        Ok(Instruction {
            program_id: self.program_id,
            accounts,
            data,
        })
    }

    pub fn init_send_library(
        &self,
        delegate: &Pubkey,
        oapp: &Pubkey,
        dst_eid: u32,
    ) -> AppResult<Instruction> {
        let store = self.send_library_config_pda(oapp, dst_eid);
        self.instruction(
            "init_send_library",
            InitSendLibraryArgs { eid: dst_eid },
            vec![
                AccountMeta::new(*delegate, true),
                AccountMeta::new_readonly(*oapp, false),
                AccountMeta::new(store, false),
                AccountMeta::new_readonly(solana_system_interface::program::id(), false),
            ],
        )
    }

    pub fn init_receive_library(
        &self,
        delegate: &Pubkey,
        oapp: &Pubkey,
        src_eid: u32,
    ) -> AppResult<Instruction> {
        let store = self.receive_library_config_pda(oapp, src_eid);
        self.instruction(
            "init_receive_library",
            InitReceiveLibraryArgs { eid: src_eid },
            vec![
                AccountMeta::new(*delegate, true),
                AccountMeta::new_readonly(*oapp, false),
                AccountMeta::new(store, false),
                AccountMeta::new_readonly(solana_system_interface::program::id(), false),
            ],
        )
    }

    pub fn init_nonce(
        &self,
        delegate: &Pubkey,
        oapp: &Pubkey,
        remote_eid: u32,
        remote_peer: [u8; 32],
    ) -> AppResult<Instruction> {
        let store = self.nonce_pda(oapp, remote_eid, &remote_peer);
        self.instruction(
            "init_nonce",
            InitNonceArgs {
                remote_eid,
                remote_oapp: remote_peer,
            },
            vec![
                AccountMeta::new(*delegate, true),
                AccountMeta::new_readonly(*oapp, false),
                AccountMeta::new(store, false),
                AccountMeta::new_readonly(solana_system_interface::program::id(), false),
            ],
        )
    }

    /// Create the message library's config stores for one remote, which
    /// registers the OApp with that library
    pub fn init_oapp_config(
        &self,
        delegate: &Pubkey,
        oapp: &Pubkey,
        message_lib: &Pubkey,
        eid: u32,
    ) -> AppResult<Instruction> {
        let send_store = pda::send_config(message_lib, oapp, eid);
        let receive_store = pda::receive_config(message_lib, oapp, eid);
        self.instruction(
            "init_oapp_config",
            InitOappConfigArgs { eid },
            vec![
                AccountMeta::new(*delegate, true),
                AccountMeta::new_readonly(*oapp, false),
                AccountMeta::new_readonly(*message_lib, false),
                AccountMeta::new(send_store, false),
                AccountMeta::new(receive_store, false),
                AccountMeta::new_readonly(solana_system_interface::program::id(), false),
            ],
        )
    }

    /// Write one config blob through the endpoint into the library's store
    pub fn set_config(
        &self,
        delegate: &Pubkey,
        oapp: &Pubkey,
        message_lib: &Pubkey,
        eid: u32,
        config_type: u32,
        config: Vec<u8>,
        store: Pubkey,
    ) -> AppResult<Instruction> {
        self.instruction(
            "set_config",
            SetConfigArgs {
                oapp: oapp.to_bytes(),
                eid,
                config_type,
                config,
            },
            vec![
                AccountMeta::new(*delegate, true),
                AccountMeta::new_readonly(*oapp, false),
                AccountMeta::new_readonly(*message_lib, false),
                AccountMeta::new(store, false),
                AccountMeta::new_readonly(solana_system_interface::program::id(), false),
            ],
        )
    }
}
