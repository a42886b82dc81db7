use solana_sdk::pubkey::Pubkey;

pub const OFT_CONFIG_SEED: &[u8] = b"OftConfig";
pub const PEER_SEED: &[u8] = b"Peer";
pub const ENFORCED_OPTIONS_SEED: &[u8] = b"EnforcedOptions";
pub const SEND_LIBRARY_CONFIG_SEED: &[u8] = b"SendLibraryConfig";
pub const RECEIVE_LIBRARY_CONFIG_SEED: &[u8] = b"ReceiveLibraryConfig";
pub const NONCE_SEED: &[u8] = b"Nonce";
pub const SEND_CONFIG_SEED: &[u8] = b"SendConfig";
pub const RECEIVE_CONFIG_SEED: &[u8] = b"ReceiveConfig";
pub const EXECUTOR_CONFIG_SEED: &[u8] = b"ExecutorConfig";
pub const DVN_CONFIG_SEED: &[u8] = b"DvnConfig";

/// Config store of one token deployment, keyed by its mint (fresh OFT) or
/// lockbox (adapter)
pub fn oft_config(oft_program: &Pubkey, token_account: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[OFT_CONFIG_SEED, token_account.as_ref()], oft_program).0
}

pub fn peer(oft_program: &Pubkey, oft_config: &Pubkey, dst_eid: u32) -> Pubkey {
    Pubkey::find_program_address(
        &[PEER_SEED, oft_config.as_ref(), &dst_eid.to_be_bytes()],
        oft_program,
    )
    .0
}

pub fn enforced_options(oft_program: &Pubkey, oft_config: &Pubkey, dst_eid: u32) -> Pubkey {
    Pubkey::find_program_address(
        &[ENFORCED_OPTIONS_SEED, oft_config.as_ref(), &dst_eid.to_be_bytes()],
        oft_program,
    )
    .0
}

pub fn send_library_config(endpoint_program: &Pubkey, oapp: &Pubkey, dst_eid: u32) -> Pubkey {
    Pubkey::find_program_address(
        &[SEND_LIBRARY_CONFIG_SEED, oapp.as_ref(), &dst_eid.to_be_bytes()],
        endpoint_program,
    )
    .0
}

pub fn receive_library_config(endpoint_program: &Pubkey, oapp: &Pubkey, src_eid: u32) -> Pubkey {
    Pubkey::find_program_address(
        &[RECEIVE_LIBRARY_CONFIG_SEED, oapp.as_ref(), &src_eid.to_be_bytes()],
        endpoint_program,
    )
    .0
}

/// Nonce store exists per (oapp, remote eid, remote peer) triple, so it can
/// only be derived once the peer bytes are known
pub fn nonce(
    endpoint_program: &Pubkey,
    oapp: &Pubkey,
    remote_eid: u32,
    remote_peer: &[u8; 32],
) -> Pubkey {
    Pubkey::find_program_address(
        &[
            NONCE_SEED,
            oapp.as_ref(),
            &remote_eid.to_be_bytes(),
            remote_peer,
        ],
        endpoint_program,
    )
    .0
}

pub fn send_config(uln_program: &Pubkey, oapp: &Pubkey, dst_eid: u32) -> Pubkey {
    Pubkey::find_program_address(
        &[SEND_CONFIG_SEED, oapp.as_ref(), &dst_eid.to_be_bytes()],
        uln_program,
    )
    .0
}

pub fn receive_config(uln_program: &Pubkey, oapp: &Pubkey, src_eid: u32) -> Pubkey {
    Pubkey::find_program_address(
        &[RECEIVE_CONFIG_SEED, oapp.as_ref(), &src_eid.to_be_bytes()],
        uln_program,
    )
    .0
}

pub fn executor_config(executor_program: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[EXECUTOR_CONFIG_SEED], executor_program).0
}

pub fn dvn_config(dvn_program: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[DVN_CONFIG_SEED], dvn_program).0
}
