pub mod endpoint;
pub mod oft;
pub mod pda;
pub mod uln;

pub use endpoint::EndpointProgram;
pub use oft::OftProgram;
pub use uln::{SendConfigAccount, ReceiveConfigAccount, UlnConfig};

use borsh::BorshDeserialize;
use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult, WireError};

/// Deployment names the Solana wiring resolves program ids under
pub const OFT_DEPLOYMENT: &str = "Oft";
pub const ENDPOINT_DEPLOYMENT: &str = "Endpoint";
pub const ULN_DEPLOYMENT: &str = "Uln";
pub const EXECUTOR_DEPLOYMENT: &str = "Executor";

/// Config kinds accepted by the endpoint's set_config
pub const CONFIG_TYPE_EXECUTOR: u32 = 1;
pub const CONFIG_TYPE_SEND_ULN: u32 = 2;
pub const CONFIG_TYPE_RECEIVE_ULN: u32 = 3;

/// Anchor-style instruction discriminator: first 8 bytes of
/// sha256("global:<method>")
pub fn discriminator(method: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("global:{}", method).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Parse an anchor account, skipping the 8-byte discriminator. Trailing
/// bytes are allowed; accounts may be allocated with slack.
pub fn parse_account<T: BorshDeserialize>(name: &str, data: &[u8]) -> AppResult<T> {
    if data.len() < 8 {
        return Err(AppError::Wire(WireError::AccountDecodeFailed {
            account: name.to_string(),
            message: format!("{} bytes is shorter than the discriminator", data.len()),
        }));
    }
    T::deserialize(&mut &data[8..]).map_err(|e| {
        AppError::Wire(WireError::AccountDecodeFailed {
            account: name.to_string(),
            message: e.to_string(),
        })
    })
}
