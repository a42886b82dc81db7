use borsh::{BorshDeserialize, BorshSerialize};
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;

use crate::error::{AppError, AppResult};

/// Executor message size cap applied when wiring a fresh deployment
pub const DEFAULT_MAX_MESSAGE_SIZE: u32 = 10_000;

/// Verification settings stored per (oapp, remote) in the message library.
/// DVN entries are raw program keys; count fields mirror the list lengths.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct UlnConfig {
    pub confirmations: u64,
    pub required_dvn_count: u8,
    pub optional_dvn_count: u8,
    pub optional_dvn_threshold: u8,
    pub required_dvns: Vec<[u8; 32]>,
    pub optional_dvns: Vec<[u8; 32]>,
}

impl UlnConfig {
    /// Sort both DVN lists so comparison ignores on-chain ordering
    pub fn canonicalized(mut self) -> Self {
        self.required_dvns.sort_unstable();
        self.optional_dvns.sort_unstable();
        self
    }

    pub fn encode(&self) -> AppResult<Vec<u8>> {
        borsh::to_vec(self).map_err(|e| AppError::Internal(format!("uln config encode: {}", e)))
    }

    pub fn to_json(&self) -> Value {
        json!({
            "confirmations": self.confirmations,
            "requiredDVNs": keys_json(&self.required_dvns),
            "optionalDVNs": keys_json(&self.optional_dvns),
            "optionalDVNsThreshold": self.optional_dvn_threshold,
        })
    }
}

/// Executor settings stored alongside the send config
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutorSettings {
    pub max_message_size: u32,
    pub executor: [u8; 32],
}

impl ExecutorSettings {
    pub fn encode(&self) -> AppResult<Vec<u8>> {
        borsh::to_vec(self)
            .map_err(|e| AppError::Internal(format!("executor config encode: {}", e)))
    }

    pub fn to_json(&self) -> Value {
        json!({
            "maxMessageSize": self.max_message_size,
            "executor": Pubkey::new_from_array(self.executor).to_string(),
        })
    }
}

/// "SendConfig" store: verification plus executor settings for outbound
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SendConfigAccount {
    pub bump: u8,
    pub uln: UlnConfig,
    pub executor: ExecutorSettings,
}

/// "ReceiveConfig" store: verification settings for inbound
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceiveConfigAccount {
    pub bump: u8,
    pub uln: UlnConfig,
}

fn keys_json(keys: &[[u8; 32]]) -> Vec<String> {
    keys.iter()
        .map(|k| Pubkey::new_from_array(*k).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::{discriminator, parse_account};

    fn sample() -> UlnConfig {
        UlnConfig {
            confirmations: 6,
            required_dvn_count: 2,
            optional_dvn_count: 0,
            optional_dvn_threshold: 0,
            required_dvns: vec![[9u8; 32], [1u8; 32]],
            optional_dvns: vec![],
        }
    }

    #[test]
    fn test_canonicalized_sorts_by_key_bytes() {
        let sorted = sample().canonicalized();
        assert_eq!(sorted.required_dvns, vec![[1u8; 32], [9u8; 32]]);
    }

    #[test]
    fn test_canonical_forms_compare_equal_regardless_of_order() {
        let mut reordered = sample();
        reordered.required_dvns.reverse();
        assert_ne!(sample(), reordered);
        assert_eq!(sample().canonicalized(), reordered.canonicalized());
    }

    #[test]
    fn test_send_config_account_round_trip() {
        let account = SendConfigAccount {
            bump: 253,
            uln: sample(),
            executor: ExecutorSettings {
                max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
                executor: [4u8; 32],
            },
        };
        let mut data = discriminator("send_config").to_vec();
        account.serialize(&mut data).unwrap();
        let parsed: SendConfigAccount = parse_account("SendConfig", &data).unwrap();
        assert_eq!(parsed, account);
    }

    #[test]
    fn test_encode_is_deterministic() {
        assert_eq!(sample().encode().unwrap(), sample().encode().unwrap());
        assert_ne!(
            sample().encode().unwrap(),
            sample().canonicalized().encode().unwrap()
        );
    }

    #[test]
    fn test_json_reports_base58_keys() {
        let value = sample().to_json();
        let listed = value["requiredDVNs"].as_array().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(
            listed[0].as_str().unwrap(),
            Pubkey::new_from_array([9u8; 32]).to_string()
        );
    }
}
