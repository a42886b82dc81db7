use std::collections::BTreeMap;

use alloy::signers::local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::{Digest, Sha256, Sha512};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};

use crate::error::{AppError, AppResult, SignError};
use crate::model::{ChainFamily, Stage};

/// Alias of the account that signs wiring transactions
pub const DEPLOYER: &str = "deployer";

/// Solana signer keys use the all-hardened path, per SLIP-0010
const SOLANA_PATH: &str = "m/44'/501'/0'/0'";

type HmacSha512 = Hmac<Sha512>;

#[derive(Debug, Clone, Deserialize)]
pub struct SignerEntry {
    pub mnemonic: String,
    #[serde(default)]
    pub path: Option<String>,
}

/// Signer keys for one stage, keyed by chain family and alias.
/// The backing file is keyed [stage][family][alias].
pub struct SignerRegistry {
    stage: Stage,
    entries: BTreeMap<(ChainFamily, String), SignerEntry>,
}

type SignerFile = BTreeMap<String, BTreeMap<String, BTreeMap<String, SignerEntry>>>;

impl SignerRegistry {
    pub fn from_json(raw: &str, stage: Stage) -> AppResult<Self> {
        let file: SignerFile = serde_json::from_str(raw)
            .map_err(|e| AppError::InvalidInput(format!("signer file parse error: {}", e)))?;
        let mut entries = BTreeMap::new();
        if let Some(families) = file.get(stage.as_str()) {
            for (family, aliases) in families {
                let family = match family.as_str() {
                    "evm" => ChainFamily::Evm,
                    "solana" => ChainFamily::Solana,
                    other => {
                        return Err(AppError::InvalidInput(format!(
                            "unknown signer family: {}",
                            other
                        )))
                    }
                };
                for (alias, entry) in aliases {
                    entries.insert((family, alias.clone()), entry.clone());
                }
            }
        }
        Ok(Self { stage, entries })
    }

    /// One mnemonic for both families under the deployer alias
    pub fn single_mnemonic(stage: Stage, mnemonic: &str) -> Self {
        let mut entries = BTreeMap::new();
        for family in [ChainFamily::Evm, ChainFamily::Solana] {
            entries.insert(
                (family, DEPLOYER.to_string()),
                SignerEntry {
                    mnemonic: mnemonic.to_string(),
                    path: None,
                },
            );
        }
        Self { stage, entries }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn entry(&self, family: ChainFamily, alias: &str) -> AppResult<&SignerEntry> {
        self.entries
            .get(&(family, alias.to_string()))
            .ok_or_else(|| {
                AppError::Sign(SignError::MissingKey {
                    stage: self.stage,
                    family,
                    alias: alias.to_string(),
                })
            })
    }

    /// EVM signing key for an alias, derived at the entry's path or the
    /// builder's BIP-44 default
    pub fn evm_signer(&self, alias: &str) -> AppResult<PrivateKeySigner> {
        let entry = self.entry(ChainFamily::Evm, alias)?;
        let mut builder = MnemonicBuilder::<English>::default().phrase(entry.mnemonic.clone());
        if let Some(path) = &entry.path {
            builder = builder
                .derivation_path(path)
                .map_err(|e| AppError::Sign(SignError::Derivation(e.to_string())))?;
        }
        builder
            .build()
            .map_err(|e| AppError::Sign(SignError::Derivation(e.to_string())))
    }

    /// Solana signing keypair for an alias
    pub fn solana_keypair(&self, alias: &str) -> AppResult<Keypair> {
        let entry = self.entry(ChainFamily::Solana, alias)?;
        let mnemonic = bip39::Mnemonic::parse(&entry.mnemonic)
            .map_err(|e| AppError::Sign(SignError::Mnemonic(e.to_string())))?;
        let seed = mnemonic.to_seed("");
        let path = entry.path.as_deref().unwrap_or(SOLANA_PATH);
        let components = parse_hardened_path(path)?;
        let secret = slip10_ed25519(&seed, &components)?;
        Ok(Keypair::new_from_array(secret))
    }
}

/// Parse "m/44'/501'/0'/0'" into its component indices. Ed25519 derivation
/// hardens every level, so the marks are accepted but not required.
fn parse_hardened_path(path: &str) -> AppResult<Vec<u32>> {
    let stripped = path.strip_prefix("m/").ok_or_else(|| {
        AppError::Sign(SignError::Derivation(format!(
            "path must start with m/: {}",
            path
        )))
    })?;
    stripped
        .split('/')
        .map(|component| {
            let digits = component.trim_end_matches(['\'', 'h']);
            digits.parse::<u32>().map_err(|_| {
                AppError::Sign(SignError::Derivation(format!(
                    "invalid path component: {}",
                    component
                )))
            })
        })
        .collect()
}

/// SLIP-0010 ed25519 derivation: HMAC-SHA512 master keyed "ed25519 seed",
/// then hardened children over 0x00 || key || index
fn slip10_ed25519(seed: &[u8], path: &[u32]) -> AppResult<[u8; 32]> {
    let mut mac = HmacSha512::new_from_slice(b"ed25519 seed")
        .map_err(|e| AppError::Sign(SignError::Derivation(e.to_string())))?;
    mac.update(seed);
    let digest = mac.finalize().into_bytes();

    let mut key = [0u8; 32];
    let mut chain_code = [0u8; 32];
    key.copy_from_slice(&digest[..32]);
    chain_code.copy_from_slice(&digest[32..]);

    for component in path {
        let mut mac = HmacSha512::new_from_slice(&chain_code)
            .map_err(|e| AppError::Sign(SignError::Derivation(e.to_string())))?;
        mac.update(&[0x00]);
        mac.update(&key);
        mac.update(&(component | 0x8000_0000).to_be_bytes());
        let digest = mac.finalize().into_bytes();
        key.copy_from_slice(&digest[..32]);
        chain_code.copy_from_slice(&digest[32..]);
    }

    Ok(key)
}

fn seed32(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Mint keypair for a token, derived from the token name alone. The same
/// name yields the same mint on every run and every machine.
pub fn mint_keypair(token_name: &str) -> Keypair {
    Keypair::new_from_array(seed32(token_name.as_bytes()))
}

/// Lockbox keypair for adapter deployments, derived from the token name
/// with a lockbox suffix
pub fn lockbox_keypair(token_name: &str) -> Keypair {
    Keypair::new_from_array(seed32(format!("{}-lockbox", token_name).as_bytes()))
}

/// Match required signers beyond the payer against the token's derived
/// keypairs. Any signer that is neither payer, mint nor lockbox is unknown.
pub fn match_extra_signers(
    required: &[Pubkey],
    payer: &Pubkey,
    token_name: &str,
) -> AppResult<Vec<Keypair>> {
    let mint = mint_keypair(token_name);
    let lockbox = lockbox_keypair(token_name);
    let mut extras = Vec::new();
    for signer in required {
        if signer == payer {
            continue;
        }
        if *signer == mint.pubkey() {
            extras.push(mint_keypair(token_name));
        } else if *signer == lockbox.pubkey() {
            extras.push(lockbox_keypair(token_name));
        } else {
            return Err(AppError::Sign(SignError::UnknownSigner(signer.to_string())));
        }
    }
    Ok(extras)
}
