pub mod evm;
pub mod solana;

pub use evm::EvmSubmitter;
pub use solana::SolanaSubmitter;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{AppResult, WireError};
use crate::model::ChainFamily;
use crate::wire::{PendingChange, WireContext};

/// Submitter trait - implemented by each chain family's transaction sender
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Sign, send and confirm one change, returning the transaction hash
    /// or signature
    async fn submit(
        &self,
        ctx: &WireContext,
        token: &str,
        change: &PendingChange,
    ) -> AppResult<String>;

    /// Chain family this submitter handles
    fn family(&self) -> ChainFamily;
}

/// SubmitRouter - routes each change to its family's submitter
pub struct SubmitRouter {
    submitters: HashMap<ChainFamily, Arc<dyn Submitter>>,
}

impl SubmitRouter {
    pub fn new() -> Self {
        Self {
            submitters: HashMap::new(),
        }
    }

    /// Register a submitter for a chain family
    pub fn register_submitter(&mut self, family: ChainFamily, submitter: Arc<dyn Submitter>) {
        info!("Registering submitter for family: {:?}", family);
        self.submitters.insert(family, submitter);
    }

    pub async fn submit(
        &self,
        ctx: &WireContext,
        token: &str,
        change: &PendingChange,
    ) -> AppResult<String> {
        let submitter = self
            .submitters
            .get(&change.family())
            .ok_or(WireError::UnsupportedChain(change.chain))?;
        submitter.submit(ctx, token, change).await
    }

    /// Send changes one at a time in emitted order. Changes of one run
    /// share a payer per family, so sends must not overlap.
    #[instrument(skip_all, fields(token = %token, count = changes.len()))]
    pub async fn submit_all(
        &self,
        ctx: &WireContext,
        token: &str,
        changes: &[PendingChange],
    ) -> AppResult<Vec<String>> {
        let mut receipts = Vec::with_capacity(changes.len());
        for change in changes {
            info!("submitting {}", change.summary());
            let receipt = self.submit(ctx, token, change).await?;
            info!("confirmed {} as {}", change.summary(), receipt);
            receipts.push(receipt);
        }
        Ok(receipts)
    }

    pub fn supports_family(&self, family: ChainFamily) -> bool {
        self.submitters.contains_key(&family)
    }
}

impl Default for SubmitRouter {
    fn default() -> Self {
        let mut router = Self::new();
        router.register_submitter(ChainFamily::Evm, Arc::new(EvmSubmitter::new()));
        router.register_submitter(ChainFamily::Solana, Arc::new(SolanaSubmitter::new()));
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appconfig::AppConfig;
    use crate::error::AppError;
    use crate::keys::{SignerRegistry, DEPLOYER};
    use crate::model::{Chain, Stage};
    use crate::providers::ProviderPool;
    use crate::wire::ChangePayload;
    use serde_json::json;

    fn context() -> WireContext {
        WireContext {
            stage: Stage::Sandbox,
            app_config: AppConfig::from_json(r#"{ "token": {} }"#).unwrap(),
            providers: Arc::new(ProviderPool::new(Stage::Sandbox)),
            signers: Arc::new(SignerRegistry::single_mnemonic(
                Stage::Sandbox,
                "test test test test test test test test test test test junk",
            )),
            deployments: vec![],
        }
    }

    fn solana_change() -> PendingChange {
        PendingChange {
            expected: json!(true),
            current: json!(false),
            method: "initOFT".to_string(),
            payload: ChangePayload::Solana {
                instruction: solana_sdk::instruction::Instruction {
                    program_id: solana_sdk::pubkey::Pubkey::new_unique(),
                    accounts: vec![],
                    data: vec![],
                },
            },
            chain: Chain::Solana,
            remote: None,
            target: "program".to_string(),
            signer: DEPLOYER.to_string(),
            metadata: json!({}),
        }
    }

    #[tokio::test]
    async fn test_unregistered_family_is_rejected() {
        let router = SubmitRouter::new();
        let err = router
            .submit(&context(), "Rocket", &solana_change())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Wire(WireError::UnsupportedChain(Chain::Solana))
        ));
    }

    #[test]
    fn test_default_router_covers_both_families() {
        let router = SubmitRouter::default();
        assert!(router.supports_family(ChainFamily::Evm));
        assert!(router.supports_family(ChainFamily::Solana));
    }
}
