use alloy::network::TransactionBuilder;
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use tracing::debug;

use crate::error::{AppError, AppResult, SubmitError};
use crate::model::ChainFamily;
use crate::submit::Submitter;
use crate::wire::{ChangePayload, PendingChange, WireContext};

/// Submitter for EVM chains: encodes the typed call to calldata, sends it
/// through a wallet-filled provider and waits for the receipt.
pub struct EvmSubmitter;

impl EvmSubmitter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EvmSubmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Submitter for EvmSubmitter {
    async fn submit(
        &self,
        ctx: &WireContext,
        _token: &str,
        change: &PendingChange,
    ) -> AppResult<String> {
        let ChangePayload::Evm { to, call } = &change.payload else {
            return Err(AppError::Submit(SubmitError::InvalidTransaction(format!(
                "{} is not an EVM change",
                change.method
            ))));
        };

        let signer = ctx.signers.evm_signer(&change.signer)?;
        let provider = ctx.providers.evm_with_wallet(change.chain, signer).await?;

        let request = TransactionRequest::default()
            .with_to(*to)
            .with_input(call.abi_encode());
        debug!("sending {} to {}", call.method(), to);

        let receipt = provider
            .send_transaction(request)
            .await
            .map_err(|e| {
                AppError::Submit(SubmitError::SendFailed {
                    chain: change.chain,
                    message: e.to_string(),
                })
            })?
            .get_receipt()
            .await
            .map_err(|e| {
                AppError::Submit(SubmitError::SendFailed {
                    chain: change.chain,
                    message: e.to_string(),
                })
            })?;

        if !receipt.status() {
            return Err(AppError::Submit(SubmitError::SendFailed {
                chain: change.chain,
                message: format!("{} reverted", receipt.transaction_hash),
            }));
        }
        Ok(receipt.transaction_hash.to_string())
    }

    fn family(&self) -> ChainFamily {
        ChainFamily::Evm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appconfig::AppConfig;
    use crate::keys::{SignerRegistry, DEPLOYER};
    use crate::model::{Chain, Stage};
    use crate::providers::ProviderPool;
    use serde_json::json;
    use std::sync::Arc;

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

    #[tokio::test]
    async fn test_rejects_non_evm_payload() {
        let change = PendingChange {
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
        };
        let err = EvmSubmitter::new()
            .submit(&context(), "Rocket", &change)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Submit(SubmitError::InvalidTransaction(_))
        ));
    }
}
