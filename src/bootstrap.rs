use std::sync::Arc;

use tracing::info;

use crate::appconfig::AppConfig;
use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::keys::SignerRegistry;
use crate::model::{DeploymentRegistry, StaticDeployments};
use crate::providers::ProviderPool;
use crate::wire::WireContext;

/// Assemble the context one reconciliation run works against: parsed token
/// config, signer registry, provider pool and the deployment records of
/// every requested network.
pub async fn initialize_wire_context(settings: &Settings) -> AppResult<WireContext> {
    info!("Initializing wiring components ...");

    let stage = settings.parse_stage()?;
    let networks = settings.networks()?;

    let app_config = AppConfig::from_json(&read_file(&settings.app_config_path)?)?;
    info!("✅ Token config loaded from {}", settings.app_config_path);

    let signers = match &settings.signers_path {
        Some(path) => SignerRegistry::from_json(&read_file(path)?, stage)?,
        None => SignerRegistry::single_mnemonic(stage, &settings.mnemonic),
    };
    info!("✅ Signer registry initialized for stage: {}", stage);

    let overrides = settings.rpc_overrides()?;
    if !overrides.is_empty() {
        info!("Using {} rpc overrides", overrides.len());
    }
    let providers = Arc::new(ProviderPool::with_overrides(stage, overrides));

    let registry = StaticDeployments::from_json(&read_file(&settings.deployments_path)?)?;
    let deployments = registry.get_deployments(&networks).await?;
    info!(
        "✅ {} deployment records loaded for {} networks",
        deployments.len(),
        networks.len()
    );

    Ok(WireContext {
        stage,
        app_config,
        providers,
        signers: Arc::new(signers),
        deployments,
    })
}

fn read_file(path: &str) -> AppResult<String> {
    std::fs::read_to_string(path).map_err(|e| AppError::InvalidInput(format!("{}: {}", path, e)))
}
