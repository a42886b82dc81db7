mod appconfig;
mod bootstrap;
mod config;
mod error;
mod keys;
mod model;
mod programs;
mod providers;
mod submit;
mod wire;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::submit::SubmitRouter;
use crate::wire::WireRouter;

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,oftwire=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("🚀 Starting OFT wiring run");

    dotenv::dotenv().ok();
    let settings = config::Settings::from_env()?;
    let networks = settings.networks()?;
    let token = settings.token.clone();

    let ctx = bootstrap::initialize_wire_context(&settings).await?;

    info!(
        "Reconciling {} across networks: {:?}",
        token,
        networks.iter().map(|n| n.to_string()).collect::<Vec<_>>()
    );

    let changes = WireRouter::default()
        .collect(&ctx, &token, &networks)
        .await?;

    if changes.is_empty() {
        info!("✅ No drift found - {} is fully wired", token);
        return Ok(());
    }

    info!("Found {} pending changes", changes.len());
    for change in &changes {
        info!(
            "  {} | expected {} | current {}",
            change.summary(),
            change.expected,
            change.current
        );
    }

    if settings.dry_run {
        info!("DRY_RUN set - leaving {} changes unsubmitted", changes.len());
        return Ok(());
    }

    let receipts = SubmitRouter::default()
        .submit_all(&ctx, &token, &changes)
        .await?;

    info!("🌐 Applied {} changes successfully", receipts.len());

    Ok(())
}
