use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use labflow_core::constants::{CODE_TABLE_ENV, ENRICH_ENV};
use labflow_core::{CoreConfig, ResultPipeline};
use mllp::{ADDR_ENV, IDLE_TIMEOUT_ENV, MllpConfig, PipelineHandler};

/// Main entry point for the labflow listener
///
/// Resolves configuration once, then accepts MLLP connections and runs every received lab
/// result message through the pipeline, replying with an acknowledgement per message.
///
/// # Environment Variables
/// - `LABFLOW_MLLP_ADDR`: listen address (default: "0.0.0.0:2575")
/// - `LABFLOW_MLLP_IDLE_TIMEOUT_SECS`: per-connection idle timeout (default: none)
/// - `LABFLOW_CODE_TABLE`: YAML code table replacing the built-in one
/// - `LABFLOW_ENRICH`: enrichment request flag passed to the pipeline
///
/// # Returns
/// * `Ok(())` - If the listener shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration or the listener fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("labflow_run=info".parse()?)
                .add_directive("labflow_core=info".parse()?)
                .add_directive("mllp=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let core_cfg = CoreConfig::from_env_values(
        std::env::var(CODE_TABLE_ENV).ok(),
        std::env::var(ENRICH_ENV).ok(),
    )?;
    let mllp_cfg = MllpConfig::from_env_values(
        std::env::var(ADDR_ENV).ok(),
        std::env::var(IDLE_TIMEOUT_ENV).ok(),
    )?;

    tracing::info!(
        addr = %mllp_cfg.addr(),
        idle_timeout = ?mllp_cfg.idle_timeout(),
        code_table_rules = core_cfg.code_table().rules().len(),
        "starting labflow"
    );

    let handler = PipelineHandler::new(
        ResultPipeline::from_config(&core_cfg),
        *core_cfg.options(),
    );

    mllp::serve(mllp_cfg, Arc::new(handler)).await?;
    Ok(())
}
