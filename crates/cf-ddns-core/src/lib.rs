//! cf-ddns-core – configuration, detection, reconciliation and scheduling

pub mod cfg;
pub mod detector;
pub mod error;
pub mod reconciler;
pub mod scheduler;

use anyhow::{Context, Result};
use cf_ddns_provider_cloudflare::CfProvider;
use cfg::AppConfig;
use detector::HttpDetector;
use reconciler::{CycleOutcome, Reconciler, Target};
use std::sync::Arc;
use tracing::info;

pub use cfg::load_config;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// one cycle, then exit
    Once,
    /// cycles on the configured cron schedule until interrupted
    Scheduled,
}

/// Wire the Cloudflare client and the HTTP detector into a reconciler.
pub fn build_reconciler(cfg: &AppConfig) -> Result<Arc<Reconciler>> {
    let provider = CfProvider::new(
        &cfg.cloudflare.zone_id,
        &cfg.cloudflare.token,
        cfg.http.timeout(),
    )?
    .with_api_root(&cfg.cloudflare.api_root);
    let detector = HttpDetector::new(&cfg.detect, &cfg.http)?;

    Ok(Arc::new(Reconciler::new(
        Target::from(&cfg.record),
        Arc::new(detector),
        Arc::new(provider),
    )))
}

pub async fn bootstrap(cfg: AppConfig, mode: RunMode) -> Result<()> {
    let reconciler = build_reconciler(&cfg)?;
    info!(
        "managing A record {} (proxied={}) in zone {}",
        cfg.record.name, cfg.record.proxied, cfg.cloudflare.zone_id
    );

    match mode {
        RunMode::Once => match reconciler.run_cycle().await {
            CycleOutcome::Aborted(e) => Err(e).context("reconciliation cycle aborted"),
            _ => Ok(()),
        },
        RunMode::Scheduled => scheduler::run_scheduler(cfg.scheduler, reconciler).await,
    }
}
