//! Scheduler: trigger reconciliation cycles on a cron cadence.
//!
//! Ticks never stack up: a tick that fires while a cycle is still running is
//! skipped (see [`Reconciler::try_run_cycle`]).

use crate::{cfg::SchedulerCfg, reconciler::Reconciler};
use anyhow::Result;
use chrono::Utc;
use croner::Cron;
use std::{future::Future, pin::Pin, sync::Arc};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

/*──────── entry point ────────*/
pub async fn run_scheduler(cfg: SchedulerCfg, reconciler: Arc<Reconciler>) -> Result<()> {
    let expr = cfg.cron_expr();
    let sched = Arc::new(cfg.schedule()?);

    type BoxFut = Pin<Box<dyn Future<Output = ()> + Send>>;
    let tick: Arc<dyn Fn() -> BoxFut + Send + Sync> = Arc::new({
        let reconciler = reconciler.clone();
        let sched = sched.clone();
        move || {
            let reconciler = reconciler.clone();
            let sched = sched.clone();
            Box::pin(async move {
                // outcome and skip notices are logged by the reconciler
                let _ = reconciler.try_run_cycle().await;
                log_next_tick(&sched);
            })
        }
    });

    let mut sch = JobScheduler::new().await?;
    let run = tick.clone();
    sch.add(Job::new_async(expr.as_str(), move |_, _| (run)())?)
        .await?;
    sch.start().await?;
    info!("cron started: {expr}");

    if cfg.run_on_start {
        (tick)().await;
    } else {
        log_next_tick(&sched);
    }

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received; stopping scheduler");
    sch.shutdown().await?;
    Ok(())
}

/*──────── helpers ────────*/
fn log_next_tick(sched: &Cron) {
    if let Ok(next) = sched.find_next_occurrence(&Utc::now(), false) {
        info!("next cycle at {next}");
    }
}
