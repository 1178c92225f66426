//! Reconciler: bring one `A` record in line with the current public IP.
//!
//! A cycle resolves the IP, looks the record up by name, then creates it,
//! replaces it, or leaves it alone. Nothing survives a cycle: the record id
//! found by the lookup is a local of that cycle, and the next cycle asks the
//! provider again.

use crate::{
    cfg::RecordCfg,
    detector::IpResolver,
    error::{CycleError, Operation},
};
use cf_ddns_provider::{DnsProvider, DnsRecord, RecordInput, RecordType};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Desired record, fixed for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub proxied: bool,
}

impl From<&RecordCfg> for Target {
    fn from(r: &RecordCfg) -> Self {
        Self {
            name: r.name.clone(),
            proxied: r.proxied,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create,
    Update { id: String },
    Keep,
}

/// Both the content and the proxied flag must match for a record to be kept.
pub fn decide(observed: Option<&DnsRecord>, ip: &str, proxied: bool) -> Action {
    match observed {
        None => Action::Create,
        Some(rec) if rec.content == ip && rec.proxied == proxied => Action::Keep,
        Some(rec) => Action::Update { id: rec.id.clone() },
    }
}

#[derive(Debug)]
pub enum CycleOutcome {
    Unchanged,
    Created { id: String },
    Updated { id: String },
    Aborted(CycleError),
}

pub struct Reconciler {
    target: Target,
    resolver: Arc<dyn IpResolver>,
    provider: Arc<dyn DnsProvider>,
    /// held for the whole cycle; the only thing shared between cycles
    running: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        target: Target,
        resolver: Arc<dyn IpResolver>,
        provider: Arc<dyn DnsProvider>,
    ) -> Self {
        Self {
            target,
            resolver,
            provider,
            running: Mutex::new(()),
        }
    }

    /// Run a cycle unless one is already in flight. `None` means this trigger
    /// was skipped.
    pub async fn try_run_cycle(&self) -> Option<CycleOutcome> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!(
                "previous cycle for {} still running; skipping this tick",
                self.target.name
            );
            return None;
        };
        Some(self.cycle().await)
    }

    /// Run a cycle, waiting for an in-flight one to finish first.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let _guard = self.running.lock().await;
        self.cycle().await
    }

    async fn cycle(&self) -> CycleOutcome {
        let name = &self.target.name;
        match self.reconcile().await {
            Ok(outcome) => {
                match &outcome {
                    CycleOutcome::Unchanged => info!("{name} is up to date; nothing to do"),
                    CycleOutcome::Created { id } => info!("{name} created (id={id})"),
                    CycleOutcome::Updated { id } => info!("{name} updated (id={id})"),
                    CycleOutcome::Aborted(_) => {}
                }
                outcome
            }
            Err(e) => {
                error!("cycle for {name} aborted during {}: {e}", e.operation());
                CycleOutcome::Aborted(e)
            }
        }
    }

    async fn reconcile(&self) -> Result<CycleOutcome, CycleError> {
        let ip = self
            .resolver
            .resolve()
            .await
            .map_err(|e| CycleError::Network {
                op: Operation::ResolveIp,
                message: format!("{e:#}"),
            })?;
        info!("current public IP = {ip}");

        let observed = self
            .provider
            .find_record_by_name(&self.target.name, RecordType::A)
            .await
            .map_err(|e| CycleError::from_provider(Operation::FindRecord, e))?;
        match &observed {
            Some(rec) => info!(
                "{} record {} found in zone {}: content={} proxied={}",
                self.provider.name(),
                rec.id,
                self.provider.zone(),
                rec.content,
                rec.proxied
            ),
            None => info!(
                "no A record named {} in zone {}",
                self.target.name,
                self.provider.zone()
            ),
        }

        let desired = RecordInput::a(self.target.name.as_str(), ip.as_str(), self.target.proxied);
        match decide(observed.as_ref(), &ip, self.target.proxied) {
            Action::Keep => Ok(CycleOutcome::Unchanged),
            Action::Create => {
                let id = self
                    .provider
                    .create_record(&desired)
                    .await
                    .map_err(|e| CycleError::from_provider(Operation::CreateRecord, e))?;
                Ok(CycleOutcome::Created { id })
            }
            Action::Update { id } => {
                self.provider
                    .update_record(&id, &desired)
                    .await
                    .map_err(|e| CycleError::from_provider(Operation::UpdateRecord, e))?;
                Ok(CycleOutcome::Updated { id })
            }
        }
    }
}
