//! Test doubles for reconciliation tests
//!
//! `FakeProvider` keeps an in-memory zone and records every call so tests can
//! assert exactly which reads and writes a cycle issued.

#![allow(dead_code)]

use async_trait::async_trait;
use cf_ddns_core::detector::IpResolver;
use cf_ddns_core::reconciler::{Reconciler, Target};
use cf_ddns_provider::{ApiMessage, DnsProvider, DnsRecord, ProviderError, RecordInput, RecordType};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const NAME: &str = "home.example.com";

/// Resolver answering with a settable address; `None` simulates an outage.
pub struct StubResolver {
    ip: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl StubResolver {
    pub fn new(ip: &str) -> Self {
        Self {
            ip: Mutex::new(Some(ip.to_owned())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            ip: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_ip(&self, ip: Option<&str>) {
        *self.ip.lock().unwrap() = ip.map(str::to_owned);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IpResolver for StubResolver {
    async fn resolve(&self) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ip
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("connect timeout"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Find { name: String },
    Create(RecordInput),
    Update { id: String, desired: RecordInput },
}

/// In-memory zone with call recording, failure injection and an optional
/// one-shot gate that parks the next lookup until released.
pub struct FakeProvider {
    records: Mutex<Vec<DnsRecord>>,
    calls: Mutex<Vec<Call>>,
    fail_find: Mutex<Option<Vec<ApiMessage>>>,
    fail_create: Mutex<Option<Vec<ApiMessage>>>,
    fail_update: Mutex<Option<Vec<ApiMessage>>>,
    gate: Mutex<Option<Arc<Notify>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            fail_find: Mutex::new(None),
            fail_create: Mutex::new(None),
            fail_update: Mutex::new(None),
            gate: Mutex::new(None),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
        }
    }

    pub fn with_record(self, rec: DnsRecord) -> Self {
        self.records.lock().unwrap().push(rec);
        self
    }

    pub fn gate_next_lookup(&self, gate: Arc<Notify>) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    pub fn fail_find_with(&self, messages: &[&str]) {
        *self.fail_find.lock().unwrap() = Some(api_messages(messages));
    }

    pub fn fail_create_with(&self, messages: &[&str]) {
        *self.fail_create.lock().unwrap() = Some(api_messages(messages));
    }

    pub fn fail_update_with(&self, messages: &[&str]) {
        *self.fail_update.lock().unwrap() = Some(api_messages(messages));
    }

    pub fn delete_all(&self) {
        self.records.lock().unwrap().clear();
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn find_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Find { .. }))
            .count()
    }

    pub fn creates(&self) -> Vec<RecordInput> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create(desired) => Some(desired),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self) -> Vec<(String, RecordInput)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update { id, desired } => Some((id, desired)),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> usize {
        self.creates().len() + self.updates().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self, call: Call) -> InFlight<'_> {
        self.calls.lock().unwrap().push(call);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(&self.in_flight)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn api_messages(messages: &[&str]) -> Vec<ApiMessage> {
    messages
        .iter()
        .enumerate()
        .map(|(i, m)| ApiMessage {
            code: 1000 + i as i64,
            message: (*m).to_owned(),
        })
        .collect()
}

fn api_error(errors: Vec<ApiMessage>) -> ProviderError {
    ProviderError::Api {
        status: 400,
        errors,
    }
}

#[async_trait]
impl DnsProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }
    fn zone(&self) -> &str {
        "zone123"
    }

    async fn find_record_by_name(
        &self,
        name: &str,
        typ: RecordType,
    ) -> Result<Option<DnsRecord>, ProviderError> {
        let _busy = self.enter(Call::Find {
            name: name.to_owned(),
        });
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(errors) = self.fail_find.lock().unwrap().clone() {
            return Err(api_error(errors));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.matches(name, typ))
            .cloned())
    }

    async fn create_record(&self, desired: &RecordInput) -> Result<String, ProviderError> {
        let _busy = self.enter(Call::Create(desired.clone()));
        if let Some(errors) = self.fail_create.lock().unwrap().clone() {
            return Err(api_error(errors));
        }
        let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records.lock().unwrap().push(DnsRecord {
            id: id.clone(),
            record_type: desired.record_type.as_str().to_owned(),
            name: desired.name.clone(),
            content: desired.content.clone(),
            ttl: desired.ttl,
            proxied: desired.proxied,
        });
        Ok(id)
    }

    async fn update_record(
        &self,
        id: &str,
        desired: &RecordInput,
    ) -> Result<DnsRecord, ProviderError> {
        let _busy = self.enter(Call::Update {
            id: id.to_owned(),
            desired: desired.clone(),
        });
        if let Some(errors) = self.fail_update.lock().unwrap().clone() {
            return Err(api_error(errors));
        }
        let mut records = self.records.lock().unwrap();
        let rec = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| api_error(api_messages(&["Record does not exist."])))?;
        rec.record_type = desired.record_type.as_str().to_owned();
        rec.name = desired.name.clone();
        rec.content = desired.content.clone();
        rec.ttl = desired.ttl;
        rec.proxied = desired.proxied;
        Ok(rec.clone())
    }
}

pub fn a_record(id: &str, content: &str, proxied: bool) -> DnsRecord {
    DnsRecord {
        id: id.to_owned(),
        record_type: "A".to_owned(),
        name: NAME.to_owned(),
        content: content.to_owned(),
        ttl: 1,
        proxied,
    }
}

pub fn reconciler(
    resolver: &Arc<StubResolver>,
    provider: &Arc<FakeProvider>,
    proxied: bool,
) -> Reconciler {
    Reconciler::new(
        Target {
            name: NAME.to_owned(),
            proxied,
        },
        resolver.clone(),
        provider.clone(),
    )
}
