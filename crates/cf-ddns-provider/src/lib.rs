//! Provider seam shared by the reconciler and the Cloudflare client.
//!
//! * [`DnsRecord`] is what the provider reports, [`RecordInput`] is what we send.
//! * Every call is a plain request/response; implementations keep no state
//!   between calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Provider-side "automatic" TTL, the smallest value Cloudflare accepts.
pub const AUTO_TTL: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RecordType {
    A,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record as observed at the provider.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub ttl: u32,
    #[serde(default)]
    pub proxied: bool,
}

impl DnsRecord {
    /// Exact name and type match; no case folding, no suffix logic.
    pub fn matches(&self, name: &str, typ: RecordType) -> bool {
        self.name == name && self.record_type == typ.as_str()
    }
}

/// Full desired field set, used for both create and full-replace update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordInput {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
}

impl RecordInput {
    /// Desired `A` record with the automatic TTL.
    pub fn a(name: impl Into<String>, content: impl Into<String>, proxied: bool) -> Self {
        Self {
            record_type: RecordType::A,
            name: name.into(),
            content: content.into(),
            ttl: AUTO_TTL,
            proxied,
        }
    }
}

/// One `(code, message)` pair from a provider error list.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

fn join_messages(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error details".to_owned();
    }
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport-level failure: connect, TLS, timeout, body read.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The provider answered and signalled failure.
    #[error("api error (HTTP {status}): {}", join_messages(.errors))]
    Api { status: u16, errors: Vec<ApiMessage> },
    /// A success response that lacks what the operation needs.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ProviderError::Http(_))
    }
}

#[async_trait]
pub trait DnsProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn zone(&self) -> &str;

    /// First record whose name and type match exactly, or `None`.
    async fn find_record_by_name(
        &self,
        name: &str,
        typ: RecordType,
    ) -> Result<Option<DnsRecord>, ProviderError>;

    /// Creates the record and returns the provider-assigned id.
    async fn create_record(&self, desired: &RecordInput) -> Result<String, ProviderError>;

    /// Replaces every field of record `id` with `desired`.
    async fn update_record(
        &self,
        id: &str,
        desired: &RecordInput,
    ) -> Result<DnsRecord, ProviderError>;
}
