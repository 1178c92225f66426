//! Cloudflare DNS provider
//!
//! * Auth via **API Token** – needs `DNS:Edit` on the target zone.
//! * The zone is addressed by id; no zone-name lookup.
//! * Nothing is cached: every call goes to the API, so out-of-band edits and
//!   deletions are always observed.
//! * All API failures are mapped to [`cf_ddns_provider::ProviderError`].

use async_trait::async_trait;
use cf_ddns_provider::{ApiMessage, DnsProvider, DnsRecord, ProviderError, RecordInput, RecordType};
use reqwest::{
    Client, RequestBuilder, StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::{Deserialize, de::DeserializeOwned};
use std::{fmt, time::Duration};
use tracing::{debug, info};

pub const API_ROOT: &str = "https://api.cloudflare.com/client/v4";

/// Largest page size the list endpoint accepts.
const PER_PAGE: u32 = 100;

/*──────── wire envelope ────────*/

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    /// Absent on some list responses; only an explicit `false` is a failure.
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

fn check<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<Envelope<T>, ProviderError> {
    match serde_json::from_slice::<Envelope<T>>(body) {
        Ok(env) if status.is_success() && env.success != Some(false) => Ok(env),
        Ok(env) => Err(ProviderError::Api {
            status: status.as_u16(),
            errors: env.errors,
        }),
        // error pages from proxies in front of the API are often not JSON
        Err(_) if !status.is_success() => Err(ProviderError::Api {
            status: status.as_u16(),
            errors: Vec::new(),
        }),
        Err(e) => Err(ProviderError::Malformed(e.to_string())),
    }
}

fn first_match(records: Vec<DnsRecord>, name: &str, typ: RecordType) -> Option<DnsRecord> {
    records.into_iter().find(|r| r.matches(name, typ))
}

/*──────── provider struct ────────*/

pub struct CfProvider {
    zone_id: String,
    api_root: String,
    client: Client,
}

// the token only lives inside the client's default headers
impl fmt::Debug for CfProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CfProvider")
            .field("zone_id", &self.zone_id)
            .field("api_root", &self.api_root)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl CfProvider {
    pub fn new(zone_id: &str, token: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))?;
        auth.set_sensitive(true);

        let mut hdr = HeaderMap::new();
        hdr.insert(AUTHORIZATION, auth);
        hdr.insert(USER_AGENT, HeaderValue::from_static("cf-ddns (+github)"));
        hdr.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            zone_id: zone_id.to_owned(),
            api_root: API_ROOT.to_owned(),
            client: Client::builder()
                .default_headers(hdr)
                .timeout(timeout)
                .build()?,
        })
    }

    /// Point the client at another API root (staging, a local stub, ...).
    pub fn with_api_root(mut self, root: &str) -> Self {
        self.api_root = root.trim_end_matches('/').to_owned();
        self
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.api_root, self.zone_id)
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/{id}", self.records_url())
    }

    /*──────── tiny HTTP wrapper ────────*/

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Envelope<T>, ProviderError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        check(status, &body)
    }
}

/*──────── DnsProvider impl ────────*/

#[async_trait]
impl DnsProvider for CfProvider {
    fn name(&self) -> &'static str {
        "Cloudflare"
    }
    fn zone(&self) -> &str {
        &self.zone_id
    }

    async fn find_record_by_name(
        &self,
        name: &str,
        typ: RecordType,
    ) -> Result<Option<DnsRecord>, ProviderError> {
        let mut page = 1u32;
        loop {
            let env: Envelope<Vec<DnsRecord>> = self
                .send(
                    self.client
                        .get(self.records_url())
                        .query(&[("page", page), ("per_page", PER_PAGE)]),
                )
                .await?;
            let total = env.result_info.map(|i| i.total_pages).unwrap_or(1);
            let records = env.result.unwrap_or_default();
            debug!("Cloudflare list page {page}/{total}: {} records", records.len());

            if let Some(rec) = first_match(records, name, typ) {
                return Ok(Some(rec));
            }
            if page >= total {
                return Ok(None);
            }
            page += 1;
        }
    }

    async fn create_record(&self, desired: &RecordInput) -> Result<String, ProviderError> {
        let env: Envelope<Created> = self
            .send(self.client.post(self.records_url()).json(desired))
            .await?;
        let id = env
            .result
            .map(|c| c.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::Malformed("create: missing result.id".into()))?;
        info!("Cloudflare created record {} id={id}", desired.name);
        Ok(id)
    }

    async fn update_record(
        &self,
        id: &str,
        desired: &RecordInput,
    ) -> Result<DnsRecord, ProviderError> {
        let env: Envelope<DnsRecord> = self
            .send(self.client.put(self.record_url(id)).json(desired))
            .await?;
        let rec = env
            .result
            .ok_or_else(|| ProviderError::Malformed("update: missing result".into()))?;
        info!("Cloudflare updated record id={id} -> {}", rec.content);
        Ok(rec)
    }
}
