//! Public-IP detection
//!
//! * HTTP – JSON services answering `{"ip": "..."}` (ipify and friends)
//!
//! No retry here: the next scheduled cycle is the retry.

use crate::cfg::{DetectCfg, HttpCfg};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Current public address as reported upstream; not validated further.
    async fn resolve(&self) -> Result<String>;
}

#[derive(Deserialize)]
struct IpReply {
    ip: String,
}

fn parse_reply(body: &str) -> Result<String> {
    let reply: IpReply = serde_json::from_str(body).context("unexpected body from IP service")?;
    let ip = reply.ip.trim();
    if ip.is_empty() {
        bail!("IP service returned an empty `ip`");
    }
    Ok(ip.to_owned())
}

/*──────── HTTP detector ────────*/
pub struct HttpDetector {
    url: String,
    client: Client,
}

impl HttpDetector {
    pub fn new(detect: &DetectCfg, http: &HttpCfg) -> Result<Self> {
        Ok(Self {
            url: detect.url.clone(),
            client: Client::builder().timeout(http.timeout()).build()?,
        })
    }
}

#[async_trait]
impl IpResolver for HttpDetector {
    async fn resolve(&self) -> Result<String> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let ip = parse_reply(&body).with_context(|| format!("detect/http {}", self.url))?;
        info!("detect/http {} -> {ip}", self.url);
        Ok(ip)
    }
}
