//! Parse `cf-ddns.toml` and the environment into an immutable `AppConfig`

use crate::error::ConfigError;
use config::{Config, Environment, File};
use croner::Cron;
use serde::Deserialize;
use std::{env, fmt, path::Path, time::Duration};
use validator::Validate;

/// Every five minutes, in classic 5-field form.
pub const DEFAULT_CRON: &str = "*/5 * * * *";
pub const DEFAULT_IP_URL: &str = "https://api.ipify.org?format=json";

/// Variable names understood by the Node.js-era updater, mapped onto our keys.
const LEGACY_VARS: [(&str, &str); 3] = [
    ("CLOUDFLARE_API_TOKEN", "cloudflare.token"),
    ("ZONE_ID", "cloudflare.zone_id"),
    ("DNS_NAME", "record.name"),
];

/*──────── Cloudflare ────────*/
#[derive(Clone, Deserialize, Validate)]
pub struct CloudflareCfg {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 1))]
    pub zone_id: String,
    #[serde(default = "default_api_root")]
    pub api_root: String,
}

impl fmt::Debug for CloudflareCfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareCfg")
            .field("token", &"<redacted>")
            .field("zone_id", &self.zone_id)
            .field("api_root", &self.api_root)
            .finish()
    }
}

/*──────── Record ────────*/
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordCfg {
    /// full record name as the provider reports it, e.g. `home.example.com`
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub proxied: bool,
}

/*──────── Detect ────────*/
#[derive(Debug, Clone, Deserialize)]
pub struct DetectCfg {
    /// service answering `{"ip": "..."}`
    #[serde(default = "default_ip_url")]
    pub url: String,
}

impl Default for DetectCfg {
    fn default() -> Self {
        Self {
            url: default_ip_url(),
        }
    }
}

/*──────── HTTP ────────*/
#[derive(Debug, Clone, Deserialize)]
pub struct HttpCfg {
    /// per-request timeout in milliseconds, for both the IP service and the API
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl HttpCfg {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

/*──────── Scheduler ────────*/
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerCfg {
    /// 5-field (minute first) or 6-field (seconds first) cron expression, UTC
    #[serde(default = "default_cron")]
    pub cron: String,
    /// run one cycle right away instead of waiting for the first tick
    #[serde(default = "default_true")]
    pub run_on_start: bool,
}

impl SchedulerCfg {
    /// Expression in the seconds-first form the job scheduler expects.
    pub fn cron_expr(&self) -> String {
        normalize_cron(&self.cron)
    }

    /// Parse with the same `croner` rules `tokio-cron-scheduler` applies to
    /// its jobs (seconds required, day-of-month and day-of-week both honoured,
    /// `0`/`7` = Sunday).
    pub fn schedule(&self) -> Result<Cron, ConfigError> {
        Cron::new(&self.cron_expr())
            .with_seconds_required()
            .with_dom_and_dow()
            .parse()
            .map_err(|e| ConfigError::Schedule {
                expr: self.cron.clone(),
                reason: e.to_string(),
            })
    }
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            run_on_start: true,
        }
    }
}

fn default_api_root() -> String {
    cf_ddns_provider_cloudflare::API_ROOT.to_owned()
}
fn default_ip_url() -> String {
    DEFAULT_IP_URL.to_owned()
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_cron() -> String {
    DEFAULT_CRON.to_owned()
}
fn default_true() -> bool {
    true
}

/*──────── AppConfig ────────*/
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub cloudflare: CloudflareCfg,
    #[validate(nested)]
    pub record: RecordCfg,
    #[serde(default)]
    pub detect: DetectCfg,
    #[serde(default)]
    pub http: HttpCfg,
    #[serde(default)]
    pub scheduler: SchedulerCfg,
}

/// Prefix `0 ` (second zero) to classic 5-field expressions.
pub fn normalize_cron(expr: &str) -> String {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() == 5 {
        format!("0 {}", fields.join(" "))
    } else {
        fields.join(" ")
    }
}

/// `DNS_PROXIED` semantics: only `true` (any case) enables proxying.
fn parse_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}

/// Load configuration from an optional TOML file **and** environment variables.
///
/// Priority (high → low):
/// 1. Legacy variables (`CLOUDFLARE_API_TOKEN`, `ZONE_ID`, `DNS_NAME`,
///    `DNS_PROXIED`, `INTERVAL`)
/// 2. Prefixed variables (`CF_DDNS_RECORD__NAME`, `CF_DDNS_HTTP__TIMEOUT_MS`, …)
/// 3. Values in the TOML file (if it exists)
///
/// The result is validated here, so a returned `AppConfig` always carries a
/// token, zone id, record name and a parseable schedule.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    // 1) start with the optional file
    let mut builder = Config::builder();
    if Path::new(path).exists() {
        builder = builder.add_source(File::with_name(path).required(true));
    } else {
        tracing::info!("config file `{path}` not found; environment-only mode");
    }

    // 2) prefixed env, `__` separates section and field
    builder = builder.add_source(
        Environment::with_prefix("CF_DDNS")
            .prefix_separator("_")
            .separator("__"),
    );

    // 3) legacy names win over everything else
    for (var, key) in LEGACY_VARS {
        builder = builder.set_override_option(key, env::var(var).ok())?;
    }
    // a blank INTERVAL keeps whatever schedule the lower layers chose
    builder = builder.set_override_option(
        "scheduler.cron",
        env::var("INTERVAL").ok().filter(|v| !v.trim().is_empty()),
    )?;
    builder = builder.set_override_option(
        "record.proxied",
        env::var("DNS_PROXIED").ok().map(|v| parse_flag(&v)),
    )?;

    let cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.validate()?;
    cfg.scheduler.schedule()?;
    Ok(cfg)
}
