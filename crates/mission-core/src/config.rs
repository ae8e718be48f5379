use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_PORT: u16 = 3100;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_OPENCLAW_URL: &str = "http://127.0.0.1:18789";

// Cron cache defaults
pub const CRON_CACHE_TTL_MS: i64 = 60_000;
pub const CRON_HORIZON_DAYS: u32 = 14;
pub const MAX_EVENTS_PER_JOB: usize = 600;
pub const CRON_FETCH_TIMEOUT_MS: u64 = 20_000;
pub const CRON_FETCH_MAX_OUTPUT_BYTES: usize = 1024 * 1024; // 1 MB stdout cap

/// Top-level config (mission.toml + MISSION_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissionConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cron: CronConfig,
    #[serde(default)]
    pub openclaw: OpenClawConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Occurrence cache and the `openclaw cron list` invocation that feeds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronConfig {
    /// How long a cached payload counts as fresh.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: i64,
    /// How many days ahead occurrences are materialized.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// Per-job cap on generated occurrences.
    #[serde(default = "default_max_events_per_job")]
    pub max_events_per_job: usize,
    #[serde(default = "default_cron_command")]
    pub command: String,
    #[serde(default = "default_cron_args")]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            ttl_ms: CRON_CACHE_TTL_MS,
            horizon_days: CRON_HORIZON_DAYS,
            max_events_per_job: MAX_EVENTS_PER_JOB,
            command: default_cron_command(),
            args: default_cron_args(),
            timeout_ms: CRON_FETCH_TIMEOUT_MS,
            max_output_bytes: CRON_FETCH_MAX_OUTPUT_BYTES,
        }
    }
}

/// HTTP endpoint of the automation backend, used for the status card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenClawConfig {
    #[serde(default = "default_openclaw_url")]
    pub base_url: String,
    /// Sent as `Authorization: Bearer <token>` when set.
    pub token: Option<String>,
}

impl Default for OpenClawConfig {
    fn default() -> Self {
        Self {
            base_url: default_openclaw_url(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Overrides the workspace directory stored in settings.
    pub workspace_dir: Option<String>,
}

impl MissionConfig {
    /// Load config: explicit path > `~/.mission/mission.toml`, then
    /// `MISSION_*` env vars on top (`MISSION_CRON__TTL_MS=30000`).
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        debug!(path = %path, exists = std::path::Path::new(&path).exists(), "loading config");

        let config: MissionConfig = Figment::from(Serialized::defaults(MissionConfig::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed("MISSION_").split("__"))
            .extract()
            .map_err(|e| crate::error::MissionError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn home_dir() -> String {
    std::env::var("HOME").unwrap_or_else(|_| ".".to_string())
}

fn default_config_path() -> String {
    format!("{}/.mission/mission.toml", home_dir())
}
fn default_db_path() -> String {
    format!("{}/.mission/mission.db", home_dir())
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_ttl_ms() -> i64 {
    CRON_CACHE_TTL_MS
}
fn default_horizon_days() -> u32 {
    CRON_HORIZON_DAYS
}
fn default_max_events_per_job() -> usize {
    MAX_EVENTS_PER_JOB
}
fn default_cron_command() -> String {
    "openclaw".to_string()
}
fn default_cron_args() -> Vec<String> {
    ["cron", "list", "--all", "--json"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_timeout_ms() -> u64 {
    CRON_FETCH_TIMEOUT_MS
}
fn default_max_output_bytes() -> usize {
    CRON_FETCH_MAX_OUTPUT_BYTES
}
fn default_openclaw_url() -> String {
    DEFAULT_OPENCLAW_URL.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cache_constants() {
        let config = MissionConfig::default();
        assert_eq!(config.cron.ttl_ms, 60_000);
        assert_eq!(config.cron.horizon_days, 14);
        assert_eq!(config.cron.max_events_per_job, 600);
        assert_eq!(config.cron.args, vec!["cron", "list", "--all", "--json"]);
        assert_eq!(config.gateway.bind, "127.0.0.1");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: MissionConfig = Figment::from(Serialized::defaults(MissionConfig::default()))
            .merge(Toml::string("[cron]\nttl_ms = 5000\n"))
            .extract()
            .expect("extract");
        assert_eq!(config.cron.ttl_ms, 5000);
        assert_eq!(config.cron.horizon_days, 14);
        assert_eq!(config.gateway.port, DEFAULT_PORT);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = MissionConfig::load(Some("/nonexistent/mission.toml")).expect("load");
        assert_eq!(config.openclaw.base_url, DEFAULT_OPENCLAW_URL);
        assert!(config.openclaw.token.is_none());
    }
}
