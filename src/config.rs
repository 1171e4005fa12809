use crate::infrastructure::http::notification_gateway::{
    NotificationEndpoints, DEFAULT_COUNT_PATH, DEFAULT_LIST_PATH, DEFAULT_MARK_ALL_READ_PATH,
    DEFAULT_MARK_READ_PATH,
};
use crate::services::{FailurePolicy, SyncConfig};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub count_path: String,
    pub list_path: String,
    pub mark_read_path: String,
    pub mark_all_read_path: String,
    pub page_size: u32,
    pub cache_ttl_secs: u64,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub failure_policy: FailurePolicy,
    pub session_token: Option<String>,
    pub session_file: Option<PathBuf>,
    pub otel_exporter_endpoint: Option<String>,
    pub service_name: String,
    pub metrics_port: Option<u16>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_url = var("FIELDESK_API_URL").ok_or(ConfigError::MissingApiUrl)?;

        let count_path = var("FIELDESK_COUNT_PATH").unwrap_or_else(|| DEFAULT_COUNT_PATH.to_string());
        let list_path = var("FIELDESK_LIST_PATH").unwrap_or_else(|| DEFAULT_LIST_PATH.to_string());
        let mark_read_path =
            var("FIELDESK_MARK_READ_PATH").unwrap_or_else(|| DEFAULT_MARK_READ_PATH.to_string());
        let mark_all_read_path = var("FIELDESK_MARK_ALL_READ_PATH")
            .unwrap_or_else(|| DEFAULT_MARK_ALL_READ_PATH.to_string());

        let page_size = parse_positive(&var, "FIELDESK_PAGE_SIZE", 10)?;
        let cache_ttl_secs = parse_positive(&var, "FIELDESK_CACHE_TTL_SECS", 600)?;
        let poll_interval_secs = parse_positive(&var, "FIELDESK_POLL_INTERVAL_SECS", 600)?;
        let request_timeout_secs = parse_positive(&var, "FIELDESK_REQUEST_TIMEOUT_SECS", 30)?;

        let failure_policy = match var("FIELDESK_FAILURE_POLICY") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidFailurePolicy(value))?,
            None => FailurePolicy::default(),
        };

        let session_token = var("FIELDESK_SESSION_TOKEN");
        let session_file = var("FIELDESK_SESSION_FILE").map(PathBuf::from);

        let otel_exporter_endpoint = var("OTEL_EXPORTER_OTLP_ENDPOINT");

        let service_name = var("SERVICE_NAME").unwrap_or_else(|| "fieldesk".to_string());

        let metrics_port = match var("METRICS_PORT") {
            Some(value) => Some(value.parse().map_err(|_| ConfigError::InvalidPort)?),
            None => None,
        };

        Ok(Config {
            api_url,
            count_path,
            list_path,
            mark_read_path,
            mark_all_read_path,
            page_size,
            cache_ttl_secs,
            poll_interval_secs,
            request_timeout_secs,
            failure_policy,
            session_token,
            session_file,
            otel_exporter_endpoint,
            service_name,
            metrics_port,
        })
    }

    pub fn endpoints(&self) -> NotificationEndpoints {
        NotificationEndpoints {
            base_url: self.api_url.clone(),
            count_path: self.count_path.clone(),
            list_path: self.list_path.clone(),
            mark_read_path: self.mark_read_path.clone(),
            mark_all_read_path: self.mark_all_read_path.clone(),
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            page_size: self.page_size,
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            failure_policy: self.failure_policy,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_positive<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + Default,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = var(key) else {
        return Ok(default);
    };

    match raw.trim().parse::<T>() {
        Ok(value) if value != T::default() => Ok(value),
        _ => Err(ConfigError::InvalidNumber { key, value: raw }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("FIELDESK_API_URL environment variable not set")]
    MissingApiUrl,

    #[error("{key} must be a positive integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },

    #[error("Invalid failure policy '{0}' (expected 'reset' or 'keep')")]
    InvalidFailurePolicy(String),

    #[error("Invalid port number")]
    InvalidPort,
}
