//! Service configuration.
//!
//! Every tunable of the harvester lives in [`HarvestConfig`]. Values are
//! layered with the `config` crate: built-in defaults, then an optional TOML
//! (or YAML/JSON) file, then `MAILSIFT__`-prefixed environment variables, e.g.
//!
//! ```text
//! MAILSIFT__HARVEST__MAX_DOMAINS=20
//! MAILSIFT__HARVEST__GENERIC_LOCAL_PARTS=info,contact,office
//! MAILSIFT__SERVER__PORT=8080
//! ```

use crate::error::{HarvestError, Result};
use config::{Config, Environment, File};
use mailsift_scanner::PathCrawler;
use mailsift_scanner::crawler::{
    DEFAULT_CANDIDATE_PATHS, DEFAULT_EARLY_STOP_THRESHOLD, DEFAULT_USER_AGENT,
};
use mailsift_scanner::extract::{AddressExtractor, DEFAULT_GENERIC_LOCAL_PARTS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Looked up in the working directory when no file is given explicitly
pub const DEFAULT_CONFIG_FILE: &str = "mailsift.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Largest batch accepted in one request
    pub max_domains: usize,
    /// Wall-clock budget for a whole batch
    pub deadline_secs: u64,
    /// Per-path fetch timeout; keep well below the batch deadline
    pub request_timeout_secs: u64,
    /// Pause after each successful fetch on the same host
    pub fetch_delay_ms: u64,
    /// Stop probing a domain once this many addresses are known
    pub early_stop_threshold: usize,
    /// Domains crawled concurrently (1 = strictly sequential)
    pub workers: usize,
    /// `https` in production, `http` for local test servers
    pub scheme: String,
    pub user_agent: String,
    /// Suffixes appended to `{scheme}://{domain}`, probed in order
    pub candidate_paths: Vec<String>,
    /// Local parts accepted from page text even on unrelated domains
    pub generic_local_parts: Vec<String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_domains: 50,
            deadline_secs: 25,
            request_timeout_secs: 5,
            fetch_delay_ms: 500,
            early_stop_threshold: DEFAULT_EARLY_STOP_THRESHOLD,
            workers: 1,
            scheme: "https".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            candidate_paths: DEFAULT_CANDIDATE_PATHS.iter().map(|p| p.to_string()).collect(),
            generic_local_parts: DEFAULT_GENERIC_LOCAL_PARTS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl HarvestConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_domains == 0 {
            return Err(HarvestError::InvalidConfig(
                "max_domains must be at least 1".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(HarvestError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(HarvestError::InvalidConfig(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.early_stop_threshold == 0 {
            return Err(HarvestError::InvalidConfig(
                "early_stop_threshold must be at least 1".to_string(),
            ));
        }
        if self.scheme != "https" && self.scheme != "http" {
            return Err(HarvestError::InvalidConfig(format!(
                "unsupported scheme '{}'",
                self.scheme
            )));
        }
        if self.candidate_paths.is_empty() {
            return Err(HarvestError::InvalidConfig(
                "candidate_paths must not be empty".to_string(),
            ));
        }
        if self.request_timeout_secs >= self.deadline_secs {
            warn!(
                "request timeout ({}s) is not below the batch deadline ({}s); one slow domain can exhaust the budget",
                self.request_timeout_secs, self.deadline_secs
            );
        }
        Ok(())
    }

    /// Build the path crawler these settings describe.
    pub fn build_crawler(&self) -> Result<PathCrawler> {
        let crawler = PathCrawler::with_timeout(self.request_timeout(), &self.user_agent)?
            .with_paths(self.candidate_paths.clone())
            .with_scheme(&self.scheme)
            .with_early_stop_threshold(self.early_stop_threshold)
            .with_fetch_delay(self.fetch_delay())
            .with_extractor(AddressExtractor::new(&self.generic_local_parts));
        Ok(crawler)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub harvest: HarvestConfig,
    pub server: ServerConfig,
}

impl Settings {
    /// Load settings from `path` (tilde-expanded, must exist) or, when absent,
    /// from `mailsift.toml` in the working directory if there is one. The
    /// environment overrides both.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let file_source = match path {
            Some(path) => {
                let expanded = shellexpand::tilde(path);
                debug!("Loading configuration from {}", expanded);
                File::from(Path::new(expanded.as_ref())).required(true)
            }
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file_source)
            .add_source(
                Environment::with_prefix("MAILSIFT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("harvest.candidate_paths")
                    .with_list_parse_key("harvest.generic_local_parts"),
            )
            .build()?
            .try_deserialize()?;

        settings.harvest.validate()?;
        Ok(settings)
    }
}
