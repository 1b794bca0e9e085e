//! Configuration types for the watchpost service

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub endpoints_file: Option<PathBuf>,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub rules: BTreeMap<String, EndpointRules>,
    #[serde(default)]
    pub suppression: Option<SuppressionConfig>,
    #[serde(default)]
    pub notifications: Option<NotificationConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            endpoints_file: None,
            workers: default_workers(),
            probe: ProbeConfig::default(),
            rules: BTreeMap::new(),
            suppression: None,
            notifications: None,
        }
    }
}

impl Config {
    /// Check the invariants that must hold before any probing starts.
    ///
    /// The endpoint list itself is checked once it has been resolved, see
    /// [`crate::endpoints::resolve_endpoints`].
    pub fn validate(&self) -> crate::Result<()> {
        if self.workers == 0 {
            return Err(crate::WatchpostError::Config(
                "workers must be at least 1".to_string(),
            ));
        }

        for (endpoint, rules) in &self.rules {
            if let Some(auth) = &rules.auth {
                if auth.user.trim().is_empty() {
                    return Err(crate::WatchpostError::Config(format!(
                        "Missing basic auth user for endpoint '{}'",
                        endpoint
                    )));
                }
            }
        }

        if let Some(notifications) = &self.notifications {
            if notifications
                .webhooks
                .iter()
                .any(|webhook| webhook.url.trim().is_empty())
            {
                return Err(crate::WatchpostError::Config(
                    "Webhook url must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// HTTP method used for probes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeMethod {
    #[default]
    Get,
    Post,
}

/// Settings shared by every probe request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default)]
    pub method: ProbeMethod,
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(default = "default_read_timeout", with = "humantime_serde")]
    pub read_timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            method: ProbeMethod::default(),
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Per-endpoint classification rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointRules {
    #[serde(default, alias = "strings")]
    pub required_strings: Vec<String>,
    #[serde(default)]
    pub auth: Option<BasicAuth>,
}

/// HTTP basic authentication credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasicAuth {
    pub user: String,
    pub pass: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Alert suppression settings; absent means every failure is alerted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionConfig {
    #[serde(default = "default_suppression_window", with = "humantime_serde")]
    pub window: Duration,
    pub state_file: PathBuf,
}

/// Notification delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub prefix_message: Option<String>,
    #[serde(default)]
    pub webhooks: Vec<WebhookConfig>,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay", with = "humantime_serde")]
    pub retry_delay: Duration,
    #[serde(default)]
    pub slack: Option<SlackConfig>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            prefix_message: None,
            webhooks: Vec::new(),
            retry_attempts: default_retry_attempts(),
            retry_delay: default_retry_delay(),
            slack: None,
        }
    }
}

/// A single webhook channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Tokens used to resolve mention tags into Slack identifiers
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default)]
    pub workspace_token: Option<String>,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field(
                "workspace_token",
                &self.workspace_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

fn default_workers() -> usize {
    15
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_user_agent() -> String {
    concat!("watchpost/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_suppression_window() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_retry_attempts() -> u32 {
    5
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(10)
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::WatchpostError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
