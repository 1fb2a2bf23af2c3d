//! Application configuration structures.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Tier;

/// Shortest interval between two pass starts.
pub const MIN_INTERVAL_SECS: u64 = 60;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Targets, thresholds, timing and file locations
    pub watch: WatchConfig,

    /// Lists to poll, in processing order
    #[serde(default)]
    pub lists: Vec<ListConfig>,

    /// HTTP client and retry behavior
    #[serde(default)]
    pub http: HttpConfig,

    /// Portal logins, applied in order at startup
    #[serde(default)]
    pub logins: Vec<LoginConfig>,

    /// Alert delivery; absent disables notifications
    #[serde(default)]
    pub discord: Option<DiscordConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Uppercase targets and drop blanks so every comparison downstream is exact.
    fn normalize(&mut self) {
        let mut seen = HashSet::new();
        self.watch.targets = self
            .watch
            .targets
            .iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect();
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.lists.is_empty() {
            return Err(AppError::validation("at least one [[lists]] entry is required"));
        }
        if self.lists.iter().any(|l| l.url.trim().is_empty()) {
            return Err(AppError::validation("lists.url must not be empty"));
        }
        if self.watch.targets.is_empty() {
            return Err(AppError::validation("watch.targets must contain at least one identifier"));
        }
        if self.watch.page_limit == 0 {
            return Err(AppError::validation("watch.page_limit must be > 0"));
        }
        if self.watch.top_threshold > self.watch.warn_threshold {
            return Err(AppError::validation(
                "watch.top_threshold must not exceed watch.warn_threshold",
            ));
        }
        if self.watch.try_cooldown().is_none() {
            return Err(AppError::validation("watch.cooldown_minutes is out of range"));
        }
        if self.http.max_retries == 0 {
            return Err(AppError::validation("http.max_retries must be > 0"));
        }
        if !(self.http.retry_backoff > 0.0 && self.http.retry_backoff.is_finite()) {
            return Err(AppError::validation("http.retry_backoff must be a finite number > 0"));
        }
        if Duration::try_from_secs_f64(self.http.initial_backoff_secs).is_err() {
            return Err(AppError::validation(
                "http.initial_backoff_secs must be a finite number >= 0",
            ));
        }
        if self
            .logins
            .iter()
            .any(|l| l.enabled && l.url.trim().is_empty())
        {
            return Err(AppError::validation("enabled logins need a url"));
        }
        if let Some(discord) = &self.discord {
            if discord.webhook_url.trim().is_empty() {
                return Err(AppError::validation("discord.webhook_url is empty"));
            }
        }
        Ok(())
    }

    /// Lists paired with their display label.
    pub fn labeled_lists(&self) -> Vec<(String, String)> {
        self.lists
            .iter()
            .enumerate()
            .map(|(index, list)| (list.url.clone(), list.label(index)))
            .collect()
    }
}

/// What to watch and how often.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Identifiers to look for on every list
    pub targets: Vec<String>,

    /// Maximum pages fetched per list per pass
    #[serde(default = "defaults::page_limit")]
    pub page_limit: usize,

    /// Time between the starts of two passes
    #[serde(default = "defaults::interval_secs")]
    pub interval_secs: u64,

    /// Minimum time between two alerts with the same key
    #[serde(default = "defaults::cooldown_minutes")]
    pub cooldown_minutes: u64,

    /// Ranks at or below this are "top"
    #[serde(default = "defaults::top_threshold")]
    pub top_threshold: u32,

    /// Ranks at or below this (and above top) are "warn"
    #[serde(default = "defaults::warn_threshold")]
    pub warn_threshold: u32,

    #[serde(default = "defaults::state_file")]
    pub state_file: PathBuf,

    #[serde(default = "defaults::log_file")]
    pub log_file: PathBuf,
}

impl WatchConfig {
    /// Pass interval, raised to the one-minute floor.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(MIN_INTERVAL_SECS))
    }

    /// Alert cooldown, saturated at the largest representable duration.
    pub fn cooldown(&self) -> chrono::Duration {
        self.try_cooldown().unwrap_or(chrono::Duration::MAX)
    }

    fn try_cooldown(&self) -> Option<chrono::Duration> {
        i64::try_from(self.cooldown_minutes)
            .ok()
            .and_then(chrono::Duration::try_minutes)
    }

    /// Tier for a rank; first matching threshold wins.
    pub fn tier_for(&self, rank: u32) -> Tier {
        if rank <= self.top_threshold {
            Tier::Top
        } else if rank <= self.warn_threshold {
            Tier::Warn
        } else {
            Tier::Update
        }
    }
}

/// A paginated list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    /// Base URL; the page index is appended as a path segment
    pub url: String,

    #[serde(default)]
    pub label: Option<String>,
}

impl ListConfig {
    /// Configured label, or `Liste {index}`.
    pub fn label(&self, index: usize) -> String {
        match &self.label {
            Some(label) if !label.trim().is_empty() => label.trim().to_string(),
            _ => format!("Liste {index}"),
        }
    }
}

/// HTTP client and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    #[serde(default = "defaults::connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "defaults::read_timeout")]
    pub read_timeout_secs: u64,

    /// Total attempts per page, including the first
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Wait before the second attempt
    #[serde(default = "defaults::initial_backoff")]
    pub initial_backoff_secs: f64,

    /// Multiplier applied to the wait after each failed attempt
    #[serde(default = "defaults::retry_backoff")]
    pub retry_backoff: f64,

    /// Overall timeout for one webhook call
    #[serde(default = "defaults::notify_timeout")]
    pub notify_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            connect_timeout_secs: defaults::connect_timeout(),
            read_timeout_secs: defaults::read_timeout(),
            max_retries: defaults::max_retries(),
            initial_backoff_secs: defaults::initial_backoff(),
            retry_backoff: defaults::retry_backoff(),
            notify_timeout_secs: defaults::notify_timeout(),
        }
    }
}

/// Credentials for one intranet portal.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginConfig {
    /// Page holding the login form
    pub url: String,

    pub username: String,

    pub password: String,

    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Additional form fields sent with the credentials
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl std::fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("enabled", &self.enabled)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Discord webhook delivery and message templates.
///
/// Supported placeholders: `{ping}`, `{label}`, `{rank}`, `{target}`,
/// `{shift}`, `{date}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,

    /// Mention prepended to every tier unless overridden below
    #[serde(default)]
    pub ping: String,

    #[serde(default)]
    pub top_ping: Option<String>,

    #[serde(default)]
    pub warn_ping: Option<String>,

    #[serde(default)]
    pub update_ping: Option<String>,

    #[serde(default = "defaults::top_template")]
    pub top_template: String,

    #[serde(default = "defaults::warn_template")]
    pub warn_template: String,

    #[serde(default = "defaults::update_template")]
    pub update_template: String,
}

impl DiscordConfig {
    /// Template for a tier; `None` when the tier is disabled.
    pub fn template(&self, tier: Tier) -> Option<&str> {
        let template = match tier {
            Tier::Top => &self.top_template,
            Tier::Warn => &self.warn_template,
            Tier::Update => &self.update_template,
        };
        (!template.trim().is_empty()).then_some(template.as_str())
    }

    /// Mention used for a tier.
    pub fn ping(&self, tier: Tier) -> &str {
        let specific = match tier {
            Tier::Top => &self.top_ping,
            Tier::Warn => &self.warn_ping,
            Tier::Update => &self.update_ping,
        };
        specific.as_deref().unwrap_or(&self.ping).trim()
    }
}

mod defaults {
    use std::path::PathBuf;

    // Watch defaults
    pub fn page_limit() -> usize {
        20
    }
    pub fn interval_secs() -> u64 {
        300
    }
    pub fn cooldown_minutes() -> u64 {
        30
    }
    pub fn top_threshold() -> u32 {
        6
    }
    pub fn warn_threshold() -> u32 {
        10
    }
    pub fn state_file() -> PathBuf {
        PathBuf::from("state.json")
    }
    pub fn log_file() -> PathBuf {
        PathBuf::from("watcher.log")
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; recall-watcher/0.1)".into()
    }
    pub fn connect_timeout() -> u64 {
        15
    }
    pub fn read_timeout() -> u64 {
        90
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn initial_backoff() -> f64 {
        1.0
    }
    pub fn retry_backoff() -> f64 {
        2.0
    }
    pub fn notify_timeout() -> u64 {
        15
    }

    pub fn enabled() -> bool {
        true
    }

    // Template defaults
    pub fn top_template() -> String {
        "{ping} 🔥 {label} #{rank} ({shift}) le {date} — {target}".into()
    }
    pub fn warn_template() -> String {
        "{ping} ⚠️ {label} #{rank} ({shift}) le {date} — {target}".into()
    }
    pub fn update_template() -> String {
        "{ping} ℹ️ {label} #{rank} ({shift}) le {date} — {target}".into()
    }
}
