//! Configuration management for promptpilot
//!
//! Supports environment variables, config files, and runtime overrides.
//! Selector priority lists live here and are handed to components as
//! immutable [`SelectorSet`]s.
//!
//! Config file location: ~/.config/promptpilot/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::{PilotError, Result};
use crate::core::types::{SelectorRole, SelectorSet};

/// Main configuration for promptpilot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// DevTools endpoint
    #[serde(default)]
    pub browser: BrowserConfig,
    /// Platform the tab should be on
    #[serde(default)]
    pub platform: PlatformConfig,
    /// Delays, timeouts and retry bounds
    #[serde(default)]
    pub timing: TimingConfig,
    /// Selector priority lists
    #[serde(default)]
    pub selectors: SelectorConfig,
    /// Queue source
    #[serde(default)]
    pub queue: QueueConfig,
    /// Log verbosity
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// DevTools endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Host of the debugging endpoint (default: localhost)
    pub host: String,
    /// Remote debugging port (default: 9222)
    pub port: u16,
    /// HTTP timeout for the discovery endpoint in seconds
    pub discovery_timeout_secs: u64,
    /// Per-command response timeout in seconds, 0 waits forever
    pub command_timeout_secs: u64,
}

/// Platform identification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Case-insensitive substring identifying the platform's tab
    pub pattern: String,
    /// Where to send a tab that isn't on the platform yet
    pub home_url: String,
    /// Treat the control as actionable only while its form validates
    pub require_valid_form: bool,
}

/// Delays and retry bounds
///
/// The defaults are tuned for a generation UI that takes tens of seconds
/// per submission and debounces rapid input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Wait after activation before declaring the item done
    pub settle_secs: u64,
    /// Rounds per item
    pub retry_attempts: u32,
    /// Backoff between rounds
    pub retry_delay_secs: u64,
    /// Pause between items
    pub pacing_ms: u64,
    /// Pause between filling the field and locating the control
    pub post_fill_ms: u64,
    /// Wait for the framework to re-render after a fill
    pub fill_settle_ms: u64,
    /// Delay of the trailing input re-assertion inside the page
    pub reassert_ms: u64,
    /// How long to wait for the control to become actionable
    pub enable_timeout_secs: u64,
    /// Poll interval while waiting for the control
    pub enable_poll_ms: u64,
    /// Pause after each escalation strategy before probing for an effect
    pub strategy_pause_ms: u64,
    /// Wait after navigating the tab to the home URL
    pub navigation_wait_ms: u64,
    /// Wait after attaching before the first item
    pub page_ready_ms: u64,
}

/// Selector priority lists
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Candidates for the input field, highest priority first
    pub input: Vec<String>,
    /// Candidates for the activation control, highest priority first
    pub control: Vec<String>,
    /// Inner glyph some controls bind their handler to
    pub inner_icon: String,
    /// Elements whose presence means the action was accepted
    pub loading_indicators: Vec<String>,
    /// URL fragments that mean the page moved on to a result
    pub result_url_markers: Vec<String>,
}

/// Queue source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Line-oriented UTF-8 file, one item per line
    pub path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
}

/// Parse an environment variable if it is set
fn env_value<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| PilotError::config(format!("invalid {}='{}': {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9222,
            discovery_timeout_secs: 5,
            command_timeout_secs: 0,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            pattern: "whisk".to_string(),
            home_url: "https://whisk.com".to_string(),
            require_valid_form: false,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_secs: 20,
            retry_attempts: 3,
            retry_delay_secs: 5,
            pacing_ms: 2000,
            post_fill_ms: 1000,
            fill_settle_ms: 1500,
            reassert_ms: 100,
            enable_timeout_secs: 20,
            enable_poll_ms: 500,
            strategy_pause_ms: 2000,
            navigation_wait_ms: 3000,
            page_ready_ms: 2000,
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            input: strings(&[
                r#"textarea[placeholder*="Describe your idea"]"#,
                r#"textarea[placeholder*="Describe"]"#,
                r#"textarea[placeholder*="idea"]"#,
                "textarea",
            ]),
            control: strings(&[
                r#"button[aria-label="Submit prompt"]"#,
                r#"button[type="submit"]"#,
                r#"button[aria-label*="Submit"]"#,
                "button:has(i.google-symbols)",
            ]),
            inner_icon: "i.google-symbols".to_string(),
            loading_indicators: strings(&[
                ".loading",
                ".spinner",
                r#"[data-loading="true"]"#,
                ".generating",
                ".progress",
                r#"[aria-busy="true"]"#,
            ]),
            result_url_markers: strings(&["generating", "result"]),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("prompts.txt"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl BrowserConfig {
    /// Base URL of the HTTP introspection endpoint
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }

    /// Per-command timeout, `None` when commands may wait forever
    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_secs > 0).then(|| Duration::from_secs(self.command_timeout_secs))
    }
}

impl PlatformConfig {
    /// Whether a URL or title belongs to the platform
    pub fn matches(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.pattern.to_lowercase())
    }
}

impl TimingConfig {
    /// All waits zeroed, for driving the state machines without sleeping
    pub fn immediate() -> Self {
        Self {
            settle_secs: 0,
            retry_attempts: 3,
            retry_delay_secs: 0,
            pacing_ms: 0,
            post_fill_ms: 0,
            fill_settle_ms: 0,
            reassert_ms: 0,
            enable_timeout_secs: 0,
            enable_poll_ms: 0,
            strategy_pause_ms: 0,
            navigation_wait_ms: 0,
            page_ready_ms: 0,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn post_fill_delay(&self) -> Duration {
        Duration::from_millis(self.post_fill_ms)
    }

    pub fn fill_settle_delay(&self) -> Duration {
        Duration::from_millis(self.fill_settle_ms)
    }

    pub fn enable_timeout(&self) -> Duration {
        Duration::from_secs(self.enable_timeout_secs)
    }

    pub fn enable_poll(&self) -> Duration {
        Duration::from_millis(self.enable_poll_ms)
    }

    pub fn strategy_pause(&self) -> Duration {
        Duration::from_millis(self.strategy_pause_ms)
    }

    pub fn navigation_wait(&self) -> Duration {
        Duration::from_millis(self.navigation_wait_ms)
    }

    pub fn page_ready_wait(&self) -> Duration {
        Duration::from_millis(self.page_ready_ms)
    }

    /// Number of actionability polls that fit in the enable timeout (at least one)
    pub fn enable_polls(&self) -> u64 {
        let poll = self.enable_poll_ms.max(1);
        (self.enable_timeout_secs * 1000 / poll).max(1)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("promptpilot")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let path = Self::config_file();
        if path.exists() {
            return Self::from_file(&path);
        }

        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from an explicit file, then apply env overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PilotError::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| PilotError::config(format!("Failed to read config: {}", e)))?;

        let mut config = Self::from_toml(&content)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from `PILOT_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(host) = env_value::<String>("PILOT_DEBUG_HOST")? {
            self.browser.host = host;
        }
        if let Some(port) = env_value("PILOT_DEBUG_PORT")? {
            self.browser.port = port;
        }
        if let Some(path) = env_value::<PathBuf>("PILOT_PROMPTS")? {
            self.queue.path = path;
        }
        if let Some(secs) = env_value("PILOT_SETTLE_SECS")? {
            self.timing.settle_secs = secs;
        }
        if let Some(rounds) = env_value("PILOT_RETRIES")? {
            self.timing.retry_attempts = rounds;
        }
        if let Some(secs) = env_value("PILOT_RETRY_DELAY_SECS")? {
            self.timing.retry_delay_secs = secs;
        }
        if let Some(level) = env_value::<String>("PILOT_LOG_LEVEL")? {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Parse configuration from TOML text; missing sections take defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PilotError::config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to the default file and return its path
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| PilotError::config(format!("Failed to create config dir: {}", e)))?;
        }

        fs::write(&config_path, self.to_toml()?)
            .map_err(|e| PilotError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Serialize to pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PilotError::config(format!("Failed to serialize config: {}", e)))
    }

    /// Default configuration as TOML, for display
    pub fn default_config_toml() -> String {
        Config::default()
            .to_toml()
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }

    /// Check the invariants the run depends on
    pub fn validate(&self) -> Result<()> {
        self.selector_set(SelectorRole::Input)?;
        self.selector_set(SelectorRole::Control)?;

        if self.timing.retry_attempts == 0 {
            return Err(PilotError::config("retry_attempts must be at least 1"));
        }

        if self.platform.pattern.trim().is_empty() {
            return Err(PilotError::config("platform pattern is empty"));
        }

        url::Url::parse(&self.platform.home_url).map_err(|e| {
            PilotError::config(format!(
                "invalid home_url '{}': {}",
                self.platform.home_url, e
            ))
        })?;

        Ok(())
    }

    /// Immutable selector set for a role
    pub fn selector_set(&self, role: SelectorRole) -> Result<SelectorSet> {
        let candidates = match role {
            SelectorRole::Input => self.selectors.input.clone(),
            SelectorRole::Control => self.selectors.control.clone(),
        };
        SelectorSet::new(role, candidates)
    }
}
