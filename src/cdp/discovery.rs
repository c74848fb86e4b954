//! Target discovery over the DevTools HTTP endpoint
//!
//! Lists open targets via `GET /json`, picks the one to drive, and creates a
//! new one pointed at the platform when nothing suitable is open.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::core::config::{BrowserConfig, PlatformConfig};
use crate::core::{PilotError, Result};

/// One debuggable target as reported by `/json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "type", default)]
    pub target_type: String,
    /// Absent when another client is already attached
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub ws_url: Option<String>,
}

impl TargetInfo {
    pub fn is_page(&self) -> bool {
        self.target_type == "page"
    }

    pub fn is_connectable(&self) -> bool {
        self.ws_url.is_some()
    }
}

/// Why a target was chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetChoice {
    /// URL or title matched the platform pattern
    Platform(TargetInfo),
    /// First open page with a connection endpoint
    AnyPage(TargetInfo),
    /// Nothing suitable; a new target is needed
    CreateNew,
}

/// Apply the selection policy to a target list
pub fn select_target(targets: &[TargetInfo], platform: &PlatformConfig) -> TargetChoice {
    if let Some(target) = targets
        .iter()
        .find(|t| t.is_connectable() && (platform.matches(&t.url) || platform.matches(&t.title)))
    {
        return TargetChoice::Platform(target.clone());
    }

    if let Some(target) = targets.iter().find(|t| t.is_page() && t.is_connectable()) {
        return TargetChoice::AnyPage(target.clone());
    }

    TargetChoice::CreateNew
}

/// Client for the introspection endpoint
pub struct TargetDiscovery {
    client: Client,
    endpoint: String,
}

impl TargetDiscovery {
    pub fn new(config: &BrowserConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.discovery_timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
        })
    }

    /// Base URL of the endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn unavailable(&self, path: &str, reason: impl Into<String>) -> PilotError {
        PilotError::DiscoveryUnavailable {
            endpoint: format!("{}{}", self.endpoint, path),
            reason: reason.into(),
        }
    }

    /// List currently open targets
    pub async fn list_targets(&self) -> Result<Vec<TargetInfo>> {
        let url = format!("{}/json", self.endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.unavailable("/json", e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.unavailable("/json", format!("HTTP {}", response.status())));
        }

        let targets: Vec<TargetInfo> = response
            .json()
            .await
            .map_err(|e| self.unavailable("/json", format!("unreadable target list: {}", e)))?;

        tracing::info!(count = targets.len(), "found targets");
        Ok(targets)
    }

    /// Open a new target at `url`
    pub async fn create_target(&self, url: &str) -> Result<TargetInfo> {
        let path = format!("/json/new?{}", url);
        let full = format!("{}{}", self.endpoint, path);

        let mut response = self
            .client
            .put(&full)
            .send()
            .await
            .map_err(|e| self.unavailable(&path, e.to_string()))?;

        // Older browsers only accept GET here
        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            response = self
                .client
                .get(&full)
                .send()
                .await
                .map_err(|e| self.unavailable(&path, e.to_string()))?;
        }

        if !response.status().is_success() {
            return Err(PilotError::NoTarget(format!(
                "creating a target at {} returned HTTP {}",
                url,
                response.status()
            )));
        }

        let target: TargetInfo = response.json().await?;
        tracing::info!(id = %target.id, url, "created new target");
        Ok(target)
    }

    /// Pick the target to drive, creating one if needed
    pub async fn resolve(&self, platform: &PlatformConfig) -> Result<TargetInfo> {
        let targets = self.list_targets().await?;

        let target = match select_target(&targets, platform) {
            TargetChoice::Platform(t) => {
                tracing::info!(title = %t.title, "found platform tab");
                t
            }
            TargetChoice::AnyPage(t) => {
                tracing::info!(title = %t.title, "no platform tab, reusing open page");
                t
            }
            TargetChoice::CreateNew => {
                tracing::info!("no usable page, creating one");
                self.create_target(&platform.home_url).await?
            }
        };

        if !target.is_connectable() {
            return Err(PilotError::NoTarget(format!(
                "target {} has no WebSocket endpoint",
                target.id
            )));
        }

        Ok(target)
    }
}
