//! One controlled tab, from discovery to teardown

use std::sync::Arc;

use crate::cdp::discovery::{TargetDiscovery, TargetInfo};
use crate::cdp::transport::{CdpClient, Protocol};
use crate::core::{Config, Result};
use crate::script::{PageSnapshot, ScriptRunner};

/// Attached tab with its open transport
pub struct Session {
    client: Arc<CdpClient>,
}

impl Session {
    /// Discover a target, connect, bring it to the platform and enable the
    /// domains the scripts need.
    pub async fn start(config: &Config) -> Result<Self> {
        let discovery = TargetDiscovery::new(&config.browser)?;
        let target = discovery.resolve(&config.platform).await?;
        Self::attach(config, target).await
    }

    /// Attach to an already chosen target
    pub async fn attach(config: &Config, target: TargetInfo) -> Result<Self> {
        let ws_url = target.ws_url.clone().unwrap_or_default();
        let client = Arc::new(CdpClient::connect(&ws_url, config.browser.command_timeout()).await?);
        tracing::info!(title = %target.title, "attached to target");

        let session = Self { client };

        if let Err(e) = session.prepare(config, &target).await {
            session.close().await;
            return Err(e);
        }

        Ok(session)
    }

    async fn prepare(&self, config: &Config, target: &TargetInfo) -> Result<()> {
        if !config.platform.matches(&target.url) {
            tracing::info!(url = %config.platform.home_url, "navigating to platform");
            self.client.navigate(&config.platform.home_url).await?;
            tokio::time::sleep(config.timing.navigation_wait()).await;
        }

        self.client.enable_domain("Runtime").await?;
        self.client.enable_domain("DOM").await?;

        tokio::time::sleep(config.timing.page_ready_wait()).await;

        // One look at the page for diagnosing selectors later.
        match PageSnapshot::capture(&self.runner()).await {
            Ok(snapshot) => {
                tracing::debug!(page = %snapshot.format_for_display(), "page at attach")
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => tracing::debug!(error = %e, "page inspection failed"),
        }
        Ok(())
    }

    /// Script runner bound to this tab
    pub fn runner(&self) -> ScriptRunner {
        let protocol: Arc<dyn Protocol> = self.client.clone();
        ScriptRunner::new(protocol)
    }

    /// Release the connection; safe to call more than once
    pub async fn close(&self) {
        self.client.close().await;
    }
}
