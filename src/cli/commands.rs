//! CLI commands
//!
//! The non-run subcommands: listing targets, inspecting the page and
//! showing or saving the effective configuration.

use crate::cdp::{Session, TargetDiscovery};
use crate::cli::report::render_targets;
use crate::core::{Config, Result};
use crate::script::PageSnapshot;

/// List the browser's debuggable targets
pub async fn list_targets(config: &Config) -> Result<String> {
    let discovery = TargetDiscovery::new(&config.browser)?;
    let targets = discovery.list_targets().await?;
    Ok(format!(
        "Endpoint: {}\n{}",
        discovery.endpoint(),
        render_targets(&targets)
    ))
}

/// Attach to the platform tab and describe its fields and buttons
pub async fn inspect_page(config: &Config) -> Result<String> {
    let session = Session::start(config).await?;
    let runner = session.runner();
    let snapshot = PageSnapshot::capture(&runner).await;
    session.close().await;

    let snapshot = snapshot?;
    let mut output = snapshot.format_for_display();

    let candidates = snapshot.submit_candidates();
    if !candidates.is_empty() {
        output.push_str("Likely submit controls:\n");
        for button in candidates {
            output.push_str(&format!(
                "  - \"{}\" aria-label=\"{}\"\n",
                button.text, button.aria_label
            ));
        }
    }
    Ok(output)
}

/// Effective configuration as TOML, optionally saved to the default location
pub fn show_config(config: &Config, save: bool) -> Result<String> {
    let mut output = config.to_toml()?;
    if save {
        let path = config.save()?;
        output.push_str(&format!("\n# Saved to {}\n", path.display()));
    } else {
        output.push_str(&format!(
            "\n# Default location: {}\n",
            Config::config_file().display()
        ));
    }
    Ok(output)
}
