/*!
 * Resource Governor - Main Entry Point
 *
 * Installs the governance facade from the environment, then holds it until
 * Ctrl-C and runs the shutdown sweep over every tracked process.
 */

use std::error::Error;
use std::path::PathBuf;
use tracing::{error, info};

use resource_governor::core::persist_bytes;
use resource_governor::{init_tracing, install, GovernanceConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize structured tracing
    init_tracing();

    info!("Resource governor starting...");

    let config = match std::env::var("GOVERNOR_CONFIG") {
        Ok(path) => {
            info!(path = %path, "Loading configuration file");
            let raw = tokio::fs::read_to_string(&path).await?;
            GovernanceConfig::from_json(&raw)?.overlay(|name| std::env::var(name).ok())?
        }
        Err(_) => GovernanceConfig::from_env()?,
    };

    let governance = install(config)?;
    info!("Governance ready; press Ctrl-C to shut down");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, terminating tracked processes");

    let summary = governance.shutdown().await;
    let report = serde_json::to_vec_pretty(&summary)?;

    if let Ok(path) = std::env::var("GOVERNOR_SUMMARY_PATH") {
        let written = persist_bytes(PathBuf::from(path), report.clone()).await?;
        info!(path = %written.display(), "Shutdown summary written");
    }

    if summary.is_clean() {
        info!(summary = %String::from_utf8_lossy(&report), "Resource governor stopped");
        Ok(())
    } else {
        error!(
            failed = summary.failed,
            failed_pids = ?summary.failed_pids,
            "Shutdown left unreaped processes"
        );
        Err(format!("{} process(es) could not be reaped", summary.failed).into())
    }
}
