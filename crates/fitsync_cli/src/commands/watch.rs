//! Periodic incremental passes until interrupted.

use super::{sync, Workspace};
use crate::error::CliResult;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Runs a full pass, then an incremental pass every sync interval until
/// Ctrl-C.
pub async fn run(workspace: &Workspace) -> CliResult<()> {
    let (engine, settings) = workspace.open().await?;
    let interval = settings.sync_interval();

    sync::report(&engine.full_sync(None).await);
    info!(?interval, "watching for changes");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let result = engine.incremental_sync(None).await;
                if !result.success {
                    warn!(errors = result.errors.len(), "incremental pass failed");
                }
                sync::report(&result);
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("interrupted, stopping");
                break;
            }
        }
    }
    Ok(())
}
