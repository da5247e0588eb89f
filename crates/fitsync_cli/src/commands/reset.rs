//! Forget watermarks, mappings and errors.

use super::Workspace;
use crate::error::CliResult;

/// Resets the persisted sync state. Vault files are left in place.
pub async fn run(workspace: &Workspace) -> CliResult<()> {
    let (engine, _) = workspace.open().await?;
    engine.reset_state().await?;
    println!("✓ Sync state reset");
    println!("  Path: {:?}", workspace.state);
    Ok(())
}
