//! One-shot full and incremental passes.

use super::Workspace;
use crate::error::{CliError, CliResult};
use fitsync_sync_engine::{ProgressFn, SyncPassResult, SyncProgress};
use tracing::{debug, info};

/// Runs one pass and prints its summary.
pub async fn run(workspace: &Workspace, full: bool) -> CliResult<()> {
    let (engine, _) = workspace.open().await?;
    let progress: &ProgressFn = &|event: SyncProgress| {
        debug!(mode = ?event.mode, stage = %event.stage, "stage started");
    };

    info!(full, "starting sync pass");
    let result = if full {
        engine.full_sync(Some(progress)).await
    } else {
        engine.incremental_sync(Some(progress)).await
    };
    report(&result);

    if result.success {
        Ok(())
    } else {
        Err(CliError::PassFailed(result.errors.len()))
    }
}

/// Prints a pass summary.
pub(crate) fn report(result: &SyncPassResult) {
    if result.success {
        println!("✓ Sync completed in {:?}", result.duration);
    } else {
        println!("✗ Sync finished with errors in {:?}", result.duration);
    }
    println!("  Created: {}", result.files_created);
    println!("  Updated: {}", result.files_updated);
    for error in &result.errors {
        println!("  Error: {}/{}: {}", error.entity_type, error.item_id, error.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;

    #[tokio::test]
    async fn full_pass_writes_the_vault() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = testing::workspace(dir.path());

        run(&workspace, true).await.unwrap();

        let vault = &workspace.vault;
        let recipe = std::fs::read_to_string(vault.join("rezepte/Soup.md")).unwrap();
        assert!(recipe.contains("# Soup"));
        let daily = std::fs::read_to_string(vault.join("tracker/2024/03/2024-03-01.md")).unwrap();
        assert!(daily.contains("| Oats | 350 |"));
        assert!(vault.join("Profil.md").exists());
        assert!(workspace.state.exists());
    }

    #[tokio::test]
    async fn incremental_pass_after_full_pass_writes_nothing_new() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = testing::workspace(dir.path());
        run(&workspace, true).await.unwrap();

        let (engine, _) = workspace.open().await.unwrap();
        let result = engine.incremental_sync(None).await;
        assert!(result.success);
        assert_eq!(result.files_created, 0);
    }

    #[tokio::test]
    async fn unreadable_export_fails_the_pass() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = testing::workspace(dir.path());
        std::fs::write(&workspace.data, "not json").unwrap();

        let err = run(&workspace, true).await.unwrap_err();
        assert!(matches!(err, CliError::PassFailed(n) if n > 0));
    }
}
