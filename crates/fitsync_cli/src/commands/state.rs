//! Show the persisted sync state.

use super::{format_timestamp, Workspace};
use crate::error::CliResult;

/// Prints the sync state as text or JSON.
pub async fn run(workspace: &Workspace, format: &str) -> CliResult<()> {
    let (engine, _) = workspace.open().await?;
    let state = engine.state();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!("Sync State");
    println!("==========");
    println!();
    println!(
        "Last full sync: {}",
        state
            .last_full_sync
            .map_or_else(|| "never".to_string(), format_timestamp)
    );
    println!("Documents: {}", state.file_mappings.len());

    if !state.watermarks.is_empty() {
        println!();
        println!("Watermarks:");
        for (table, ts) in &state.watermarks {
            println!("  {:<32} {}", table.name(), format_timestamp(*ts));
        }
    }

    if !state.errors.is_empty() {
        println!();
        println!("Errors ({}):", state.errors.len());
        for error in &state.errors {
            println!(
                "  [{}] {}/{}: {}",
                format_timestamp(error.timestamp),
                error.entity_type,
                error.item_id,
                error.message
            );
        }
    }
    Ok(())
}
