//! Re-render a single document.

use super::Workspace;
use crate::error::{CliError, CliResult};
use fitsync_model::{parse_date, ResyncKey};
use fitsync_sync_engine::WriteOutcome;

/// Parses `recipe:<id>`, `mealprep:<id>`, `date:<YYYY-MM-DD>`,
/// `inventory`, `medications` or `shopping`.
pub fn parse_target(target: &str) -> CliResult<ResyncKey> {
    let invalid = || CliError::InvalidTarget(target.to_string());
    let key = match target.split_once(':') {
        Some(("recipe", id)) if !id.is_empty() => ResyncKey::Recipe(id.to_string()),
        Some(("mealprep", id)) if !id.is_empty() => ResyncKey::MealprepPlan(id.to_string()),
        Some(("date", date)) => ResyncKey::Daily(parse_date(date).ok_or_else(invalid)?),
        Some(_) => return Err(invalid()),
        None => match target {
            "inventory" => ResyncKey::Inventory,
            "medications" => ResyncKey::Medications,
            "shopping" => ResyncKey::ShoppingList,
            _ => return Err(invalid()),
        },
    };
    Ok(key)
}

/// Re-renders the document behind `target`.
pub async fn run(workspace: &Workspace, target: &str) -> CliResult<()> {
    let key = parse_target(target)?;
    let (engine, _) = workspace.open().await?;

    match engine.resync(&key).await? {
        Some(WriteOutcome::Created) => println!("✓ Created {}", key.debounce_key()),
        Some(WriteOutcome::Updated) => println!("✓ Updated {}", key.debounce_key()),
        None => println!("Nothing to write for {}", key.debounce_key()),
    }
    Ok(())
}
