//! CLI command implementations.

pub mod reset;
pub mod resync;
pub mod state;
pub mod sync;
pub mod watch;

use crate::error::CliResult;
use crate::markdown::MarkdownRenderer;
use crate::settings::Settings;
use crate::snapshot::JsonSnapshotSource;
use crate::vault::VaultStore;
use fitsync_sync_engine::{JsonFileStorage, SyncEngine, SyncStateStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// The engine every command drives.
pub type VaultEngine = SyncEngine<JsonSnapshotSource, VaultStore, MarkdownRenderer>;

/// Locations a command works with.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Vault root.
    pub vault: PathBuf,
    /// JSON export of the remote tables.
    pub data: PathBuf,
    /// Driver settings.
    pub settings: PathBuf,
    /// Persisted sync state.
    pub state: PathBuf,
}

impl Workspace {
    /// Resolves unset paths below `<vault>/.fitsync`.
    pub fn new(
        vault: PathBuf,
        data: Option<PathBuf>,
        settings: Option<PathBuf>,
        state: Option<PathBuf>,
    ) -> Self {
        let home = vault.join(".fitsync");
        Self {
            data: data.unwrap_or_else(|| home.join("export.json")),
            settings: settings.unwrap_or_else(|| home.join("settings.json")),
            state: state.unwrap_or_else(|| home.join("state.json")),
            vault,
        }
    }

    /// Loads settings and state and builds the engine.
    pub async fn open(&self) -> CliResult<(VaultEngine, Settings)> {
        let settings = Settings::load(&self.settings)?;
        let storage = Arc::new(JsonFileStorage::new(&self.state));
        let state = SyncStateStore::load(storage).await?;
        debug!(vault = %self.vault.display(), data = %self.data.display(), "opening engine");

        let engine = SyncEngine::new(
            settings.sync_config(),
            JsonSnapshotSource::new(&self.data),
            VaultStore::new(&self.vault, settings.layout.clone()),
            MarkdownRenderer,
            state,
        );
        Ok((engine, settings))
    }
}

/// Formats a millisecond timestamp for display.
pub(crate) fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn unset_paths_live_below_the_vault() {
        let workspace = Workspace::new(PathBuf::from("/v"), None, None, Some("/s.json".into()));
        assert_eq!(workspace.data, Path::new("/v/.fitsync/export.json"));
        assert_eq!(workspace.settings, Path::new("/v/.fitsync/settings.json"));
        assert_eq!(workspace.state, Path::new("/s.json"));
    }

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
    }
}
