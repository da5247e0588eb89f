//! The JSON settings file.

use crate::error::{CliError, CliResult};
use fitsync_sync_engine::{SuccessPolicy, SyncConfig, SyncToggles};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Where each document kind is placed, relative to the vault root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderLayout {
    /// Folder all documents live under. Empty for the vault root.
    pub base_path: String,
    /// Recipe documents.
    pub recipes_folder: String,
    /// Daily documents, nested by year and month.
    pub tracker_folder: String,
    /// Meal-prep plans.
    pub mealprep_folder: String,
    /// The medication list.
    pub health_folder: String,
    /// Inventory and shopping list.
    pub lists_folder: String,
    /// File name of the profile page.
    pub profile_file_name: String,
}

impl Default for FolderLayout {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            recipes_folder: "rezepte".into(),
            tracker_folder: "tracker".into(),
            mealprep_folder: "mealprep".into(),
            health_folder: "gesundheit".into(),
            lists_folder: "listen".into(),
            profile_file_name: "Profil.md".into(),
        }
    }
}

/// Driver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Per-table switches.
    pub toggles: SyncToggles,
    /// Minutes between incremental passes in `watch`.
    pub sync_interval_minutes: u64,
    /// How pass success is judged.
    pub success_policy: SuccessPolicy,
    /// Folder layout of the vault.
    pub layout: FolderLayout,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            toggles: SyncToggles::default(),
            sync_interval_minutes: 15,
            success_policy: SuccessPolicy::default(),
            layout: FolderLayout::default(),
        }
    }
}

impl Settings {
    /// Reads the settings at `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> CliResult<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| CliError::Settings {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Interval between automatic incremental passes, at least one minute.
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_minutes.max(1) * 60)
    }

    /// Engine configuration derived from these settings.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::new()
            .with_toggles(self.toggles.clone())
            .with_success_policy(self.success_policy)
            .with_sync_interval(self.sync_interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.sync_interval(), Duration::from_secs(15 * 60));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"toggles": {"water": false}, "layout": {"base_path": "FitAssistent"}, "sync_interval_minutes": 0}"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert!(!settings.toggles.water);
        assert!(settings.toggles.meals);
        assert_eq!(settings.layout.base_path, "FitAssistent");
        assert_eq!(settings.layout.recipes_folder, "rezepte");
        assert_eq!(settings.sync_interval(), Duration::from_secs(60));
        assert!(!settings.sync_config().toggles.water);
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{").unwrap();

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, CliError::Settings { .. }));
        assert!(err.to_string().contains("settings.json"));
    }
}
