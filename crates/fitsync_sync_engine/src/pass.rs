//! Pass modes, stages, progress reporting and pass results.

use crate::config::SyncToggles;
use crate::error_log::SyncErrorEntry;
use fitsync_model::SourceTable;
use std::fmt;
use std::time::Duration;

/// The kind of batch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Every enabled table read without a watermark.
    Full,
    /// Reads bounded by per-table watermarks.
    Incremental,
}

impl SyncMode {
    /// Item id recorded when a whole table fails in this mode.
    pub(crate) fn scope_marker(&self) -> &'static str {
        match self {
            SyncMode::Full => "all",
            SyncMode::Incremental => "incremental",
        }
    }

    /// Item id of synthetic orchestration errors in this mode.
    pub(crate) fn pass_name(&self) -> &'static str {
        match self {
            SyncMode::Full => "full_sync",
            SyncMode::Incremental => "incremental",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Full => f.write_str("full"),
            SyncMode::Incremental => f.write_str("incremental"),
        }
    }
}

/// One step of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStage {
    /// The profile page.
    Profile,
    /// The medication list.
    Medications,
    /// Recipe documents.
    Recipes,
    /// Meal-prep plan documents.
    MealprepPlans,
    /// The inventory list.
    Inventory,
    /// The shopping list.
    ShoppingList,
    /// Daily documents.
    DailyNotes,
}

impl SyncStage {
    /// Stages in execution order.
    ///
    /// Profile and medications come first because later documents look
    /// names up in them; daily notes come last.
    pub const ORDER: [SyncStage; 7] = [
        SyncStage::Profile,
        SyncStage::Medications,
        SyncStage::Recipes,
        SyncStage::MealprepPlans,
        SyncStage::Inventory,
        SyncStage::ShoppingList,
        SyncStage::DailyNotes,
    ];

    /// Source tables read by this stage.
    pub fn tables(&self) -> &'static [SourceTable] {
        match self {
            SyncStage::Profile => &[SourceTable::Profile],
            SyncStage::Medications => &[SourceTable::Medications],
            SyncStage::Recipes => &[SourceTable::Recipes],
            SyncStage::MealprepPlans => &[SourceTable::MealprepPlans],
            SyncStage::Inventory => &[SourceTable::InventoryItems],
            SyncStage::ShoppingList => &[SourceTable::ShoppingItems],
            SyncStage::DailyNotes => &SourceTable::DAILY_SOURCES,
        }
    }

    /// Returns true if any table of this stage is enabled.
    pub fn is_enabled(&self, toggles: &SyncToggles) -> bool {
        self.tables().iter().any(|table| toggles.is_enabled(*table))
    }

    /// Stable lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            SyncStage::Profile => "profile",
            SyncStage::Medications => "medications",
            SyncStage::Recipes => "recipes",
            SyncStage::MealprepPlans => "mealprep_plans",
            SyncStage::Inventory => "inventory",
            SyncStage::ShoppingList => "shopping_list",
            SyncStage::DailyNotes => "daily_notes",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress event passed to a [`ProgressFn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncProgress {
    /// The running pass.
    pub mode: SyncMode,
    /// The step that is starting.
    pub stage: SyncStage,
}

/// Progress callback accepted by the batch passes.
pub type ProgressFn = dyn Fn(SyncProgress) + Send + Sync;

/// Summary of one full or incremental pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPassResult {
    /// Whether the pass counts as successful, see
    /// [`SuccessPolicy`](crate::SuccessPolicy).
    pub success: bool,
    /// Documents created.
    pub files_created: usize,
    /// Documents overwritten.
    pub files_updated: usize,
    /// Errors reported for this pass.
    pub errors: Vec<SyncErrorEntry>,
    /// Wall time of the pass.
    pub duration: Duration,
}

impl SyncPassResult {
    /// Total number of documents written.
    pub fn files_written(&self) -> usize {
        self.files_created + self.files_updated
    }
}

/// Statistics about the engine since it was created.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Passes completed, either mode.
    pub passes_completed: u64,
    /// Full passes completed.
    pub full_passes: u64,
    /// Incremental passes completed.
    pub incremental_passes: u64,
    /// Single-item resyncs that wrote a document.
    pub items_resynced: u64,
    /// Duration of the latest pass.
    pub last_pass_duration: Option<Duration>,
}

/// Write counters collected while a pass runs.
#[derive(Debug, Default)]
pub(crate) struct PassCounters {
    pub(crate) created: usize,
    pub(crate) updated: usize,
}
