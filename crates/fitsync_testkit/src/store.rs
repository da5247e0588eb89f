//! In-memory document store.

use async_trait::async_trait;
use fitsync_model::Document;
use fitsync_sync_engine::{DocumentStore, SyncError, SyncResult, WriteOutcome};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};

/// One write seen by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    /// Target path.
    pub path: String,
    /// Written content.
    pub content: String,
    /// Whether the write created the path.
    pub outcome: WriteOutcome,
}

#[derive(Debug, Default)]
struct StoreInner {
    files: BTreeMap<String, String>,
    writes: Vec<WriteRecord>,
    failing: HashSet<String>,
}

/// A [`DocumentStore`] keeping documents in a map, laid out like a vault.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    inner: Mutex<StoreInner>,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write to `path` fail.
    pub fn fail_on(&self, path: impl Into<String>) {
        self.inner.lock().failing.insert(path.into());
    }

    /// Current content of `path`.
    pub fn get(&self, path: &str) -> Option<String> {
        self.inner.lock().files.get(path).cloned()
    }

    /// Returns true if `path` exists.
    pub fn contains(&self, path: &str) -> bool {
        self.inner.lock().files.contains_key(path)
    }

    /// Every stored path, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.inner.lock().files.keys().cloned().collect()
    }

    /// Every write in order.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.inner.lock().writes.clone()
    }

    /// Total number of writes.
    pub fn write_count(&self) -> usize {
        self.inner.lock().writes.len()
    }

    /// Number of writes to paths starting with `prefix`.
    pub fn writes_under(&self, prefix: &str) -> usize {
        self.inner
            .lock()
            .writes
            .iter()
            .filter(|w| w.path.starts_with(prefix))
            .count()
    }

    /// Forgets the write history, keeping the documents.
    pub fn clear_writes(&self) {
        self.inner.lock().writes.clear();
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn resolve_path(&self, document: &Document<'_>) -> SyncResult<String> {
        let path = match document {
            Document::Profile(_) => "Profil.md".to_string(),
            Document::Medications(_) => "gesundheit/Medikamente.md".to_string(),
            Document::Recipe(recipe) => {
                let name = if recipe.title.trim().is_empty() {
                    recipe.id.as_str()
                } else {
                    recipe.title.trim()
                };
                format!("rezepte/{name}.md")
            }
            Document::MealprepPlan(plan) => format!("mealprep/{}.md", plan.id),
            Document::Inventory(_) => "listen/Inventar.md".to_string(),
            Document::ShoppingList(_) => "listen/Einkaufsliste.md".to_string(),
            Document::Daily(daily) => format!("tracker/{}.md", daily.date.format("%Y-%m-%d")),
        };
        Ok(path)
    }

    async fn write_or_update(&self, path: &str, content: &str) -> SyncResult<WriteOutcome> {
        let mut inner = self.inner.lock();
        if inner.failing.contains(path) {
            return Err(SyncError::write(path, "injected failure"));
        }
        let outcome = match inner.files.insert(path.to_string(), content.to_string()) {
            Some(_) => WriteOutcome::Updated,
            None => WriteOutcome::Created,
        };
        inner.writes.push(WriteRecord {
            path: path.to_string(),
            content: content.to_string(),
            outcome,
        });
        Ok(outcome)
    }
}
