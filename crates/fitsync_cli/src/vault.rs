//! Document store writing markdown files into a vault directory.

use crate::settings::FolderLayout;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use fitsync_model::{Document, MealPrepPlan, Recipe};
use fitsync_sync_engine::{DocumentStore, SyncError, SyncResult, WriteOutcome};
use std::path::PathBuf;

/// Longest file stem kept by [`sanitize_filename`], in characters.
const MAX_STEM_CHARS: usize = 200;

/// Makes `name` safe as a file stem: path and wildcard characters become
/// `-`, whitespace runs collapse to one space, and the result is trimmed
/// and capped at 200 characters.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>' => '-',
            other => other,
        })
        .collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(MAX_STEM_CHARS).collect()
}

/// File stem of an unnamed meal-prep plan: `KWnn-YYYY` from the ISO week
/// of the start date and its calendar year.
pub fn week_stem(start: NaiveDate) -> String {
    format!("KW{:02}-{}", start.iso_week().week(), start.year())
}

/// A [`DocumentStore`] over a directory on disk.
///
/// Paths handed to the engine are relative to the vault root and always
/// use `/` separators.
#[derive(Debug, Clone)]
pub struct VaultStore {
    root: PathBuf,
    layout: FolderLayout,
}

impl VaultStore {
    /// Creates a store writing under `root`.
    pub fn new(root: impl Into<PathBuf>, layout: FolderLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    /// Joins `parts` below the base path, skipping empty segments.
    fn relative(&self, parts: &[&str]) -> String {
        std::iter::once(self.layout.base_path.as_str())
            .chain(parts.iter().copied())
            .flat_map(|part| part.split('/'))
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn recipe_path(&self, recipe: &Recipe) -> String {
        let title = match recipe.title.trim() {
            "" => "Unbekanntes Rezept",
            title => title,
        };
        let file = format!("{}.md", sanitize_filename(title));
        self.relative(&[&self.layout.recipes_folder, &file])
    }

    fn mealprep_path(&self, plan: &MealPrepPlan) -> String {
        let stem = match plan.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => sanitize_filename(name),
            _ => week_stem(plan.start_date),
        };
        let file = format!("{stem}.md");
        self.relative(&[&self.layout.mealprep_folder, &file])
    }

    fn daily_path(&self, date: NaiveDate) -> String {
        let year = format!("{:04}", date.year());
        let month = format!("{:02}", date.month());
        let file = format!("{}.md", date.format("%Y-%m-%d"));
        self.relative(&[&self.layout.tracker_folder, &year, &month, &file])
    }

    fn absolute(&self, path: &str) -> PathBuf {
        path.split('/').fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

#[async_trait]
impl DocumentStore for VaultStore {
    fn resolve_path(&self, document: &Document<'_>) -> SyncResult<String> {
        let layout = &self.layout;
        let path = match document {
            Document::Profile(_) => self.relative(&[&layout.profile_file_name]),
            Document::Medications(_) => self.relative(&[&layout.health_folder, "Medikamente.md"]),
            Document::Recipe(recipe) => self.recipe_path(recipe),
            Document::MealprepPlan(plan) => self.mealprep_path(plan),
            Document::Inventory(_) => self.relative(&[&layout.lists_folder, "Inventar.md"]),
            Document::ShoppingList(_) => self.relative(&[&layout.lists_folder, "Einkaufsliste.md"]),
            Document::Daily(daily) => self.daily_path(daily.date),
        };
        Ok(path)
    }

    async fn write_or_update(&self, path: &str, content: &str) -> SyncResult<WriteOutcome> {
        let target = self.absolute(path);
        let io = |e: std::io::Error| SyncError::write(path, e.to_string());
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io)?;
        }
        let existed = tokio::fs::try_exists(&target).await.map_err(io)?;
        tokio::fs::write(&target, content).await.map_err(io)?;
        Ok(if existed {
            WriteOutcome::Updated
        } else {
            WriteOutcome::Created
        })
    }
}
