//! A renderer producing short, deterministic text.

use fitsync_model::Document;
use fitsync_sync_engine::{RenderContext, Renderer, SyncError, SyncResult};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A [`Renderer`] whose output names the document and the rows it holds.
///
/// Meal-prep slots are titled through the [`RenderContext`] so tests can
/// observe the recipe cache.
#[derive(Debug, Default)]
pub struct StubRenderer {
    failing: Mutex<HashSet<String>>,
    panicking: Mutex<HashSet<String>>,
    renders: AtomicUsize,
}

impl StubRenderer {
    /// Creates a renderer that never fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes rendering fail for the document with `mapping_key`.
    pub fn fail_on(&self, mapping_key: impl Into<String>) {
        self.failing.lock().insert(mapping_key.into());
    }

    /// Makes rendering panic for the document with `mapping_key`.
    pub fn panic_on(&self, mapping_key: impl Into<String>) {
        self.panicking.lock().insert(mapping_key.into());
    }

    /// Stops failing or panicking for `mapping_key`.
    pub fn heal(&self, mapping_key: &str) {
        self.failing.lock().remove(mapping_key);
        self.panicking.lock().remove(mapping_key);
    }

    /// Number of successful renders.
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl Renderer for StubRenderer {
    fn render(&self, document: &Document<'_>, context: &RenderContext) -> SyncResult<String> {
        let key = document.mapping_key();
        let panics = self.panicking.lock().contains(&key);
        if panics {
            panic!("injected panic rendering {key}");
        }
        if self.failing.lock().contains(&key) {
            return Err(SyncError::render(document.kind(), key, "injected failure"));
        }
        let body = match document {
            Document::Profile(profile) => format!("profile {}", profile.uid),
            Document::Medications(medications) => medications
                .iter()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            Document::Recipe(recipe) => format!("# {}", recipe.title),
            Document::MealprepPlan(plan) => plan
                .recipe_ids()
                .map(|id| context.recipe_title(id).unwrap_or(id))
                .collect::<Vec<_>>()
                .join(", "),
            Document::Inventory(items) => format!("{} items", items.len()),
            Document::ShoppingList(items) => format!("{} items", items.len()),
            Document::Daily(daily) => format!("{} rows", daily.row_count()),
        };
        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(format!("[{}:{}]\n{}", document.kind(), key, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{mealprep_plan, recipe};

    #[test]
    fn plans_are_titled_from_context() {
        let renderer = StubRenderer::new();
        let plan = mealprep_plan("p1", "2024-01-01", &["r1", "r2"], 1);
        let mut context = RenderContext::new();
        context.set_recipes(&[recipe("r1", "Soup", 1)]);

        let text = renderer.render(&Document::MealprepPlan(&plan), &context).unwrap();
        assert_eq!(text, "[mealprep_plan:p1]\nSoup, r2");
        assert_eq!(renderer.render_count(), 1);
    }

    #[test]
    fn injected_failure_is_a_render_error() {
        let renderer = StubRenderer::new();
        renderer.fail_on("r1");
        let soup = recipe("r1", "Soup", 1);
        let err = renderer
            .render(&Document::Recipe(&soup), &RenderContext::new())
            .unwrap_err();
        assert!(matches!(err, SyncError::Render { .. }));

        renderer.heal("r1");
        assert!(renderer.render(&Document::Recipe(&soup), &RenderContext::new()).is_ok());
    }
}
