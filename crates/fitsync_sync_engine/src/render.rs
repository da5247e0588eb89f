//! Rendering seam and the lookup caches renderers rely on.

use crate::error::SyncResult;
use fitsync_model::{Document, Medication, Recipe, UserProfile};
use std::collections::HashMap;

/// Lookup data a renderer needs to resolve foreign keys without its own
/// data access.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// Latest profile, for goal comparisons.
    pub profile: Option<UserProfile>,
    /// Medications by id, for naming medication log entries.
    pub medications: HashMap<String, Medication>,
    /// Recipes by id, for titling meal-prep slots.
    pub recipes: HashMap<String, Recipe>,
}

impl RenderContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the medication map.
    pub fn set_medications(&mut self, medications: &[Medication]) {
        self.medications = medications
            .iter()
            .map(|m| (m.id.clone(), m.clone()))
            .collect();
    }

    /// Replaces the recipe map.
    pub fn set_recipes(&mut self, recipes: &[Recipe]) {
        self.recipes = recipes.iter().map(|r| (r.id.clone(), r.clone())).collect();
    }

    /// Inserts or refreshes recipes in the map.
    pub fn upsert_recipes(&mut self, recipes: &[Recipe]) {
        for recipe in recipes {
            self.recipes.insert(recipe.id.clone(), recipe.clone());
        }
    }

    /// Title of the recipe with `id`, if known.
    pub fn recipe_title(&self, id: &str) -> Option<&str> {
        self.recipes.get(id).map(|r| r.title.as_str())
    }

    /// Name of the medication with `id`, if known.
    pub fn medication_name(&self, id: &str) -> Option<&str> {
        self.medications.get(id).map(|m| m.name.as_str())
    }
}

/// Turns a document into text.
///
/// Rendering is pure: the same document and context always produce the
/// same text. Malformed rows are reported as
/// [`SyncError::Render`](crate::SyncError::Render).
pub trait Renderer: Send + Sync + 'static {
    /// Renders `document`.
    fn render(&self, document: &Document<'_>, context: &RenderContext) -> SyncResult<String>;
}
