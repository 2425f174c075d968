//! # Recipe Registry
//!
//! Holds the rendering strategies a scheduler can run. Built once at startup,
//! then shared read-only behind an `Arc`.

use crate::config::FactoryConfig;
use crate::error::{FactoryError, FactoryResult};
use crate::orchestration::stage_graph::StageGraph;
use crate::recipes::{builtin, Recipe, RecipeKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Registry statistics for monitoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_recipes: usize,
    pub total_stages: usize,
    pub recipes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RecipeRegistry {
    recipes: HashMap<RecipeKind, Arc<Recipe>>,
    /// Registration order
    order: Vec<RecipeKind>,
}

impl RecipeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the five built-in recipes
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for recipe in builtin::all(crate::constants::limits::LOOP_MIN_DURATION_SECS) {
            // built-in templates are valid and distinct
            if let Err(e) = registry.register(recipe) {
                tracing::error!(error = %e, "Built-in recipe rejected");
            }
        }
        registry
    }

    /// Built-in recipes with configured policy overrides and loop threshold applied
    pub fn from_config(config: &FactoryConfig) -> FactoryResult<Self> {
        let mut registry = Self::new();
        for mut recipe in builtin::all(config.validation.loop_min_duration_secs) {
            for stage in &mut recipe.stages {
                config.execution.apply_overrides(stage);
            }
            registry.register(recipe)?;
        }
        info!(
            recipes = registry.len(),
            "🎞️ Recipe registry initialized"
        );
        Ok(registry)
    }

    pub fn register(&mut self, recipe: Recipe) -> FactoryResult<()> {
        if self.recipes.contains_key(&recipe.kind) {
            return Err(FactoryError::DuplicateRecipe(recipe.name().to_string()));
        }
        StageGraph::validate(&recipe.stages)?;

        debug!(
            recipe = recipe.name(),
            stages = recipe.stages.len(),
            "Registered recipe"
        );
        self.order.push(recipe.kind);
        self.recipes.insert(recipe.kind, Arc::new(recipe));
        Ok(())
    }

    /// Look a recipe up by name, ignoring case
    pub fn resolve(&self, name: &str) -> FactoryResult<Arc<Recipe>> {
        let kind: RecipeKind = name.parse()?;
        self.get(kind)
            .ok_or_else(|| FactoryError::UnknownRecipe(name.trim().to_string()))
    }

    pub fn get(&self, kind: RecipeKind) -> Option<Arc<Recipe>> {
        self.recipes.get(&kind).cloned()
    }

    pub fn contains(&self, kind: RecipeKind) -> bool {
        self.recipes.contains_key(&kind)
    }

    /// Registered recipe names in registration order
    pub fn list_available(&self) -> Vec<&'static str> {
        self.order.iter().map(RecipeKind::name).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_recipes: self.len(),
            total_stages: self.recipes.values().map(|r| r.stages.len()).sum(),
            recipes: self.list_available().into_iter().map(String::from).collect(),
        }
    }
}
