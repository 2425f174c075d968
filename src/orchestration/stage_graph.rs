//! # Stage Graph
//!
//! Dependency graph built from a recipe's stage template.
//!
//! The graph is validated once on construction (unknown dependencies,
//! duplicate stage kinds, cycles). Readiness is then answered against the list
//! of completed stages; when several stages are runnable the one declared first
//! wins, so execution order is deterministic for a given recipe.

use super::types::{StageKind, StageSpec};
use crate::error::{FactoryError, FactoryResult};
use crate::recipes::Recipe;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct StageGraph {
    specs: Vec<StageSpec>,
}

impl StageGraph {
    pub fn new(specs: Vec<StageSpec>) -> FactoryResult<Self> {
        Self::validate(&specs)?;
        Ok(Self { specs })
    }

    pub fn from_recipe(recipe: &Recipe) -> FactoryResult<Self> {
        Self::new(recipe.stages.clone())
    }

    /// Check a stage template without building a graph
    pub fn validate(specs: &[StageSpec]) -> FactoryResult<()> {
        if specs.is_empty() {
            return Err(FactoryError::validation("stage template is empty"));
        }

        let mut declared = HashSet::new();
        for spec in specs {
            if !declared.insert(spec.kind) {
                return Err(FactoryError::ValidationError(format!(
                    "stage {} is declared more than once",
                    spec.kind
                )));
            }
        }

        for spec in specs {
            if let Some(unknown) = spec.depends_on.iter().find(|dep| !declared.contains(dep)) {
                return Err(FactoryError::ValidationError(format!(
                    "stage {} depends on undeclared stage {unknown}",
                    spec.kind
                )));
            }
            if spec.depends_on.contains(&spec.kind) {
                return Err(FactoryError::ValidationError(format!(
                    "stage {} depends on itself",
                    spec.kind
                )));
            }
        }

        let ordered = Self::order(specs);
        if ordered.len() != specs.len() {
            let stuck: Vec<String> = specs
                .iter()
                .filter(|spec| !ordered.contains(&spec.kind))
                .map(|spec| spec.kind.to_string())
                .collect();
            return Err(FactoryError::ValidationError(format!(
                "stage template has a dependency cycle involving: {}",
                stuck.join(", ")
            )));
        }

        Ok(())
    }

    /// Kahn's algorithm, picking the first declared ready stage at each step.
    /// Stops early when the remaining stages form a cycle.
    fn order(specs: &[StageSpec]) -> Vec<StageKind> {
        let mut done: Vec<StageKind> = Vec::with_capacity(specs.len());
        while done.len() < specs.len() {
            let next = specs.iter().find(|spec| {
                !done.contains(&spec.kind) && spec.depends_on.iter().all(|dep| done.contains(dep))
            });
            match next {
                Some(spec) => done.push(spec.kind),
                None => break,
            }
        }
        done
    }

    pub fn specs(&self) -> &[StageSpec] {
        &self.specs
    }

    /// Stage kinds in declaration order
    pub fn kinds(&self) -> Vec<StageKind> {
        self.specs.iter().map(|spec| spec.kind).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    fn is_ready(spec: &StageSpec, completed: &[StageKind]) -> bool {
        !completed.contains(&spec.kind) && spec.depends_on.iter().all(|dep| completed.contains(dep))
    }

    /// First stage in declaration order that is not completed and whose
    /// dependencies all are
    pub fn next_runnable(&self, completed: &[StageKind]) -> Option<&StageSpec> {
        self.specs
            .iter()
            .find(|spec| Self::is_ready(spec, completed))
    }

    pub fn is_complete(&self, completed: &[StageKind]) -> bool {
        self.specs.iter().all(|spec| completed.contains(&spec.kind))
    }

    /// The order in which the scheduler will execute the stages
    pub fn execution_order(&self) -> Vec<StageKind> {
        Self::order(&self.specs)
    }
}
