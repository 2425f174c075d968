//! # Registry Infrastructure
//!
//! Registries for the components a scheduler resolves at run time.
//!
//! ## Available Registries
//!
//! - **RecipeRegistry**: named rendering strategies and their stage templates
//!
//! ## Usage
//!
//! ```rust
//! use video_factory::registry::RecipeRegistry;
//!
//! let registry = RecipeRegistry::with_defaults();
//! let recipe = registry.resolve("Ambient").unwrap();
//! assert_eq!(recipe.name(), "ambient");
//! ```

pub mod recipe_registry;

pub use recipe_registry::{RecipeRegistry, RegistryStats};
