//! platescan-core: reference catalog, image classifier, and configuration.
//! All other Platescan crates depend on this one.

pub mod catalog;
pub mod classifier;
pub mod config;

pub use catalog::{Catalog, CatalogError, FoodProfile, Macros};
pub use classifier::{ClassificationResult, Classifier, ClassifyError};
