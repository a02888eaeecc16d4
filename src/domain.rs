//! Domain layer - product records and the run-scoped dataset

pub mod dataset;
pub mod product;

pub use dataset::{Acceptance, Dataset, RunContext};
pub use product::{ExtractedProduct, ItemType, ProductRecord};
