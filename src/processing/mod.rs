pub mod entities;
pub mod reshape;

pub use entities::{build_entity_table, extract_region};
pub use reshape::{extract_observations, pivot, reshape, ReshapeResult, ReshapeStats};
