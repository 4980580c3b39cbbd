pub mod account_mapping;
pub mod analysis;
pub mod api;
pub mod database;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod processing;
pub mod sources;
pub mod utils;

pub use error::{PipelineError, Result};
