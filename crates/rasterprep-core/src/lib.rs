//! Rasterprep Core - Error taxonomy, domain models, and config rendering
//!
//! This crate contains the shared domain logic for the rasterprep pipeline.

pub mod config;
pub mod error;
pub mod models;
pub mod template;

pub use error::{PrepError, Result};
