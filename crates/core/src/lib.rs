//! Domain building blocks for the model-generation gateway.
//!
//! Holds the local validation error taxonomy, job kinds and request
//! parsing, the upstream payload builder, status normalization, and the
//! temporary asset store used to stage uploaded images.

pub mod error;
pub mod job;
pub mod payload;
pub mod staging;
pub mod status;
