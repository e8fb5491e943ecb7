//! Client library for the upstream job-processing APIs.
//!
//! Provides family configuration, the [`JobApi`](api::JobApi) seam used by
//! the gateway handlers, a reqwest-backed implementation with bearer
//! credential injection, multipart form parts that stream staged uploads
//! from disk, and normalization of upstream failures into
//! [`UpstreamError`](error::UpstreamError).

pub mod api;
pub mod config;
pub mod error;
pub mod form;

pub use api::{ByteStream, HttpJobApi, JobApi, UpstreamResponse};
pub use config::{UpstreamFamily, UpstreamSettings};
pub use error::UpstreamError;
pub use form::FormPart;
