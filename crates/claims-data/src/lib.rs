//! Claims audit engine.
//!
//! Reads the patient, provider, procedure and claim tables, cleans them,
//! aggregates claims along each dimension, derives billing metrics, applies
//! the anomaly rules and assembles the named report sections.

pub mod aggregator;
pub mod analysis;
pub mod cleaning;
pub mod metrics;
pub mod reader;
pub mod report;
pub mod rules;
pub mod store;
pub mod summary;

pub use claims_core as core;
