//! Core types for claims auditing: the claim data model, the error type,
//! statistics primitives, policy thresholds, formatting and CLI settings.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod stats;
pub mod thresholds;

pub use error::{AuditError, Result};
