//! Core types for the client-certificate gate
//!
//! This library provides:
//! - Validation configuration shared by all gate invocations
//! - The gate error taxonomy

pub mod config;
pub mod error;

pub use config::ValidationConfig;
pub use error::{GateError, Result};
