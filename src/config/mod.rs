//! # Configuration Module
//!
//! Centralizes the configuration constants of the view protocol. Values that
//! are adjustable at runtime are passed explicitly instead (see
//! `ScratchBuffer::with_capacity` and `TagRegistry::with_discriminant`); there
//! is no global mutable state.
//!
//! ## Module Organization
//!
//! - [`constants`]: numeric configuration values with dependency documentation

pub mod constants;
pub use constants::*;
