//! # Formats
//!
//! Concrete serialized forms of an environment, each exposed through the
//! `EnvironmentAccessor` interface.

pub mod json;

pub use json::{JsonAccessor, JsonList};
