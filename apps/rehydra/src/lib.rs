//! # rehydra
//!
//! Command-line front end for `rehydra-core`: reads environment files,
//! applies configuration, prints rehydrated graphs and flattens headers.

pub mod cli;
pub mod config;
pub mod error;
pub mod flatten;

pub use config::Config;
pub use error::AppError;
pub use flatten::HeaderFlattener;
