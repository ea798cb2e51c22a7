//! # jobsift-types
//!
//! Core type definitions shared by every jobsift crate.
//!
//! - **[`record`]** -- [`InputRecord`], [`OutputRecord`] and the fixed
//!   [`OutputField`] column set
//! - **[`config`]** -- Configuration schema loaded from JSON
//! - **[`secret`]** -- [`SecretString`] for API credentials
//! - **[`error`]** -- [`JobsiftError`] for configuration and setup failures

pub mod config;
pub mod error;
pub mod record;
pub mod secret;

pub use error::{JobsiftError, Result};
pub use record::{InputRecord, OutputField, OutputRecord};
pub use secret::SecretString;
