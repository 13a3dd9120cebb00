//! Robo Common Library
//!
//! This crate provides shared constants and configuration loading utilities
//! for all robo_command workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Scheduler capacity limits and timing defaults
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use robo_common::consts::MAX_RESOURCES;
//! use robo_common::config::{ConfigLoader, SharedConfig};
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
