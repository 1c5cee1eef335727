//! Kenbot Common Library
//!
//! This crate provides shared constants, configuration loading utilities and
//! the hardware-abstraction traits for all Kenbot workspace crates.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Workspace-wide numeric defaults
//! - [`hal`] - Digital input, edge notification and PWM output contracts
//!
//! # Usage
//!
//! ```rust
//! use kenbot_common::config::{ConfigLoader, SharedConfig};
//! use kenbot_common::hal::{Channel, DigitalInput, EdgeSource, PwmOutput};
//! ```

pub mod config;
pub mod consts;
pub mod hal;
