//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the transfer core:
//! - Logging and tracing infrastructure
//! - Transfer configuration
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the other crates depend on. It
//! establishes the logging conventions, the explicit configuration value that
//! replaces ambient settings state, and the event broadcasting used to report
//! background progress to the host.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::TransferConfig;
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, RecoveryEvent, TransferEvent};
