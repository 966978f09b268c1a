//! # Metadata Module
//!
//! Device-facing metadata sanitizing.
//!
//! ## Overview
//!
//! The transfer core ships each file with a metadata record the device folds
//! into its catalog. This crate owns the projection from the host library's
//! source records into that device-safe shape: binary payloads stripped,
//! stale cross-format blocks dropped, identifiers guaranteed present.

pub mod sanitizer;

pub use sanitizer::{sanitize_for_device, DeviceMetadata};
