//! # Transport Module
//!
//! The wire-protocol side of the transfer core.
//!
//! ## Overview
//!
//! This crate is the only place that speaks the device protocol:
//!
//! - **Transport Client** (`client`): one protocol session; send one file,
//!   probe for a file, delete a file, classify failures
//! - **Protocol Payloads** (`protocol`): the opcode field maps, reproduced
//!   bit-for-field from the device contract
//! - **Cache Recovery** (`recovery`): the local cache purge and the crafted
//!   remote catalog reset
//!
//! Everything above this crate works in terms of tasks and outcomes; nothing
//! else constructs protocol payloads or touches the session channel.

pub mod client;
pub mod error;
pub mod outcome;
pub mod protocol;
pub mod recovery;

pub use client::TransportClient;
pub use error::{Result, TransportError};
pub use outcome::{ErrorReport, TransferOutcome, UNCONFIRMED_REASON};
pub use recovery::{CacheRecovery, PurgeReport};
