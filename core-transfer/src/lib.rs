//! # Transfer Module
//!
//! Batch transfer of raw e-book files to a connected reading device.
//!
//! ## Overview
//!
//! This crate owns everything between "the user picked some books" and "the
//! device catalog reflects what arrived":
//!
//! - **Task Builder** (`task`): resolves each book to one concrete file,
//!   filename, and sanitized metadata record
//! - **Batch Coordinator** (`coordinator`): drives the transport client over
//!   the task list on a background task, with cooperative cancellation and
//!   progress events
//! - **Catalog Syncer** (`catalog`): folds confirmed uploads into the
//!   in-memory device book lists
//! - **Digests** (`digest`): streaming MD5 for integrity verification
//!
//! Files are transferred verbatim — byte-for-byte, hash-preserving. The
//! payload is an opaque blob whose only required property is that its digest
//! on the device equals its digest at the source.

pub mod batch;
pub mod catalog;
pub mod coordinator;
pub mod digest;
pub mod error;
pub mod task;

pub use batch::{BatchId, BatchReport};
pub use catalog::{BookLists, CatalogEntry, CatalogSyncer};
pub use coordinator::{BatchCoordinator, BatchHandle};
pub use error::{Result, TransferError};
pub use task::{SkippedBook, TaskBuilder, TransferTask};
