//! # Host Bridge Traits
//!
//! Boundary traits that must be implemented by the host application.
//!
//! ## Overview
//!
//! This crate defines the contract between the transfer core and the host's
//! own subsystems. Each trait represents a capability the core requires but
//! does not own: the wireless device driver, the raw protocol channel
//! underneath it, and the library database.
//!
//! ## Traits
//!
//! - [`DeviceDriver`](device::DeviceDriver) - upload, fetch, delete against a
//!   connected reading device
//! - [`DeviceChannel`](device::DeviceChannel) - raw opcode/payload exchange;
//!   used only by the catalog recovery path
//! - [`LibraryStore`](library::LibraryStore) - format lookup, metadata
//!   records, stored file paths
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Host
//! implementations should convert their own errors into it and keep the
//! messages actionable (paths, opcode names, device state).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared across async
//! tasks behind `Arc`.

pub mod device;
pub mod error;
pub mod library;

pub use error::BridgeError;

// Re-export commonly used types
pub use device::{DeviceChannel, DeviceDriver, DeviceSession, UploadReceipt};
pub use library::{BookId, BookRecord, FormatBlock, LibraryStore};
