//! Device Driver Abstractions
//!
//! Defines the boundary between the transfer core and the wireless
//! companion-reader driver owned by the host application.
//!
//! The driver exposes two levels of access:
//!
//! - [`DeviceDriver`]: the high-level file operations (upload, fetch, delete)
//!   every normal transfer goes through.
//! - [`DeviceChannel`]: the raw opcode/payload exchange underneath. Only the
//!   catalog recovery path reaches for this level; everything else must stay
//!   on the `DeviceDriver` surface.
//!
//! A [`DeviceSession`] ties the two together for the lifetime of one
//! user-initiated operation. The device answers exactly one request at a time
//! over a single channel, so every exchange must hold the session lock —
//! concurrent protocol calls on the same session are a correctness violation,
//! not a performance concern.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::Result;

/// Outcome of uploading a single file, as reported by the device.
///
/// A non-negative `length` signals that the device accepted the file. The
/// `lpath` may be absent even on acceptance; callers must treat a missing
/// location as "accepted but unconfirmed placement".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Device-relative logical path the file landed at, when confirmed.
    pub lpath: Option<String>,
    /// Number of bytes the device accepted; negative on rejection.
    pub length: i64,
}

impl UploadReceipt {
    /// Whether the device accepted the file.
    pub fn accepted(&self) -> bool {
        self.length >= 0
    }
}

/// Raw request/response channel to the device.
///
/// One `call` is one protocol exchange; the device processes exchanges
/// strictly in sequence. Callers are responsible for holding the owning
/// session's lock across the call (and across any byte stream that follows
/// it).
#[async_trait]
pub trait DeviceChannel: Send + Sync {
    /// Perform one opcode exchange and return the response `(opcode, fields)`.
    ///
    /// When the device does not wait for acknowledgements the returned tuple
    /// may be a synthetic empty acknowledgement; callers that set no
    /// acknowledgement expectation must not interpret it.
    async fn call(&self, opcode: &str, args: Value) -> Result<(String, Value)>;

    /// Stream raw payload bytes over the channel.
    async fn send_bytes(&self, payload: &[u8]) -> Result<()>;
}

/// One live connection to the device.
///
/// Lifetime is one user-initiated operation; sessions are not reused across
/// unrelated operations lest stale session markers desynchronize receiver and
/// sender.
pub struct DeviceSession {
    /// Serializes all protocol exchanges against this session.
    pub lock: Mutex<()>,
    /// Whether the device acknowledges the start of a file transfer before
    /// bytes are streamed.
    pub wants_send_ok: bool,
    /// The raw transport channel.
    pub channel: Arc<dyn DeviceChannel>,
}

impl DeviceSession {
    pub fn new(channel: Arc<dyn DeviceChannel>, wants_send_ok: bool) -> Self {
        Self {
            lock: Mutex::new(()),
            wants_send_ok,
            channel,
        }
    }
}

/// High-level device driver operations.
///
/// Implemented by the host's device layer. All methods speak through the
/// session's channel; implementations must not terminate the session between
/// calls so that consecutive operations reuse one connection.
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    /// Upload files to the device's main storage.
    ///
    /// Returns one receipt per file, in the order given. The transfer is
    /// byte-for-byte; the driver must not re-encode payloads.
    async fn upload_books(
        &self,
        paths: &[PathBuf],
        names: &[String],
        metadata: &[Value],
    ) -> Result<Vec<UploadReceipt>>;

    /// Fetch a file by its device-relative path into `sink`.
    ///
    /// Errors with [`BridgeError::NotFound`](crate::BridgeError::NotFound)
    /// when the path does not exist on the device.
    async fn get_file(&self, lpath: &str, sink: &mut Vec<u8>) -> Result<()>;

    /// Delete files by device-relative path.
    async fn delete_books(&self, lpaths: &[String]) -> Result<()>;

    /// Whether the device currently has a competing job in flight.
    fn busy(&self) -> bool {
        false
    }

    /// The live protocol session for this connection.
    fn session(&self) -> &DeviceSession;

    /// Display a short message on the device, when supported. Best-effort.
    async fn show_message(&self, _message: &str) -> Result<()> {
        Ok(())
    }
}
