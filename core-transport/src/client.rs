//! Transport client for the device protocol session.
//!
//! The only component allowed to speak the wire protocol. One client owns
//! one protocol session; every operation serializes against the session lock
//! because the device answers exactly one request at a time. The session is
//! preserved across calls so consecutive sends reuse one connection.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bridge_traits::device::DeviceDriver;
use core_metadata::DeviceMetadata;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::outcome::{ErrorReport, TransferOutcome, UNCONFIRMED_REASON};
use crate::protocol::{
    catalog_reset_metadata, send_book_fields, EMPTY_CATALOG, OP_ERROR, OP_SEND_BOOK,
};

/// Remediation appended to error reports matching the catalog corruption
/// signature. Surfaced to the operator, never auto-applied.
const CORRUPTION_REMEDIATION: &str = "The device catalog cache looks corrupted.\n\
1) Purge the host-side catalog cache from the plugin menu;\n\
2) then run the device's wireless catalog reset so the catalog is rebuilt on the next connection.";

/// A missing `extension` field or a key-lookup failure in a driver message is
/// the known signature of a stale or malformed cached catalog record, not a
/// generic transport error.
fn is_corruption_signature(message: &str) -> bool {
    message.contains("extension")
        || message.contains("missing field")
        || message.contains("key not found")
}

/// Client for one live device session.
pub struct TransportClient {
    driver: Arc<dyn DeviceDriver>,
    timeout_secs: u64,
    error_reports: Mutex<Vec<ErrorReport>>,
}

impl TransportClient {
    /// Creates a client over a connected driver with the per-book timeout
    /// from the transfer configuration.
    pub fn new(driver: Arc<dyn DeviceDriver>, timeout_secs: u64) -> Self {
        Self {
            driver,
            timeout_secs,
            error_reports: Mutex::new(Vec::new()),
        }
    }

    /// The underlying driver. Used by the recovery path, which needs the raw
    /// session channel.
    pub fn driver(&self) -> &Arc<dyn DeviceDriver> {
        &self.driver
    }

    /// Verifies the device can accept a transfer right now.
    pub fn ensure_ready(&self) -> Result<()> {
        if self.driver.busy() {
            return Err(TransportError::NotReady(
                "the device is busy with another job".to_string(),
            ));
        }
        Ok(())
    }

    /// Sends one file to the device.
    ///
    /// Wraps the driver's batch-upload primitive with a single-element batch.
    /// Failures are returned as data, never raised: driver errors and
    /// timeouts are recorded as error reports and classified as
    /// [`TransferOutcome::Failed`]. An empty or negative-length receipt is a
    /// failure ("transfer unconfirmed") even though no error occurred.
    pub async fn send_one(
        &self,
        path: &Path,
        filename: &str,
        title: &str,
        metadata: &DeviceMetadata,
    ) -> TransferOutcome {
        let metadata_value = match serde_json::to_value(metadata) {
            Ok(value) => value,
            Err(e) => {
                let err = TransportError::Serialize(e);
                self.record_error(title, &err);
                return TransferOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        };

        let session = self.driver.session();
        let _guard = session.lock.lock().await;

        debug!(filename, "uploading file");
        let paths = [path.to_path_buf()];
        let filenames = [filename.to_string()];
        let metadata_values = [metadata_value];
        let upload = self.driver.upload_books(
            &paths,
            &filenames,
            &metadata_values,
        );

        match timeout(Duration::from_secs(self.timeout_secs), upload).await {
            Ok(Ok(receipts)) => match receipts.into_iter().next() {
                Some(receipt) if receipt.accepted() => match receipt.lpath {
                    Some(lpath) => TransferOutcome::Delivered { lpath },
                    None => TransferOutcome::DeliveredUnplaced,
                },
                _ => TransferOutcome::Failed {
                    reason: UNCONFIRMED_REASON.to_string(),
                },
            },
            Ok(Err(e)) => {
                warn!(title, error = %e, "upload failed");
                let reason = e.to_string();
                self.record_error(title, &e);
                TransferOutcome::Failed { reason }
            }
            Err(_elapsed) => {
                let err = TransportError::Timeout(self.timeout_secs);
                warn!(title, "upload timed out");
                let reason = err.to_string();
                self.record_error(title, &err);
                TransferOutcome::Failed { reason }
            }
        }
    }

    /// Whether a file exists on the device.
    ///
    /// Existence is inferred purely from the absence of a protocol error on
    /// fetch; nothing is assumed about the content.
    pub async fn fetch_exists(&self, lpath: &str) -> bool {
        let session = self.driver.session();
        let _guard = session.lock.lock().await;

        let mut sink = Vec::new();
        self.driver.get_file(lpath, &mut sink).await.is_ok()
    }

    /// Deletes one file from the device.
    pub async fn delete(&self, lpath: &str) -> Result<()> {
        let session = self.driver.session();
        let _guard = session.lock.lock().await;

        self.driver.delete_books(&[lpath.to_string()]).await?;
        Ok(())
    }

    /// Overwrites a server-side catalog record with an empty list.
    ///
    /// Impersonates a one-file transfer whose target path IS the catalog
    /// filename; the ordinary upload API cannot address that file. Returns
    /// the lpath actually written, which is the device-corrected path when
    /// the acknowledgement supplies one; the corrected path is trusted
    /// without re-verification.
    ///
    /// The session lock is held across the whole exchange: this is not a
    /// normal file send and must not be interleaved with other protocol
    /// calls. Honors the device's pre-send acknowledgement flag; an explicit
    /// error opcode aborts the operation with the device's own message and
    /// nothing is streamed after it. The exchange is protocol-version
    /// fragile: any change to the device's acknowledgement semantics
    /// invalidates it.
    pub async fn reset_catalog_record(&self, lpath: &str) -> Result<String> {
        let session = self.driver.session();
        let wants_ack = session.wants_send_ok;

        let metadata = catalog_reset_metadata(lpath, EMPTY_CATALOG.len());
        let fields = send_book_fields(lpath, EMPTY_CATALOG.len(), &metadata, wants_ack)?;

        let _guard = session.lock.lock().await;

        let (opcode, result) = session.channel.call(OP_SEND_BOOK, fields).await?;

        let mut target = lpath.to_string();
        if wants_ack {
            if opcode == OP_ERROR {
                let message = result
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("SEND_BOOK failed")
                    .to_string();
                warn!(lpath, message, "device rejected catalog reset");
                return Err(TransportError::RecoveryRejected { message });
            }
            if let Some(corrected) = result.get("lpath").and_then(Value::as_str) {
                target = corrected.to_string();
            }
        }

        session.channel.send_bytes(EMPTY_CATALOG).await?;

        Ok(target)
    }

    /// Records a task failure, enriching known corruption signatures with a
    /// remediation note.
    pub fn record_error(&self, title: &str, error: &dyn std::error::Error) {
        let message = error.to_string();

        let mut details = message.clone();
        let mut source = error.source();
        while let Some(cause) = source {
            details.push_str("\ncaused by: ");
            details.push_str(&cause.to_string());
            source = cause.source();
        }

        let (message, details) = if is_corruption_signature(&message) {
            (
                format!("{}\n{}", message, CORRUPTION_REMEDIATION),
                format!("{}\n\n{}", details, CORRUPTION_REMEDIATION),
            )
        } else {
            (message, details)
        };

        self.error_reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(ErrorReport {
                title: title.to_string(),
                message,
                details,
            });
    }

    /// Drains the error reports accumulated so far.
    pub fn take_error_reports(&self) -> Vec<ErrorReport> {
        std::mem::take(
            &mut *self
                .error_reports
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}
