//! Batch identifiers and result types.
//!
//! A batch's outcome is data, not an exception: everything the host needs to
//! present — per-task results, collected error reports, entries staged for
//! catalog sync — travels in the [`BatchReport`] resolved through the
//! completion channel.

use core_metadata::DeviceMetadata;
use core_transport::ErrorReport;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a transfer batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(Uuid);

impl BatchId {
    /// Create a new random batch ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Final result of one transfer batch.
///
/// Partial failure is not fatal: each task's outcome is independent, and a
/// cancelled batch keeps the outcomes it accumulated before the stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: BatchId,
    /// Titles delivered to the device.
    pub succeeded: Vec<String>,
    /// `(title, reason)` for every task that failed.
    pub failed: Vec<(String, String)>,
    /// Detailed error reports collected by the transport client.
    pub error_reports: Vec<ErrorReport>,
    /// `(lpath, metadata)` pairs for catalog sync; only located successes
    /// are staged.
    pub staged: Vec<(String, DeviceMetadata)>,
    /// Whether the batch stopped early at a task boundary.
    pub cancelled: bool,
}

impl BatchReport {
    pub fn new(batch_id: BatchId) -> Self {
        Self {
            batch_id,
            succeeded: Vec::new(),
            failed: Vec::new(),
            error_reports: Vec::new(),
            staged: Vec::new(),
            cancelled: false,
        }
    }

    /// Tasks that produced an outcome (succeeded or failed).
    pub fn total_processed(&self) -> u64 {
        (self.succeeded.len() + self.failed.len()) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_id_unique() {
        assert_ne!(BatchId::new(), BatchId::new());
    }

    #[test]
    fn test_report_counts() {
        let mut report = BatchReport::new(BatchId::new());
        report.succeeded.push("A".to_string());
        report.succeeded.push("B".to_string());
        report.failed.push(("C".to_string(), "boom".to_string()));

        assert_eq!(report.total_processed(), 3);
    }
}
