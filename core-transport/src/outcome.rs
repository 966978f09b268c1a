//! Per-task transfer outcomes and collected error reports.

use serde::{Deserialize, Serialize};

/// Reason attached to transfers the device completed without a usable
/// confirmation. Distinguishes "protocol succeeded but semantically empty
/// result" from a hard error.
pub const UNCONFIRMED_REASON: &str = "transfer unconfirmed";

/// Result of sending one file to the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferOutcome {
    /// Accepted with a confirmed device location.
    Delivered { lpath: String },
    /// Accepted, but the device returned no confirmable path. The transfer
    /// counts as a success; there is nothing to stage for catalog sync.
    DeliveredUnplaced,
    /// Rejected, unconfirmed, or errored.
    Failed { reason: String },
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, TransferOutcome::Failed { .. })
    }
}

/// One collected task failure: title, short message, detailed trace.
/// Append-only for the duration of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub title: String,
    pub message: String,
    pub details: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success_classification() {
        assert!(TransferOutcome::Delivered {
            lpath: "books/a.epub".to_string()
        }
        .is_success());
        assert!(TransferOutcome::DeliveredUnplaced.is_success());
        assert!(!TransferOutcome::Failed {
            reason: UNCONFIRMED_REASON.to_string()
        }
        .is_success());
    }
}
